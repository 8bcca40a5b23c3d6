//! Aired episode order: the order episodes went out, with specials placed
//! at the point their airs-before/airs-after markers put them.

use std::cmp::Ordering;

use mq_core::Episode;

/// Compare two episodes in aired order.
///
/// Premiere dates decide when both are known and differ. Otherwise regular
/// episodes order by season and number, specials by their declared
/// placement, and mixed pairs by where the special lands in the season.
pub fn compare_aired(x: &Episode, y: &Episode) -> Ordering {
    if let (Some(a), Some(b)) = (x.premiere_date, y.premiere_date) {
        let by_date = a.cmp(&b);
        if by_date != Ordering::Equal {
            return by_date;
        }
    }

    match (x.is_special(), y.is_special()) {
        (true, true) => special_value(x).cmp(&special_value(y)),
        (false, false) => episode_value(x).cmp(&episode_value(y)),
        (false, true) => episode_to_special(x, y),
        (true, false) => episode_to_special(y, x).reverse(),
    }
}

/// Stable sort into aired order.
///
/// The comparator is not a total order once premiere dates are only
/// partially known, so this is an insertion sort rather than
/// `slice::sort_by`, which may panic on inconsistent orderings.
pub fn sort_aired(episodes: &mut [Episode]) {
    for i in 1..episodes.len() {
        let mut j = i;
        while j > 0 && compare_aired(&episodes[j - 1], &episodes[j]) == Ordering::Greater {
            episodes.swap(j - 1, j);
            j -= 1;
        }
    }
}

fn episode_value(e: &Episode) -> i64 {
    i64::from(e.parent_index.unwrap_or(-1)) * 1000 + i64::from(e.index_number.unwrap_or(-1))
}

fn special_value(e: &Episode) -> i64 {
    let season = e.airs_after_season.or(e.airs_before_season).unwrap_or(0);
    let mut value = i64::from(season) * 1_000_000_000;
    if e.airs_after_season.is_some() {
        value += 1_000_000;
    }
    value += i64::from(e.airs_before_episode.unwrap_or(0)) * 1000;
    value + i64::from(e.index_number.unwrap_or(0))
}

/// Regular episode `x` against special `y`.
fn episode_to_special(x: &Episode, y: &Episode) -> Ordering {
    let x_season = x.parent_index.unwrap_or(-1);
    let y_season = y.airs_after_season.or(y.airs_before_season).unwrap_or(-1);
    if x_season != y_season {
        return x_season.cmp(&y_season);
    }

    // Same season from here on.
    if y.airs_after_season.is_some() {
        return Ordering::Less;
    }
    let Some(before_episode) = y.airs_before_episode else {
        // Airs before the whole season.
        return Ordering::Greater;
    };
    let Some(x_episode) = x.index_number else {
        return Ordering::Less;
    };
    if x_episode == before_episode {
        return Ordering::Greater;
    }
    x_episode.cmp(&before_episode)
}

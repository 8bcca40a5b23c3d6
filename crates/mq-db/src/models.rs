//! Row mapping between SQLite tables and `mq-core` domain types.
//!
//! Each mapper reads columns positionally, so the SELECT column constants
//! defined here must stay in step with the mappers below them.

use chrono::{DateTime, SecondsFormat, Utc};
use mq_core::{Episode, Item, ItemKind, SeriesKey, UserProfile, WatchMark};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// helpers
// ---------------------------------------------------------------------------

fn conversion_error(
    idx: usize,
    e: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
}

/// Parse a UUID-based ID from a text column.
pub(crate) fn parse_id<T: From<Uuid>>(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<T> {
    let s: String = row.get(idx)?;
    let uuid = Uuid::parse_str(&s).map_err(|e| conversion_error(idx, e))?;
    Ok(T::from(uuid))
}

pub(crate) fn parse_opt_id<T: From<Uuid>>(
    row: &rusqlite::Row,
    idx: usize,
) -> rusqlite::Result<Option<T>> {
    let s: Option<String> = row.get(idx)?;
    match s {
        Some(v) => {
            let uuid = Uuid::parse_str(&v).map_err(|e| conversion_error(idx, e))?;
            Ok(Some(T::from(uuid)))
        }
        None => Ok(None),
    }
}

/// Parse an optional RFC 3339 timestamp column.
pub(crate) fn parse_opt_ts(
    row: &rusqlite::Row,
    idx: usize,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let s: Option<String> = row.get(idx)?;
    match s {
        Some(v) => {
            let ts = DateTime::parse_from_rfc3339(&v).map_err(|e| conversion_error(idx, e))?;
            Ok(Some(ts.with_timezone(&Utc)))
        }
        None => Ok(None),
    }
}

/// Fixed-width timestamp text, so that string order equals time order.
pub(crate) fn fmt_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

// ---------------------------------------------------------------------------
// Item
// ---------------------------------------------------------------------------

/// Item columns, for `Item::from_row`.
pub const ITEM_COLS: &str = "id, item_kind, name, parent_id, path, series_key";

/// Build an [`Item`] from a row selected with [`ITEM_COLS`].
///
/// Alternate versions live in their own table and are left empty here.
pub fn item_from_row(row: &rusqlite::Row) -> rusqlite::Result<Item> {
    let kind: String = row.get(1)?;
    let kind = kind
        .parse::<ItemKind>()
        .map_err(|e| conversion_error(1, e))?;
    let series_key: Option<String> = row.get(5)?;
    Ok(Item {
        id: parse_id(row, 0)?,
        kind,
        name: row.get(2)?,
        parent_id: parse_opt_id(row, 3)?,
        path: row.get(4)?,
        series_key: series_key.map(SeriesKey::from),
        alternate_versions: Vec::new(),
    })
}

// ---------------------------------------------------------------------------
// Episode
// ---------------------------------------------------------------------------

/// Episode columns, for `episode_from_row`. Unqualified so they work both
/// against `items` directly and against a subquery that re-exports them.
pub const EPISODE_COLS: &str = "id, series_key, name, sort_key, parent_index, index_number,
    airs_before_season, airs_after_season, airs_before_episode, premiere_date, is_virtual";

/// Build an [`Episode`] from a row selected with [`EPISODE_COLS`].
pub fn episode_from_row(row: &rusqlite::Row) -> rusqlite::Result<Episode> {
    let series_key: Option<String> = row.get(1)?;
    Ok(Episode {
        id: parse_id(row, 0)?,
        series_key: SeriesKey::from(series_key.unwrap_or_default()),
        name: row.get(2)?,
        sort_key: row.get(3)?,
        parent_index: row.get(4)?,
        index_number: row.get(5)?,
        airs_before_season: row.get(6)?,
        airs_after_season: row.get(7)?,
        airs_before_episode: row.get(8)?,
        premiere_date: parse_opt_ts(row, 9)?,
        is_virtual: row.get::<_, i32>(10)? != 0,
    })
}

// ---------------------------------------------------------------------------
// Playback
// ---------------------------------------------------------------------------

/// Playback columns, for `watch_mark_from_row`.
pub const PLAYBACK_COLS: &str = "played, play_count, position_ticks, last_played_at";

pub fn watch_mark_from_row(row: &rusqlite::Row) -> rusqlite::Result<WatchMark> {
    Ok(WatchMark {
        played: row.get::<_, i32>(0)? != 0,
        play_count: row.get(1)?,
        resume_position_ticks: row.get(2)?,
        last_played_at: parse_opt_ts(row, 3)?,
    })
}

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// Build a [`UserProfile`] from `id, username`. Folder exclusions are
/// loaded separately.
pub fn user_from_row(row: &rusqlite::Row) -> rusqlite::Result<UserProfile> {
    Ok(UserProfile {
        id: parse_id(row, 0)?,
        name: row.get(1)?,
        latest_item_excludes: Vec::new(),
    })
}

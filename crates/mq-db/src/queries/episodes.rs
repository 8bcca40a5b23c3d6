//! Episode creation and the dynamic episode query behind
//! [`LibraryIndex::query_episodes`](mq_core::LibraryIndex::query_episodes).

use chrono::{DateTime, Utc};
use mq_core::{
    Episode, EpisodeOrder, EpisodeQuery, Error, ItemId, ParentIndexFilter, Result, SeriesKey,
};
use rusqlite::types::ToSql;
use rusqlite::Connection;

use crate::models::{episode_from_row, fmt_ts, EPISODE_COLS};

/// Episode columns qualified against `items i`, aliased to the bare
/// [`EPISODE_COLS`] names, plus the querying user's last-played date.
const SELECT_COLS: &str = "i.id AS id, i.series_key AS series_key, i.name AS name,
    i.sort_key AS sort_key, i.parent_index AS parent_index, i.index_number AS index_number,
    i.airs_before_season AS airs_before_season, i.airs_after_season AS airs_after_season,
    i.airs_before_episode AS airs_before_episode, i.premiere_date AS premiere_date,
    i.is_virtual AS is_virtual, p.last_played_at AS last_played_at";

/// Fields for a new episode row.
#[derive(Debug, Clone)]
pub struct NewEpisode {
    pub series_key: SeriesKey,
    pub name: String,
    pub season: Option<i32>,
    pub episode: Option<i32>,
    /// Defaults to [`default_sort_key`] when unset.
    pub sort_key: Option<String>,
    pub airs_before_season: Option<i32>,
    pub airs_after_season: Option<i32>,
    pub airs_before_episode: Option<i32>,
    pub premiere_date: Option<DateTime<Utc>>,
    pub is_virtual: bool,
}

impl NewEpisode {
    pub fn new(
        series_key: &SeriesKey,
        name: &str,
        season: Option<i32>,
        episode: Option<i32>,
    ) -> Self {
        Self {
            series_key: series_key.clone(),
            name: name.to_string(),
            season,
            episode,
            sort_key: None,
            airs_before_season: None,
            airs_after_season: None,
            airs_before_episode: None,
            premiere_date: None,
            is_virtual: false,
        }
    }

    pub fn airs_before(mut self, season: i32, episode: Option<i32>) -> Self {
        self.airs_before_season = Some(season);
        self.airs_before_episode = episode;
        self
    }

    pub fn airs_after(mut self, season: i32) -> Self {
        self.airs_after_season = Some(season);
        self
    }

    pub fn premiered(mut self, date: DateTime<Utc>) -> Self {
        self.premiere_date = Some(date);
        self
    }

    pub fn missing(mut self) -> Self {
        self.is_virtual = true;
        self
    }
}

/// Zero-padded `season - episode - name`, so that text order is play order.
pub fn default_sort_key(season: Option<i32>, episode: Option<i32>, name: &str) -> String {
    format!(
        "{:03} - {:04} - {}",
        season.unwrap_or(0),
        episode.unwrap_or(0),
        name
    )
}

/// Create an episode under `parent_id` (usually a season).
pub fn create_episode(
    conn: &Connection,
    parent_id: Option<ItemId>,
    new: &NewEpisode,
) -> Result<Episode> {
    let episode = Episode {
        id: ItemId::new(),
        series_key: new.series_key.clone(),
        name: new.name.clone(),
        sort_key: new
            .sort_key
            .clone()
            .unwrap_or_else(|| default_sort_key(new.season, new.episode, &new.name)),
        parent_index: new.season,
        index_number: new.episode,
        airs_before_season: new.airs_before_season,
        airs_after_season: new.airs_after_season,
        airs_before_episode: new.airs_before_episode,
        premiere_date: new.premiere_date,
        is_virtual: new.is_virtual,
    };

    conn.execute(
        "INSERT INTO items (id, item_kind, name, parent_id, series_key, sort_key, parent_index,
            index_number, airs_before_season, airs_after_season, airs_before_episode,
            premiere_date, is_virtual, created_at)
         VALUES (?1, 'episode', ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        rusqlite::params![
            episode.id.to_string(),
            &episode.name,
            parent_id.map(|p| p.to_string()),
            episode.series_key.as_str(),
            &episode.sort_key,
            episode.parent_index,
            episode.index_number,
            episode.airs_before_season,
            episode.airs_after_season,
            episode.airs_before_episode,
            episode.premiere_date.map(fmt_ts),
            episode.is_virtual as i32,
            fmt_ts(Utc::now()),
        ],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    Ok(episode)
}

/// Push a parameter and return its numbered placeholder.
fn bind(params: &mut Vec<Box<dyn ToSql>>, value: impl ToSql + 'static) -> String {
    params.push(Box::new(value));
    format!("?{}", params.len())
}

/// Run an [`EpisodeQuery`].
pub fn query_episodes(conn: &Connection, query: &EpisodeQuery) -> Result<Vec<Episode>> {
    let mut params: Vec<Box<dyn ToSql>> = Vec::new();
    let user = bind(&mut params, query.user_id.to_string());

    let mut sql = String::new();
    let mut conds = vec!["i.item_kind = 'episode'".to_string()];

    if !query.ancestors.is_empty() {
        let roots: Vec<String> = query
            .ancestors
            .iter()
            .map(|a| bind(&mut params, a.to_string()))
            .collect();
        sql.push_str(&format!(
            "WITH RECURSIVE scope(id) AS (
                SELECT id FROM items WHERE id IN ({})
                UNION
                SELECT c.id FROM items c JOIN scope s ON c.parent_id = s.id
            ) ",
            roots.join(", ")
        ));
        conds.push("i.id IN (SELECT id FROM scope)".into());
    }
    if let Some(key) = &query.series_key {
        conds.push(format!(
            "i.series_key = {}",
            bind(&mut params, key.as_str().to_string())
        ));
    }
    if let Some(played) = query.is_played {
        conds.push(format!(
            "COALESCE(p.played, 0) = {}",
            bind(&mut params, played as i32)
        ));
    }
    if let Some(is_virtual) = query.is_virtual {
        conds.push(format!(
            "i.is_virtual = {}",
            bind(&mut params, is_virtual as i32)
        ));
    }
    match query.parent_index {
        ParentIndexFilter::Any => {}
        ParentIndexFilter::Equals(n) => {
            conds.push(format!("i.parent_index = {}", bind(&mut params, n)));
        }
        ParentIndexFilter::NotEquals(n) => {
            conds.push(format!(
                "(i.parent_index IS NULL OR i.parent_index <> {})",
                bind(&mut params, n)
            ));
        }
    }
    if let Some(min) = &query.min_sort_key {
        conds.push(format!("i.sort_key >= {}", bind(&mut params, min.clone())));
    }

    // Bare column names resolve to the same columns inside and outside the
    // grouping subquery.
    let order = match query.order {
        EpisodeOrder::SortKeyAscending => "sort_key ASC, id ASC",
        EpisodeOrder::SortKeyDescending => "sort_key DESC, id DESC",
        EpisodeOrder::DatePlayedDescending => "last_played_at DESC, sort_key DESC, id DESC",
    };
    let from = format!(
        "FROM items i
         LEFT JOIN playback p ON p.item_id = i.id AND p.user_id = {user}
         WHERE {}",
        conds.join(" AND ")
    );

    if query.group_by_series {
        sql.push_str(&format!(
            "SELECT {EPISODE_COLS} FROM (
                SELECT {SELECT_COLS},
                    ROW_NUMBER() OVER (PARTITION BY i.series_key ORDER BY {order}) AS rn
                {from}
             ) WHERE rn = 1 ORDER BY {order}"
        ));
    } else {
        sql.push_str(&format!("SELECT {SELECT_COLS} {from} ORDER BY {order}"));
    }
    if let Some(limit) = query.limit {
        sql.push_str(&format!(" LIMIT {}", bind(&mut params, limit as i64)));
    }

    let params_refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();
    let mut stmt = conn.prepare(&sql).map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map(params_refs.as_slice(), episode_from_row)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

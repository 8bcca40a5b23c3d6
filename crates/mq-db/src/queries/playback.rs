//! Playback state operations.

use chrono::{DateTime, Utc};
use mq_core::{Error, ItemId, Result, UserId, WatchMark};
use rusqlite::Connection;

use crate::models::{fmt_ts, watch_mark_from_row, PLAYBACK_COLS};

/// Insert or update playback state for a (user, item) pair.
///
/// `played` marks the item as watched through; `position_ticks` is the
/// resume point (0 when finished or reset).
pub fn upsert_playback(
    conn: &Connection,
    user_id: UserId,
    item_id: ItemId,
    position_ticks: i64,
    played: bool,
    last_played_at: Option<DateTime<Utc>>,
) -> Result<WatchMark> {
    conn.execute(
        "INSERT INTO playback (user_id, item_id, played, play_count, position_ticks, last_played_at)
         VALUES (?1, ?2, ?3, 1, ?4, ?5)
         ON CONFLICT(user_id, item_id) DO UPDATE SET
            played = excluded.played,
            play_count = play_count + 1,
            position_ticks = excluded.position_ticks,
            last_played_at = COALESCE(excluded.last_played_at, last_played_at)",
        rusqlite::params![
            user_id.to_string(),
            item_id.to_string(),
            played as i32,
            position_ticks,
            last_played_at.map(fmt_ts),
        ],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    get_playback(conn, user_id, item_id)?
        .ok_or_else(|| Error::Internal(format!("playback row for {item_id} vanished after upsert")))
}

/// Get playback state for a (user, item) pair, if any was recorded.
pub fn get_playback(
    conn: &Connection,
    user_id: UserId,
    item_id: ItemId,
) -> Result<Option<WatchMark>> {
    let q = format!("SELECT {PLAYBACK_COLS} FROM playback WHERE user_id = ?1 AND item_id = ?2");
    let result = conn.query_row(
        &q,
        rusqlite::params![user_id.to_string(), item_id.to_string()],
        watch_mark_from_row,
    );
    match result {
        Ok(p) => Ok(Some(p)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// Watch mark for a (user, item) pair; the default mark when nothing was
/// recorded.
pub fn get_watch_mark(conn: &Connection, user_id: UserId, item_id: ItemId) -> Result<WatchMark> {
    Ok(get_playback(conn, user_id, item_id)?.unwrap_or_default())
}

/// Mark an item as played through. `None` records a play without a date,
/// as imported histories sometimes do.
pub fn mark_played(
    conn: &Connection,
    user_id: UserId,
    item_id: ItemId,
    at: Option<DateTime<Utc>>,
) -> Result<WatchMark> {
    upsert_playback(conn, user_id, item_id, 0, true, at)
}

/// Record a partial watch stopping at `position_ticks`.
pub fn record_progress(
    conn: &Connection,
    user_id: UserId,
    item_id: ItemId,
    position_ticks: i64,
    at: DateTime<Utc>,
) -> Result<WatchMark> {
    upsert_playback(conn, user_id, item_id, position_ticks, false, Some(at))
}

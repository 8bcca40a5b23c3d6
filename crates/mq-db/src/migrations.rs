//! Embedded SQL migrations and runner.
//!
//! Migrations are stored as `&str` constants and executed in order.  A
//! `schema_migrations` table tracks which versions have been applied.

use mq_core::{Error, Result};
use rusqlite::Connection;

/// V1: initial schema -- users, items, playback state.
const V1_INITIAL: &str = r#"
CREATE TABLE users (
    id         TEXT PRIMARY KEY,
    username   TEXT UNIQUE NOT NULL,
    created_at TEXT NOT NULL
);

-- Every library entity: folders, series, seasons, episodes, movies, box sets.
CREATE TABLE items (
    id                  TEXT PRIMARY KEY,
    item_kind           TEXT NOT NULL,
    name                TEXT NOT NULL,
    parent_id           TEXT REFERENCES items(id) ON DELETE CASCADE,
    path                TEXT,
    series_key          TEXT,
    sort_key            TEXT NOT NULL DEFAULT '',
    parent_index        INTEGER,
    index_number        INTEGER,
    airs_before_season  INTEGER,
    airs_after_season   INTEGER,
    airs_before_episode INTEGER,
    premiere_date       TEXT,
    is_virtual          INTEGER NOT NULL DEFAULT 0,
    created_at          TEXT NOT NULL
);

CREATE TABLE playback (
    user_id        TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    item_id        TEXT NOT NULL REFERENCES items(id) ON DELETE CASCADE,
    played         INTEGER NOT NULL DEFAULT 0,
    play_count     INTEGER NOT NULL DEFAULT 0,
    position_ticks INTEGER NOT NULL DEFAULT 0,
    last_played_at TEXT,
    PRIMARY KEY (user_id, item_id)
);
"#;

/// V2: per-user folder exclusions and alternate versions.
const V2_USER_PREFS_AND_VERSIONS: &str = r#"
CREATE TABLE user_latest_excludes (
    user_id   TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    folder_id TEXT NOT NULL REFERENCES items(id) ON DELETE CASCADE,
    PRIMARY KEY (user_id, folder_id)
);

CREATE TABLE alternate_versions (
    item_id      TEXT NOT NULL REFERENCES items(id) ON DELETE CASCADE,
    alternate_id TEXT NOT NULL REFERENCES items(id) ON DELETE CASCADE,
    PRIMARY KEY (item_id, alternate_id)
);
"#;

/// V3: box set membership.
///
/// `item_id` is NULL for children that are only known by path. The UNIQUE
/// constraint keeps a collection from linking the same item twice.
const V3_COLLECTIONS: &str = r#"
CREATE TABLE collection_children (
    collection_id TEXT NOT NULL REFERENCES items(id) ON DELETE CASCADE,
    position      INTEGER NOT NULL,
    item_id       TEXT REFERENCES items(id) ON DELETE CASCADE,
    path          TEXT,
    UNIQUE (collection_id, item_id)
);
"#;

/// V4: indexes for the next-up queries.
const V4_INDEXES: &str = r#"
CREATE INDEX idx_items_parent_id   ON items(parent_id);
CREATE INDEX idx_items_series_sort ON items(series_key, sort_key);
CREATE INDEX idx_items_path        ON items(path);
CREATE INDEX idx_playback_user     ON playback(user_id, last_played_at);
CREATE INDEX idx_collection_children_collection ON collection_children(collection_id, position);
"#;

/// Ordered list of (version, sql) pairs.
const MIGRATIONS: &[(i64, &str)] = &[
    (1, V1_INITIAL),
    (2, V2_USER_PREFS_AND_VERSIONS),
    (3, V3_COLLECTIONS),
    (4, V4_INDEXES),
];

/// Run all pending migrations on `conn`.
///
/// Creates the `schema_migrations` tracking table if it does not exist,
/// then applies each outstanding migration inside a transaction.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version    INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
    )
    .map_err(|e| Error::database(format!("Failed to create schema_migrations: {e}")))?;

    for &(version, sql) in MIGRATIONS {
        let already: bool = conn
            .query_row(
                "SELECT COUNT(*) > 0 FROM schema_migrations WHERE version = ?1",
                [version],
                |row| row.get(0),
            )
            .map_err(|e| Error::database(e.to_string()))?;

        if already {
            continue;
        }

        let tx = conn
            .unchecked_transaction()
            .map_err(|e| Error::database(e.to_string()))?;

        tx.execute_batch(sql)
            .map_err(|e| Error::database(format!("Migration V{version} failed: {e}")))?;

        tx.execute(
            "INSERT INTO schema_migrations (version) VALUES (?1)",
            [version],
        )
        .map_err(|e| Error::database(e.to_string()))?;

        tx.commit().map_err(|e| Error::database(e.to_string()))?;
        tracing::debug!("Applied migration V{version}");
    }

    Ok(())
}

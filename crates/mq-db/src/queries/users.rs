//! User operations.

use chrono::Utc;
use mq_core::{Error, ItemId, Result, UserId, UserProfile};
use rusqlite::Connection;

use crate::models::{fmt_ts, parse_id, user_from_row};

/// Create a new user and return its profile.
pub fn create_user(conn: &Connection, username: &str) -> Result<UserProfile> {
    let id = UserId::new();
    conn.execute(
        "INSERT INTO users (id, username, created_at) VALUES (?1, ?2, ?3)",
        rusqlite::params![id.to_string(), username, fmt_ts(Utc::now())],
    )
    .map_err(|e| {
        if e.to_string().contains("UNIQUE constraint failed") {
            Error::Validation(format!("Username '{username}' already exists"))
        } else {
            Error::database(e.to_string())
        }
    })?;

    Ok(UserProfile {
        id,
        name: username.to_string(),
        latest_item_excludes: Vec::new(),
    })
}

/// Get a user by primary key, including their folder exclusions.
pub fn get_user(conn: &Connection, id: UserId) -> Result<Option<UserProfile>> {
    let result = conn.query_row(
        "SELECT id, username FROM users WHERE id = ?1",
        [id.to_string()],
        user_from_row,
    );
    let mut user = match result {
        Ok(u) => u,
        Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
        Err(e) => return Err(Error::database(e.to_string())),
    };
    user.latest_item_excludes = list_latest_excludes(conn, id)?;
    Ok(Some(user))
}

/// Hide a root folder from the user's latest / next-up views.
pub fn add_latest_exclude(conn: &Connection, user_id: UserId, folder_id: ItemId) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO user_latest_excludes (user_id, folder_id) VALUES (?1, ?2)",
        rusqlite::params![user_id.to_string(), folder_id.to_string()],
    )
    .map_err(|e| Error::database(e.to_string()))?;
    Ok(())
}

fn list_latest_excludes(conn: &Connection, user_id: UserId) -> Result<Vec<ItemId>> {
    let mut stmt = conn
        .prepare("SELECT folder_id FROM user_latest_excludes WHERE user_id = ?1 ORDER BY folder_id")
        .map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map([user_id.to_string()], |row| parse_id(row, 0))
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

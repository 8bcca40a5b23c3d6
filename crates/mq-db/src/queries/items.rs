//! Item CRUD and lookup operations.

use chrono::Utc;
use mq_core::{Error, Item, ItemId, ItemKind, Result, SeriesKey};
use rusqlite::Connection;

use crate::models::{fmt_ts, item_from_row, parse_id, ITEM_COLS};

/// Create a new non-episode item (folder, series, movie, ...).
pub fn create_item(
    conn: &Connection,
    kind: ItemKind,
    name: &str,
    parent_id: Option<ItemId>,
    path: Option<&str>,
    series_key: Option<&SeriesKey>,
) -> Result<Item> {
    let item = Item {
        id: ItemId::new(),
        kind,
        name: name.to_string(),
        parent_id,
        path: path.map(String::from),
        series_key: series_key.cloned(),
        alternate_versions: Vec::new(),
    };
    insert_item(conn, &item)?;
    Ok(item)
}

/// Insert a fully-formed item, keeping its id.
pub fn insert_item(conn: &Connection, item: &Item) -> Result<()> {
    conn.execute(
        "INSERT INTO items (id, item_kind, name, parent_id, path, series_key, sort_key, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        rusqlite::params![
            item.id.to_string(),
            item.kind.as_str(),
            &item.name,
            item.parent_id.map(|p| p.to_string()),
            &item.path,
            item.series_key.as_ref().map(|k| k.as_str().to_string()),
            &item.name,
            fmt_ts(Utc::now()),
        ],
    )
    .map_err(|e| Error::database(e.to_string()))?;
    Ok(())
}

/// Get an item by ID, including its alternate versions.
pub fn get_item(conn: &Connection, id: ItemId) -> Result<Option<Item>> {
    let q = format!("SELECT {ITEM_COLS} FROM items WHERE id = ?1");
    let result = conn.query_row(&q, [id.to_string()], item_from_row);
    let mut item = match result {
        Ok(i) => i,
        Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
        Err(e) => return Err(Error::database(e.to_string())),
    };
    item.alternate_versions = list_alternate_versions(conn, id)?;
    Ok(Some(item))
}

/// Find the item stored at `path`.
pub fn find_item_by_path(conn: &Connection, path: &str) -> Result<Option<ItemId>> {
    let result = conn.query_row(
        "SELECT id FROM items WHERE path = ?1 ORDER BY created_at LIMIT 1",
        [path],
        |row| parse_id(row, 0),
    );
    match result {
        Ok(id) => Ok(Some(id)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// List top-level folders, ordered by name.
pub fn list_root_folders(conn: &Connection) -> Result<Vec<Item>> {
    let q = format!(
        "SELECT {ITEM_COLS} FROM items
         WHERE parent_id IS NULL AND item_kind IN ('folder', 'collection_folder')
         ORDER BY name ASC"
    );
    let mut stmt = conn.prepare(&q).map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map([], item_from_row)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

/// Record `alternates` as alternate versions of `primary`, in both
/// directions.
pub fn link_alternate_versions(
    conn: &Connection,
    primary: ItemId,
    alternates: &[ItemId],
) -> Result<()> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| Error::database(e.to_string()))?;
    for alt in alternates {
        if *alt == primary {
            continue;
        }
        for (a, b) in [(primary, *alt), (*alt, primary)] {
            tx.execute(
                "INSERT OR IGNORE INTO alternate_versions (item_id, alternate_id) VALUES (?1, ?2)",
                rusqlite::params![a.to_string(), b.to_string()],
            )
            .map_err(|e| Error::database(e.to_string()))?;
        }
    }
    tx.commit().map_err(|e| Error::database(e.to_string()))?;
    Ok(())
}

fn list_alternate_versions(conn: &Connection, id: ItemId) -> Result<Vec<ItemId>> {
    let mut stmt = conn
        .prepare("SELECT alternate_id FROM alternate_versions WHERE item_id = ?1 ORDER BY alternate_id")
        .map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map([id.to_string()], |row| parse_id(row, 0))
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

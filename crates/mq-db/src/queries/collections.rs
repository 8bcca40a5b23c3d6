//! Box set storage: collection items and their linked children.

use std::collections::HashMap;

use mq_core::{Collection, Error, Item, ItemId, ItemKind, LinkedChild, Result};
use rusqlite::Connection;

use crate::models::{item_from_row, parse_id, parse_opt_id, ITEM_COLS};
use crate::queries::items;

/// Create an empty box set.
pub fn create_collection(
    conn: &Connection,
    name: &str,
    parent_id: Option<ItemId>,
) -> Result<Collection> {
    let item = items::create_item(conn, ItemKind::BoxSet, name, parent_id, None, None)?;
    Ok(Collection {
        item,
        linked_children: Vec::new(),
    })
}

/// Get a box set by id. Returns `None` for ids that are not box sets.
pub fn get_collection(conn: &Connection, id: ItemId) -> Result<Option<Collection>> {
    let q = format!("SELECT {ITEM_COLS} FROM items WHERE id = ?1 AND item_kind = 'box_set'");
    let item = match conn.query_row(&q, [id.to_string()], item_from_row) {
        Ok(i) => i,
        Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
        Err(e) => return Err(Error::database(e.to_string())),
    };
    let linked_children = list_children(conn, id)?;
    Ok(Some(Collection {
        item,
        linked_children,
    }))
}

/// List every box set with its children, ordered by name.
///
/// Runs 2 queries (box sets + all children) instead of N+1.
pub fn list_collections(conn: &Connection) -> Result<Vec<Collection>> {
    let q = format!("SELECT {ITEM_COLS} FROM items WHERE item_kind = 'box_set' ORDER BY name, id");
    let mut stmt = conn.prepare(&q).map_err(|e| Error::database(e.to_string()))?;
    let sets = stmt
        .query_map([], item_from_row)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;

    let mut stmt = conn
        .prepare(
            "SELECT collection_id, item_id, path FROM collection_children
             ORDER BY collection_id, position",
        )
        .map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map([], |row| {
            let collection_id: ItemId = parse_id(row, 0)?;
            let child = LinkedChild {
                item_id: parse_opt_id(row, 1)?,
                path: row.get(2)?,
            };
            Ok((collection_id, child))
        })
        .map_err(|e| Error::database(e.to_string()))?;

    let mut children: HashMap<ItemId, Vec<LinkedChild>> = HashMap::new();
    for row in rows {
        let (collection_id, child) = row.map_err(|e| Error::database(e.to_string()))?;
        children.entry(collection_id).or_default().push(child);
    }

    Ok(sets
        .into_iter()
        .map(|item| {
            let linked_children = children.remove(&item.id).unwrap_or_default();
            Collection {
                item,
                linked_children,
            }
        })
        .collect())
}

fn list_children(conn: &Connection, collection_id: ItemId) -> Result<Vec<LinkedChild>> {
    let mut stmt = conn
        .prepare(
            "SELECT item_id, path FROM collection_children
             WHERE collection_id = ?1 ORDER BY position",
        )
        .map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map([collection_id.to_string()], |row| {
            Ok(LinkedChild {
                item_id: parse_opt_id(row, 0)?,
                path: row.get(1)?,
            })
        })
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

/// Append children after the current last position. A child whose item id
/// is already linked is skipped.
pub fn link_children(
    conn: &Connection,
    collection_id: ItemId,
    children: &[LinkedChild],
) -> Result<()> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| Error::database(e.to_string()))?;
    let mut next: i64 = tx
        .query_row(
            "SELECT COALESCE(MAX(position) + 1, 0) FROM collection_children WHERE collection_id = ?1",
            [collection_id.to_string()],
            |row| row.get(0),
        )
        .map_err(|e| Error::database(e.to_string()))?;

    for child in children {
        let n = tx
            .execute(
                "INSERT OR IGNORE INTO collection_children (collection_id, position, item_id, path)
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![
                    collection_id.to_string(),
                    next,
                    child.item_id.map(|id| id.to_string()),
                    &child.path,
                ],
            )
            .map_err(|e| Error::database(e.to_string()))?;
        next += n as i64;
    }

    tx.commit().map_err(|e| Error::database(e.to_string()))?;
    Ok(())
}

/// Remove the children linked to any of `item_ids`. Returns rows removed.
pub fn unlink_children(
    conn: &Connection,
    collection_id: ItemId,
    item_ids: &[ItemId],
) -> Result<usize> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| Error::database(e.to_string()))?;
    let mut removed = 0;
    for id in item_ids {
        removed += tx
            .execute(
                "DELETE FROM collection_children WHERE collection_id = ?1 AND item_id = ?2",
                rusqlite::params![collection_id.to_string(), id.to_string()],
            )
            .map_err(|e| Error::database(e.to_string()))?;
    }
    tx.commit().map_err(|e| Error::database(e.to_string()))?;
    Ok(removed)
}

/// Insert a caller-built box set item.
pub fn insert_collection(conn: &Connection, item: &Item) -> Result<()> {
    if item.kind != ItemKind::BoxSet {
        return Err(Error::invalid_argument(format!(
            "item {} is a {}, not a box set",
            item.id, item.kind
        )));
    }
    items::insert_item(conn, item)
}

//! Shared test harness for CLI tests.
//!
//! Provides [`TestHarness`], which owns a temporary directory holding a
//! SQLite library and a config file pointing at it. Tests seed the library
//! through `mq_db` and then run the binary against the config.

#![allow(dead_code)]

use std::path::PathBuf;

use chrono::{DateTime, Duration, Utc};
use mq_core::{Episode, Item, ItemId, ItemKind, LinkedChild, SeriesKey, UserId};
use mq_db::pool::{init_pool, DbPool, PooledConnection};
use mq_db::queries::episodes::{create_episode, NewEpisode};
use mq_db::queries::{collections, items, playback, users};
use tempfile::TempDir;

/// A seeded library on disk plus a config file that points at it.
pub struct TestHarness {
    pub dir: TempDir,
    pub db: DbPool,
    pub config_path: PathBuf,
    pub user: UserId,
    pub tv: Item,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_config_json(|db_path| format!(r#"{{"database": {{"path": "{db_path}"}}}}"#))
    }

    /// Build the config file from the database path.
    pub fn with_config_json(config: impl FnOnce(&str) -> String) -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let db_path = dir.path().join("marquee.db");
        let db_path_str = db_path.to_str().expect("temp path is not utf-8").to_string();
        let db = init_pool(&db_path_str).expect("failed to open library");

        let config_path = dir.path().join("marquee.json");
        std::fs::write(&config_path, config(&db_path_str)).expect("failed to write config");

        let conn = db.get().unwrap();
        let user = users::create_user(&conn, "viewer").unwrap().id;
        let tv =
            items::create_item(&conn, ItemKind::CollectionFolder, "TV", None, None, None).unwrap();
        drop(conn);

        Self {
            dir,
            db,
            config_path,
            user,
            tv,
        }
    }

    pub fn conn(&self) -> PooledConnection {
        self.db.get().unwrap()
    }

    pub fn config_arg(&self) -> &str {
        self.config_path.to_str().unwrap()
    }

    pub fn days_ago(&self, days: i64) -> DateTime<Utc> {
        Utc::now() - Duration::days(days)
    }

    /// A series in the TV folder with `episodes` regular episodes in
    /// season 1.
    pub fn series(&self, name: &str, episodes: i32) -> (Item, Vec<Episode>) {
        let conn = self.conn();
        let key = SeriesKey::new(format!("series:{name}"));
        let series = items::create_item(
            &conn,
            ItemKind::Series,
            name,
            Some(self.tv.id),
            None,
            Some(&key),
        )
        .unwrap();
        let episodes = (1..=episodes)
            .map(|n| {
                let title = format!("{name} S01E{n:02}");
                create_episode(
                    &conn,
                    Some(series.id),
                    &NewEpisode::new(&key, &title, Some(1), Some(n)),
                )
                .unwrap()
            })
            .collect();
        (series, episodes)
    }

    pub fn watched(&self, item: ItemId, at: DateTime<Utc>) {
        playback::mark_played(&self.conn(), self.user, item, Some(at)).unwrap();
    }

    pub fn movie(&self, name: &str) -> Item {
        items::create_item(&self.conn(), ItemKind::Movie, name, None, None, None).unwrap()
    }

    pub fn collection(&self, name: &str, members: &[ItemId]) -> ItemId {
        let conn = self.conn();
        let set = collections::create_collection(&conn, name, None).unwrap();
        let children: Vec<LinkedChild> = members.iter().copied().map(LinkedChild::by_id).collect();
        collections::link_children(&conn, set.id(), &children).unwrap();
        set.id()
    }

    pub fn members(&self, collection: ItemId) -> Vec<ItemId> {
        collections::get_collection(&self.conn(), collection)
            .unwrap()
            .unwrap()
            .linked_children
            .into_iter()
            .filter_map(|child| child.item_id)
            .collect()
    }
}

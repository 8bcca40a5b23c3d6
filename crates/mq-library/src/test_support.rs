//! In-memory library fixture shared by the engine tests.

use chrono::{DateTime, Duration, TimeZone, Utc};
use mq_core::{
    Collection, CollectionStore, Episode, Item, ItemId, ItemKind, LibraryIndex, LinkedChild,
    SeriesKey, UserId,
};
use mq_db::pool::{init_memory_pool, DbPool, PooledConnection};
use mq_db::queries::episodes::{create_episode, NewEpisode};
use mq_db::queries::{collections, items, playback, users};
use mq_db::SqliteLibrary;

use crate::aggregator::NextUpService;
use crate::resolver::SeriesResolver;

pub struct Show {
    pub item: Item,
    pub key: SeriesKey,
}

/// A user with one "TV" root folder over a fresh in-memory database.
pub struct Fixture {
    pub pool: DbPool,
    pub library: SqliteLibrary,
    pub user: UserId,
    pub tv: Item,
    now: DateTime<Utc>,
}

impl Fixture {
    pub fn new() -> Self {
        let pool = init_memory_pool().unwrap();
        let library = SqliteLibrary::new(pool.clone());
        let conn = pool.get().unwrap();
        let user = users::create_user(&conn, "viewer").unwrap().id;
        let tv =
            items::create_item(&conn, ItemKind::CollectionFolder, "TV", None, None, None).unwrap();
        drop(conn);
        Self {
            pool,
            library,
            user,
            tv,
            // Whole seconds, so dates survive the round trip through the
            // store unchanged.
            now: Utc.with_ymd_and_hms(2024, 6, 1, 20, 0, 0).unwrap(),
        }
    }

    fn conn(&self) -> PooledConnection {
        self.pool.get().unwrap()
    }

    pub fn days_ago(&self, days: i64) -> DateTime<Utc> {
        self.now - Duration::days(days)
    }

    pub fn resolver(
        &self,
        specials_within_seasons: bool,
    ) -> SeriesResolver<'_, SqliteLibrary, SqliteLibrary> {
        SeriesResolver::new(&self.library, &self.library, self.user, specials_within_seasons)
    }

    pub fn service(
        &self,
        specials_within_seasons: bool,
    ) -> NextUpService<'_, SqliteLibrary, SqliteLibrary> {
        NextUpService::new(&self.library, &self.library, specials_within_seasons)
    }

    pub fn root_folder(&self, name: &str) -> Item {
        items::create_item(&self.conn(), ItemKind::CollectionFolder, name, None, None, None)
            .unwrap()
    }

    pub fn exclude_from_latest(&self, folder: ItemId) {
        users::add_latest_exclude(&self.conn(), self.user, folder).unwrap();
    }

    /// A series in the TV folder.
    pub fn series(&self, name: &str) -> Show {
        self.series_in(name, self.tv.id)
    }

    pub fn series_in(&self, name: &str, folder: ItemId) -> Show {
        let key = SeriesKey::new(format!("series:{name}"));
        let item = items::create_item(
            &self.conn(),
            ItemKind::Series,
            name,
            Some(folder),
            None,
            Some(&key),
        )
        .unwrap();
        Show { item, key }
    }

    fn add_episode(&self, show: &Show, new: NewEpisode) -> Episode {
        create_episode(&self.conn(), Some(show.item.id), &new).unwrap()
    }

    pub fn episode(&self, show: &Show, season: i32, number: i32) -> Episode {
        let name = format!("{} S{season:02}E{number:02}", show.item.name);
        self.add_episode(show, NewEpisode::new(&show.key, &name, Some(season), Some(number)))
    }

    pub fn premiered_episode(
        &self,
        show: &Show,
        season: i32,
        number: i32,
        date: DateTime<Utc>,
    ) -> Episode {
        let name = format!("{} S{season:02}E{number:02}", show.item.name);
        self.add_episode(
            show,
            NewEpisode::new(&show.key, &name, Some(season), Some(number)).premiered(date),
        )
    }

    pub fn missing_episode(&self, show: &Show, season: i32, number: i32) -> Episode {
        let name = format!("{} S{season:02}E{number:02}", show.item.name);
        self.add_episode(
            show,
            NewEpisode::new(&show.key, &name, Some(season), Some(number)).missing(),
        )
    }

    /// A season-0 episode, placed by `place`.
    pub fn special(
        &self,
        show: &Show,
        number: i32,
        place: impl FnOnce(NewEpisode) -> NewEpisode,
    ) -> Episode {
        let name = format!("{} Special {number}", show.item.name);
        self.add_episode(
            show,
            place(NewEpisode::new(&show.key, &name, Some(0), Some(number))),
        )
    }

    pub fn watched(&self, episode: &Episode, at: DateTime<Utc>) {
        playback::mark_played(&self.conn(), self.user, episode.id, Some(at)).unwrap();
    }

    pub fn watched_undated(&self, episode: &Episode) {
        playback::mark_played(&self.conn(), self.user, episode.id, None).unwrap();
    }

    pub fn in_progress(&self, episode: &Episode, at: DateTime<Utc>) {
        playback::record_progress(&self.conn(), self.user, episode.id, 9_000_000_000, at).unwrap();
    }

    /// Stopped partway through an episode that was already played through.
    pub fn rewatching_partway(&self, episode: &Episode, at: DateTime<Utc>) {
        playback::upsert_playback(&self.conn(), self.user, episode.id, 9_000_000_000, true, Some(at))
            .unwrap();
    }

    pub fn movie(&self, name: &str, path: Option<&str>) -> Item {
        items::create_item(&self.conn(), ItemKind::Movie, name, None, path, None).unwrap()
    }

    pub fn alternate_versions(&self, primary: ItemId, alternates: &[ItemId]) {
        items::link_alternate_versions(&self.conn(), primary, alternates).unwrap();
    }

    pub fn collection(&self, name: &str, children: &[LinkedChild]) -> Collection {
        let conn = self.conn();
        let set = collections::create_collection(&conn, name, None).unwrap();
        collections::link_children(&conn, set.id(), children).unwrap();
        collections::get_collection(&conn, set.id()).unwrap().unwrap()
    }

    /// An item as the library currently stores it.
    pub fn library_item(&self, id: ItemId) -> Item {
        self.library.get_item(id).unwrap().unwrap()
    }

    pub fn library_collection(&self, id: ItemId) -> Collection {
        self.library.get_collection(id).unwrap().unwrap()
    }

    pub fn all_collections(&self) -> Vec<Collection> {
        self.library.list_collections(self.user).unwrap()
    }
}

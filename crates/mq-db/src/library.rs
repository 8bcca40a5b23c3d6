//! [`SqliteLibrary`]: the collaborator contracts backed by a connection pool.

use mq_core::{
    Collection, CollectionStore, Episode, EpisodeQuery, Item, ItemId, LibraryIndex, LinkedChild,
    PlaybackStore, Result, UserId, UserProfile, WatchMark,
};

use crate::pool::{get_conn, DbPool};
use crate::queries::{collections, episodes, items, playback, users};

/// Library index, playback store and collection store over one SQLite pool.
///
/// Each call checks a connection out of the pool, so a `SqliteLibrary` can
/// be shared freely between threads.
#[derive(Debug, Clone)]
pub struct SqliteLibrary {
    pool: DbPool,
}

impl SqliteLibrary {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

impl LibraryIndex for SqliteLibrary {
    fn query_episodes(&self, query: &EpisodeQuery) -> Result<Vec<Episode>> {
        let conn = get_conn(&self.pool)?;
        episodes::query_episodes(&conn, query)
    }

    fn get_item(&self, id: ItemId) -> Result<Option<Item>> {
        let conn = get_conn(&self.pool)?;
        items::get_item(&conn, id)
    }

    fn find_item_by_path(&self, path: &str) -> Result<Option<ItemId>> {
        let conn = get_conn(&self.pool)?;
        items::find_item_by_path(&conn, path)
    }

    // Box sets are not access-controlled; every user sees all of them.
    fn list_collections(&self, _user: UserId) -> Result<Vec<Collection>> {
        let conn = get_conn(&self.pool)?;
        collections::list_collections(&conn)
    }

    fn get_user(&self, id: UserId) -> Result<Option<UserProfile>> {
        let conn = get_conn(&self.pool)?;
        users::get_user(&conn, id)
    }

    fn root_folders(&self, _user: UserId) -> Result<Vec<Item>> {
        let conn = get_conn(&self.pool)?;
        items::list_root_folders(&conn)
    }
}

impl PlaybackStore for SqliteLibrary {
    fn watch_mark(&self, user: UserId, item: ItemId) -> Result<WatchMark> {
        let conn = get_conn(&self.pool)?;
        playback::get_watch_mark(&conn, user, item)
    }
}

impl CollectionStore for SqliteLibrary {
    fn get_collection(&self, id: ItemId) -> Result<Option<Collection>> {
        let conn = get_conn(&self.pool)?;
        collections::get_collection(&conn, id)
    }

    fn insert_collection(&self, item: &Item) -> Result<()> {
        let conn = get_conn(&self.pool)?;
        collections::insert_collection(&conn, item)
    }

    fn link_children(&self, collection_id: ItemId, children: &[LinkedChild]) -> Result<()> {
        let conn = get_conn(&self.pool)?;
        collections::link_children(&conn, collection_id, children)
    }

    fn unlink_children(&self, collection_id: ItemId, item_ids: &[ItemId]) -> Result<()> {
        let conn = get_conn(&self.pool)?;
        collections::unlink_children(&conn, collection_id, item_ids).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::init_memory_pool;
    use mq_core::ItemKind;

    #[test]
    fn trait_calls_reach_the_pool() {
        let pool = init_memory_pool().unwrap();
        let lib = SqliteLibrary::new(pool.clone());
        let conn = get_conn(&pool).unwrap();
        let user = users::create_user(&conn, "u").unwrap();
        let folder =
            items::create_item(&conn, ItemKind::CollectionFolder, "TV", None, None, None).unwrap();

        assert_eq!(lib.get_user(user.id).unwrap().unwrap().name, "u");
        assert_eq!(lib.root_folders(user.id).unwrap().len(), 1);
        assert_eq!(lib.get_item(folder.id).unwrap().unwrap().name, "TV");
        assert_eq!(lib.watch_mark(user.id, folder.id).unwrap(), WatchMark::default());

        let set = Item::new(ItemKind::BoxSet, "Set");
        lib.insert_collection(&set).unwrap();
        lib.link_children(set.id, &[LinkedChild::by_id(folder.id)]).unwrap();
        let listed = lib.list_collections(user.id).unwrap();
        assert_eq!(listed.len(), 1);
        assert!(listed[0].links_item_id(folder.id));

        lib.unlink_children(set.id, &[folder.id]).unwrap();
        assert!(lib.get_collection(set.id).unwrap().unwrap().linked_children.is_empty());
    }
}

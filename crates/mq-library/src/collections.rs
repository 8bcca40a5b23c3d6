//! Box set membership edits.
//!
//! Callers serialize edits per box set; nothing here locks.

use mq_core::events::{EventPayload, EventSink};
use mq_core::{
    Collection, CollectionStore, Error, Item, ItemId, ItemKind, LibraryIndex, LinkedChild, Result,
};
use tracing::info;

/// Creates box sets and edits their members, publishing one event per
/// change.
pub struct CollectionManager<'a, L, S, E> {
    library: &'a L,
    store: &'a S,
    events: &'a E,
}

impl<'a, L, S, E> CollectionManager<'a, L, S, E>
where
    L: LibraryIndex,
    S: CollectionStore,
    E: EventSink,
{
    pub fn new(library: &'a L, store: &'a S, events: &'a E) -> Self {
        Self {
            library,
            store,
            events,
        }
    }

    /// Create a box set named `name`, optionally under `parent_id`, with
    /// `item_ids` as its first members.
    pub fn create_collection(
        &self,
        name: &str,
        parent_id: Option<ItemId>,
        item_ids: &[ItemId],
    ) -> Result<Collection> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::invalid_argument("box set name must not be empty"));
        }
        if let Some(parent_id) = parent_id {
            self.require_item(parent_id)?;
        }
        self.require_items(item_ids)?;

        let mut item = Item::new(ItemKind::BoxSet, name);
        item.parent_id = parent_id;
        self.store.insert_collection(&item)?;
        info!(collection = %item.id, box_set = name, "created box set");
        self.events.publish(EventPayload::CollectionCreated {
            collection_id: item.id,
            name: name.to_string(),
        });

        let created = Collection {
            item,
            linked_children: Vec::new(),
        };
        self.link_new_members(&created, item_ids)?;

        self.store
            .get_collection(created.id())?
            .ok_or_else(|| Error::Internal(format!("box set {} vanished", created.id())))
    }

    /// Add `item_ids` to a box set. Returns the ids that were not already
    /// members.
    pub fn add_to_collection(
        &self,
        collection_id: ItemId,
        item_ids: &[ItemId],
    ) -> Result<Vec<ItemId>> {
        let collection = self.require_collection(collection_id)?;
        self.require_items(item_ids)?;
        self.link_new_members(&collection, item_ids)
    }

    /// Remove `item_ids` from a box set. Returns the ids that were members;
    /// the rest are ignored.
    pub fn remove_from_collection(
        &self,
        collection_id: ItemId,
        item_ids: &[ItemId],
    ) -> Result<Vec<ItemId>> {
        let collection = self.require_collection(collection_id)?;

        let mut removed: Vec<ItemId> = Vec::new();
        for &id in item_ids {
            if collection.links_item_id(id) && !removed.contains(&id) {
                removed.push(id);
            }
        }
        if removed.is_empty() {
            return Ok(removed);
        }

        self.store.unlink_children(collection_id, &removed)?;
        info!(collection = %collection_id, count = removed.len(), "removed from box set");
        self.events.publish(EventPayload::ItemsRemovedFromCollection {
            collection_id,
            item_ids: removed.clone(),
        });
        Ok(removed)
    }

    fn link_new_members(&self, collection: &Collection, item_ids: &[ItemId]) -> Result<Vec<ItemId>> {
        let mut added: Vec<ItemId> = Vec::new();
        for &id in item_ids {
            if !collection.links_item_id(id) && !added.contains(&id) {
                added.push(id);
            }
        }
        if added.is_empty() {
            return Ok(added);
        }

        let children: Vec<LinkedChild> = added.iter().copied().map(LinkedChild::by_id).collect();
        self.store.link_children(collection.id(), &children)?;
        info!(collection = %collection.id(), count = added.len(), "added to box set");
        self.events.publish(EventPayload::ItemsAddedToCollection {
            collection_id: collection.id(),
            item_ids: added.clone(),
        });
        Ok(added)
    }

    fn require_collection(&self, id: ItemId) -> Result<Collection> {
        self.store
            .get_collection(id)?
            .ok_or_else(|| Error::invalid_argument(format!("unknown box set {id}")))
    }

    fn require_item(&self, id: ItemId) -> Result<Item> {
        self.library
            .get_item(id)?
            .ok_or_else(|| Error::invalid_argument(format!("unknown item {id}")))
    }

    fn require_items(&self, ids: &[ItemId]) -> Result<()> {
        for &id in ids {
            self.require_item(id)?;
        }
        Ok(())
    }
}

//! Collapse box set members into their box sets.

use std::collections::HashMap;

use indexmap::IndexMap;
use mq_core::{Collection, Error, Item, ItemId, LibraryIndex, Result, UserId};
use tracing::debug;

/// Replace items that belong to a box set with the box set, and drop items
/// that are alternate versions of an item already in the result.
///
/// Input order is kept. A box set appears at the position of its first
/// member. A repeated non-grouping item overwrites its earlier entry in
/// place.
pub fn collapse_collections<L: LibraryIndex>(
    library: &L,
    items: Vec<Item>,
    user: UserId,
) -> Result<Vec<Item>> {
    if items.is_empty() {
        return Ok(items);
    }

    if library.get_user(user)?.is_none() {
        return Err(Error::invalid_argument(format!("unknown user {user}")));
    }
    let collections = library.list_collections(user)?;
    let membership = Membership::build(library, &collections)?;
    let input_len = items.len();

    let mut results: IndexMap<ItemId, Item> = IndexMap::with_capacity(input_len);
    for item in items {
        if item.kind.supports_collection_grouping() {
            let owners = membership.owners(item.id);
            if !owners.is_empty() {
                for &owner in owners {
                    let collection = &collections[owner];
                    results
                        .entry(collection.id())
                        .or_insert_with(|| collection.item.clone());
                }
                continue;
            }

            if item.kind.is_video()
                && item
                    .alternate_versions
                    .iter()
                    .any(|alt| results.contains_key(alt))
            {
                continue;
            }
        }
        results.insert(item.id, item);
    }

    debug!(
        %user,
        input = input_len,
        output = results.len(),
        collections = collections.len(),
        "collapsed box sets"
    );
    Ok(results.into_values().collect())
}

/// Member item id to the box sets that link it, in box set order.
struct Membership {
    owners: HashMap<ItemId, Vec<usize>>,
}

impl Membership {
    fn build<L: LibraryIndex>(library: &L, collections: &[Collection]) -> Result<Self> {
        let mut owners: HashMap<ItemId, Vec<usize>> = HashMap::new();
        for (index, collection) in collections.iter().enumerate() {
            for child in &collection.linked_children {
                let member = match (child.item_id, child.path.as_deref()) {
                    (Some(id), _) => Some(id),
                    (None, Some(path)) => library.find_item_by_path(path)?,
                    (None, None) => None,
                };
                let Some(member) = member else { continue };
                let list = owners.entry(member).or_default();
                if list.last() != Some(&index) {
                    list.push(index);
                }
            }
        }
        Ok(Self { owners })
    }

    fn owners(&self, item: ItemId) -> &[usize] {
        self.owners.get(&item).map(Vec::as_slice).unwrap_or(&[])
    }
}

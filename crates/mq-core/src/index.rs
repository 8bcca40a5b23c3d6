//! Contracts of the external collaborators consumed by the engine.
//!
//! The engine never talks to storage directly. It asks a [`LibraryIndex`]
//! for items and episodes, a [`PlaybackStore`] for per-user watch state, and
//! a [`CollectionStore`] when box set membership is edited. `mq-db` provides
//! the SQLite implementation of all three.

use crate::error::Result;
use crate::ids::{ItemId, UserId};
use crate::model::{Collection, Episode, Item, LinkedChild, SeriesKey, UserProfile, WatchMark};

/// Ordering applied to an episode query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EpisodeOrder {
    #[default]
    SortKeyAscending,
    SortKeyDescending,
    /// Most recently played first (for the querying user), ties broken by
    /// sort key descending. Never-played episodes come last.
    DatePlayedDescending,
}

/// Constraint on an episode's parent index (season number).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParentIndexFilter {
    #[default]
    Any,
    Equals(i32),
    NotEquals(i32),
}

/// Predicate for [`LibraryIndex::query_episodes`].
///
/// Every query is evaluated on behalf of a user, because played state and
/// play dates are per user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeQuery {
    pub user_id: UserId,
    pub series_key: Option<SeriesKey>,
    /// Restrict to descendants of any of these folders. Empty means the
    /// whole library.
    pub ancestors: Vec<ItemId>,
    pub is_played: Option<bool>,
    pub is_virtual: Option<bool>,
    pub parent_index: ParentIndexFilter,
    /// Inclusive lower bound on the sort key.
    pub min_sort_key: Option<String>,
    pub order: EpisodeOrder,
    pub limit: Option<usize>,
    /// Keep one episode per series key: the first under [`Self::order`].
    pub group_by_series: bool,
}

impl EpisodeQuery {
    pub fn for_user(user_id: UserId) -> Self {
        Self {
            user_id,
            series_key: None,
            ancestors: Vec::new(),
            is_played: None,
            is_virtual: None,
            parent_index: ParentIndexFilter::Any,
            min_sort_key: None,
            order: EpisodeOrder::default(),
            limit: None,
            group_by_series: false,
        }
    }

    pub fn series(mut self, key: &SeriesKey) -> Self {
        self.series_key = Some(key.clone());
        self
    }

    pub fn within(mut self, ancestors: Vec<ItemId>) -> Self {
        self.ancestors = ancestors;
        self
    }

    pub fn played(mut self, played: bool) -> Self {
        self.is_played = Some(played);
        self
    }

    pub fn virtual_items(mut self, is_virtual: bool) -> Self {
        self.is_virtual = Some(is_virtual);
        self
    }

    pub fn parent_index(mut self, filter: ParentIndexFilter) -> Self {
        self.parent_index = filter;
        self
    }

    pub fn min_sort_key(mut self, key: Option<&str>) -> Self {
        self.min_sort_key = key.map(String::from);
        self
    }

    pub fn order(mut self, order: EpisodeOrder) -> Self {
        self.order = order;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn group_by_series(mut self) -> Self {
        self.group_by_series = true;
        self
    }
}

/// Read access to the media library.
pub trait LibraryIndex {
    /// Episodes matching `query`, in the query's order.
    fn query_episodes(&self, query: &EpisodeQuery) -> Result<Vec<Episode>>;

    fn get_item(&self, id: ItemId) -> Result<Option<Item>>;

    /// Resolve a filesystem path to the item stored at it.
    fn find_item_by_path(&self, path: &str) -> Result<Option<ItemId>>;

    /// All box sets visible to `user`.
    fn list_collections(&self, user: UserId) -> Result<Vec<Collection>>;

    fn get_user(&self, id: UserId) -> Result<Option<UserProfile>>;

    /// Top-level folders of the library as seen by `user`.
    fn root_folders(&self, user: UserId) -> Result<Vec<Item>>;
}

/// Per-user playback state.
pub trait PlaybackStore {
    /// The watch mark for (user, item). An item the user never touched has
    /// the default mark.
    fn watch_mark(&self, user: UserId, item: ItemId) -> Result<WatchMark>;
}

/// Write access to box set membership.
pub trait CollectionStore {
    fn get_collection(&self, id: ItemId) -> Result<Option<Collection>>;

    /// Persist a new, empty box set item.
    fn insert_collection(&self, item: &Item) -> Result<()>;

    /// Append linked children to a collection, in order.
    fn link_children(&self, collection_id: ItemId, children: &[LinkedChild]) -> Result<()>;

    /// Drop the linked children pointing at any of `item_ids`.
    fn unlink_children(&self, collection_id: ItemId, item_ids: &[ItemId]) -> Result<()>;
}

//! Library domain model: items, episodes, collections and watch state.
//!
//! All of these are read-only inputs to the engine. They are produced by a
//! [`LibraryIndex`](crate::index::LibraryIndex) or
//! [`PlaybackStore`](crate::index::PlaybackStore) implementation and live
//! for the duration of a single query.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;
use crate::ids::{ItemId, UserId};

// ---------------------------------------------------------------------------
// ItemKind
// ---------------------------------------------------------------------------

/// The kind of a library item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Folder,
    CollectionFolder,
    Series,
    Season,
    Episode,
    Movie,
    Video,
    MusicVideo,
    Trailer,
    BoxSet,
    Audio,
}

impl ItemKind {
    /// Stable lowercase name, used for storage and display.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Folder => "folder",
            Self::CollectionFolder => "collection_folder",
            Self::Series => "series",
            Self::Season => "season",
            Self::Episode => "episode",
            Self::Movie => "movie",
            Self::Video => "video",
            Self::MusicVideo => "music_video",
            Self::Trailer => "trailer",
            Self::BoxSet => "box_set",
            Self::Audio => "audio",
        }
    }

    /// Whether items of this kind are folded into their owning box set when
    /// a result set is collapsed.
    pub fn supports_collection_grouping(&self) -> bool {
        matches!(
            self,
            Self::Movie | Self::Series | Self::MusicVideo | Self::Trailer
        )
    }

    /// Whether items of this kind are videos and may carry alternate versions.
    pub fn is_video(&self) -> bool {
        matches!(
            self,
            Self::Episode | Self::Movie | Self::Video | Self::MusicVideo | Self::Trailer
        )
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s {
            "folder" => Self::Folder,
            "collection_folder" => Self::CollectionFolder,
            "series" => Self::Series,
            "season" => Self::Season,
            "episode" => Self::Episode,
            "movie" => Self::Movie,
            "video" => Self::Video,
            "music_video" => Self::MusicVideo,
            "trailer" => Self::Trailer,
            "box_set" => Self::BoxSet,
            "audio" => Self::Audio,
            other => return Err(Error::Validation(format!("unknown item kind '{other}'"))),
        };
        Ok(kind)
    }
}

// ---------------------------------------------------------------------------
// SeriesKey
// ---------------------------------------------------------------------------

/// Stable grouping key for the episodes of one series across seasons.
///
/// Derived from a series' identity rather than its display name, so two
/// series that happen to share a title stay apart.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeriesKey(String);

impl SeriesKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SeriesKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for SeriesKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// ---------------------------------------------------------------------------
// Item
// ---------------------------------------------------------------------------

/// Any library entity: folder, series, movie, box set, ...
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub kind: ItemKind,
    pub name: String,
    pub parent_id: Option<ItemId>,
    /// Filesystem path, when the item is backed by one.
    pub path: Option<String>,
    /// Presentation key: a series' own key, or the owning series' key for
    /// an episode.
    pub series_key: Option<SeriesKey>,
    /// Local alternate versions (other encodes of the same content).
    #[serde(default)]
    pub alternate_versions: Vec<ItemId>,
}

impl Item {
    pub fn new(kind: ItemKind, name: impl Into<String>) -> Self {
        Self {
            id: ItemId::new(),
            kind,
            name: name.into(),
            parent_id: None,
            path: None,
            series_key: None,
            alternate_versions: Vec::new(),
        }
    }

    /// The key this item groups its episodes under, if it is a series.
    ///
    /// A series without an explicit key falls back to its id.
    pub fn presentation_key(&self) -> Option<SeriesKey> {
        if self.kind != ItemKind::Series {
            return None;
        }
        Some(
            self.series_key
                .clone()
                .unwrap_or_else(|| SeriesKey::new(self.id.to_string())),
        )
    }
}

// ---------------------------------------------------------------------------
// Episode
// ---------------------------------------------------------------------------

/// A playable episode of a series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    pub id: ItemId,
    pub series_key: SeriesKey,
    pub name: String,
    /// Lexicographic ordering token within the series.
    pub sort_key: String,
    /// Season number; `Some(0)` marks a special.
    pub parent_index: Option<i32>,
    /// Episode number within the season.
    pub index_number: Option<i32>,
    pub airs_before_season: Option<i32>,
    pub airs_after_season: Option<i32>,
    pub airs_before_episode: Option<i32>,
    pub premiere_date: Option<DateTime<Utc>>,
    /// Placeholder for a known but missing episode.
    pub is_virtual: bool,
}

impl Episode {
    /// Season-0 episodes are specials.
    pub fn is_special(&self) -> bool {
        self.parent_index == Some(0)
    }

    /// Whether a curator declared where this special airs between seasons.
    pub fn has_season_placement(&self) -> bool {
        self.airs_before_season.is_some() || self.airs_after_season.is_some()
    }
}

// ---------------------------------------------------------------------------
// Collections
// ---------------------------------------------------------------------------

/// A reference from a collection to one of its members.
///
/// Members are normally linked by id. Children imported from a collection
/// file may only carry a path, which is resolved against the library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedChild {
    pub item_id: Option<ItemId>,
    pub path: Option<String>,
}

impl LinkedChild {
    pub fn by_id(item_id: ItemId) -> Self {
        Self {
            item_id: Some(item_id),
            path: None,
        }
    }

    pub fn by_path(path: impl Into<String>) -> Self {
        Self {
            item_id: None,
            path: Some(path.into()),
        }
    }
}

/// A box set: a named grouping item owning an ordered set of linked children.
///
/// No two linked children point at the same item id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    pub item: Item,
    pub linked_children: Vec<LinkedChild>,
}

impl Collection {
    pub fn id(&self) -> ItemId {
        self.item.id
    }

    /// Whether a child is linked to `item_id` directly by id.
    pub fn links_item_id(&self, item_id: ItemId) -> bool {
        self.linked_children
            .iter()
            .any(|c| c.item_id == Some(item_id))
    }
}

// ---------------------------------------------------------------------------
// Watch state
// ---------------------------------------------------------------------------

/// Per (user, item) playback fact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchMark {
    pub played: bool,
    pub play_count: i32,
    pub last_played_at: Option<DateTime<Utc>>,
    /// Resume position in 100ns ticks; non-zero means partially watched.
    pub resume_position_ticks: i64,
}

impl WatchMark {
    pub fn is_partially_watched(&self) -> bool {
        self.resume_position_ticks > 0
    }
}

/// When a user last watched a series, as ranked by next-up.
///
/// Variants are ordered: a series that was never started ranks below one
/// that was watched without a recorded date, which ranks below any real
/// date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "state", content = "at", rename_all = "snake_case")]
pub enum LastWatched {
    /// No episode of the series has been played.
    NotStarted,
    /// An episode is marked played but carries no last-played date.
    WatchedUndated,
    /// The last-played date of the most recently watched episode.
    At(DateTime<Utc>),
}

impl LastWatched {
    pub fn is_not_started(&self) -> bool {
        matches!(self, Self::NotStarted)
    }

    /// The real date, if there is one.
    pub fn date(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::At(d) => Some(*d),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// The parts of a user account the engine needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub name: String,
    /// Root folders the user hid from the latest / next-up views.
    #[serde(default)]
    pub latest_item_excludes: Vec<ItemId>,
}

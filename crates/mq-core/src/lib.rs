//! mq-core: shared types, IDs, errors, configuration, and event system.
//!
//! This crate is the foundational dependency for the other mq-* crates. It
//! holds the media domain model, the contracts of the external
//! collaborators (library index, playback state store, collection store),
//! a unified error type, application configuration, and the collection
//! event bus.

pub mod config;
pub mod error;
pub mod events;
pub mod ids;
pub mod index;
pub mod model;

// Re-export the most commonly used items at the crate root.
pub use error::{Error, Result};
pub use ids::*;
pub use index::*;
pub use model::*;

//! Database query modules.

pub mod collections;
pub mod episodes;
pub mod items;
pub mod playback;
pub mod users;

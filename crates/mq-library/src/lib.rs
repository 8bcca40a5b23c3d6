//! mq-library: the next-up and box set engine.
//!
//! - [`resolver`] ranks one series for a user and, on demand, resolves the
//!   episode to offer next.
//! - [`aggregator`] fans the resolver out over many series, applies the
//!   visibility rules, and paginates.
//! - [`collapse`] folds box set members and duplicate alternate versions
//!   out of a result set.
//! - [`collections`] edits box set membership and publishes events.
//!
//! Everything here is synchronous and read-only apart from
//! [`collections`]; storage is reached only through the `mq-core` traits.

pub mod aggregator;
pub mod aired_order;
pub mod collapse;
pub mod collections;
pub mod resolver;

#[cfg(test)]
mod test_support;

pub use aggregator::{NextUpQuery, NextUpResult, NextUpService};
pub use collapse::collapse_collections;
pub use collections::CollectionManager;
pub use resolver::{NextUpCandidate, SeriesResolver, WatchMode};

//! mq-db: SQLite persistence for the marquee library.
//!
//! This crate provides connection pooling, embedded migrations, typed row
//! models, query modules, and [`SqliteLibrary`], which implements the
//! collaborator contracts from `mq-core` on top of a pool.

pub mod library;
pub mod migrations;
pub mod models;
pub mod pool;
pub mod queries;

pub use library::SqliteLibrary;

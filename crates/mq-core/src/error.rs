//! Unified error type for marquee.
//!
//! The engine raises [`Error::InvalidArgument`] for caller contract
//! violations. Everything else originates in a collaborator (usually the
//! SQLite store) and is passed through unchanged.

use std::fmt;

/// Unified error type covering all failure modes in marquee.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A caller passed an identity the system does not know (user,
    /// collection, item).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The requested entity could not be found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g. "item", "collection").
        entity: String,
        /// The identifier that was looked up.
        id: String,
    },

    /// Configuration or input data failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A database operation failed.
    #[error("Database error: {source}")]
    Database {
        /// The underlying database error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether this error is the caller's fault. Such errors are never
    /// worth retrying.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidArgument(_) | Error::NotFound { .. } | Error::Validation(_)
        )
    }

    /// Convenience constructor for [`Error::InvalidArgument`].
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Error::InvalidArgument(message.into())
    }

    /// Convenience constructor for [`Error::NotFound`].
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        Error::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Convenience constructor for [`Error::Database`].
    pub fn database(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Error::Database {
            source: source.into(),
        }
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

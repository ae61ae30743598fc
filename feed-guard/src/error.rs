//! Error types for the feed-guard library.
//!
//! Errors are split along the lines of who can recover from them:
//!
//! - [`FeedError::SchemaConfiguration`]: the static schema is malformed. Fatal at startup.
//! - [`FeedError::InvalidInput`]: strict validation found violations. The caller can switch
//!   to repair or permissive mode, or fix the data upstream, without re-running validation.
//! - [`FeedError::Store`]: the store adapter failed. Always propagated untouched.

use crate::core::Violation;
use crate::store::RowId;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the feed-guard library.
#[derive(Error, Debug)]
pub enum FeedError {
    /// The declared schema cannot be resolved into a consistent graph.
    #[error("Schema configuration error: {0}")]
    SchemaConfiguration(String),

    /// An entity lookup by name found nothing.
    #[error("Entity '{0}' not found in schema")]
    EntityNotFound(String),

    /// Strict validation found foreign key violations.
    ///
    /// This is the only error carrying a structured payload, so a caller can
    /// pick a policy without validating the store a second time.
    #[error("Invalid input: {} foreign key violation(s)", violations.len())]
    InvalidInput {
        /// Every violation found by the first pass
        violations: Vec<Violation>,
    },

    /// Error raised by the store adapter.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// A repair or prune loop hit its iteration bound before converging.
    #[error("{operation} did not reach a fixed point within {limit} iterations")]
    FixedPointNotReached {
        /// Which loop gave up ("repair" or "prune")
        operation: String,
        /// The configured bound
        limit: usize,
    },

    /// Error related to configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Error from serialization/deserialization operations.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic internal error for unexpected conditions.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Errors raised by [`Store`](crate::store::Store) implementations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backing file could not be opened for reading and writing.
    #[error("Failed to open store at {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error from the SQLite engine.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Entity '{0}' is not declared in the store")]
    UnknownEntity(String),

    #[error("Column '{column}' is not declared on entity '{entity}'")]
    UnknownColumn { entity: String, column: String },

    #[error("Entity '{0}' is already declared")]
    EntityExists(String),

    /// The backend cannot represent an entity without columns.
    #[error("Entity '{0}' must be declared with at least one column")]
    EmptyEntity(String),

    /// Delete-by-identity targeted a row that no longer exists.
    #[error("Row {id} no longer exists in '{entity}'")]
    MissingRow { entity: String, id: RowId },

    #[error("Failed to acquire store lock: {0}")]
    Lock(String),

    /// A name was rejected before being interpolated into a query.
    #[error("Security error: {0}")]
    Security(String),
}

/// A type alias for `Result<T, FeedError>`.
pub type Result<T> = std::result::Result<T, FeedError>;

/// A type alias for `Result<T, StoreError>`, used by store adapters.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

impl FeedError {
    /// Creates a new schema configuration error.
    pub fn schema(message: impl Into<String>) -> Self {
        Self::SchemaConfiguration(message.into())
    }

    /// Creates a fixed-point error for the named loop.
    pub fn fixed_point(operation: impl Into<String>, limit: usize) -> Self {
        Self::FixedPointNotReached {
            operation: operation.into(),
            limit,
        }
    }

    /// Returns the violations carried by an [`FeedError::InvalidInput`] error.
    pub fn violations(&self) -> Option<&[Violation]> {
        match self {
            Self::InvalidInput { violations } => Some(violations),
            _ => None,
        }
    }
}

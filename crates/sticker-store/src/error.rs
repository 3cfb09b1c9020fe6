//! Error types for the store module.

use sticker_core::{ResourceKind, ResourceVersion};
use thiserror::Error;

use crate::stream::StreamError;

/// Errors that can occur during resource store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No resource with this name.
    #[error("{kind} {name:?} not found")]
    NotFound { kind: ResourceKind, name: String },

    /// Create of a name that is already taken.
    #[error("{kind} {name:?} already exists")]
    AlreadyExists { kind: ResourceKind, name: String },

    /// Optimistic-lock failure: the caller wrote from a stale read.
    #[error("conflict on {kind} {name:?}: read at version {expected}, stored version is {actual}")]
    Conflict {
        kind: ResourceKind,
        name: String,
        expected: ResourceVersion,
        actual: ResourceVersion,
    },

    /// The resource is not acceptable to the store.
    #[error("invalid resource: {0}")]
    Invalid(String),

    /// Resource serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// In-memory state lock was poisoned by a panicking writer.
    #[error("store lock poisoned")]
    Poisoned,

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    pub fn not_found(kind: ResourceKind, name: impl Into<String>) -> Self {
        StoreError::NotFound {
            kind,
            name: name.into(),
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, StoreError::AlreadyExists { .. })
    }
}

/// Result type for resource store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors surfaced by an attachment store.
#[derive(Debug, Error)]
pub enum AttachmentError {
    /// Reading the upload body failed or the size guard tripped.
    #[error(transparent)]
    Stream(#[from] StreamError),

    /// The storage policy does not exist.
    #[error("attachment policy {0:?} not found")]
    PolicyNotFound(String),

    /// Permalink resolution failed.
    #[error("permalink unavailable for attachment {name:?}: {message}")]
    Permalink { name: String, message: String },

    /// Any other backend failure.
    #[error("attachment backend error: {0}")]
    Backend(String),
}

/// Result type for attachment store operations.
pub type AttachmentResult<T> = std::result::Result<T, AttachmentError>;

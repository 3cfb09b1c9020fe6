//! Error types for the controller module.

use sticker_core::ResourceKind;
use sticker_store::{AttachmentError, StoreError};
use thiserror::Error;

/// Errors that can occur while reconciling.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Resource store operation failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Attachment store operation failed.
    #[error("attachment error: {0}")]
    Attachment(#[from] AttachmentError),

    /// A request arrived for a kind nobody reconciles.
    #[error("no reconciler registered for {0}")]
    NoReconciler(ResourceKind),

    /// The reconcile task panicked.
    #[error("reconcile of {0} panicked")]
    Panicked(String),
}

impl ControllerError {
    /// Whether this is an optimistic-lock failure from the store.
    pub fn is_conflict(&self) -> bool {
        matches!(self, ControllerError::Store(e) if e.is_conflict())
    }
}

/// Result type for controller operations.
pub type Result<T> = std::result::Result<T, ControllerError>;

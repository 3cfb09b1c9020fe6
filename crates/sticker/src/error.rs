//! Error types for the sticker services.

use sticker_controller::ControllerError;
use sticker_core::CoreError;
use sticker_store::{AttachmentError, StoreError, StreamError};
use thiserror::Error;

/// Errors returned by the sticker services.
///
/// Each variant maps to one HTTP-equivalent status through
/// [`ServiceError::status_code`].
#[derive(Debug, Error)]
pub enum ServiceError {
    /// A conditional write lost against a concurrent writer.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A create hit a name that is already taken.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// The resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The caller may not touch this resource.
    ///
    /// Reported as not-found so callers cannot probe for other users' groups.
    #[error("permission denied: {0}")]
    Permission(String),

    /// Malformed or unacceptable input.
    #[error("invalid input: {0}")]
    ClientInput(String),

    /// The service is missing required settings.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Any other resource store failure.
    #[error("store error: {0}")]
    Store(StoreError),

    /// Any other attachment store failure.
    #[error("attachment error: {0}")]
    Attachment(AttachmentError),
}

impl ServiceError {
    /// HTTP-equivalent status code for a boundary layer.
    pub fn status_code(&self) -> u16 {
        match self {
            ServiceError::Conflict(_) | ServiceError::AlreadyExists(_) => 409,
            ServiceError::NotFound(_) | ServiceError::Permission(_) => 404,
            ServiceError::ClientInput(_) => 400,
            ServiceError::Configuration(_)
            | ServiceError::Store(_)
            | ServiceError::Attachment(_) => 500,
        }
    }

    /// Whether repeating the operation from a fresh read may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ServiceError::Conflict(_))
    }
}

impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict { .. } => ServiceError::Conflict(e.to_string()),
            StoreError::NotFound { .. } => ServiceError::NotFound(e.to_string()),
            StoreError::AlreadyExists { .. } => ServiceError::AlreadyExists(e.to_string()),
            StoreError::Invalid(message) => ServiceError::ClientInput(message),
            other => ServiceError::Store(other),
        }
    }
}

impl From<AttachmentError> for ServiceError {
    fn from(e: AttachmentError) -> Self {
        match e {
            AttachmentError::Stream(stream) => stream.into(),
            AttachmentError::PolicyNotFound(_) => ServiceError::Configuration(e.to_string()),
            other => ServiceError::Attachment(other),
        }
    }
}

impl From<StreamError> for ServiceError {
    fn from(e: StreamError) -> Self {
        ServiceError::ClientInput(e.to_string())
    }
}

impl From<ControllerError> for ServiceError {
    fn from(e: ControllerError) -> Self {
        match e {
            ControllerError::Store(store) => store.into(),
            ControllerError::Attachment(attachment) => attachment.into(),
            other => ServiceError::Configuration(other.to_string()),
        }
    }
}

impl From<CoreError> for ServiceError {
    fn from(e: CoreError) -> Self {
        ServiceError::ClientInput(e.to_string())
    }
}

/// Result type for service operations.
pub type Result<T> = std::result::Result<T, ServiceError>;

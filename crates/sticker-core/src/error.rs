//! Error types for the sticker core.

use thiserror::Error;

/// Errors raised while interpreting caller input against the model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("unsupported sort value: {0}")]
    UnsupportedSort(String),

    #[error("invalid query parameter {param}: {message}")]
    InvalidQuery { param: &'static str, message: String },

    #[error("invalid label selector {selector:?}: {message}")]
    InvalidSelector { selector: String, message: String },

    #[error("invalid resource name {0:?}")]
    InvalidName(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

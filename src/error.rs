//! Error types for FileHub.

use thiserror::Error;

/// Common error type for FileHub.
#[derive(Error, Debug)]
pub enum FileHubError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// A supplied or requested name contained path-traversal sequences or
    /// other characters unsafe for use as a filesystem leaf name.
    #[error("invalid name: {0:?}")]
    InvalidName(String),

    /// An upload exceeded the configured size limit.
    #[error("file too large (max {max} bytes)")]
    SizeLimitExceeded {
        /// The limit that was exceeded, in bytes.
        max: u64,
    },

    /// A stored name already exists in the registry. The storage naming
    /// scheme makes this unreachable in practice; it indicates an invariant
    /// violation rather than a client mistake.
    #[error("duplicate stored name: {0}")]
    DuplicateStoredName(String),

    /// Validation error for user input or configuration.
    #[error("validation error: {0}")]
    Validation(String),
}

/// Result type alias for FileHub operations.
pub type Result<T> = std::result::Result<T, FileHubError>;

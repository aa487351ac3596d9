//! Error types for the kubebridge-core library.

use thiserror::Error;
use uuid::Uuid;

/// Result type alias for kubebridge operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while watching cluster state, resolving
/// permissions, or orchestrating port forwards.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error (paths, persistence layout, invalid input).
    #[error("Configuration error: {0}")]
    Config(String),

    /// A forward configuration was not found in the store.
    #[error("Forward configuration {0} not found")]
    ForwardNotFound(Uuid),

    /// A forward configuration with the same ID already exists.
    #[error("Forward configuration {0} already exists")]
    DuplicateForward(Uuid),

    /// The underlying watch stream failed.
    #[error("Watch failure for {resource}: {reason}")]
    Watch { resource: String, reason: String },

    /// A SelfSubjectAccessReview call failed.
    #[error("Access review failed: {0}")]
    AccessReview(String),

    /// Opening a port-forward tunnel failed.
    #[error("Port forward connection failed: {0}")]
    Connection(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

//! Persistence error types.

use thiserror::Error;

/// Errors reported by the remote diagram API
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    #[error("Remote store unreachable: {0}")]
    Network(String),

    #[error("Diagram {0} not found on remote store")]
    NotFound(String),

    #[error("Remote store rejected request: {0}")]
    Rejected(String),
}

/// Result type for remote API operations
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors reported by the local fallback cache
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cache contents are not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors surfaced by the diagram store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Cannot delete the last remaining diagram")]
    LastDiagram,

    #[error("Diagram {0} does not exist")]
    UnknownDiagram(String),

    #[error("No diagram is active")]
    NoActiveDiagram,

    #[error("Could not load diagrams from the remote store or the local cache: {0}")]
    BootstrapFailed(ApiError),

    #[error("Failed to serialize diagram: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Result type for diagram store operations
pub type StoreResult<T> = Result<T, StoreError>;

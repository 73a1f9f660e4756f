//! Error types shared across the workspace

use thiserror::Error;

/// Result type alias for common operations
pub type Result<T> = std::result::Result<T, CommonError>;

/// Errors raised while parsing shared vocabulary
#[derive(Error, Debug)]
pub enum CommonError {
    #[error("Unknown jurisdiction: {0}")]
    UnknownJurisdiction(String),

    #[error("Unknown source format: {0}")]
    UnknownSourceFormat(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

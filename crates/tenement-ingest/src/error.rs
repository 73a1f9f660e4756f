//! Ingestion error types
//!
//! The variants follow how a failure should be handled rather than where it
//! came from: transient network failures are retried within a budget, schema
//! problems degrade or skip, persistence failures are isolated per batch, and
//! configuration failures are fatal.

use tenement_common::{CommonError, Jurisdiction};
use thiserror::Error;

/// Result type alias for ingestion operations
pub type Result<T> = std::result::Result<T, IngestError>;

/// Ingestion error types
#[derive(Error, Debug)]
pub enum IngestError {
    /// Timeouts, refused connections, 5xx responses, ArcGIS error bodies
    #[error("Transient network error: {0}")]
    TransientNetwork(String),

    /// Malformed or unexpected upstream payload
    #[error("Upstream schema error: {0}")]
    UpstreamSchema(String),

    /// A store write failed
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// No enabled source, no registered provider, invalid settings
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IngestError {
    /// Whether a retry policy may try the operation again
    pub fn is_retryable(&self) -> bool {
        matches!(self, IngestError::TransientNetwork(_))
    }

    pub fn no_enabled_source(jurisdiction: Jurisdiction) -> Self {
        Self::Configuration(format!("No enabled data source for jurisdiction {}", jurisdiction))
    }

    pub fn no_provider(jurisdiction: Jurisdiction) -> Self {
        Self::Configuration(format!("No provider registered for jurisdiction {}", jurisdiction))
    }
}

impl From<reqwest::Error> for IngestError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            IngestError::UpstreamSchema(err.to_string())
        } else if err.is_builder() {
            IngestError::Configuration(err.to_string())
        } else {
            IngestError::TransientNetwork(err.to_string())
        }
    }
}

impl From<sqlx::Error> for IngestError {
    fn from(err: sqlx::Error) -> Self {
        IngestError::Persistence(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for IngestError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        IngestError::Persistence(format!("Migration failed: {}", err))
    }
}

impl From<serde_json::Error> for IngestError {
    fn from(err: serde_json::Error) -> Self {
        IngestError::UpstreamSchema(err.to_string())
    }
}

impl From<csv::Error> for IngestError {
    fn from(err: csv::Error) -> Self {
        IngestError::UpstreamSchema(err.to_string())
    }
}

impl From<zip::result::ZipError> for IngestError {
    fn from(err: zip::result::ZipError) -> Self {
        IngestError::UpstreamSchema(format!("Invalid archive: {}", err))
    }
}

impl From<CommonError> for IngestError {
    fn from(err: CommonError) -> Self {
        IngestError::Configuration(err.to_string())
    }
}

impl From<tokio::task::JoinError> for IngestError {
    fn from(err: tokio::task::JoinError) -> Self {
        IngestError::Io(std::io::Error::new(std::io::ErrorKind::Other, err.to_string()))
    }
}

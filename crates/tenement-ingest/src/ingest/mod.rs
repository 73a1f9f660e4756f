//! Multi-jurisdiction tenement ingestion
//!
//! Provider adapters fetch and normalize each regulator's feed, the batch
//! engine upserts the result and the orchestrator ties both to the
//! `data_sources` registry.

pub mod batch;
pub mod health;
pub mod models;
pub mod normalizer;
pub mod orchestrator;
pub mod providers;
pub mod retry;

pub use batch::{BatchUpsertEngine, ImportOutcome};
pub use health::HealthChecker;
pub use models::{
    DataSourceConfig, EndpointDescriptor, ProviderStatus, SourceHealth, StatusResult, SyncResult,
    SyncStatus, TenementRecord,
};
pub use orchestrator::IngestionOrchestrator;
pub use providers::{ProviderRegistry, TenementProvider};
pub use retry::{retry_with_policy, RetryPolicy};

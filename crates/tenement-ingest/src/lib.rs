//! Tenement Ingestion Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Aggregates Australian mining-tenement registers from six regulators into
//! one canonical PostgreSQL table.
//!
//! # Overview
//!
//! - **Providers**: one adapter per upstream protocol (ArcGIS REST, WFS
//!   GeoJSON, ZIP of CSV/TAB, plain CSV), each normalizing into
//!   [`TenementRecord`]
//! - **Batch engine**: chunked, deduplicated upserts with per-batch failure
//!   isolation
//! - **Orchestrator**: sync lifecycle and health sweeps over the
//!   `data_sources` registry
//! - **Persistence**: Postgres via SQLx, or in-memory stores for dry runs
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tenement_common::Jurisdiction;
//! use tenement_ingest::config::Config;
//! use tenement_ingest::db::{self, PgDataSourceRepository, PgTenementStore};
//! use tenement_ingest::ingest::providers::http::build_client;
//! use tenement_ingest::{IngestionOrchestrator, ProviderRegistry};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = Config::load()?;
//! let pool = db::create_pool(&config.database).await?;
//! let client = build_client()?;
//!
//! let orchestrator = IngestionOrchestrator::new(
//!     Arc::new(ProviderRegistry::from_settings(&config.ingest, client.clone())),
//!     Arc::new(PgDataSourceRepository::new(pool.clone())),
//!     Arc::new(PgTenementStore::new(pool)),
//!     config.ingest,
//!     client,
//! );
//!
//! let result = orchestrator.sync_data_source(Jurisdiction::Wa).await?;
//! println!("imported {} records", result.imported);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod db;
pub mod error;
pub mod ingest;

pub use config::{Config, IngestSettings};
pub use error::{IngestError, Result};
pub use ingest::{
    DataSourceConfig, IngestionOrchestrator, ProviderRegistry, StatusResult, SyncResult,
    TenementProvider, TenementRecord,
};

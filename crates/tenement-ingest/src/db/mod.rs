//! Persistence
//!
//! Two stores sit behind traits so the orchestrator can run against Postgres
//! or entirely in memory:
//!
//! - [`TenementStore`]: batch upserts into `tenements`
//! - [`DataSourceRepository`]: the `data_sources` registry and its sync state

pub mod data_sources;
pub mod memory;
pub mod tenements;

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::error::Result;

pub use data_sources::{DataSourceRepository, PgDataSourceRepository};
pub use memory::{InMemoryDataSourceRepository, InMemoryTenementStore};
pub use tenements::{PgTenementStore, TenementStore, MAX_UPSERT_BATCH_SIZE};

pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .connect(&config.url)
        .await?;

    info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "Database connection pool created"
    );

    Ok(pool)
}

/// Apply the workspace migrations (schema and source seed)
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("../../migrations").run(pool).await?;
    info!("Database migrations completed");
    Ok(())
}

pub async fn health_check(pool: &PgPool) -> Result<()> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

//! Data source registry
//!
//! Rows are seeded by migration and only ever updated here: sync lifecycle
//! transitions and health sweep results.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use tenement_common::Jurisdiction;
use uuid::Uuid;

use crate::error::{IngestError, Result};
use crate::ingest::models::{DataSourceConfig, EndpointDescriptor, SourceHealth};

#[async_trait]
pub trait DataSourceRepository: Send + Sync {
    async fn list_enabled(&self) -> Result<Vec<DataSourceConfig>>;

    /// Oldest enabled source for a jurisdiction
    async fn find_enabled(&self, jurisdiction: Jurisdiction) -> Result<Option<DataSourceConfig>>;

    /// Enter `running` and stamp `last_sync_attempt`
    async fn mark_running(&self, id: Uuid) -> Result<()>;

    /// Enter `success`, stamp `last_sync_success` and store the record count
    ///
    /// `note` replaces `last_error`; `None` clears it.
    async fn mark_success(&self, id: Uuid, record_count: i64, note: Option<String>) -> Result<()>;

    /// Enter `error` with the failure message
    async fn mark_error(&self, id: Uuid, message: &str) -> Result<()>;

    async fn record_health(&self, id: Uuid, status: SourceHealth, error: Option<String>) -> Result<()>;
}

#[derive(Debug, FromRow)]
struct DataSourceRow {
    id: Uuid,
    name: String,
    jurisdiction: String,
    endpoint: Json<EndpointDescriptor>,
    format: String,
    sync_status: String,
    last_sync_attempt: Option<DateTime<Utc>>,
    last_sync_success: Option<DateTime<Utc>>,
    last_error: Option<String>,
    record_count: i64,
    is_enabled: bool,
    health_status: Option<String>,
    health_error: Option<String>,
    last_health_check: Option<DateTime<Utc>>,
}

impl TryFrom<DataSourceRow> for DataSourceConfig {
    type Error = IngestError;

    fn try_from(row: DataSourceRow) -> Result<Self> {
        let invalid = |field: &str, e: anyhow::Error| {
            IngestError::Configuration(format!("data source {} has invalid {}: {}", row.id, field, e))
        };

        Ok(DataSourceConfig {
            jurisdiction: row.jurisdiction.parse()?,
            format: row.format.parse()?,
            sync_status: row.sync_status.parse().map_err(|e| invalid("sync_status", e))?,
            health_status: row
                .health_status
                .as_deref()
                .map(str::parse::<SourceHealth>)
                .transpose()
                .map_err(|e| invalid("health_status", e))?,
            id: row.id,
            name: row.name,
            endpoint: row.endpoint.0,
            last_sync_attempt: row.last_sync_attempt,
            last_sync_success: row.last_sync_success,
            last_error: row.last_error,
            record_count: row.record_count,
            is_enabled: row.is_enabled,
            health_error: row.health_error,
            last_health_check: row.last_health_check,
        })
    }
}

const SELECT_SOURCES: &str = r#"
    SELECT
        id, name, jurisdiction, endpoint, format, sync_status,
        last_sync_attempt, last_sync_success, last_error, record_count,
        is_enabled, health_status, health_error, last_health_check
    FROM data_sources
"#;

pub struct PgDataSourceRepository {
    pool: PgPool,
}

impl PgDataSourceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DataSourceRepository for PgDataSourceRepository {
    async fn list_enabled(&self) -> Result<Vec<DataSourceConfig>> {
        let rows: Vec<DataSourceRow> =
            sqlx::query_as(&format!("{} WHERE is_enabled ORDER BY jurisdiction, created_at", SELECT_SOURCES))
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter().map(DataSourceConfig::try_from).collect()
    }

    async fn find_enabled(&self, jurisdiction: Jurisdiction) -> Result<Option<DataSourceConfig>> {
        let row: Option<DataSourceRow> = sqlx::query_as(&format!(
            "{} WHERE is_enabled AND jurisdiction = $1 ORDER BY created_at LIMIT 1",
            SELECT_SOURCES
        ))
        .bind(jurisdiction.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(DataSourceConfig::try_from).transpose()
    }

    async fn mark_running(&self, id: Uuid) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE data_sources
            SET sync_status = 'running', last_sync_attempt = NOW(), updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn mark_success(&self, id: Uuid, record_count: i64, note: Option<String>) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE data_sources
            SET sync_status = 'success',
                last_sync_success = NOW(),
                record_count = $2,
                last_error = $3,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(record_count)
        .bind(note)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn mark_error(&self, id: Uuid, message: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE data_sources
            SET sync_status = 'error', last_error = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(message)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn record_health(&self, id: Uuid, status: SourceHealth, error: Option<String>) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE data_sources
            SET health_status = $2,
                last_health_check = NOW(),
                health_error = $3,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status.as_str())
        .bind(error)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

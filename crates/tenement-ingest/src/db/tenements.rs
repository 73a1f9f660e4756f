//! Tenement store

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tenement_common::Jurisdiction;

use crate::error::Result;
use crate::ingest::models::TenementRecord;

/// PostgreSQL bind-parameter ceiling for one statement
pub const POSTGRES_MAX_BIND_PARAMS: usize = 65_535;

/// Columns bound per row by [`PgTenementStore::upsert_batch`]
pub const BINDS_PER_TENEMENT: usize = 14;

/// Largest batch that fits in one upsert statement
pub const MAX_UPSERT_BATCH_SIZE: usize = POSTGRES_MAX_BIND_PARAMS / BINDS_PER_TENEMENT;

/// Write side of the canonical tenement table
#[async_trait]
pub trait TenementStore: Send + Sync {
    /// Upsert one batch as a single atomic write, returning rows written
    ///
    /// Callers must not pass two records with the same natural key.
    async fn upsert_batch(&self, records: &[TenementRecord]) -> Result<usize>;

    /// Stored rows, optionally for one jurisdiction
    async fn count(&self, jurisdiction: Option<Jurisdiction>) -> Result<i64>;
}

pub struct PgTenementStore {
    pool: PgPool,
}

impl PgTenementStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TenementStore for PgTenementStore {
    async fn upsert_batch(&self, records: &[TenementRecord]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new(
            r#"
            INSERT INTO tenements (
                jurisdiction,
                number,
                tenement_type,
                status,
                holder_name,
                application_date,
                grant_date,
                expiry_date,
                anniversary_date,
                markout_date,
                area_ha,
                section29_flag,
                geometry,
                last_sync_at
            )
            "#,
        );

        query_builder.push_values(records, |mut b, record| {
            b.push_bind(record.jurisdiction.as_str())
                .push_bind(&record.number)
                .push_bind(&record.tenement_type)
                .push_bind(&record.status)
                .push_bind(&record.holder_name)
                .push_bind(record.application_date)
                .push_bind(record.grant_date)
                .push_bind(record.expiry_date)
                .push_bind(record.anniversary_date)
                .push_bind(record.markout_date)
                .push_bind(record.area_ha)
                .push_bind(record.section29_flag)
                .push_bind(&record.geometry)
                .push_bind(record.last_sync_at);
        });

        query_builder.push(
            r#"
            ON CONFLICT (jurisdiction, number)
            DO UPDATE SET
                tenement_type = EXCLUDED.tenement_type,
                status = EXCLUDED.status,
                holder_name = EXCLUDED.holder_name,
                application_date = EXCLUDED.application_date,
                grant_date = EXCLUDED.grant_date,
                expiry_date = EXCLUDED.expiry_date,
                anniversary_date = EXCLUDED.anniversary_date,
                markout_date = EXCLUDED.markout_date,
                area_ha = EXCLUDED.area_ha,
                section29_flag = EXCLUDED.section29_flag,
                geometry = EXCLUDED.geometry,
                last_sync_at = EXCLUDED.last_sync_at,
                updated_at = NOW()
            "#,
        );

        let result = query_builder.build().execute(&self.pool).await?;
        Ok(result.rows_affected() as usize)
    }

    async fn count(&self, jurisdiction: Option<Jurisdiction>) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM tenements WHERE $1::TEXT IS NULL OR jurisdiction = $1",
        )
        .bind(jurisdiction.map(|j| j.as_str()))
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}

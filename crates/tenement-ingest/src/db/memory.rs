//! In-memory stores
//!
//! Back the `--dry-run` mode of the binary and the orchestration tests.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use tenement_common::Jurisdiction;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::data_sources::DataSourceRepository;
use super::tenements::TenementStore;
use crate::config::IngestSettings;
use crate::error::{IngestError, Result};
use crate::ingest::models::{
    DataSourceConfig, SourceHealth, SyncStatus, TenementKey, TenementRecord,
};
use crate::ingest::providers::default_format;

/// Display name of the seeded source for a jurisdiction
pub fn default_source_name(jurisdiction: Jurisdiction) -> &'static str {
    match jurisdiction {
        Jurisdiction::Wa => "WA DMIRS Mining Tenements",
        Jurisdiction::Nsw => "NSW Mining Titles",
        Jurisdiction::Vic => "VIC Mineral Tenements",
        Jurisdiction::Nt => "NT Mineral Titles",
        Jurisdiction::Qld => "QLD Mining Permits",
        Jurisdiction::Tas => "TAS Mineral Tenements",
    }
}

#[derive(Debug, Default)]
pub struct InMemoryTenementStore {
    rows: RwLock<BTreeMap<TenementKey, TenementRecord>>,
}

impl InMemoryTenementStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, jurisdiction: Jurisdiction, number: &str) -> Option<TenementRecord> {
        let key = TenementKey {
            jurisdiction,
            number: number.to_string(),
        };
        self.rows.read().await.get(&key).cloned()
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }

    /// All rows ordered by natural key
    pub async fn snapshot(&self) -> Vec<TenementRecord> {
        self.rows.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl TenementStore for InMemoryTenementStore {
    async fn upsert_batch(&self, records: &[TenementRecord]) -> Result<usize> {
        let mut rows = self.rows.write().await;
        for record in records {
            rows.insert(record.key(), record.clone());
        }
        Ok(records.len())
    }

    async fn count(&self, jurisdiction: Option<Jurisdiction>) -> Result<i64> {
        let rows = self.rows.read().await;
        let count = match jurisdiction {
            Some(j) => rows.keys().filter(|k| k.jurisdiction == j).count(),
            None => rows.len(),
        };
        Ok(count as i64)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryDataSourceRepository {
    sources: RwLock<Vec<DataSourceConfig>>,
}

impl InMemoryDataSourceRepository {
    pub fn new(sources: Vec<DataSourceConfig>) -> Self {
        Self {
            sources: RwLock::new(sources),
        }
    }

    /// One enabled source per configured endpoint
    pub fn from_settings(settings: &IngestSettings) -> Self {
        let sources = settings
            .endpoints
            .iter()
            .map(|(jurisdiction, endpoint)| {
                DataSourceConfig::new(
                    default_source_name(*jurisdiction),
                    *jurisdiction,
                    endpoint.clone(),
                    default_format(*jurisdiction),
                )
            })
            .collect();
        Self::new(sources)
    }

    pub async fn get(&self, id: Uuid) -> Option<DataSourceConfig> {
        self.sources.read().await.iter().find(|s| s.id == id).cloned()
    }

    pub async fn snapshot(&self) -> Vec<DataSourceConfig> {
        self.sources.read().await.clone()
    }

    async fn update<F>(&self, id: Uuid, apply: F) -> Result<()>
    where
        F: FnOnce(&mut DataSourceConfig) + Send,
    {
        let mut sources = self.sources.write().await;
        let source = sources
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| IngestError::Persistence(format!("data source {} not found", id)))?;
        apply(source);
        Ok(())
    }
}

#[async_trait]
impl DataSourceRepository for InMemoryDataSourceRepository {
    async fn list_enabled(&self) -> Result<Vec<DataSourceConfig>> {
        let mut enabled: Vec<_> = self
            .sources
            .read()
            .await
            .iter()
            .filter(|s| s.is_enabled)
            .cloned()
            .collect();
        enabled.sort_by_key(|s| s.jurisdiction);
        Ok(enabled)
    }

    async fn find_enabled(&self, jurisdiction: Jurisdiction) -> Result<Option<DataSourceConfig>> {
        Ok(self
            .sources
            .read()
            .await
            .iter()
            .find(|s| s.is_enabled && s.jurisdiction == jurisdiction)
            .cloned())
    }

    async fn mark_running(&self, id: Uuid) -> Result<()> {
        self.update(id, |s| {
            s.sync_status = SyncStatus::Running;
            s.last_sync_attempt = Some(Utc::now());
        })
        .await
    }

    async fn mark_success(&self, id: Uuid, record_count: i64, note: Option<String>) -> Result<()> {
        self.update(id, |s| {
            s.sync_status = SyncStatus::Success;
            s.last_sync_success = Some(Utc::now());
            s.record_count = record_count;
            s.last_error = note;
        })
        .await
    }

    async fn mark_error(&self, id: Uuid, message: &str) -> Result<()> {
        let message = message.to_string();
        self.update(id, |s| {
            s.sync_status = SyncStatus::Error;
            s.last_error = Some(message);
        })
        .await
    }

    async fn record_health(&self, id: Uuid, status: SourceHealth, error: Option<String>) -> Result<()> {
        self.update(id, |s| {
            s.health_status = Some(status);
            s.health_error = error;
            s.last_health_check = Some(Utc::now());
        })
        .await
    }
}

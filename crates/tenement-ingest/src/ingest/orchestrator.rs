//! Ingestion orchestrator
//!
//! Drives one sync end to end: resolve the source, mark it running, fetch
//! through the jurisdiction's adapter, upsert in batches and persist the
//! outcome on the source row. Fatal errors are persisted before they are
//! returned; per-batch failures are folded into [`SyncResult::errors`].

use chrono::Utc;
use futures::future::join_all;
use reqwest::Client;
use std::sync::Arc;
use tenement_common::Jurisdiction;
use tracing::{error, info, warn};

use crate::config::IngestSettings;
use crate::db::{DataSourceRepository, TenementStore};
use crate::error::{IngestError, Result};
use crate::ingest::batch::{BatchUpsertEngine, ImportOutcome};
use crate::ingest::health::HealthChecker;
use crate::ingest::models::{DataSourceConfig, StatusResult, SyncResult};
use crate::ingest::providers::{build_provider, ProviderRegistry, TenementProvider};

pub struct IngestionOrchestrator {
    registry: Arc<ProviderRegistry>,
    sources: Arc<dyn DataSourceRepository>,
    engine: BatchUpsertEngine,
    health: HealthChecker,
    settings: IngestSettings,
    client: Client,
}

impl IngestionOrchestrator {
    pub fn new(
        registry: Arc<ProviderRegistry>,
        sources: Arc<dyn DataSourceRepository>,
        store: Arc<dyn TenementStore>,
        settings: IngestSettings,
        client: Client,
    ) -> Self {
        Self {
            health: HealthChecker::new(registry.clone(), sources.clone()),
            engine: BatchUpsertEngine::new(store, settings.batch_size),
            registry,
            sources,
            settings,
            client,
        }
    }

    /// Probe every enabled source; never fails
    pub async fn check_all_data_sources_status(&self) -> Vec<StatusResult> {
        info!("Checking status of all enabled data sources");
        let results = self.health.sweep().await;
        info!(checked = results.len(), "Status check complete");
        results
    }

    /// Sync the enabled source of one jurisdiction through the registry
    pub async fn sync_data_source(&self, jurisdiction: Jurisdiction) -> Result<SyncResult> {
        let source = self
            .sources
            .find_enabled(jurisdiction)
            .await?
            .ok_or_else(|| IngestError::no_enabled_source(jurisdiction))?;

        let provider = self.registry.get(jurisdiction);
        self.run_sync(&source, provider).await
    }

    /// Sync using an adapter built from the source's own endpoint and format
    pub async fn ingest_from_source(&self, source: &DataSourceConfig) -> Result<SyncResult> {
        let provider = build_provider(
            source.jurisdiction,
            source.format,
            source.endpoint.clone(),
            &self.settings,
            self.client.clone(),
        );
        self.run_sync(source, Ok(provider)).await
    }

    /// Sync every enabled jurisdiction concurrently
    pub async fn sync_all(&self) -> Vec<(Jurisdiction, Result<SyncResult>)> {
        let mut jurisdictions: Vec<Jurisdiction> = match self.sources.list_enabled().await {
            Ok(sources) => sources.into_iter().map(|s| s.jurisdiction).collect(),
            Err(e) => {
                error!(error = %e, "Failed to list data sources for sync");
                return Vec::new();
            },
        };
        jurisdictions.sort();
        jurisdictions.dedup();

        info!(jurisdictions = jurisdictions.len(), "Starting sync of all sources");

        let results = join_all(jurisdictions.iter().map(|j| self.sync_data_source(*j))).await;
        jurisdictions.into_iter().zip(results).collect()
    }

    async fn run_sync(
        &self,
        source: &DataSourceConfig,
        provider: Result<Arc<dyn TenementProvider>>,
    ) -> Result<SyncResult> {
        info!(
            jurisdiction = %source.jurisdiction,
            source = %source.name,
            format = %source.format,
            "Starting sync"
        );

        if let Err(e) = self.sources.mark_running(source.id).await {
            return Err(self.fail(source, e).await);
        }

        let outcome = match self.fetch_and_import(provider).await {
            Ok(outcome) => outcome,
            Err(e) => return Err(self.fail(source, e).await),
        };

        let note = failure_note(&outcome);
        if let Some(note) = &note {
            warn!(jurisdiction = %source.jurisdiction, "{}", note);
        }

        if let Err(e) = self
            .sources
            .mark_success(source.id, outcome.imported as i64, note)
            .await
        {
            return Err(self.fail(source, e).await);
        }

        info!(
            jurisdiction = %source.jurisdiction,
            imported = outcome.imported,
            failed_batches = outcome.errors.len(),
            "Sync complete"
        );

        Ok(SyncResult {
            jurisdiction: source.jurisdiction,
            imported: outcome.imported,
            errors: outcome.errors,
            timestamp: Utc::now(),
        })
    }

    /// Best-effort `error` status for a failed sync; hands the error back
    async fn fail(&self, source: &DataSourceConfig, e: IngestError) -> IngestError {
        error!(jurisdiction = %source.jurisdiction, error = %e, "Sync failed");
        if let Err(persist_err) = self.sources.mark_error(source.id, &e.to_string()).await {
            error!(
                source_id = %source.id,
                error = %persist_err,
                "Failed to record sync error"
            );
        }
        e
    }

    async fn fetch_and_import(
        &self,
        provider: Result<Arc<dyn TenementProvider>>,
    ) -> Result<ImportOutcome> {
        let provider = provider?;
        let records = provider.fetch_tenements().await?;
        info!(
            jurisdiction = %provider.jurisdiction(),
            records = records.len(),
            batch_size = self.engine.batch_size(),
            "Fetched records, importing"
        );
        Ok(self.engine.import(&records).await)
    }
}

/// Summary stored in `last_error` when some batches failed
fn failure_note(outcome: &ImportOutcome) -> Option<String> {
    let first = outcome.errors.first()?;
    Some(format!(
        "{} batch(es) failed during import; first: {}",
        outcome.errors.len(),
        first
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_note_only_when_batches_failed() {
        assert!(failure_note(&ImportOutcome::default()).is_none());

        let outcome = ImportOutcome {
            imported: 500,
            errors: vec!["Batch 2/2 failed: Persistence error: boom".to_string()],
        };
        let note = failure_note(&outcome).unwrap();
        assert!(note.starts_with("1 batch(es) failed"));
        assert!(note.contains("Batch 2/2"));
    }
}

//! Batch upsert engine
//!
//! Records are deduplicated by natural key (first occurrence wins) and then
//! written in order-preserving chunks of `batch_size`. Each chunk is one
//! atomic upsert; a failed chunk is recorded and the next one still
//! runs, so one bad row costs at most its own batch.

use std::collections::HashSet;
use std::sync::Arc;
use tracing::{error, info};

use crate::db::{TenementStore, MAX_UPSERT_BATCH_SIZE};
use crate::ingest::models::{TenementKey, TenementRecord};

/// Outcome of one import
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportOutcome {
    /// Rows written by successful batches
    pub imported: usize,
    /// `"Batch {n}/{total} failed: ..."`, one per failed batch
    pub errors: Vec<String>,
}

/// Keep the first record for each natural key, preserving order
pub fn dedupe_first(records: &[TenementRecord]) -> Vec<TenementRecord> {
    let mut seen: HashSet<TenementKey> = HashSet::with_capacity(records.len());
    records
        .iter()
        .filter(|r| seen.insert(r.key()))
        .cloned()
        .collect()
}

pub struct BatchUpsertEngine {
    store: Arc<dyn TenementStore>,
    batch_size: usize,
}

impl BatchUpsertEngine {
    pub fn new(store: Arc<dyn TenementStore>, batch_size: usize) -> Self {
        Self {
            store,
            batch_size: batch_size.clamp(1, MAX_UPSERT_BATCH_SIZE),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Upsert `records` in order; a key seen twice keeps its first record
    pub async fn import(&self, records: &[TenementRecord]) -> ImportOutcome {
        // Whole-import dedupe: a key split across batches must not be overwritten
        let unique = dedupe_first(records);
        if unique.len() < records.len() {
            info!(
                duplicates = records.len() - unique.len(),
                "Dropped duplicate tenement keys before import"
            );
        }

        let total_batches = unique.len().div_ceil(self.batch_size);
        let mut outcome = ImportOutcome::default();

        for (batch_idx, batch) in unique.chunks(self.batch_size).enumerate() {
            let batch_number = batch_idx + 1;

            info!(
                "Upserting batch {} / {} ({} records)",
                batch_number,
                total_batches,
                batch.len()
            );

            match self.store.upsert_batch(batch).await {
                Ok(written) => outcome.imported += written,
                Err(e) => {
                    error!(batch = batch_number, total_batches, error = %e, "Batch upsert failed");
                    outcome
                        .errors
                        .push(format!("Batch {}/{} failed: {}", batch_number, total_batches, e));
                },
            }
        }

        outcome
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::db::InMemoryTenementStore;
    use crate::error::{IngestError, Result};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tenement_common::Jurisdiction;

    fn records(count: usize) -> Vec<TenementRecord> {
        let now = Utc::now();
        (0..count)
            .map(|i| TenementRecord::new(Jurisdiction::Wa, format!("M {}", i), "Mining Lease", "Active", now))
            .collect()
    }

    /// Fails the nth call (1-based), delegating the rest
    struct FlakyStore {
        inner: InMemoryTenementStore,
        fail_on: usize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TenementStore for FlakyStore {
        async fn upsert_batch(&self, records: &[TenementRecord]) -> Result<usize> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call == self.fail_on {
                return Err(IngestError::Persistence("constraint violation".into()));
            }
            self.inner.upsert_batch(records).await
        }

        async fn count(&self, jurisdiction: Option<Jurisdiction>) -> Result<i64> {
            self.inner.count(jurisdiction).await
        }
    }

    #[tokio::test]
    async fn test_batches_cover_every_record() {
        let store = Arc::new(InMemoryTenementStore::new());
        let engine = BatchUpsertEngine::new(store.clone(), 500);

        let outcome = engine.import(&records(1234)).await;
        assert_eq!(outcome.imported, 1234);
        assert!(outcome.errors.is_empty());
        assert_eq!(store.len().await, 1234);
    }

    #[tokio::test]
    async fn test_failed_batch_is_isolated() {
        let store = Arc::new(FlakyStore {
            inner: InMemoryTenementStore::new(),
            fail_on: 2,
            calls: AtomicUsize::new(0),
        });
        let engine = BatchUpsertEngine::new(store.clone(), 500);

        let outcome = engine.import(&records(1500)).await;

        assert_eq!(outcome.imported, 1000);
        assert_eq!(outcome.errors.len(), 1);
        assert!(outcome.errors[0].starts_with("Batch 2/3 failed:"));
        assert_eq!(store.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_duplicates_within_batch_keep_first() {
        let now = Utc::now();
        let batch = vec![
            TenementRecord::new(Jurisdiction::Wa, "E 1", "Exploration Licence", "Active", now),
            TenementRecord::new(Jurisdiction::Wa, "E 1", "Exploration Licence", "Expired", now),
            TenementRecord::new(Jurisdiction::Qld, "E 1", "E", "Pending", now),
        ];
        let store = Arc::new(InMemoryTenementStore::new());
        let outcome = BatchUpsertEngine::new(store.clone(), 500).import(&batch).await;

        assert_eq!(outcome.imported, 2);
        assert_eq!(store.get(Jurisdiction::Wa, "E 1").await.unwrap().status, "Active");
    }

    #[tokio::test]
    async fn test_duplicates_across_batches_keep_first() {
        let now = Utc::now();
        let input = vec![
            TenementRecord::new(Jurisdiction::Wa, "E 1", "Exploration Licence", "Active", now),
            TenementRecord::new(Jurisdiction::Wa, "E 2", "Exploration Licence", "Active", now),
            TenementRecord::new(Jurisdiction::Wa, "E 1", "Exploration Licence", "Expired", now),
        ];
        let store = Arc::new(InMemoryTenementStore::new());
        let outcome = BatchUpsertEngine::new(store.clone(), 2).import(&input).await;

        assert_eq!(outcome.imported, 2);
        assert!(outcome.errors.is_empty());
        assert_eq!(store.len().await, 2);
        assert_eq!(store.get(Jurisdiction::Wa, "E 1").await.unwrap().status, "Active");
    }

    #[tokio::test]
    async fn test_reimport_is_idempotent() {
        let store = Arc::new(InMemoryTenementStore::new());
        let engine = BatchUpsertEngine::new(store.clone(), 100);
        let input = records(250);

        engine.import(&input).await;
        let first = store.snapshot().await;
        engine.import(&input).await;

        assert_eq!(store.snapshot().await, first);
    }

    #[test]
    fn test_batch_size_clamped_to_statement_limit() {
        let store = Arc::new(InMemoryTenementStore::new());
        assert_eq!(BatchUpsertEngine::new(store.clone(), 0).batch_size(), 1);
        assert_eq!(
            BatchUpsertEngine::new(store, 10_000).batch_size(),
            MAX_UPSERT_BATCH_SIZE
        );
        assert_eq!(MAX_UPSERT_BATCH_SIZE, 4681);
    }

    #[tokio::test]
    async fn test_empty_input_writes_nothing() {
        let store = Arc::new(InMemoryTenementStore::new());
        let outcome = BatchUpsertEngine::new(store, 500).import(&[]).await;
        assert_eq!(outcome, ImportOutcome::default());
    }
}

//! Delimited text provider (NSW)
//!
//! The NSW register is a plain CSV download. The export repeats a title once
//! per holder, so rows are deduplicated by number with the first row kept.
//! A download with no usable rows is an error; there is no fallback set.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use std::collections::HashSet;
use std::time::Duration;
use tenement_common::Jurisdiction;
use tracing::info;

use super::attributes::FieldMap;
use super::{http, tabular, TenementProvider};
use crate::config::IngestSettings;
use crate::error::{IngestError, Result};
use crate::ingest::health::probe_endpoint;
use crate::ingest::models::{EndpointDescriptor, ProviderStatus, TenementRecord};
use crate::ingest::retry::{retry_with_policy, RetryPolicy};

/// Keep the first record for each number, preserving order
pub fn dedupe_by_number(records: Vec<TenementRecord>) -> Vec<TenementRecord> {
    let mut seen = HashSet::with_capacity(records.len());
    records
        .into_iter()
        .filter(|r| seen.insert(r.number.clone()))
        .collect()
}

pub struct DelimitedProvider {
    jurisdiction: Jurisdiction,
    client: Client,
    endpoint: EndpointDescriptor,
    fields: FieldMap,
    retry: RetryPolicy,
    fetch_timeout: Duration,
    probe_timeout: Duration,
}

impl DelimitedProvider {
    pub fn new(
        jurisdiction: Jurisdiction,
        endpoint: EndpointDescriptor,
        settings: &IngestSettings,
        client: Client,
    ) -> Self {
        Self {
            jurisdiction,
            client,
            endpoint,
            fields: FieldMap::for_jurisdiction(jurisdiction),
            retry: settings.retry_policy(),
            fetch_timeout: settings.fetch_timeout(),
            probe_timeout: settings.probe_timeout(),
        }
    }

    async fn download(&self) -> Result<String> {
        http::get_text(self.client.get(&self.endpoint.url).timeout(self.fetch_timeout)).await
    }
}

#[async_trait]
impl TenementProvider for DelimitedProvider {
    fn jurisdiction(&self) -> Jurisdiction {
        self.jurisdiction
    }

    async fn check_status(&self) -> ProviderStatus {
        probe_endpoint(self.client.head(&self.endpoint.url), self.probe_timeout).await
    }

    async fn fetch_tenements(&self) -> Result<Vec<TenementRecord>> {
        let synced_at = Utc::now();
        let label = format!("{} download", self.jurisdiction);
        let text = retry_with_policy(&self.retry, &label, |_| self.download()).await?;

        let jurisdiction = self.jurisdiction;
        let fields = self.fields.clone();
        let parsed = tokio::task::spawn_blocking(move || {
            tabular::records_from_text(&text, jurisdiction, &fields, synced_at)
        })
        .await?;

        if parsed.is_empty() {
            return Err(IngestError::UpstreamSchema(format!(
                "No tenement records found in {} register",
                self.jurisdiction
            )));
        }

        let parsed_count = parsed.len();
        let records = dedupe_by_number(parsed);

        info!(
            jurisdiction = %self.jurisdiction,
            parsed = parsed_count,
            unique = records.len(),
            "Parsed delimited register"
        );

        Ok(records)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_dedupe_keeps_first_occurrence() {
        let now = Utc::now();
        let records = vec![
            TenementRecord::new(Jurisdiction::Nsw, "EL9123", "Exploration Licence", "Active", now),
            TenementRecord::new(Jurisdiction::Nsw, "ML1", "Mining Lease", "Active", now),
            TenementRecord::new(Jurisdiction::Nsw, "EL9123", "Exploration Licence", "Expired", now),
        ];

        let unique = dedupe_by_number(records);
        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0].status, "Active");
        assert_eq!(unique[1].number, "ML1");
    }
}

//! ZIP archive provider (NT)
//!
//! The regulator publishes a ZIP holding CSV/TAB extracts alongside shapefile
//! parts. Only entries that look like tenement tables are parsed; everything
//! else is skipped.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use std::io::{Cursor, Read};
use std::time::Duration;
use tenement_common::Jurisdiction;
use tracing::{debug, info};
use zip::ZipArchive;

use super::attributes::FieldMap;
use super::{http, tabular, TenementProvider};
use crate::config::IngestSettings;
use crate::error::{IngestError, Result};
use crate::ingest::health::probe_endpoint;
use crate::ingest::models::{EndpointDescriptor, ProviderStatus, TenementRecord};
use crate::ingest::retry::{retry_with_policy, RetryPolicy};

const NAME_MARKERS: [&str; 3] = ["tenement", "title", "grant"];
const EXTENSIONS: [&str; 3] = [".csv", ".tab", ".txt"];

/// Whether an archive entry should be parsed as a tenement table
pub fn is_tenement_entry(name: &str) -> bool {
    let basename = name.split('/').next_back().unwrap_or(name).to_lowercase();
    NAME_MARKERS.iter().any(|m| basename.contains(m))
        && EXTENSIONS.iter().any(|ext| basename.ends_with(ext))
}

/// Parse every matching entry of an in-memory archive
///
/// Blocking; run it on the blocking pool.
pub fn records_from_archive(
    bytes: &[u8],
    jurisdiction: Jurisdiction,
    fields: &FieldMap,
    synced_at: DateTime<Utc>,
) -> Result<Vec<TenementRecord>> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let mut records = Vec::new();

    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        if file.is_dir() {
            continue;
        }

        let name = file.name().to_string();
        if !is_tenement_entry(&name) {
            debug!(entry = %name, "Skipping archive entry");
            continue;
        }

        let mut content = Vec::new();
        file.read_to_end(&mut content)?;
        let text = String::from_utf8_lossy(&content);

        let parsed = tabular::records_from_text(&text, jurisdiction, fields, synced_at);
        info!(entry = %name, records = parsed.len(), "Parsed archive entry");
        records.extend(parsed);
    }

    if records.is_empty() {
        return Err(IngestError::UpstreamSchema(
            "No tenement records found in archive".to_string(),
        ));
    }

    Ok(records)
}

pub struct ZipArchiveProvider {
    jurisdiction: Jurisdiction,
    client: Client,
    endpoint: EndpointDescriptor,
    fields: FieldMap,
    retry: RetryPolicy,
    fetch_timeout: Duration,
    probe_timeout: Duration,
}

impl ZipArchiveProvider {
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

    async fn download(&self) -> Result<Vec<u8>> {
        http::get_bytes(self.client.get(&self.endpoint.url).timeout(self.fetch_timeout)).await
    }
}

#[async_trait]
impl TenementProvider for ZipArchiveProvider {
    fn jurisdiction(&self) -> Jurisdiction {
        self.jurisdiction
    }

    async fn check_status(&self) -> ProviderStatus {
        probe_endpoint(self.client.head(&self.endpoint.url), self.probe_timeout).await
    }

    async fn fetch_tenements(&self) -> Result<Vec<TenementRecord>> {
        let synced_at = Utc::now();
        let label = format!("{} archive download", self.jurisdiction);
        let bytes = retry_with_policy(&self.retry, &label, |_| self.download()).await?;

        info!(
            jurisdiction = %self.jurisdiction,
            bytes = bytes.len(),
            "Downloaded archive"
        );

        let jurisdiction = self.jurisdiction;
        let fields = self.fields.clone();
        tokio::task::spawn_blocking(move || {
            records_from_archive(&bytes, jurisdiction, &fields, synced_at)
        })
        .await?
    }
}

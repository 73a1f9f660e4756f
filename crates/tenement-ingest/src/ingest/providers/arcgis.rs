//! Paged ArcGIS REST provider (WA, QLD, TAS)
//!
//! A count query sizes the layer, then pages are requested with
//! `resultOffset`/`resultRecordCount` ordered by a stable ascending key. A
//! short page ends the fetch unless the server flags `exceededTransferLimit`,
//! in which case paging resumes from the rows actually received. Each
//! page has its own retry budget; an exhausted page aborts the whole fetch
//! since a partial layer cannot be told apart from a shrunken one.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration;
use tenement_common::Jurisdiction;
use tracing::{debug, info, warn};

use super::attributes::{map_record, Attributes, FieldMap};
use super::{http, TenementProvider};
use crate::config::IngestSettings;
use crate::error::{IngestError, Result};
use crate::ingest::health::probe_endpoint;
use crate::ingest::models::{EndpointDescriptor, ProviderStatus, TenementRecord};
use crate::ingest::retry::{retry_with_policy, RetryPolicy};

pub const DEFAULT_ORDER_BY: &str = "OBJECTID";

/// Page of a `/query` response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArcGisQueryResponse {
    #[serde(default)]
    pub features: Vec<ArcGisFeature>,
    #[serde(default)]
    pub exceeded_transfer_limit: Option<bool>,
    #[serde(default)]
    pub error: Option<ArcGisError>,
}

#[derive(Debug, Deserialize)]
pub struct ArcGisFeature {
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

/// Response of a `returnCountOnly=true` query
#[derive(Debug, Deserialize)]
pub struct ArcGisCountResponse {
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(default)]
    pub error: Option<ArcGisError>,
}

/// Error object ArcGIS returns with HTTP 200
#[derive(Debug, Deserialize)]
pub struct ArcGisError {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ArcGisError {
    fn into_ingest_error(self) -> IngestError {
        IngestError::TransientNetwork(format!(
            "ArcGIS error {}: {}",
            self.code.map(|c| c.to_string()).unwrap_or_else(|| "?".to_string()),
            self.message.unwrap_or_default()
        ))
    }
}

pub struct ArcGisProvider {
    jurisdiction: Jurisdiction,
    client: Client,
    endpoint: EndpointDescriptor,
    fields: FieldMap,
    page_size: usize,
    page_delay: Duration,
    retry: RetryPolicy,
    fetch_timeout: Duration,
    probe_timeout: Duration,
}

impl ArcGisProvider {
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
            page_size: settings.page_size,
            page_delay: settings.page_delay(),
            retry: settings.retry_policy(),
            fetch_timeout: settings.fetch_timeout(),
            probe_timeout: settings.probe_timeout(),
        }
    }

    fn order_by(&self) -> &str {
        self.endpoint.order_by.as_deref().unwrap_or(DEFAULT_ORDER_BY)
    }

    async fn fetch_count(&self) -> Result<u64> {
        let request = self
            .client
            .get(&self.endpoint.url)
            .timeout(self.fetch_timeout)
            .query(&[("where", "1=1"), ("returnCountOnly", "true"), ("f", "json")]);

        let response: ArcGisCountResponse = http::get_json(request).await?;
        if let Some(error) = response.error {
            return Err(error.into_ingest_error());
        }
        response
            .count
            .ok_or_else(|| IngestError::UpstreamSchema("Count response has no count".to_string()))
    }

    async fn fetch_page(&self, offset: usize) -> Result<ArcGisQueryResponse> {
        let order_by = format!("{} ASC", self.order_by());
        let offset = offset.to_string();
        let page_size = self.page_size.to_string();

        let request = self.client.get(&self.endpoint.url).timeout(self.fetch_timeout).query(&[
            ("where", "1=1"),
            ("outFields", "*"),
            ("returnGeometry", "false"),
            ("orderByFields", order_by.as_str()),
            ("resultOffset", offset.as_str()),
            ("resultRecordCount", page_size.as_str()),
            ("f", "json"),
        ]);

        let mut response: ArcGisQueryResponse = http::get_json(request).await?;
        if let Some(error) = response.error.take() {
            return Err(error.into_ingest_error());
        }
        Ok(response)
    }
}

#[async_trait]
impl TenementProvider for ArcGisProvider {
    fn jurisdiction(&self) -> Jurisdiction {
        self.jurisdiction
    }

    async fn check_status(&self) -> ProviderStatus {
        let request = self
            .client
            .get(&self.endpoint.url)
            .query(&[("where", "1=1"), ("returnCountOnly", "true"), ("f", "json")]);
        probe_endpoint(request, self.probe_timeout).await
    }

    async fn fetch_tenements(&self) -> Result<Vec<TenementRecord>> {
        let synced_at = Utc::now();
        let label = format!("{} count query", self.jurisdiction);
        let total = retry_with_policy(&self.retry, &label, |_| self.fetch_count()).await? as usize;

        info!(
            jurisdiction = %self.jurisdiction,
            total,
            page_size = self.page_size,
            "Starting paged fetch"
        );

        let mut records = Vec::with_capacity(total);
        let mut offset = 0usize;
        let mut page_number = 0usize;

        while offset < total {
            if page_number > 0 && !self.page_delay.is_zero() {
                tokio::time::sleep(self.page_delay).await;
            }
            page_number += 1;

            let label = format!("{} page at offset {}", self.jurisdiction, offset);
            let page = retry_with_policy(&self.retry, &label, |_| self.fetch_page(offset)).await?;
            let received = page.features.len();
            let capped = page.exceeded_transfer_limit == Some(true);

            records.extend(page.features.into_iter().filter_map(|feature| {
                map_record(
                    &Attributes::from_map(feature.attributes),
                    self.jurisdiction,
                    &self.fields,
                    None,
                    synced_at,
                )
            }));

            debug!(
                jurisdiction = %self.jurisdiction,
                page = page_number,
                offset,
                received,
                capped,
                "Fetched page"
            );

            offset += received;
            if received == 0 {
                break;
            }
            // A page cut short by the server's maxRecordCount continues from
            // what was actually received
            if received < self.page_size && !capped {
                break;
            }
        }

        if offset < total {
            warn!(
                jurisdiction = %self.jurisdiction,
                received = offset,
                total,
                "Layer returned fewer records than its count query reported"
            );
        }

        info!(
            jurisdiction = %self.jurisdiction,
            pages = page_number,
            records = records.len(),
            "Paged fetch complete"
        );

        Ok(records)
    }
}

//! WFS GeoJSON provider (VIC)
//!
//! One `GetFeature` request. Any failure, including an empty collection,
//! degrades to the built-in sample set so downstream consumers always have
//! something to render.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration;
use tenement_common::Jurisdiction;
use tracing::{info, warn};

use super::attributes::{map_record, Attributes, FieldMap};
use super::{http, sample, TenementProvider};
use crate::config::IngestSettings;
use crate::error::{IngestError, Result};
use crate::ingest::health::probe_endpoint;
use crate::ingest::models::{EndpointDescriptor, ProviderStatus, TenementRecord};

pub const DEFAULT_LAYER: &str = "open-data-platform:mintenement";

#[derive(Debug, Deserialize)]
pub struct WfsFeatureCollection {
    #[serde(default)]
    pub features: Vec<WfsFeature>,
}

#[derive(Debug, Deserialize)]
pub struct WfsFeature {
    #[serde(default)]
    pub properties: Map<String, Value>,
    #[serde(default)]
    pub geometry: Option<Value>,
}

pub struct WfsProvider {
    jurisdiction: Jurisdiction,
    client: Client,
    endpoint: EndpointDescriptor,
    fields: FieldMap,
    feature_cap: usize,
    fetch_timeout: Duration,
    probe_timeout: Duration,
}

impl WfsProvider {
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
            feature_cap: settings.wfs_feature_cap,
            fetch_timeout: settings.fetch_timeout(),
            probe_timeout: settings.probe_timeout(),
        }
    }

    fn layer(&self) -> &str {
        self.endpoint.layer.as_deref().unwrap_or(DEFAULT_LAYER)
    }

    async fn fetch_live(&self) -> Result<Vec<TenementRecord>> {
        let synced_at = Utc::now();
        let count = self.feature_cap.to_string();
        let request = self.client.get(&self.endpoint.url).timeout(self.fetch_timeout).query(&[
            ("service", "WFS"),
            ("version", "2.0.0"),
            ("request", "GetFeature"),
            ("typeNames", self.layer()),
            ("outputFormat", "application/json"),
            ("count", count.as_str()),
        ]);

        let collection: WfsFeatureCollection = http::get_json(request).await?;
        let received = collection.features.len();

        let records: Vec<TenementRecord> = collection
            .features
            .into_iter()
            .filter_map(|feature| {
                map_record(
                    &Attributes::from_map(feature.properties),
                    self.jurisdiction,
                    &self.fields,
                    feature.geometry,
                    synced_at,
                )
            })
            .collect();

        if records.is_empty() {
            return Err(IngestError::UpstreamSchema(format!(
                "No usable features in {} ({} received)",
                self.layer(),
                received
            )));
        }

        info!(
            jurisdiction = %self.jurisdiction,
            features = received,
            records = records.len(),
            "Fetched WFS features"
        );

        Ok(records)
    }
}

#[async_trait]
impl TenementProvider for WfsProvider {
    fn jurisdiction(&self) -> Jurisdiction {
        self.jurisdiction
    }

    async fn check_status(&self) -> ProviderStatus {
        let request = self.client.get(&self.endpoint.url).query(&[
            ("service", "WFS"),
            ("version", "2.0.0"),
            ("request", "GetCapabilities"),
        ]);
        probe_endpoint(request, self.probe_timeout).await
    }

    async fn fetch_tenements(&self) -> Result<Vec<TenementRecord>> {
        match self.fetch_live().await {
            Ok(records) => Ok(records),
            Err(e) => {
                let records = sample::sample_records(self.jurisdiction, Utc::now());
                warn!(
                    jurisdiction = %self.jurisdiction,
                    error = %e,
                    sample_records = records.len(),
                    "WFS fetch failed, using sample data"
                );
                Ok(records)
            },
        }
    }
}

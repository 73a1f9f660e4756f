//! Shared fixtures for tenement-ingest integration tests
//!
//! Upstream feeds are faked with wiremock; stores are the in-memory ones.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tenement_common::Jurisdiction;
use tenement_ingest::config::IngestSettings;
use tenement_ingest::db::{InMemoryDataSourceRepository, InMemoryTenementStore, TenementStore};
use tenement_ingest::ingest::providers::http::build_client;
use tenement_ingest::ingest::EndpointDescriptor;
use tenement_ingest::{IngestionOrchestrator, ProviderRegistry};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const WA_PATH: &str = "/wa/query";
pub const QLD_PATH: &str = "/qld/query";
pub const TAS_PATH: &str = "/tas/query";
pub const NSW_PATH: &str = "/nsw/current_titles.csv";
pub const VIC_PATH: &str = "/vic/wfs";
pub const NT_PATH: &str = "/nt/MineralTitles.zip";

/// WA status cycle: three mapped values and one the normalizer does not know
pub const WA_STATUSES: [&str; 4] = ["LIVE", "PENDING", "EXPIRED", "DEAD"];

/// Settings pointing every jurisdiction at the mock server, with no delays
pub fn settings_for(server: &MockServer, page_size: usize) -> IngestSettings {
    let uri = server.uri();
    let mut endpoints = BTreeMap::new();
    endpoints.insert(
        Jurisdiction::Wa,
        EndpointDescriptor::new(format!("{}{}", uri, WA_PATH)).with_order_by("OBJECTID"),
    );
    endpoints.insert(
        Jurisdiction::Qld,
        EndpointDescriptor::new(format!("{}{}", uri, QLD_PATH)).with_order_by("OBJECTID"),
    );
    endpoints.insert(
        Jurisdiction::Tas,
        EndpointDescriptor::new(format!("{}{}", uri, TAS_PATH)).with_order_by("OBJECTID"),
    );
    endpoints.insert(Jurisdiction::Nsw, EndpointDescriptor::new(format!("{}{}", uri, NSW_PATH)));
    endpoints.insert(
        Jurisdiction::Vic,
        EndpointDescriptor::new(format!("{}{}", uri, VIC_PATH))
            .with_layer("open-data-platform:mintenement"),
    );
    endpoints.insert(Jurisdiction::Nt, EndpointDescriptor::new(format!("{}{}", uri, NT_PATH)));

    let mut settings = IngestSettings::default().without_delays();
    settings.page_size = page_size;
    settings.retry_attempts = 3;
    settings.probe_timeout_secs = 2;
    settings.fetch_timeout_secs = 5;
    settings.endpoints = endpoints;
    settings
}

/// One WA-shaped ArcGIS feature
pub fn wa_feature(object_id: usize) -> Value {
    json!({
        "attributes": {
            "OBJECTID": object_id,
            "TENID": format!("E 45/{}", object_id),
            "TYPE": "E",
            "TENSTATUS": WA_STATUSES[object_id % WA_STATUSES.len()],
            "HOLDER1": "Acme Exploration Pty Ltd",
            "STARTDATE": 1579046400000i64,
            "ENDDATE": 1736899200000i64,
            "LEGAL_AREA": 120.5
        }
    })
}

pub fn page_body(offset: usize, count: usize) -> Value {
    let features: Vec<Value> = (offset..offset + count).map(|i| wa_feature(i + 1)).collect();
    json!({ "features": features, "exceededTransferLimit": false })
}

/// Mount a count query and one page mock per expected page
///
/// Each page mock expects exactly one hit; the server verifies on drop.
pub async fn mount_arcgis_layer(server: &MockServer, layer_path: &str, total: usize, page_size: usize) {
    mount_arcgis_layer_times(server, layer_path, total, page_size, 1).await;
}

/// Same as [`mount_arcgis_layer`] for a layer fetched `fetches` times
pub async fn mount_arcgis_layer_times(
    server: &MockServer,
    layer_path: &str,
    total: usize,
    page_size: usize,
    fetches: u64,
) {
    Mock::given(method("GET"))
        .and(path(layer_path))
        .and(query_param("returnCountOnly", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "count": total })))
        .mount(server)
        .await;

    let mut offset = 0;
    while offset < total {
        let count = page_size.min(total - offset);
        Mock::given(method("GET"))
            .and(path(layer_path))
            .and(query_param("resultOffset", offset.to_string()))
            .and(query_param("resultRecordCount", page_size.to_string()))
            .and(query_param("orderByFields", "OBJECTID ASC"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page_body(offset, count)))
            .expect(fetches)
            .mount(server)
            .await;
        offset += page_size;
    }
}

/// Number of page requests (not count queries) the server saw for a layer
pub async fn page_requests(server: &MockServer, layer_path: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == layer_path)
        .filter(|r| r.url.query_pairs().any(|(k, _)| k == "resultOffset"))
        .count()
}

pub struct Harness {
    pub orchestrator: IngestionOrchestrator,
    pub sources: Arc<InMemoryDataSourceRepository>,
    pub store: Arc<InMemoryTenementStore>,
}

/// Orchestrator over in-memory stores seeded from `settings`
pub fn harness(settings: IngestSettings) -> Harness {
    let store = Arc::new(InMemoryTenementStore::new());
    harness_with_store(settings, store.clone(), store)
}

/// Same as [`harness`] but writing through a custom store
pub fn harness_with_store(
    settings: IngestSettings,
    writer: Arc<dyn TenementStore>,
    store: Arc<InMemoryTenementStore>,
) -> Harness {
    let client = build_client().unwrap();
    let sources = Arc::new(InMemoryDataSourceRepository::from_settings(&settings));
    let registry = Arc::new(ProviderRegistry::from_settings(&settings, client.clone()));

    let orchestrator =
        IngestionOrchestrator::new(registry, sources.clone(), writer, settings, client);

    Harness {
        orchestrator,
        sources,
        store,
    }
}

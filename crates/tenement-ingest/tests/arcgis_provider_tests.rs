//! Paged ArcGIS REST provider against a fake feature service

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{mount_arcgis_layer, page_body, page_requests, settings_for, WA_PATH};
use serde_json::json;
use std::collections::HashSet;
use tenement_common::Jurisdiction;
use tenement_ingest::ingest::providers::http::build_client;
use tenement_ingest::ingest::providers::ArcGisProvider;
use tenement_ingest::{IngestError, TenementProvider};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn wa_provider(server: &MockServer, page_size: usize) -> ArcGisProvider {
    let settings = settings_for(server, page_size);
    let endpoint = settings.endpoint(Jurisdiction::Wa).unwrap().clone();
    ArcGisProvider::new(Jurisdiction::Wa, endpoint, &settings, build_client().unwrap())
}

#[tokio::test]
async fn test_pagination_fetches_every_record() {
    let server = MockServer::start().await;
    mount_arcgis_layer(&server, WA_PATH, 1234, 500).await;

    let records = wa_provider(&server, 500).fetch_tenements().await.unwrap();

    assert_eq!(records.len(), 1234);
    assert_eq!(page_requests(&server, WA_PATH).await, 3);

    let numbers: HashSet<_> = records.iter().map(|r| r.number.as_str()).collect();
    assert_eq!(numbers.len(), 1234);
}

#[tokio::test]
async fn test_exact_multiple_stops_at_total() {
    let server = MockServer::start().await;
    mount_arcgis_layer(&server, WA_PATH, 1000, 500).await;

    let records = wa_provider(&server, 500).fetch_tenements().await.unwrap();

    assert_eq!(records.len(), 1000);
    assert_eq!(page_requests(&server, WA_PATH).await, 2);
}

#[tokio::test]
async fn test_empty_layer_requests_no_pages() {
    let server = MockServer::start().await;
    mount_arcgis_layer(&server, WA_PATH, 0, 500).await;

    let records = wa_provider(&server, 500).fetch_tenements().await.unwrap();

    assert!(records.is_empty());
    assert_eq!(page_requests(&server, WA_PATH).await, 0);
}

#[tokio::test]
async fn test_server_capped_pages_continue_to_total() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(WA_PATH))
        .and(query_param("returnCountOnly", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "count": 2500 })))
        .mount(&server)
        .await;

    // Server maxRecordCount is 1000, below the requested 2000
    for (offset, count, capped) in [(0, 1000, true), (1000, 1000, true), (2000, 500, false)] {
        let mut body = page_body(offset, count);
        body["exceededTransferLimit"] = json!(capped);
        Mock::given(method("GET"))
            .and(path(WA_PATH))
            .and(query_param("resultOffset", offset.to_string()))
            .and(query_param("resultRecordCount", "2000"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(1)
            .mount(&server)
            .await;
    }

    let records = wa_provider(&server, 2000).fetch_tenements().await.unwrap();

    assert_eq!(records.len(), 2500);
    assert_eq!(page_requests(&server, WA_PATH).await, 3);

    let numbers: HashSet<_> = records.iter().map(|r| r.number.as_str()).collect();
    assert_eq!(numbers.len(), 2500);
}

#[tokio::test]
async fn test_short_page_without_transfer_limit_stops() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(WA_PATH))
        .and(query_param("returnCountOnly", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "count": 900 })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(WA_PATH))
        .and(query_param("resultOffset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_body(0, 200)))
        .expect(1)
        .mount(&server)
        .await;

    let records = wa_provider(&server, 500).fetch_tenements().await.unwrap();

    assert_eq!(records.len(), 200);
    assert_eq!(page_requests(&server, WA_PATH).await, 1);
}

#[tokio::test]
async fn test_empty_capped_page_does_not_loop() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(WA_PATH))
        .and(query_param("returnCountOnly", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "count": 50 })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(WA_PATH))
        .and(query_param("resultOffset", "0"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "features": [], "exceededTransferLimit": true })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let records = wa_provider(&server, 500).fetch_tenements().await.unwrap();
    assert!(records.is_empty());
}

#[tokio::test]
async fn test_transient_page_failure_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(WA_PATH))
        .and(query_param("returnCountOnly", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "count": 700 })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(WA_PATH))
        .and(query_param("resultOffset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_body(0, 500)))
        .mount(&server)
        .await;
    // Second page fails twice, then succeeds
    Mock::given(method("GET"))
        .and(path(WA_PATH))
        .and(query_param("resultOffset", "500"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(WA_PATH))
        .and(query_param("resultOffset", "500"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_body(500, 200)))
        .mount(&server)
        .await;

    let records = wa_provider(&server, 500).fetch_tenements().await.unwrap();

    assert_eq!(records.len(), 700);
    assert_eq!(page_requests(&server, WA_PATH).await, 4);
}

#[tokio::test]
async fn test_arcgis_error_body_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(WA_PATH))
        .and(query_param("returnCountOnly", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "count": 3 })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(WA_PATH))
        .and(query_param("resultOffset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": { "code": 500, "message": "Unable to complete operation." }
        })))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(WA_PATH))
        .and(query_param("resultOffset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_body(0, 3)))
        .mount(&server)
        .await;

    let records = wa_provider(&server, 500).fetch_tenements().await.unwrap();
    assert_eq!(records.len(), 3);
}

#[tokio::test]
async fn test_retry_exhaustion_aborts_fetch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(WA_PATH))
        .and(query_param("returnCountOnly", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "count": 1000 })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(WA_PATH))
        .and(query_param("resultOffset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_body(0, 500)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(WA_PATH))
        .and(query_param("resultOffset", "500"))
        .respond_with(ResponseTemplate::new(502))
        .expect(3)
        .mount(&server)
        .await;

    let result = wa_provider(&server, 500).fetch_tenements().await;

    let err = result.unwrap_err();
    assert!(matches!(err, IngestError::TransientNetwork(_)));
    assert!(err.to_string().contains("after 3 attempts"));
}

#[tokio::test]
async fn test_malformed_page_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(WA_PATH))
        .and(query_param("returnCountOnly", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "count": 10 })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(WA_PATH))
        .and(query_param("resultOffset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let result = wa_provider(&server, 500).fetch_tenements().await;
    assert!(matches!(result, Err(IngestError::UpstreamSchema(_))));
}

#[tokio::test]
async fn test_check_status_reports_inactive_on_404() {
    let server = MockServer::start().await;

    let status = wa_provider(&server, 500).check_status().await;

    assert_eq!(status.status.as_str(), "inactive");
    assert!(status.error.unwrap().contains("404"));
}

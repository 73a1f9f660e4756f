//! Source health checks
//!
//! [`probe_endpoint`] turns one HTTP probe into a [`ProviderStatus`] and never
//! fails. [`HealthChecker`] sweeps every enabled source and records the
//! outcome against its row.

use chrono::Utc;
use reqwest::RequestBuilder;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::db::DataSourceRepository;
use crate::ingest::models::{ProviderStatus, SourceHealth, StatusResult};
use crate::ingest::providers::ProviderRegistry;

/// 2xx is active, any other status inactive, a transport failure an error
pub async fn probe_endpoint(request: RequestBuilder, timeout: Duration) -> ProviderStatus {
    match request.timeout(timeout).send().await {
        Ok(response) if response.status().is_success() => ProviderStatus::active(),
        Ok(response) => ProviderStatus::inactive(format!("HTTP {}", response.status())),
        Err(e) if e.is_timeout() => {
            ProviderStatus::error(format!("Probe timed out after {}s", timeout.as_secs()))
        },
        Err(e) => ProviderStatus::error(e.to_string()),
    }
}

pub struct HealthChecker {
    registry: Arc<ProviderRegistry>,
    sources: Arc<dyn DataSourceRepository>,
}

impl HealthChecker {
    pub fn new(registry: Arc<ProviderRegistry>, sources: Arc<dyn DataSourceRepository>) -> Self {
        Self { registry, sources }
    }

    /// Probe every enabled source, one at a time
    ///
    /// A source without an adapter is reported as `error`; a failure to
    /// persist one result is logged and the sweep carries on.
    pub async fn sweep(&self) -> Vec<StatusResult> {
        let sources = match self.sources.list_enabled().await {
            Ok(sources) => sources,
            Err(e) => {
                error!(error = %e, "Failed to list data sources for status check");
                return Vec::new();
            },
        };

        let mut results = Vec::with_capacity(sources.len());

        for source in sources {
            let status = match self.registry.get(source.jurisdiction) {
                Ok(provider) => provider.check_status().await,
                Err(e) => ProviderStatus::error(e.to_string()),
            };

            match status.status {
                SourceHealth::Active => {
                    info!(jurisdiction = %source.jurisdiction, source = %source.name, "Source active")
                },
                _ => warn!(
                    jurisdiction = %source.jurisdiction,
                    source = %source.name,
                    status = %status.status,
                    error = status.error.as_deref().unwrap_or(""),
                    "Source unhealthy"
                ),
            }

            if let Err(e) = self
                .sources
                .record_health(source.id, status.status, status.error.clone())
                .await
            {
                error!(source_id = %source.id, error = %e, "Failed to record source health");
            }

            results.push(StatusResult {
                source_id: source.id,
                name: source.name,
                jurisdiction: source.jurisdiction,
                status: status.status,
                error: status.error,
                checked_at: Utc::now(),
            });
        }

        results
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_endpoint_status_classifies_responses() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let status = probe_endpoint(client.get(server.uri()), Duration::from_secs(5)).await;
        assert_eq!(status, ProviderStatus::active());

        let missing = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&missing)
            .await;
        let status = probe_endpoint(client.get(missing.uri()), Duration::from_secs(5)).await;
        assert_eq!(status.status, SourceHealth::Inactive);
        assert!(status.error.unwrap().contains("404"));
    }

    #[tokio::test]
    async fn test_endpoint_timeout_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let status = probe_endpoint(client.get(server.uri()), Duration::from_millis(100)).await;
        assert_eq!(status.status, SourceHealth::Error);
    }

    #[tokio::test]
    async fn test_unreachable_host_is_error() {
        let client = reqwest::Client::new();
        let status = probe_endpoint(client.get("http://127.0.0.1:1/"), Duration::from_secs(2)).await;
        assert_eq!(status.status, SourceHealth::Error);
        assert!(status.error.is_some());
    }
}

//! HTTP plumbing shared by the providers

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::config::USER_AGENT;
use crate::error::{IngestError, Result};

/// Client shared by every provider; timeouts are set per request
pub fn build_client() -> Result<Client> {
    let client = Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(Duration::from_secs(10))
        .build()?;
    Ok(client)
}

/// Send and classify the response status
///
/// 5xx, 408 and 429 are transient; any other non-2xx is a schema error since
/// retrying will not change the answer.
pub async fn send(request: RequestBuilder) -> Result<Response> {
    let response = request.send().await?;
    let status = response.status();

    if status.is_success() {
        return Ok(response);
    }

    let url = response.url().to_string();
    if is_transient_status(status) {
        Err(IngestError::TransientNetwork(format!("HTTP {} from {}", status, url)))
    } else {
        Err(IngestError::UpstreamSchema(format!("HTTP {} from {}", status, url)))
    }
}

fn is_transient_status(status: StatusCode) -> bool {
    status.is_server_error()
        || status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
}

pub async fn get_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T> {
    let body = send(request).await?.text().await?;
    Ok(serde_json::from_str(&body)?)
}

pub async fn get_text(request: RequestBuilder) -> Result<String> {
    Ok(send(request).await?.text().await?)
}

pub async fn get_bytes(request: RequestBuilder) -> Result<Vec<u8>> {
    Ok(send(request).await?.bytes().await?.to_vec())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_status_classification() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/busy"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/gone"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = build_client().unwrap();

        let busy = send(client.get(format!("{}/busy", server.uri()))).await;
        assert!(matches!(busy, Err(IngestError::TransientNetwork(_))));

        let gone = send(client.get(format!("{}/gone", server.uri()))).await;
        assert!(matches!(gone, Err(IngestError::UpstreamSchema(_))));
    }
}

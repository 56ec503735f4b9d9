use crate::core::error::{CoreError, Result};
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};
use tracing::debug;

/// A decoded JSON response plus the request metadata the ledger records.
#[derive(Debug)]
pub struct JsonResponse<T> {
    pub data: T,
    pub status_code: u16,
    pub etag: String,
    pub request_ms: u64,
}

/// Performs a GET with a per-request timeout and maps every failure mode
/// into an `ApiRequest` reason: timeout, connection failure, rate limiting
/// (429), rejected key (401), other HTTP status, malformed body.
pub async fn get_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
    timeout: Duration,
) -> Result<JsonResponse<T>> {
    let start = Instant::now();
    debug!("Requesting {}", url);

    let response = client
        .get(url)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| map_transport_error(e, timeout))?;

    let status = response.status();
    if !status.is_success() {
        let reason = match status.as_u16() {
            429 => "API request limit exceeded (HTTP 429)".to_string(),
            401 => "invalid API key (HTTP 401)".to_string(),
            code => format!("HTTP error: {code}"),
        };
        return Err(CoreError::ApiRequest { reason });
    }

    let etag = response
        .headers()
        .get(reqwest::header::ETAG)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let status_code = status.as_u16();

    let text = response
        .text()
        .await
        .map_err(|e| map_transport_error(e, timeout))?;
    let request_ms = start.elapsed().as_millis() as u64;

    let data = serde_json::from_str(&text).map_err(|e| CoreError::ApiRequest {
        reason: format!("malformed response body: {e}"),
    })?;

    Ok(JsonResponse {
        data,
        status_code,
        etag,
        request_ms,
    })
}

fn map_transport_error(e: reqwest::Error, timeout: Duration) -> CoreError {
    let reason = if e.is_timeout() {
        format!("timeout after {} seconds", timeout.as_secs())
    } else if e.is_connect() {
        format!("connection error: {e}")
    } else {
        format!("request error: {e}")
    };
    CoreError::ApiRequest { reason }
}

/// Shared HTTP client with the service's user agent.
pub fn build_http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent("valutahub/0.3.0")
        .build()
        .map_err(|e| CoreError::ApiRequest {
            reason: format!("failed to build HTTP client: {e}"),
        })
}

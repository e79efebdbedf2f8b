//! Shared HTTP plumbing for provider clients

use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::error::{Error, Result};

/// Build the HTTP client used by a provider
///
/// The client-level timeout also bounds calls made outside `CallPolicy`,
/// such as health checks.
pub(crate) fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .pool_max_idle_per_host(5)
        .build()
        .map_err(|e| Error::config(format!("Failed to create HTTP client: {}", e)))
}

/// Map a transport failure to a transient or permanent provider error
///
/// A body cut off mid-transfer counts as transport, not as bad input.
pub(crate) fn classify_send_error(provider: &str, err: reqwest::Error) -> Error {
    if err.is_timeout() || err.is_connect() || err.is_request() || err.is_body() {
        Error::retryable(provider, format!("request failed: {}", err))
    } else {
        Error::provider(provider, format!("request failed: {}", err))
    }
}

/// Pass successful responses through, classify the rest
pub(crate) async fn check_status(provider: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(classify_status(provider, status, &body))
}

/// Read the whole body, then decode it as JSON
///
/// Transfer failures go through `classify_send_error`; only a body that
/// arrived and does not parse is a permanent error.
pub(crate) async fn read_json<T: DeserializeOwned>(
    provider: &str,
    response: Response,
    what: &str,
) -> Result<T> {
    let body = response
        .bytes()
        .await
        .map_err(|e| classify_send_error(provider, e))?;
    serde_json::from_slice(&body)
        .map_err(|e| Error::provider(provider, format!("Failed to parse {}: {}", what, e)))
}

/// Transient: 408, rate limiting, 5xx. Permanent: auth, invalid input,
/// exhausted quota.
pub(crate) fn classify_status(provider: &str, status: StatusCode, body: &str) -> Error {
    let message = format!("HTTP {} - {}", status, truncate(body, 300));

    match status {
        StatusCode::TOO_MANY_REQUESTS if body.contains("insufficient_quota") => {
            Error::provider(provider, message)
        }
        StatusCode::TOO_MANY_REQUESTS | StatusCode::REQUEST_TIMEOUT => {
            Error::retryable(provider, message)
        }
        s if s.is_server_error() => Error::retryable(provider, message),
        _ => Error::provider(provider, message),
    }
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

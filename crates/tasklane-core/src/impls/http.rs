//! Shared plumbing for the HTTP clients.
//!
//! Every logical call gets one correlation id and one bearer token; the
//! request is rebuilt for each transport attempt so the retry wrapper can
//! resend it.

use std::time::Duration;

use reqwest::{Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use ulid::Ulid;

use super::retry::RetryPolicy;
use crate::domain::ClientError;
use crate::redact::mask_pii;

pub const CORRELATION_HEADER: &str = "X-Correlation-ID";

pub(crate) fn build_client(timeout: Duration) -> Result<reqwest::Client, ClientError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ClientError::Configuration(e.to_string()))
}

/// Parses an absolute http(s) URL with a host.
pub(crate) fn parse_http_url(url: &str) -> Result<Url, String> {
    let parsed = Url::parse(url.trim()).map_err(|e| format!("{url:?} is not a valid URL: {e}"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(format!("{url:?} is not an http(s) URL"));
    }
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(format!("{url:?} has no host"));
    }
    Ok(parsed)
}

/// Normalizes a configured base URL (no trailing slash).
pub(crate) fn base_url(url: &str) -> Result<String, ClientError> {
    parse_http_url(url).map_err(ClientError::Configuration)?;
    Ok(url.trim().trim_end_matches('/').to_string())
}

pub(crate) fn correlation_id() -> String {
    Ulid::new().to_string()
}

/// Send with retries on transport failure only.
pub(crate) async fn send<F>(
    retry: &RetryPolicy,
    operation: &'static str,
    build: F,
) -> Result<Response, ClientError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    retry.run(operation, || build().send()).await
}

/// Turn a non-success status into [`ClientError::Status`] with the (masked) body attached.
pub(crate) async fn check_status(
    operation: &'static str,
    response: Response,
) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ClientError::Status {
        operation,
        status: status.as_u16(),
        body: mask_pii(&body).into_owned(),
    })
}

pub(crate) fn is_not_found(response: &Response) -> bool {
    response.status() == StatusCode::NOT_FOUND
}

pub(crate) async fn decode<T: DeserializeOwned>(
    operation: &'static str,
    response: Response,
) -> Result<T, ClientError> {
    let bytes = response.bytes().await.map_err(|e| ClientError::Decode {
        operation,
        message: e.to_string(),
    })?;
    serde_json::from_slice(&bytes).map_err(|e| ClientError::Decode {
        operation,
        message: e.to_string(),
    })
}

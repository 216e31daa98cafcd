//! Shared request/retry plumbing for REST collaborators.

use super::DataSourceError;
use backoff::future::retry;
use backoff::ExponentialBackoff;
use reqwest::RequestBuilder;
use std::time::Duration;

/// Send `request` and parse the body as JSON, retrying transient failures.
///
/// Network errors, 429 and 5xx are retried with exponential backoff until
/// `max_elapsed` runs out; other 4xx and undecodable bodies fail immediately.
pub async fn send_json(
    request: RequestBuilder,
    max_elapsed: Duration,
) -> Result<serde_json::Value, DataSourceError> {
    let backoff = ExponentialBackoff {
        max_elapsed_time: Some(max_elapsed),
        ..Default::default()
    };

    retry(backoff, || async {
        let attempt = request.try_clone().ok_or_else(|| {
            backoff::Error::permanent(DataSourceError::Other(
                "request cannot be retried".to_string(),
            ))
        })?;

        let response = attempt.send().await.map_err(|e| {
            backoff::Error::transient(DataSourceError::NetworkError(e.to_string()))
        })?;

        let status = response.status();
        if status == 429 {
            return Err(backoff::Error::transient(DataSourceError::RateLimited));
        }
        if status.is_server_error() {
            return Err(backoff::Error::transient(DataSourceError::HttpError {
                status: status.as_u16(),
                message: "Server error".to_string(),
            }));
        }
        if !status.is_success() {
            return Err(backoff::Error::permanent(DataSourceError::HttpError {
                status: status.as_u16(),
                message: "Client error".to_string(),
            }));
        }

        response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| backoff::Error::permanent(DataSourceError::ParseError(e.to_string())))
    })
    .await
}

/// Read a numeric field that upstreams send as either a number or a string.
pub(crate) fn number(value: &serde_json::Value, key: &str) -> Option<f64> {
    match value.get(key)? {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Read an optional string field, treating blanks as absent.
pub(crate) fn text(value: &serde_json::Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

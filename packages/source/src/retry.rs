//! HTTP retry helper for transient errors.
//!
//! Upstream requests go through [`send_json`] rather than calling
//! `reqwest::RequestBuilder::send()` directly, so every call gets the same
//! backoff policy:
//!
//! ```ignore
//! let body = retry::send_json(|| client.get(&url).query(&params)).await?;
//! ```

use std::time::Duration;

use crate::SourceError;

/// Maximum number of retries after the first attempt. With exponential
/// backoff (1s, 2s, 4s) the total wait before giving up is 7 seconds.
const MAX_RETRIES: u32 = 3;

/// Sends a request and decodes the body as JSON.
///
/// `build_request` is called once per attempt because request builders are
/// consumed by `.send()`.
///
/// Connection errors, timeouts, HTTP 429 and HTTP 5xx are retried up to
/// [`MAX_RETRIES`] times. Other 4xx responses and undecodable bodies fail
/// immediately.
///
/// # Errors
///
/// Returns [`SourceError`] if every attempt fails, the server answers with
/// a non-retryable status, or the body is not valid JSON.
pub async fn send_json<F>(build_request: F) -> Result<serde_json::Value, SourceError>
where
    F: Fn() -> reqwest::RequestBuilder + Send + Sync,
{
    let response = send_with_retry(&build_request, MAX_RETRIES).await?;
    let text = response.text().await?;
    Ok(serde_json::from_str(&text)?)
}

async fn send_with_retry<F>(
    build_request: &F,
    max_retries: u32,
) -> Result<reqwest::Response, SourceError>
where
    F: Fn() -> reqwest::RequestBuilder + Send + Sync,
{
    let mut attempt = 0;

    loop {
        let error = match build_request().send().await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    return Ok(response);
                }
                if !is_retryable_status(status) {
                    return Err(SourceError::Status { status });
                }
                SourceError::Status { status }
            }
            Err(e) if is_transient(&e) => SourceError::Http(e),
            Err(e) => return Err(SourceError::Http(e)),
        };

        if attempt >= max_retries {
            log::warn!("giving up after {max_retries} retries: {error}");
            return Err(error);
        }

        let delay = backoff(attempt);
        attempt += 1;
        log::warn!("  {error}; retry {attempt}/{max_retries} in {delay:?}...");
        tokio::time::sleep(delay).await;
    }
}

/// Delay before retry number `attempt + 1`: 1s, 2s, 4s, ...
const fn backoff(attempt: u32) -> Duration {
    Duration::from_secs(1u64 << attempt)
}

/// Returns `true` for 429 and 5xx responses.
fn is_retryable_status(status: reqwest::StatusCode) -> bool {
    status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Returns `true` if the error is likely transient and worth retrying.
fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_body()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles() {
        assert_eq!(backoff(0), Duration::from_secs(1));
        assert_eq!(backoff(1), Duration::from_secs(2));
        assert_eq!(backoff(2), Duration::from_secs(4));
    }

    #[test]
    fn retries_rate_limits_and_server_errors_only() {
        assert!(is_retryable_status(reqwest::StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable_status(reqwest::StatusCode::BAD_GATEWAY));
        assert!(!is_retryable_status(reqwest::StatusCode::FORBIDDEN));
        assert!(!is_retryable_status(reqwest::StatusCode::NOT_FOUND));
    }
}

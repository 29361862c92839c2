//! Retry with exponential backoff for provider HTTP calls.

use std::future::Future;
use std::time::Duration;

use reqwest::{RequestBuilder, StatusCode};
use tracing::{debug, warn};

use crate::error::{ExplorerError, Result};

/// Maximum number of attempts for transient errors.
pub const MAX_RETRY_ATTEMPTS: u32 = 3;

/// Base delay for exponential backoff (milliseconds).
pub const RETRY_BASE_DELAY_MS: u64 = 1000;

/// Attempt count and initial delay for one request.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_RETRY_ATTEMPTS,
            base_delay: Duration::from_millis(RETRY_BASE_DELAY_MS),
        }
    }
}

/// Maps a non-success response to `(error, is_retryable)`.
pub type ErrorParser = fn(StatusCode, &str) -> (ExplorerError, bool);

/// Sends the request built by `build` until it succeeds, a non-retryable
/// error occurs, or the attempts run out. Returns the success body.
pub async fn send_with_retry<F>(
    provider: &str,
    policy: RetryPolicy,
    build: F,
    parse_error: ErrorParser,
) -> Result<String>
where
    F: Fn() -> RequestBuilder,
{
    retry(provider, policy, || async {
        match build().send().await {
            Ok(response) => {
                let status = response.status();
                match response.text().await {
                    Ok(body) if status.is_success() => Ok(body),
                    Ok(body) => Err(parse_error(status, &body)),
                    Err(e) => Err((
                        ExplorerError::llm(format!("Failed to read response: {e}")),
                        false,
                    )),
                }
            }
            Err(e) => Err(request_error(provider, &e)),
        }
    })
    .await
}

/// Runs `attempt` with exponential backoff between retryable failures.
pub async fn retry<F, Fut, T>(provider: &str, policy: RetryPolicy, mut attempt: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, (ExplorerError, bool)>>,
{
    let mut delay = policy.base_delay;
    let max_attempts = policy.max_attempts.max(1);
    let mut number = 1;

    loop {
        debug!(provider, attempt = number, max_attempts, "LLM request");

        match attempt().await {
            Ok(value) => return Ok(value),
            Err((error, is_retryable)) => {
                if !is_retryable || number >= max_attempts {
                    return Err(error);
                }
                warn!(
                    provider,
                    attempt = number,
                    ?delay,
                    %error,
                    "LLM request failed, retrying"
                );
            }
        }

        tokio::time::sleep(delay).await;
        delay *= 2;
        number += 1;
    }
}

fn request_error(provider: &str, error: &reqwest::Error) -> (ExplorerError, bool) {
    let retryable = error.is_timeout() || error.is_connect();
    let error = if error.is_timeout() {
        ExplorerError::llm("Request timed out. Try again.")
    } else if error.is_connect() {
        ExplorerError::llm(format!("Failed to connect to {provider} API. Check your network."))
    } else {
        ExplorerError::llm(format!("Request failed: {error}"))
    };
    (error, retryable)
}

//! HTTP fetch with bounded linear-backoff retry.
//!
//! Each failed attempt (non-2xx, timeout, connection error) sleeps
//! `base_delay * attempt` before retrying. After `max_attempts`
//! failures the last error propagates to the caller, which aborts that
//! dataset's sync without taking down the whole run.

use std::time::Duration;

/// HTTP request timeout for a single attempt, separate from the retry
/// budget.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The underlying HTTP request failed (network, DNS, timeout, ...).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The remote server returned a non-2xx status code.
    #[error("Source returned HTTP {0}")]
    HttpStatus(u16),
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

/// Linear backoff: `base_delay * attempt` (1-based).
pub fn backoff_delay(base_delay: Duration, attempt: u32) -> Duration {
    base_delay * attempt
}

pub struct BackoffFetcher {
    client: reqwest::Client,
    config: FetchConfig,
}

impl BackoffFetcher {
    pub fn new(config: FetchConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to build reqwest HTTP client");
        Self { client, config }
    }

    /// GET a URL and return the response body as text, retrying with
    /// linear backoff. Returns the last error once attempts run out.
    pub async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        let mut last_err: Option<FetchError> = None;

        for attempt in 1..=self.config.max_attempts.max(1) {
            match self.try_fetch(url).await {
                Ok(body) => return Ok(body),
                Err(e) => {
                    tracing::warn!(attempt, url, error = %e, "Fetch attempt failed");
                    last_err = Some(e);
                    if attempt < self.config.max_attempts {
                        tokio::time::sleep(backoff_delay(self.config.base_delay, attempt)).await;
                    }
                }
            }
        }

        let err = last_err.expect("at least one attempt was made");
        tracing::error!(url, error = %err, "Fetch failed after all attempts");
        Err(err)
    }

    async fn try_fetch(&self, url: &str) -> Result<String, FetchError> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(FetchError::HttpStatus(response.status().as_u16()));
        }
        Ok(response.text().await?)
    }
}

impl Default for BackoffFetcher {
    fn default() -> Self {
        Self::new(FetchConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_is_linear_in_the_attempt_number() {
        let base = Duration::from_millis(500);
        assert_eq!(backoff_delay(base, 1), Duration::from_millis(500));
        assert_eq!(backoff_delay(base, 2), Duration::from_secs(1));
        assert_eq!(backoff_delay(base, 3), Duration::from_millis(1500));
    }

    #[test]
    fn http_status_error_display() {
        let err = FetchError::HttpStatus(503);
        assert_eq!(err.to_string(), "Source returned HTTP 503");
    }

    #[tokio::test]
    async fn unreachable_host_exhausts_attempts() {
        let fetcher = BackoffFetcher::new(FetchConfig {
            max_attempts: 2,
            base_delay: Duration::from_millis(1),
        });
        // Nothing listens on port 1; the connection is refused immediately.
        let result = fetcher.fetch_text("http://127.0.0.1:1/none").await;
        assert!(matches!(result, Err(FetchError::Request(_))));
    }
}

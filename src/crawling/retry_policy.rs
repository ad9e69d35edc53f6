//! Bounded retry with linear backoff
//!
//! An operation gets one initial attempt plus `max_retries` retries. After the
//! n-th failed attempt (1-based) the policy sleeps `base_delay * n` before the
//! next one. All backoff state lives in the loop; nothing survives the call.

use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::infrastructure::config::RetrySettings;
use crate::infrastructure::http_client::FetchError;
use crate::infrastructure::parsing::ParsingError;

/// Failure of one fetch+extract attempt
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CrawlError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Extraction(#[from] ParsingError),
}

impl CrawlError {
    /// Short reason stored alongside a failed classification
    pub fn reason(&self) -> String {
        match self {
            Self::Fetch(e) => e.reason(),
            Self::Extraction(ParsingError::ExtractionIncomplete { .. }) => {
                "extraction incomplete".to_string()
            }
            Self::Extraction(e) => e.to_string(),
        }
    }
}

/// The last error of an operation that ran out of attempts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryExhausted<E> {
    pub error: E,
    pub attempts: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay: Duration,
}

impl RetryPolicy {
    pub const fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Budget for URLs on an allowed host
    pub const fn for_target(settings: &RetrySettings) -> Self {
        Self::new(settings.target_max_retries, settings.base_delay())
    }

    /// Budget for every other URL
    pub const fn for_non_target(settings: &RetrySettings) -> Self {
        Self::new(settings.non_target_max_retries, settings.base_delay())
    }

    pub const fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Pause after the `attempt`-th failure (1-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }

    /// Run `op` until it succeeds or the budget is spent.
    ///
    /// `op` receives the 1-based attempt number.
    pub async fn run<T, E, F, Fut>(&self, label: &str, mut op: F) -> Result<T, RetryExhausted<E>>
    where
        E: std::fmt::Display,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let max_attempts = self.max_attempts();
        let mut attempt = 0;

        loop {
            attempt += 1;
            match op(attempt).await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!("Succeeded for {} on attempt {}", label, attempt);
                    }
                    return Ok(value);
                }
                Err(error) if attempt < max_attempts => {
                    let delay = self.delay_after(attempt);
                    warn!(
                        "Attempt {}/{} failed for {}, retrying in {:?}: {}",
                        attempt, max_attempts, label, delay, error
                    );
                    sleep(delay).await;
                }
                Err(error) => {
                    warn!(
                        "Attempt {}/{} failed for {}, giving up: {}",
                        attempt, max_attempts, label, error
                    );
                    return Err(RetryExhausted {
                        error,
                        attempts: attempt,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn failing(url: &str) -> CrawlError {
        CrawlError::Fetch(FetchError::Status {
            status: 503,
            url: url.to_string(),
        })
    }

    #[tokio::test(start_paused = true)]
    async fn exhausts_after_one_plus_max_retries() {
        let policy = RetryPolicy::new(3, Duration::from_millis(1000));
        let calls = Arc::new(AtomicU32::new(0));
        let started = tokio::time::Instant::now();

        let result: Result<(), _> = policy
            .run("https://a.test/1", |_| {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(failing("https://a.test/1"))
                }
            })
            .await;

        let exhausted = result.unwrap_err();
        assert_eq!(exhausted.attempts, 4);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(exhausted.error.reason(), "HTTP 503");
        // 1s + 2s + 3s of linear backoff
        assert_eq!(started.elapsed(), Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_retries_means_single_attempt() {
        let policy = RetryPolicy::new(0, Duration::from_secs(1));
        let started = tokio::time::Instant::now();

        let result: Result<(), _> = policy
            .run("https://b.test/1", |_| async { Err(failing("https://b.test/1")) })
            .await;

        assert_eq!(result.unwrap_err().attempts, 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_on_a_later_attempt() {
        let policy = RetryPolicy::new(3, Duration::from_millis(10));

        let result = policy
            .run("https://a.test/2", |attempt| async move {
                if attempt < 3 {
                    Err(CrawlError::from(ParsingError::extraction_incomplete("https://a.test/2")))
                } else {
                    Ok(attempt)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 3);
    }

    #[test]
    fn delays_grow_linearly() {
        let policy = RetryPolicy::new(3, Duration::from_millis(500));
        assert_eq!(policy.delay_after(1), Duration::from_millis(500));
        assert_eq!(policy.delay_after(3), Duration::from_millis(1500));
        assert_eq!(policy.max_attempts(), 4);
    }

    #[test]
    fn incomplete_extraction_reason() {
        let error = CrawlError::from(ParsingError::extraction_incomplete("https://a.test/3"));
        assert_eq!(error.reason(), "extraction incomplete");
    }
}

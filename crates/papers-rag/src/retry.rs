//! Timeout and retry policy for external service calls

use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, timeout};

use crate::config::RequestConfig;
use crate::error::{Error, Result};

/// Per-attempt timeout plus bounded exponential backoff
///
/// Only `Retryable` and `Timeout` errors are retried. Once retries are
/// exhausted a `Retryable` error becomes `Provider`; `Timeout` is kept so
/// callers can tell the two apart.
#[derive(Debug, Clone)]
pub struct CallPolicy {
    timeout: Duration,
    max_retries: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl CallPolicy {
    pub fn new(timeout: Duration, max_retries: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            timeout,
            max_retries,
            base_delay,
            max_delay,
        }
    }

    pub fn from_config(config: &RequestConfig) -> Self {
        Self::new(
            config.timeout(),
            config.max_retries,
            Duration::from_millis(config.base_delay_ms),
            Duration::from_millis(config.max_delay_ms),
        )
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Delay before retry number `attempt + 1`
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
            .min(self.max_delay)
    }

    /// Run `call` until it succeeds, fails permanently, or retries run out
    pub async fn run<F, Fut, T>(&self, operation: &str, call: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0u32;

        loop {
            let outcome = match timeout(self.timeout, call()).await {
                Ok(result) => result,
                Err(_) => Err(Error::timeout(operation, self.timeout)),
            };

            match outcome {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    let delay = self.backoff(attempt);
                    tracing::warn!(
                        "{} failed (attempt {}/{}): {}, retrying in {:?}",
                        operation,
                        attempt + 1,
                        self.max_retries + 1,
                        e,
                        delay
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    if e.is_retryable() {
                        tracing::warn!("{} gave up after {} attempt(s): {}", operation, attempt + 1, e);
                    }
                    return Err(e.into_permanent());
                }
            }
        }
    }
}

impl CallPolicy {
    /// Run `call` once under the per-attempt timeout, without retrying
    pub async fn run_once<Fut, T>(&self, operation: &str, call: Fut) -> Result<T>
    where
        Fut: Future<Output = Result<T>>,
    {
        match timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(Error::timeout(operation, self.timeout)),
        }
    }
}

impl Default for CallPolicy {
    fn default() -> Self {
        Self::from_config(&RequestConfig::default())
    }
}

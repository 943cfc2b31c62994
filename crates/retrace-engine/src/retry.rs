//! Bounded retry with exponential backoff for collaborator calls.

use crate::config::RetryConfig;
use crate::store::StoreError;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Attempts after the first one.
    pub max_retries: usize,
    /// Delay before the first retry; doubled for each further retry.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.retry_delay_ms),
        }
    }

    /// Single attempt, no waiting.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
        }
    }

    fn delay_for(&self, attempt: usize) -> Duration {
        let factor = 2u32.saturating_pow(attempt.min(16) as u32);
        self.base_delay.saturating_mul(factor)
    }

    /// Run `op` until it succeeds, fails permanently, or retries run out.
    pub async fn run<T, F, Fut>(&self, context: &str, mut op: F) -> Result<T, StoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        "{}: {} (attempt {}/{}), retrying in {:?}",
                        context,
                        e,
                        attempt + 1,
                        self.max_retries + 1,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    if e.is_transient() {
                        warn!("{}: giving up after {} attempts: {}", context, attempt + 1, e);
                    }
                    return Err(e);
                }
            }
        }
    }
}

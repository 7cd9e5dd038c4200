//! Bounded retry with linear backoff and an untranslated fallback.

use crate::config::Config;
use crate::error::Result;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// How many times a batch is attempted and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: crate::config::DEFAULT_MAX_RETRIES,
            base_delay: crate::config::DEFAULT_RETRY_DELAY,
        }
    }
}

impl From<&Config> for RetryPolicy {
    fn from(config: &Config) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: config.retry_delay,
        }
    }
}

impl RetryPolicy {
    /// Wait before the attempt following failed attempt `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }
}

/// Final state of one batch.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOutcome<T> {
    Translated(T),
    /// Every attempt failed; holds the untranslated input.
    Fallback(T),
}

impl<T> BatchOutcome<T> {
    pub fn into_inner(self) -> T {
        match self {
            Self::Translated(v) | Self::Fallback(v) => v,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback(_))
    }
}

/// Run `attempt` up to `policy.max_retries` times, sleeping
/// `base_delay * n` after failed attempt `n`. Once attempts are exhausted,
/// or the error is not retryable, `fallback` provides the result.
/// `first_index` identifies the batch in the logs.
pub async fn run_with_fallback<T, F, Fut, G>(
    policy: &RetryPolicy,
    first_index: u32,
    mut attempt: F,
    fallback: G,
) -> BatchOutcome<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
    G: FnOnce() -> T,
{
    let max = policy.max_retries.max(1);
    let mut n = 1;
    loop {
        let err = match attempt(n).await {
            Ok(value) => return BatchOutcome::Translated(value),
            Err(err) => err,
        };
        warn!(
            "[attempt {n}/{max}] error translating batch starting at {first_index}: {err}"
        );
        if n >= max || !err.is_retryable() {
            warn!("giving up on batch starting at {first_index}, keeping original text");
            return BatchOutcome::Fallback(fallback());
        }
        tokio::time::sleep(policy.delay_after(n)).await;
        n += 1;
    }
}

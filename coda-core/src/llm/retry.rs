//! Bounded retry for transient provider failures.
//!
//! Rate limits (HTTP 429) and server errors (5xx) are retried with a fixed
//! backoff up to a fixed bound; everything else propagates immediately.
//! Adapters never mutate the dialog while a request is in flight, so a
//! retried call replays exactly the same state.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::config::constants::defaults;
use crate::llm::provider::LLMError;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: defaults::MAX_RETRIES,
            backoff: Duration::from_secs(defaults::RETRY_BACKOFF_SECS),
        }
    }
}

/// Runs `op`, retrying transient errors until the policy is exhausted. The
/// final transient error escalates to the caller unchanged.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, LLMError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, LLMError>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Err(err) if err.is_transient() && attempt < policy.max_attempts => {
                warn!(
                    attempt,
                    max_attempts = policy.max_attempts,
                    error = %err,
                    "transient provider error, backing off"
                );
                tokio::time::sleep(policy.backoff).await;
                attempt += 1;
            }
            other => return other,
        }
    }
}

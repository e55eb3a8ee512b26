//! Bounded exponential backoff for transient provider failures

use crate::config::RetryConfig;
use crate::error::{Result, ScoutError};
use std::future::Future;
use std::time::Duration;

/// Delay before retry number `attempt` (1-based)
pub fn backoff_delay(policy: &RetryConfig, attempt: u32) -> Duration {
    let factor = policy.multiplier.max(1.0).powi(attempt.saturating_sub(1) as i32);
    let delay = policy.initial_delay().mul_f64(factor);
    delay.min(policy.max_delay())
}

/// Run `op` until it succeeds, fails with a non-transient error, or the
/// attempt budget is spent.
///
/// Errors that exhaust the budget come back wrapped in
/// [`ScoutError::RetriesExhausted`] so callers can still classify the cause.
pub async fn with_backoff<T, F, Fut>(provider: &str, policy: &RetryConfig, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < max_attempts => {
                let delay = backoff_delay(policy, attempt);
                tracing::debug!(
                    "{} attempt {}/{} failed ({}), retrying in {:?}",
                    provider,
                    attempt,
                    max_attempts,
                    e,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) if e.is_transient() => {
                tracing::warn!("{} gave up after {} attempts: {}", provider, attempt, e);
                return Err(ScoutError::RetriesExhausted {
                    attempts: attempt,
                    source: Box::new(e),
                });
            }
            Err(e) => return Err(e),
        }
    }
}

//! Retry loop for registry operations.

use std::future::Future;
use std::time::Duration;

use cantus_core::{CantusError, Result};
use rand::Rng;
use tokio::time::Instant;

use crate::config::RetryConfig;

/// Runs `call` until it succeeds, fails permanently, or attempts run out.
///
/// Only errors for which [`cantus_core::CantusError::is_retryable`] holds are
/// retried; 4xx responses and protocol violations return immediately.
///
/// All attempts and delays share `policy.budget`. No retry is scheduled when
/// its delay would exhaust the budget, and an attempt still running when the
/// budget runs out is abandoned in favour of the previous attempt's error.
pub(crate) async fn with_retry<T, F, Fut>(
    policy: &RetryConfig,
    operation: &'static str,
    registry: &str,
    mut call: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let started = Instant::now();
    let mut last_error: Option<CantusError> = None;
    let mut attempt = 0;

    loop {
        attempt += 1;

        let remaining = policy.budget.saturating_sub(started.elapsed());
        let Ok(outcome) = tokio::time::timeout(remaining, call()).await else {
            tracing::warn!(
                operation,
                registry,
                attempts = attempt,
                budget = ?policy.budget,
                "registry call exceeded its retry budget"
            );
            return Err(last_error.unwrap_or_else(|| {
                CantusError::transient(
                    format!("no response within {:?}", policy.budget),
                    registry,
                )
            }));
        };

        match outcome {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < max_attempts => {
                let delay = policy.backoff(attempt) + jitter(policy.jitter);
                if started.elapsed() + delay >= policy.budget {
                    tracing::warn!(
                        operation,
                        registry,
                        attempts = attempt,
                        error = %e,
                        "registry call failed, retry budget exhausted"
                    );
                    return Err(e);
                }

                tracing::debug!(
                    operation,
                    registry,
                    attempt,
                    ?delay,
                    error = %e,
                    "registry call failed, retrying"
                );
                last_error = Some(e);
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                if e.is_retryable() {
                    tracing::warn!(
                        operation,
                        registry,
                        attempts = attempt,
                        error = %e,
                        "registry call failed, giving up"
                    );
                }
                return Err(e);
            }
        }
    }
}

fn jitter(bound: Duration) -> Duration {
    if bound.is_zero() {
        return Duration::ZERO;
    }
    let max = u64::try_from(bound.as_millis()).unwrap_or(u64::MAX);
    Duration::from_millis(rand::thread_rng().gen_range(0..=max))
}

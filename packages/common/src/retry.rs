use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::debug;

/// How many extra attempts to make and how long to wait between them.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Extra attempts after the first. `0` disables retrying.
    pub retries: u8,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl RetryPolicy {
    /// One retry after a short pause.
    pub const fn once() -> Self {
        Self {
            retries: 1,
            base_delay_ms: 200,
            max_delay_ms: 2_000,
        }
    }

    pub const fn none() -> Self {
        Self {
            retries: 0,
            base_delay_ms: 0,
            max_delay_ms: 0,
        }
    }

    pub const fn with_retries(self, retries: u8) -> Self {
        Self { retries, ..self }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::once()
    }
}

/// Calculate exponential backoff delay with jitter.
///
/// Formula: `min(base_ms * 2^(attempt-1) + jitter, max_ms)` (0-25% jitter)
pub fn calculate_backoff(attempt: u8, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }

    let exp_factor = 2u64.saturating_pow((attempt - 1) as u32);
    let delay_ms = base_ms.saturating_mul(exp_factor);

    let jitter = if delay_ms > 0 {
        rand::rng().random_range(0..=delay_ms / 4)
    } else {
        0
    };

    let total_delay = delay_ms.saturating_add(jitter).min(max_ms);
    Duration::from_millis(total_delay)
}

/// Run `op` until it succeeds or the policy's retry budget is spent.
///
/// `should_retry` lets callers stop early on errors that a repeat cannot fix.
/// The last error is returned once attempts are exhausted.
pub async fn retry_async<T, E, F, Fut, P>(
    policy: RetryPolicy,
    mut should_retry: P,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: FnMut(&E) -> bool,
    E: Display,
{
    let mut attempt: u8 = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < policy.retries && should_retry(&err) => {
                attempt += 1;
                let delay = calculate_backoff(attempt, policy.base_delay_ms, policy.max_delay_ms);
                debug!(attempt, error = %err, delay_ms = delay.as_millis() as u64, "Retrying");
                tokio::time::sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}

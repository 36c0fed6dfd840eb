use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// How many times to re-run a failed operation and how long to wait first.
///
/// The wait doubles after every failure. There is no upper bound on the
/// delay; callers with large budgets should pick a small initial delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt. `0` means a single attempt.
    pub max_retries: u32,
    pub initial_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, initial_delay: Duration) -> Self {
        RetryPolicy {
            max_retries,
            initial_delay,
        }
    }

    pub fn none() -> Self {
        RetryPolicy::new(0, Duration::ZERO)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::new(3, Duration::from_millis(1000))
    }
}

/// Run `op` until it succeeds or the retry budget is spent, returning the
/// last error in the latter case.
pub async fn retry<T, E, F, Fut>(policy: RetryPolicy, op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    retry_when(policy, op, |_| true).await
}

/// Like [`retry`], but gives up immediately on errors `should_retry` rejects.
pub async fn retry_when<T, E, F, Fut, P>(
    policy: RetryPolicy,
    mut op: F,
    should_retry: P,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: Display,
{
    let mut remaining = policy.max_retries;
    let mut delay = policy.initial_delay;
    let mut attempt = 1u32;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if remaining == 0 || !should_retry(&e) => return Err(e),
            Err(e) => {
                warn!(
                    "Attempt {} failed: {}. Retrying in {:?} ({} left)",
                    attempt, e, delay, remaining
                );
                tokio::time::sleep(delay).await;
                remaining -= 1;
                attempt += 1;
                delay = delay.saturating_mul(2);
            }
        }
    }
}

//! Bounded retry for cheap, idempotent ledger reads.
//!
//! Only transient errors are retried, and only a small fixed number of
//! times; anything else surfaces immediately.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::ledger::LedgerError;

/// Retry bounds for one read operation.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    /// Total attempts, including the first (1 = no retries).
    pub max_attempts: u32,
    /// Delay between attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3, delay: Duration::from_millis(200) }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self { max_attempts, delay }
    }

    /// No retries at all.
    pub fn once() -> Self {
        Self { max_attempts: 1, delay: Duration::ZERO }
    }
}

/// Run `operation`, retrying transient ledger errors within the policy's
/// bounds. `what` names the operation for the log.
pub async fn with_retries<T, F, Fut>(
    policy: RetryPolicy,
    what: &str,
    mut operation: F,
) -> Result<T, LedgerError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, LedgerError>>,
{
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match operation().await {
            Ok(value) => return Ok(value),
            Err(error) if error.is_transient() && attempt < policy.max_attempts => {
                warn!(
                    "{} failed (attempt {}/{}): {}; retrying",
                    what, attempt, policy.max_attempts, error
                );
                tokio::time::sleep(policy.delay).await;
            }
            Err(error) => return Err(error),
        }
    }
}

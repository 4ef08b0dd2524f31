//! Client configuration.

use std::time::Duration;

/// Default account-capacity budget for one request, in bytes.
pub const DEFAULT_CAPACITY_BUDGET: u64 = 1024;

/// Tunables for the request lifecycle.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// How often the watcher polls the request account.
    pub poll_interval: Duration,

    /// How long the watcher waits for a claim before giving up. A timeout is
    /// a bound on synchronous waiting, not a statement about the request.
    pub watch_timeout: Duration,

    /// How long the submitter waits for transaction confirmation.
    pub confirm_timeout: Duration,

    /// How often the submitter polls for confirmation.
    pub confirm_interval: Duration,

    /// Consecutive poll read failures tolerated before the watch aborts.
    pub max_consecutive_poll_failures: u32,

    /// Maximum account capacity one request may occupy.
    pub capacity_budget: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            watch_timeout: Duration::from_secs(60),
            confirm_timeout: Duration::from_secs(30),
            confirm_interval: Duration::from_millis(500),
            max_consecutive_poll_failures: 3,
            capacity_budget: DEFAULT_CAPACITY_BUDGET,
        }
    }
}

//! Claim observation over one request account.
//!
//! The watcher polls the account at a fixed interval and classifies each
//! observation against the allocation baseline: data length unchanged means
//! no prover has touched the request; any change means the request was
//! claimed (and possibly already fulfilled — the two are indistinguishable
//! without decoding program state, so the watcher reports only the boundary
//! crossing plus the raw snapshot). The loop suspends cooperatively between
//! polls and honors an external cancellation signal within one interval.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::ledger::{Address, Ledger, LedgerError, Slot};

/// One poll's view of the request account. Ephemeral and client-only.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClaimObservation {
    pub account_exists: bool,
    pub data_len: u64,
    pub observed_at: Instant,
}

impl ClaimObservation {
    /// Classify against the account's allocation length (the empty-state
    /// signature fixed at creation).
    pub fn state(&self, baseline: u64) -> ClaimState {
        if !self.account_exists {
            ClaimState::Missing
        } else if self.data_len == baseline {
            ClaimState::Unclaimed
        } else {
            ClaimState::ClaimedOrFulfilled
        }
    }
}

/// Watcher-visible states of a request account.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClaimState {
    /// Account exists with its data unmodified since creation.
    Unclaimed,
    /// Account data moved past the empty-state signature. Whether the
    /// prover has merely claimed or already fulfilled is program state the
    /// client cannot decode.
    ClaimedOrFulfilled,
    /// Account not found. Transient within the request's lifetime.
    Missing,
}

/// Hands out [`CancelSignal`]s and triggers them.
pub struct CancelHandle {
    sender: watch::Sender<bool>,
}

/// Cooperative cancellation for a watch in progress. Cloneable; all clones
/// observe the same trigger.
#[derive(Clone)]
pub struct CancelSignal {
    receiver: watch::Receiver<bool>,
}

/// Create a connected cancellation pair.
pub fn cancellation() -> (CancelHandle, CancelSignal) {
    let (sender, receiver) = watch::channel(false);
    (CancelHandle { sender }, CancelSignal { receiver })
}

impl CancelHandle {
    /// Stop any watch holding a connected signal. Idempotent.
    pub fn cancel(&self) {
        let _ = self.sender.send(true);
    }

    pub fn signal(&self) -> CancelSignal {
        CancelSignal { receiver: self.sender.subscribe() }
    }
}

impl CancelSignal {
    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolve once cancellation is triggered. A handle dropped without
    /// cancelling never resolves this.
    pub async fn cancelled(&mut self) {
        if *self.receiver.borrow() {
            return;
        }
        if self.receiver.wait_for(|&cancelled| cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Watch failures and protocol bounds.
#[derive(Debug, Error)]
pub enum WatchError {
    /// The synchronous wait bound elapsed with the request still unclaimed.
    /// Not a request failure: a prover may still claim it, and the caller
    /// may watch again.
    #[error("watch timed out after {elapsed:?} with the request still unclaimed")]
    Timeout { elapsed: Duration, last: Option<ClaimObservation> },

    /// The ledger clock passed the request's expiry while it was still
    /// unclaimed (or the account was missing).
    #[error("request expired at slot {expiry_slot} while still unclaimed")]
    Expired { expiry_slot: Slot, last: Option<ClaimObservation> },

    /// Cancelled via a [`CancelHandle`]. Distinct from [`WatchError::Timeout`].
    #[error("watch cancelled")]
    Cancelled,

    /// Too many consecutive poll read failures.
    #[error("watch aborted after {failures} consecutive read failures: {source}")]
    Aborted {
        failures: u32,
        #[source]
        source: LedgerError,
    },
}

/// Polls one request account until it leaves the unclaimed state.
pub struct ClaimWatcher {
    ledger: Arc<dyn Ledger>,
    poll_interval: Duration,
    timeout: Duration,
    max_consecutive_failures: u32,
}

impl ClaimWatcher {
    pub fn new(ledger: Arc<dyn Ledger>, config: &ClientConfig) -> Self {
        Self {
            ledger,
            poll_interval: config.poll_interval,
            timeout: config.watch_timeout,
            max_consecutive_failures: config.max_consecutive_poll_failures,
        }
    }

    /// Watch `account` until its data moves past `baseline` (the length it
    /// was allocated with), the request passes `expiry_slot`, the timeout
    /// elapses, or `cancel` fires.
    ///
    /// Individual read failures are transient: the watch continues unless
    /// they repeat past the consecutive-failure threshold.
    pub async fn watch(
        &self,
        account: Address,
        baseline: u64,
        expiry_slot: Slot,
        mut cancel: Option<CancelSignal>,
    ) -> Result<ClaimObservation, WatchError> {
        let started = Instant::now();
        let deadline = started + self.timeout;
        let mut consecutive_failures = 0u32;
        let mut last: Option<ClaimObservation> = None;

        debug!(
            "watching account {} (baseline {} bytes, expiry slot {})",
            account, baseline, expiry_slot
        );

        loop {
            if let Some(signal) = &cancel {
                if signal.is_cancelled() {
                    return Err(WatchError::Cancelled);
                }
            }

            match self.poll_once(&account).await {
                Ok(observation) => {
                    consecutive_failures = 0;
                    last = Some(observation);
                    match observation.state(baseline) {
                        ClaimState::ClaimedOrFulfilled => {
                            info!(
                                "account {} claimed or fulfilled: data length {} (baseline {})",
                                account, observation.data_len, baseline
                            );
                            return Ok(observation);
                        }
                        ClaimState::Unclaimed => {
                            debug!("account {} still unclaimed", account);
                        }
                        ClaimState::Missing => {
                            warn!("account {} not found; treating as transient", account);
                        }
                    }

                    // unclaimed or missing past the expiry slot is terminal
                    match self.ledger.current_slot().await {
                        Ok(slot) if slot > expiry_slot => {
                            return Err(WatchError::Expired { expiry_slot, last });
                        }
                        Ok(_) => {}
                        Err(e) => warn!("slot read failed during watch: {}; continuing", e),
                    }
                }
                Err(error) => {
                    consecutive_failures += 1;
                    if consecutive_failures >= self.max_consecutive_failures {
                        return Err(WatchError::Aborted {
                            failures: consecutive_failures,
                            source: error,
                        });
                    }
                    warn!(
                        "poll failed ({}/{}): {}; continuing",
                        consecutive_failures, self.max_consecutive_failures, error
                    );
                }
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(WatchError::Timeout { elapsed: now - started, last });
            }

            // suspend until the next poll, the deadline, or cancellation —
            // never busy-spin
            let sleep_for = self.poll_interval.min(deadline - now);
            match &mut cancel {
                Some(signal) => {
                    tokio::select! {
                        _ = signal.cancelled() => return Err(WatchError::Cancelled),
                        _ = tokio::time::sleep(sleep_for) => {}
                    }
                }
                None => tokio::time::sleep(sleep_for).await,
            }
        }
    }

    /// One read-only ledger query.
    async fn poll_once(&self, account: &Address) -> Result<ClaimObservation, LedgerError> {
        let info = self.ledger.get_account(account).await?;
        let observed_at = Instant::now();
        Ok(match info {
            Some(info) => ClaimObservation {
                account_exists: true,
                data_len: info.data_len,
                observed_at,
            },
            None => ClaimObservation { account_exists: false, data_len: 0, observed_at },
        })
    }
}

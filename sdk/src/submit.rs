//! Atomic request submission.
//!
//! One transaction carries two instructions: allocate the request account
//! (sized and funded for rent exemption) and write the request record into
//! it. The ledger applies them as a unit, so no partially created request
//! is ever observable. The fresh account identity co-signs its own
//! creation alongside the funding identity.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::ledger::{
    Address, ConfirmStatus, Instruction, Ledger, LedgerError, Signature, SigningIdentity, Slot,
    Transaction,
};
use crate::request::{ExecutionRequest, CLAIM_STATE_RESERVE};
use crate::retry::{with_retries, RetryPolicy};

/// Proof that a request landed: the transaction is durable and the account
/// allocated. `capacity` is the account's data length at creation, which the
/// watcher uses as its unclaimed baseline.
#[derive(Clone, Copy, Debug)]
pub struct Confirmation {
    pub signature: Signature,
    pub slot: Slot,
    pub account: Address,
    pub capacity: u64,
}

/// Submission failures.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// The funding identity cannot cover the rent-exemption deposit.
    /// Recoverable by funding it and submitting again.
    #[error("funding identity cannot cover the deposit: {0}")]
    InsufficientFunds(#[source] LedgerError),

    /// The chosen request-account address is already occupied. Never
    /// overwritten; retry with a freshly minted identity.
    #[error("request account {0} is already in use")]
    AccountCollision(Address),

    /// The ledger refused the transaction outright.
    #[error("ledger rejected the submission: {0}")]
    LedgerRejected(#[source] LedgerError),

    /// The ledger accepted the transaction into its queue but did not
    /// confirm it in time. The transaction may still land; retrying with the
    /// same account identity risks a collision, so mint a new one.
    #[error("transaction {signature} was not confirmed within {timeout:?}")]
    ConfirmationTimeout { signature: Signature, timeout: Duration },

    #[error("failed to encode request record: {0}")]
    Encode(#[from] bincode::Error),
}

/// Packages account creation and request submission into one atomic unit
/// and sees it through confirmation.
pub struct RequestSubmitter {
    ledger: Arc<dyn Ledger>,
    program: Address,
    confirm_timeout: Duration,
    confirm_interval: Duration,
    retry: RetryPolicy,
}

impl RequestSubmitter {
    pub fn new(ledger: Arc<dyn Ledger>, program: Address, config: &ClientConfig) -> Self {
        Self {
            ledger,
            program,
            confirm_timeout: config.confirm_timeout,
            confirm_interval: config.confirm_interval,
            retry: RetryPolicy::default(),
        }
    }

    /// Submit `request`, funded by `funding`, into a fresh account at
    /// `account`'s address.
    pub async fn submit(
        &self,
        request: &ExecutionRequest,
        funding: &SigningIdentity,
        account: &SigningIdentity,
    ) -> Result<Confirmation, SubmitError> {
        let address = account.address();
        let payer = funding.address();

        let record = request.record(&payer).to_bytes()?;
        let capacity = record.len() as u64 + CLAIM_STATE_RESERVE;

        // never overwrite: a freshly minted address colliding is negligible,
        // but a reused identity is not
        let existing = with_retries(self.retry, "get_account", || {
            self.ledger.get_account(&address)
        })
        .await
        .map_err(SubmitError::LedgerRejected)?;
        if existing.is_some() {
            return Err(SubmitError::AccountCollision(address));
        }

        let deposit = with_retries(self.retry, "minimum_rent_exempt_balance", || {
            self.ledger.minimum_rent_exempt_balance(capacity)
        })
        .await
        .map_err(SubmitError::LedgerRejected)?;

        debug!(
            "submitting request: account={} capacity={} deposit={} tip={}",
            address, capacity, deposit, request.tip
        );

        let tx = Transaction {
            instructions: vec![
                Instruction::CreateAccount {
                    funder: payer,
                    account: address,
                    capacity,
                    deposit,
                    owner: self.program,
                },
                Instruction::SubmitRequest {
                    program: self.program,
                    account: address,
                    payer,
                    record,
                },
            ],
            // the account authorizes its own creation
            signers: vec![payer, address],
        };

        let signature = match self.ledger.send_transaction(tx).await {
            Ok(signature) => signature,
            Err(e @ LedgerError::InsufficientFunds { .. }) => {
                return Err(SubmitError::InsufficientFunds(e))
            }
            Err(LedgerError::AccountInUse(addr)) => {
                return Err(SubmitError::AccountCollision(addr))
            }
            Err(e) => return Err(SubmitError::LedgerRejected(e)),
        };
        info!("request transaction sent: {}", signature);

        self.await_confirmation(signature, address, capacity).await
    }

    /// Poll for confirmation within the bounded wait. Transient read errors
    /// keep polling; an explicit failure surfaces as a rejection.
    async fn await_confirmation(
        &self,
        signature: Signature,
        account: Address,
        capacity: u64,
    ) -> Result<Confirmation, SubmitError> {
        let deadline = Instant::now() + self.confirm_timeout;

        loop {
            match self.ledger.confirm_transaction(&signature).await {
                Ok(ConfirmStatus::Confirmed { slot }) => {
                    info!("request confirmed at slot {}: account={}", slot, account);
                    return Ok(Confirmation { signature, slot, account, capacity });
                }
                Ok(ConfirmStatus::Failed(reason)) => {
                    return Err(SubmitError::LedgerRejected(LedgerError::Rejected(reason)));
                }
                Ok(ConfirmStatus::Pending) => {
                    debug!("transaction {} still pending", signature);
                }
                Err(e) if e.is_transient() => {
                    warn!("confirmation poll failed: {}; continuing", e);
                }
                Err(e) => return Err(SubmitError::LedgerRejected(e)),
            }

            if Instant::now() >= deadline {
                return Err(SubmitError::ConfirmationTimeout {
                    signature,
                    timeout: self.confirm_timeout,
                });
            }
            tokio::time::sleep(self.confirm_interval).await;
        }
    }
}

//! One request, end to end.
//!
//! [`RequestSession`] runs the full lifecycle — verified image lookup,
//! request construction against the current slot, atomic submission, claim
//! watching — failing fast on the first component error with the phase
//! attached. Watch-phase protocol bounds (timeout, expiry, cancellation)
//! are terminal outcomes rather than errors: the request itself is fine.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::config::ClientConfig;
use crate::error::SessionError;
use crate::image::{locate_verified, ImageAddress, ImageId};
use crate::ledger::{Address, Ledger, Signature, SigningIdentity, Slot};
use crate::request::{BuildError, ExecutionRequestBuilder, InputPayload};
use crate::retry::{with_retries, RetryPolicy};
use crate::submit::RequestSubmitter;
use crate::watch::{CancelSignal, ClaimObservation, ClaimWatcher, WatchError};

/// Per-request parameters supplied by the caller.
#[derive(Clone, Copy, Debug)]
pub struct SessionParams {
    /// Prover incentive.
    pub tip: u64,
    /// Slots until the request can no longer be claimed.
    pub expiry_offset: u64,
    /// Program notified on fulfillment.
    pub callback_program: Address,
}

/// How a watched request resolved.
#[derive(Clone, Copy, Debug)]
pub enum Resolution {
    /// A prover moved the account past its empty state. The raw
    /// observation is the caller's to interpret further.
    ClaimedOrFulfilled(ClaimObservation),
    /// The request passed its expiry slot unclaimed.
    Expired { expiry_slot: Slot },
    /// The synchronous wait bound elapsed; the request may still be claimed
    /// later and can be re-watched.
    WatchTimedOut { waited: Duration },
    /// Cancelled by the caller mid-watch.
    Cancelled,
}

/// Terminal outcome of one session.
#[derive(Clone, Copy, Debug)]
pub struct RequestOutcome {
    pub signature: Signature,
    pub account: Address,
    pub image_ref: ImageAddress,
    pub resolution: Resolution,
}

/// Orchestrates locate → build → submit → watch.
pub struct RequestSession {
    ledger: Arc<dyn Ledger>,
    program: Address,
    funding: SigningIdentity,
    config: ClientConfig,
}

impl RequestSession {
    /// `program` is the pre-deployed request program; `funding` pays for
    /// account creation and the tip.
    pub fn new(
        ledger: Arc<dyn Ledger>,
        program: Address,
        funding: SigningIdentity,
        config: ClientConfig,
    ) -> Self {
        Self { ledger, program, funding, config }
    }

    /// Run one request to a terminal outcome.
    pub async fn run(
        &self,
        image_id: &ImageId,
        input: InputPayload,
        params: SessionParams,
        cancel: Option<CancelSignal>,
    ) -> Result<RequestOutcome, SessionError> {
        let image_ref = locate_verified(self.ledger.as_ref(), image_id, &self.program).await?;
        info!("image {} located at {}", image_id, image_ref);

        let current_slot = with_retries(RetryPolicy::default(), "current_slot", || {
            self.ledger.current_slot()
        })
        .await
        .map_err(|e| SessionError::Build(BuildError::Clock(e)))?;

        let request = ExecutionRequestBuilder::new(image_ref, input)
            .with_tip(params.tip)
            .expires_after(params.expiry_offset)
            .with_callback(params.callback_program)
            .at_slot(current_slot)
            .with_capacity_budget(self.config.capacity_budget)
            .build()?;

        // fresh identity per session: nobody else writes this account
        let account = SigningIdentity::generate();
        info!("minted request account {}", account.address());

        let submitter = RequestSubmitter::new(self.ledger.clone(), self.program, &self.config);
        let confirmation = submitter.submit(&request, &self.funding, &account).await?;

        // confirmation is durable before the first poll
        let watcher = ClaimWatcher::new(self.ledger.clone(), &self.config);
        let resolution = match watcher
            .watch(confirmation.account, confirmation.capacity, request.expiry_slot, cancel)
            .await
        {
            Ok(observation) => Resolution::ClaimedOrFulfilled(observation),
            Err(WatchError::Timeout { elapsed, .. }) => Resolution::WatchTimedOut { waited: elapsed },
            Err(WatchError::Expired { expiry_slot, .. }) => Resolution::Expired { expiry_slot },
            Err(WatchError::Cancelled) => Resolution::Cancelled,
            Err(aborted @ WatchError::Aborted { .. }) => return Err(aborted.into()),
        };

        Ok(RequestOutcome {
            signature: confirmation.signature,
            account: confirmation.account,
            image_ref,
            resolution,
        })
    }
}

//! Execution-request construction.
//!
//! [`ExecutionRequestBuilder`] assembles and validates the immutable fields
//! of one request. Construction is pure: the builder never contacts the
//! ledger, so the caller must read the current slot first and hand it in
//! with [`ExecutionRequestBuilder::at_slot`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::DEFAULT_CAPACITY_BUDGET;
use crate::image::ImageAddress;
use crate::ledger::{Address, LedgerError, Slot};

/// Account bytes reserved past the request record for the claim and
/// fulfillment state the request program appends. Fixed by the program's
/// on-ledger layout.
pub const CLAIM_STATE_RESERVE: u64 = 128;

/// Input handed to the prover: either carried inline in the request account
/// or referenced by an external locator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputPayload {
    Inline(Vec<u8>),
    ByReference(String),
}

impl InputPayload {
    pub fn len(&self) -> usize {
        match self {
            InputPayload::Inline(bytes) => bytes.len(),
            InputPayload::ByReference(locator) => locator.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One execution request, constructed client-side and immutable thereafter.
///
/// The request becomes durable the instant its submission transaction
/// confirms; from then on the ledger program owns it and the client only
/// observes it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutionRequest {
    pub image_ref: ImageAddress,
    pub input: InputPayload,
    pub tip: u64,
    pub expiry_slot: Slot,
    pub callback_program: Address,
}

impl ExecutionRequest {
    /// The persisted form of this request with `payer` filled in.
    pub fn record(&self, payer: &Address) -> RequestRecord {
        RequestRecord {
            image_ref: self.image_ref,
            input: self.input.clone(),
            tip: self.tip,
            expiry_slot: self.expiry_slot,
            callback_program: self.callback_program,
            payer: *payer,
        }
    }

    /// Account capacity this request needs: the encoded record plus the
    /// program's claim-state reserve. The record length does not depend on
    /// which payer ends up funding it.
    pub fn required_capacity(&self) -> Result<u64, bincode::Error> {
        let record = self.record(&Address::ZERO);
        Ok(bincode::serialized_size(&record)? + CLAIM_STATE_RESERVE)
    }
}

/// The byte layout persisted into a request account at creation. The
/// program appends opaque claim/fulfillment state after it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestRecord {
    pub image_ref: ImageAddress,
    pub input: InputPayload,
    pub tip: u64,
    pub expiry_slot: Slot,
    pub callback_program: Address,
    pub payer: Address,
}

impl RequestRecord {
    pub fn to_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(bytes)
    }
}

/// Errors from request construction. All of these indicate a caller bug and
/// are never retried.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("expiry offset is required and must be greater than zero")]
    InvalidExpiry,

    #[error("callback program is required")]
    MissingCallback,

    #[error("no current-slot reference supplied; read the ledger clock before building")]
    MissingClockReference,

    #[error("input too large: request needs {required} bytes of account capacity, budget is {budget}")]
    InputTooLarge { required: u64, budget: u64 },

    #[error("failed to encode request record: {0}")]
    Encode(#[from] bincode::Error),

    #[error("failed to read current ledger slot: {0}")]
    Clock(#[source] LedgerError),
}

/// Builder for one [`ExecutionRequest`].
#[derive(Clone, Debug)]
pub struct ExecutionRequestBuilder {
    image_ref: ImageAddress,
    input: InputPayload,
    tip: u64,
    expiry_offset: Option<u64>,
    callback_program: Option<Address>,
    current_slot: Option<Slot>,
    capacity_budget: u64,
}

impl ExecutionRequestBuilder {
    pub fn new(image_ref: ImageAddress, input: InputPayload) -> Self {
        Self {
            image_ref,
            input,
            tip: 0,
            expiry_offset: None,
            callback_program: None,
            current_slot: None,
            capacity_budget: DEFAULT_CAPACITY_BUDGET,
        }
    }

    /// Incentive paid to the prover that fulfills the request. Defaults to 0.
    pub fn with_tip(mut self, tip: u64) -> Self {
        self.tip = tip;
        self
    }

    /// Number of slots past the current slot after which the request can no
    /// longer be claimed. Required; must be greater than zero.
    pub fn expires_after(mut self, slots: u64) -> Self {
        self.expiry_offset = Some(slots);
        self
    }

    /// Program to notify when the request is fulfilled. Required.
    pub fn with_callback(mut self, program: Address) -> Self {
        self.callback_program = Some(program);
        self
    }

    /// The ledger slot the expiry offset is anchored to. Required; the
    /// builder has no clock of its own.
    pub fn at_slot(mut self, slot: Slot) -> Self {
        self.current_slot = Some(slot);
        self
    }

    /// Maximum account capacity the request may occupy.
    pub fn with_capacity_budget(mut self, budget: u64) -> Self {
        self.capacity_budget = budget;
        self
    }

    pub fn build(self) -> Result<ExecutionRequest, BuildError> {
        let callback_program = self.callback_program.ok_or(BuildError::MissingCallback)?;

        let expiry_offset = match self.expiry_offset {
            None | Some(0) => return Err(BuildError::InvalidExpiry),
            Some(offset) => offset,
        };

        let current_slot = self.current_slot.ok_or(BuildError::MissingClockReference)?;
        let expiry_slot = current_slot
            .checked_add(expiry_offset)
            .ok_or(BuildError::InvalidExpiry)?;

        let request = ExecutionRequest {
            image_ref: self.image_ref,
            input: self.input,
            tip: self.tip,
            expiry_slot,
            callback_program,
        };

        let required = request.required_capacity()?;
        if required > self.capacity_budget {
            return Err(BuildError::InputTooLarge { required, budget: self.capacity_budget });
        }

        Ok(request)
    }
}

//! The ledger collaborator surface.
//!
//! Everything the request protocol needs from the ledger is behind the
//! [`Ledger`] trait: account reads, the slot clock, rent arithmetic, and
//! atomic transaction submission. The SDK never talks to a concrete RPC
//! endpoint itself; the caller constructs a `Ledger` implementation once at
//! process start and passes it down.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// The ledger's discrete unit of logical time, used for request expiry.
pub type Slot = u64;

/// A 32-byte ledger address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address(pub [u8; 32]);

impl Address {
    pub const ZERO: Address = Address([0u8; 32]);

    pub fn new(bytes: [u8; 32]) -> Self {
        Address(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Parse an address from 64 hex characters.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Address(bytes))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", hex::encode(self.0))
    }
}

/// A transaction signature, minted by the ledger on submission.
///
/// Opaque to the client: it identifies the transaction for confirmation
/// queries and display, nothing more.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature(pub [u8; 64]);

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", hex::encode(self.0))
    }
}

/// A locally held signing identity.
///
/// The ledger collaborator owns signature verification; from the client's
/// side an identity is the address it can authorize transactions for. Fresh
/// request-account identities are minted with [`SigningIdentity::generate`],
/// so collisions with existing accounts are negligible (and the submitter
/// still refuses to overwrite one).
#[derive(Clone, Debug)]
pub struct SigningIdentity {
    address: Address,
}

impl SigningIdentity {
    pub fn new(address: Address) -> Self {
        Self { address }
    }

    /// Mint a fresh identity with a random address.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::Rng::fill(&mut rand::thread_rng(), &mut bytes[..]);
        Self { address: Address(bytes) }
    }

    pub fn address(&self) -> Address {
        self.address
    }
}

/// Read-only view of an account, as returned by [`Ledger::get_account`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AccountInfo {
    /// The program that owns the account.
    pub owner: Address,
    /// Current length of the account's data in bytes.
    pub data_len: u64,
}

/// One operation inside a transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Instruction {
    /// Allocate a new account with fixed capacity, funded by `funder` and
    /// owned by `owner`. The new account must co-sign its own creation.
    CreateAccount {
        funder: Address,
        account: Address,
        capacity: u64,
        deposit: u64,
        owner: Address,
    },
    /// Write an execution-request record into `account`, which must already
    /// exist and be owned by `program`.
    SubmitRequest {
        program: Address,
        account: Address,
        payer: Address,
        record: Vec<u8>,
    },
}

/// An ordered sequence of instructions that applies as one atomic unit:
/// either every instruction lands or none does.
#[derive(Clone, Debug)]
pub struct Transaction {
    pub instructions: Vec<Instruction>,
    pub signers: Vec<Address>,
}

impl Transaction {
    pub fn is_signed_by(&self, address: &Address) -> bool {
        self.signers.contains(address)
    }
}

/// Outcome of a confirmation query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfirmStatus {
    /// The transaction is durable as of `slot`.
    Confirmed { slot: Slot },
    /// The ledger rejected the transaction after accepting it into its queue.
    Failed(String),
    /// Not yet confirmed; ask again.
    Pending,
}

/// Errors surfaced by the ledger collaborator.
///
/// The variants are distinguished so callers can map resource errors
/// (insufficient funds, address collisions) without string matching.
#[derive(Clone, Debug, Error)]
pub enum LedgerError {
    #[error("insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: u64, available: u64 },

    #[error("account {0} already in use")]
    AccountInUse(Address),

    #[error("transaction rejected: {0}")]
    Rejected(String),

    #[error("ledger unavailable: {0}")]
    Unavailable(String),
}

impl LedgerError {
    /// Transient errors are safe to retry where the operation is an
    /// idempotent read.
    pub fn is_transient(&self) -> bool {
        matches!(self, LedgerError::Unavailable(_))
    }
}

/// The operations the request protocol consumes from the ledger.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Read one account. `Ok(None)` means the address holds no account.
    async fn get_account(&self, address: &Address) -> Result<Option<AccountInfo>, LedgerError>;

    /// The ledger's current slot.
    async fn current_slot(&self) -> Result<Slot, LedgerError>;

    /// Minimum balance a `capacity`-byte account needs to be exempt from
    /// storage rent collection.
    async fn minimum_rent_exempt_balance(&self, capacity: u64) -> Result<u64, LedgerError>;

    /// Submit a transaction. Fails as a unit; a returned signature means the
    /// transaction entered the ledger's queue, not that it is durable.
    async fn send_transaction(&self, tx: Transaction) -> Result<Signature, LedgerError>;

    /// Query the durability of a previously sent transaction.
    async fn confirm_transaction(&self, signature: &Signature)
        -> Result<ConfirmStatus, LedgerError>;
}

/// Deterministic address derivation: a pure function of the seed sequence
/// and the owning program's identity.
pub fn derive_address(seeds: &[&[u8]], program: &Address) -> Address {
    let mut hasher = Sha256::new();
    for seed in seeds {
        hasher.update(seed);
    }
    hasher.update(program.as_bytes());
    hasher.update(b"provernet:derived-address");
    Address(hasher.finalize().into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_address_is_deterministic() {
        let program = Address([7u8; 32]);
        let a = derive_address(&[b"seed-one", b"seed-two"], &program);
        let b = derive_address(&[b"seed-one", b"seed-two"], &program);
        assert_eq!(a, b);
    }

    #[test]
    fn derive_address_separates_programs() {
        let a = derive_address(&[b"seed"], &Address([1u8; 32]));
        let b = derive_address(&[b"seed"], &Address([2u8; 32]));
        assert_ne!(a, b);
    }

    #[test]
    fn derive_address_separates_seeds() {
        let program = Address([9u8; 32]);
        let a = derive_address(&[b"alpha"], &program);
        let b = derive_address(&[b"beta"], &program);
        assert_ne!(a, b);
    }

    #[test]
    fn address_hex_round_trip() {
        let address = Address([0xab; 32]);
        let parsed = Address::from_hex(&address.to_string()).unwrap();
        assert_eq!(address, parsed);
    }

    #[test]
    fn generated_identities_are_distinct() {
        let a = SigningIdentity::generate();
        let b = SigningIdentity::generate();
        assert_ne!(a.address(), b.address());
    }

    #[test]
    fn transient_classification() {
        assert!(LedgerError::Unavailable("connection reset".into()).is_transient());
        assert!(!LedgerError::Rejected("bad record".into()).is_transient());
        assert!(!LedgerError::AccountInUse(Address::ZERO).is_transient());
    }
}

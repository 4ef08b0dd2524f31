//! In-memory ledger for tests and the demo harness.
//!
//! [`MockLedger`] implements [`Ledger`] over a mutex-guarded account map
//! with a manually advanced slot clock. Transactions are applied on a
//! scratch copy and committed only if every instruction succeeds, so
//! atomicity holds by construction. Scripted fault injection covers the
//! failure paths the protocol must survive: read outages, mid-transaction
//! program rejections, stalled confirmations.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use rand::Rng;

use crate::image::{locate, ImageAddress, ImageId};
use crate::ledger::{
    AccountInfo, Address, ConfirmStatus, Instruction, Ledger, LedgerError, Signature, Slot,
    Transaction,
};

/// Flat per-byte storage-rent model.
const RENT_PER_BYTE: u64 = 6_960;
const ACCOUNT_STORAGE_OVERHEAD: u64 = 128;

/// Bytes the simulated prover appends when claiming a request.
const CLAIM_MARKER: &[u8] = b"claimed";

#[derive(Clone)]
struct MockAccount {
    owner: Address,
    balance: u64,
    /// Data length fixed at creation; claims extend past it.
    allocated: u64,
    data: Vec<u8>,
}

#[derive(Default)]
struct MockState {
    slot: Slot,
    accounts: HashMap<Address, MockAccount>,
    /// System-owned wallet balances (no data).
    balances: HashMap<Address, u64>,
    confirmations: HashMap<Signature, Slot>,
    request_accounts: Vec<Address>,
    read_failures_remaining: u32,
    fail_next_send: Option<LedgerError>,
    fail_request_instruction: bool,
    confirm_stall: bool,
}

/// Scriptable in-memory ledger.
pub struct MockLedger {
    inner: Mutex<MockState>,
}

impl Default for MockLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLedger {
    pub fn new() -> Self {
        let state = MockState { slot: 1, ..MockState::default() };
        Self { inner: Mutex::new(state) }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.inner.lock().expect("mock ledger state poisoned")
    }

    /// Register `image_id` under `program` at its derived address.
    pub fn register_image(&self, image_id: &ImageId, program: &Address) {
        self.register_image_at(locate(image_id, program), program);
    }

    /// Place a registry account at an explicit address (for ownership
    /// mismatch scenarios).
    pub fn register_image_at(&self, address: ImageAddress, owner: &Address) {
        let mut state = self.lock();
        state.accounts.insert(
            address,
            MockAccount { owner: *owner, balance: RENT_PER_BYTE, allocated: 1, data: vec![1] },
        );
    }

    /// Set a wallet balance.
    pub fn fund(&self, address: Address, amount: u64) {
        self.lock().balances.insert(address, amount);
    }

    pub fn balance(&self, address: &Address) -> u64 {
        self.lock().balances.get(address).copied().unwrap_or(0)
    }

    pub fn account_data(&self, address: &Address) -> Option<Vec<u8>> {
        self.lock().accounts.get(address).map(|a| a.data.clone())
    }

    /// Pre-allocate an account directly, bypassing the transaction path.
    pub fn seed_account(&self, address: Address, owner: Address, len: u64) {
        let mut state = self.lock();
        state.accounts.insert(
            address,
            MockAccount { owner, balance: 0, allocated: len, data: vec![0u8; len as usize] },
        );
        state.request_accounts.push(address);
    }

    /// Simulate a prover claim: extend the account's data past its
    /// allocation. Returns false if the account does not exist.
    pub fn claim(&self, address: &Address) -> bool {
        let mut state = self.lock();
        match state.accounts.get_mut(address) {
            Some(account) => {
                account.data.extend_from_slice(CLAIM_MARKER);
                true
            }
            None => false,
        }
    }

    /// Claim the first request account still in its empty state, as a
    /// scanning prover would. Returns the claimed address, if any.
    pub fn claim_first_unclaimed(&self, program: &Address) -> Option<Address> {
        let mut state = self.lock();
        let candidates: Vec<Address> = state.request_accounts.clone();
        for address in candidates {
            if let Some(account) = state.accounts.get_mut(&address) {
                if account.owner == *program && account.data.len() as u64 == account.allocated {
                    account.data.extend_from_slice(CLAIM_MARKER);
                    return Some(address);
                }
            }
        }
        None
    }

    pub fn advance_slot(&self, slots: u64) {
        self.lock().slot += slots;
    }

    /// Fail the next `count` account reads with a transient error.
    pub fn fail_reads(&self, count: u32) {
        self.lock().read_failures_remaining = count;
    }

    /// Fail the next transaction submission outright with `error`.
    pub fn fail_next_send(&self, error: LedgerError) {
        self.lock().fail_next_send = Some(error);
    }

    /// Make the request program reject its instruction, after the
    /// account-creation instruction has already been staged. Exercises the
    /// all-or-nothing guarantee.
    pub fn fail_request_instruction(&self, fail: bool) {
        self.lock().fail_request_instruction = fail;
    }

    /// Keep every confirmation query answering `Pending`.
    pub fn stall_confirmations(&self, stall: bool) {
        self.lock().confirm_stall = stall;
    }
}

#[async_trait]
impl Ledger for MockLedger {
    async fn get_account(&self, address: &Address) -> Result<Option<AccountInfo>, LedgerError> {
        let mut state = self.lock();
        if state.read_failures_remaining > 0 {
            state.read_failures_remaining -= 1;
            return Err(LedgerError::Unavailable("injected read failure".into()));
        }
        if let Some(account) = state.accounts.get(address) {
            return Ok(Some(AccountInfo {
                owner: account.owner,
                data_len: account.data.len() as u64,
            }));
        }
        if state.balances.contains_key(address) {
            // funded wallet: a data-less account owned by the system
            return Ok(Some(AccountInfo { owner: Address::ZERO, data_len: 0 }));
        }
        Ok(None)
    }

    async fn current_slot(&self) -> Result<Slot, LedgerError> {
        Ok(self.lock().slot)
    }

    async fn minimum_rent_exempt_balance(&self, capacity: u64) -> Result<u64, LedgerError> {
        Ok((capacity + ACCOUNT_STORAGE_OVERHEAD) * RENT_PER_BYTE)
    }

    async fn send_transaction(&self, tx: Transaction) -> Result<Signature, LedgerError> {
        let mut state = self.lock();

        if let Some(error) = state.fail_next_send.take() {
            return Err(error);
        }

        // two-phase apply: stage every instruction on a scratch copy,
        // commit only if all of them succeed
        let mut accounts = state.accounts.clone();
        let mut balances = state.balances.clone();
        let mut new_request_accounts = Vec::new();

        for (index, instruction) in tx.instructions.iter().enumerate() {
            match instruction {
                Instruction::CreateAccount { funder, account, capacity, deposit, owner } => {
                    if !tx.is_signed_by(funder) || !tx.is_signed_by(account) {
                        return Err(LedgerError::Rejected(format!(
                            "instruction {index}: missing required signature"
                        )));
                    }
                    if accounts.contains_key(account) || balances.contains_key(account) {
                        return Err(LedgerError::AccountInUse(*account));
                    }
                    let available = balances.get(funder).copied().unwrap_or(0);
                    if available < *deposit {
                        return Err(LedgerError::InsufficientFunds {
                            needed: *deposit,
                            available,
                        });
                    }
                    balances.insert(*funder, available - deposit);
                    accounts.insert(
                        *account,
                        MockAccount {
                            owner: *owner,
                            balance: *deposit,
                            allocated: *capacity,
                            data: vec![0u8; *capacity as usize],
                        },
                    );
                }
                Instruction::SubmitRequest { program, account, payer: _, record } => {
                    if state.fail_request_instruction {
                        return Err(LedgerError::Rejected(
                            "request program rejected the submission".into(),
                        ));
                    }
                    let target = accounts.get_mut(account).ok_or_else(|| {
                        LedgerError::Rejected(format!("instruction {index}: unknown account"))
                    })?;
                    if target.owner != *program {
                        return Err(LedgerError::Rejected(
                            "account not owned by the request program".into(),
                        ));
                    }
                    if record.len() as u64 > target.allocated {
                        return Err(LedgerError::Rejected(
                            "record exceeds account capacity".into(),
                        ));
                    }
                    target.data[..record.len()].copy_from_slice(record);
                    new_request_accounts.push(*account);
                }
            }
        }

        state.accounts = accounts;
        state.balances = balances;
        state.request_accounts.extend(new_request_accounts);
        state.slot += 1;

        let mut bytes = [0u8; 64];
        rand::thread_rng().fill(&mut bytes[..]);
        let signature = Signature(bytes);
        let slot = state.slot;
        state.confirmations.insert(signature, slot);
        Ok(signature)
    }

    async fn confirm_transaction(
        &self,
        signature: &Signature,
    ) -> Result<ConfirmStatus, LedgerError> {
        let state = self.lock();
        if state.confirm_stall {
            return Ok(ConfirmStatus::Pending);
        }
        Ok(match state.confirmations.get(signature) {
            Some(slot) => ConfirmStatus::Confirmed { slot: *slot },
            None => ConfirmStatus::Pending,
        })
    }
}

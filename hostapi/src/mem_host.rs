//! In-memory host context for testing.
//!
//! `MemHost` implements `HostContext` over `BTreeMap`s. It tracks original
//! storage values for EIP-2200 classification and warm sets for EIP-2929,
//! and records logs, self-destructs and outgoing calls so tests can
//! inspect what an engine did.
//!
//! Nested calls are not executed: `call` records the message and returns
//! a configurable canned result. Embedders that need real nesting wrap a
//! `MemHost` and override `call`.

use std::collections::{BTreeMap, BTreeSet};

use bytes::Bytes;
use evmlink_primitives::{
    AccessStatus, Address, Bytes32, CallKind, ExecutionResult, Message, StatusCode,
    StorageStatus, TxContext,
};

use crate::traits::HostContext;
use crate::types::{Account, LogRecord, SelfdestructRecord, StorageSlot};

/// An outgoing call as the engine requested it, with borrowed data copied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub kind: CallKind,
    pub flags: u32,
    pub depth: i32,
    pub gas: i64,
    pub recipient: Address,
    pub sender: Address,
    pub input: Bytes,
    pub value: Bytes32,
}

/// In-memory world state.
#[derive(Debug, Clone, Default)]
pub struct MemHost {
    accounts: BTreeMap<Address, Account>,
    tx_context: TxContext,
    block_hashes: BTreeMap<i64, Bytes32>,
    warm_accounts: BTreeSet<Address>,
    warm_slots: BTreeSet<(Address, Bytes32)>,
    logs: Vec<LogRecord>,
    selfdestructs: Vec<SelfdestructRecord>,
    calls: Vec<RecordedCall>,
    call_output: Bytes,
    call_status: StatusCode,
}

impl MemHost {
    /// Create an empty world.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a world with the given transaction context.
    pub fn with_tx_context(tx_context: TxContext) -> Self {
        Self {
            tx_context,
            ..Self::default()
        }
    }

    /// Insert or replace an account.
    pub fn insert_account(&mut self, address: Address, account: Account) {
        self.accounts.insert(address, account);
    }

    /// Look up an account.
    pub fn account(&self, address: &Address) -> Option<&Account> {
        self.accounts.get(address)
    }

    /// Set a committed storage value (original and current).
    pub fn insert_storage(&mut self, address: Address, key: Bytes32, value: Bytes32) {
        self.accounts
            .entry(address)
            .or_default()
            .storage
            .insert(key, StorageSlot::committed(value));
    }

    /// Current value of a slot without touching access sets.
    pub fn storage(&self, address: &Address, key: &Bytes32) -> Bytes32 {
        self.accounts
            .get(address)
            .and_then(|acc| acc.storage.get(key))
            .map(|slot| slot.current)
            .unwrap_or_default()
    }

    pub fn set_block_hash(&mut self, number: i64, hash: Bytes32) {
        self.block_hashes.insert(number, hash);
    }

    pub fn tx_context_mut(&mut self) -> &mut TxContext {
        &mut self.tx_context
    }

    /// Configure the result returned by `call`. Gas is always returned unspent.
    pub fn set_call_result(&mut self, status: StatusCode, output: impl Into<Bytes>) {
        self.call_status = status;
        self.call_output = output.into();
    }

    /// Start a new transaction: current values become original values and
    /// all access sets go cold.
    pub fn begin_transaction(&mut self) {
        for account in self.accounts.values_mut() {
            for slot in account.storage.values_mut() {
                slot.original = slot.current;
            }
        }
        self.warm_accounts.clear();
        self.warm_slots.clear();
    }

    pub fn logs(&self) -> &[LogRecord] {
        &self.logs
    }

    pub fn selfdestructs(&self) -> &[SelfdestructRecord] {
        &self.selfdestructs
    }

    pub fn calls(&self) -> &[RecordedCall] {
        &self.calls
    }
}

impl HostContext for MemHost {
    fn account_exists(&mut self, address: &Address) -> bool {
        self.accounts.contains_key(address)
    }

    fn get_balance(&mut self, address: &Address) -> Bytes32 {
        self.accounts
            .get(address)
            .map(|acc| acc.balance)
            .unwrap_or_default()
    }

    fn get_code(&mut self, address: &Address) -> Bytes {
        self.accounts
            .get(address)
            .map(|acc| acc.code.clone())
            .unwrap_or_default()
    }

    fn get_code_hash(&mut self, address: &Address) -> Bytes32 {
        match self.accounts.get(address) {
            Some(acc) => Bytes32(*blake3::hash(&acc.code).as_bytes()),
            None => Bytes32::ZERO,
        }
    }

    fn selfdestruct(&mut self, address: &Address, beneficiary: &Address) -> bool {
        let first = !self.selfdestructs.iter().any(|r| r.address == *address);
        self.selfdestructs.push(SelfdestructRecord {
            address: *address,
            beneficiary: *beneficiary,
        });
        first
    }

    fn get_storage(&mut self, address: &Address, key: &Bytes32) -> Bytes32 {
        self.storage(address, key)
    }

    fn set_storage(
        &mut self,
        address: &Address,
        key: &Bytes32,
        value: &Bytes32,
    ) -> StorageStatus {
        let slot = self
            .accounts
            .entry(*address)
            .or_default()
            .storage
            .entry(*key)
            .or_default();
        let status = slot.classify(value);
        slot.current = *value;
        status
    }

    fn get_tx_context(&mut self) -> TxContext {
        self.tx_context.clone()
    }

    fn get_block_hash(&mut self, number: i64) -> Bytes32 {
        self.block_hashes.get(&number).copied().unwrap_or_default()
    }

    fn emit_log(&mut self, address: &Address, topics: &[Bytes32], data: &[u8]) {
        self.logs.push(LogRecord {
            address: *address,
            topics: topics.to_vec(),
            data: Bytes::copy_from_slice(data),
        });
    }

    fn call(&mut self, msg: &Message<'_>) -> ExecutionResult {
        self.calls.push(RecordedCall {
            kind: msg.kind,
            flags: msg.flags,
            depth: msg.depth,
            gas: msg.gas,
            recipient: msg.recipient,
            sender: msg.sender,
            input: Bytes::copy_from_slice(msg.input),
            value: msg.value,
        });
        ExecutionResult {
            status: self.call_status,
            gas_left: msg.gas,
            output: self.call_output.clone(),
            ..ExecutionResult::default()
        }
    }

    fn access_account(&mut self, address: &Address) -> AccessStatus {
        if self.warm_accounts.insert(*address) {
            AccessStatus::Cold
        } else {
            AccessStatus::Warm
        }
    }

    fn access_storage(&mut self, address: &Address, key: &Bytes32) -> AccessStatus {
        if self.warm_slots.insert((*address, *key)) {
            AccessStatus::Cold
        } else {
            AccessStatus::Warm
        }
    }
}

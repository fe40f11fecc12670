//! Host context trait: the operations an engine may request mid-execution.
//!
//! Each method corresponds to one entry of the host callback table
//! (`evmlink_primitives::ffi::HostInterface`). The bridge decodes the
//! engine's arguments, calls the method, and encodes the answer; this
//! trait only sees native types.
//!
//! Absence is reported as the all-zero value: a missing account has zero
//! balance, empty code and a zero code hash, and an unset slot reads zero.

use bytes::Bytes;
use evmlink_primitives::buffer::copy_window;
use evmlink_primitives::{
    AccessStatus, Address, Bytes32, ExecutionResult, Message, StorageStatus, TxContext,
};

/// Host-side implementation of the callbacks available to an engine.
///
/// An instance is lent to the bridge for one execution. Callbacks arrive
/// on the thread that called `execute`, possibly nested: `call` may itself
/// run another execution against the same context.
pub trait HostContext {
    // ── Accounts ──

    /// Whether the account exists.
    fn account_exists(&mut self, address: &Address) -> bool;

    /// Balance of the account, zero if absent.
    fn get_balance(&mut self, address: &Address) -> Bytes32;

    /// Full code of the account, empty if absent.
    fn get_code(&mut self, address: &Address) -> Bytes;

    /// Code length in bytes.
    fn get_code_size(&mut self, address: &Address) -> usize {
        self.get_code(address).len()
    }

    /// Code hash, zero if the account is absent.
    fn get_code_hash(&mut self, address: &Address) -> Bytes32;

    /// Copy code starting at `offset` into `buffer`, returning the number
    /// of bytes written (`min(buffer.len(), code_len - offset)`, or zero
    /// past the end).
    fn copy_code(&mut self, address: &Address, offset: usize, buffer: &mut [u8]) -> usize {
        let code = self.get_code(address);
        copy_window(&code, offset, buffer)
    }

    /// Register `address` for self-destruction in favor of `beneficiary`.
    /// Returns true the first time an account is registered.
    fn selfdestruct(&mut self, address: &Address, beneficiary: &Address) -> bool;

    // ── Storage ──

    /// Read a storage slot, zero if unset.
    fn get_storage(&mut self, address: &Address, key: &Bytes32) -> Bytes32;

    /// Write a storage slot and classify the effect of the write.
    fn set_storage(&mut self, address: &Address, key: &Bytes32, value: &Bytes32)
        -> StorageStatus;

    // ── Environment ──

    fn get_tx_context(&mut self) -> TxContext;

    /// Hash of block `number`, zero if unknown.
    fn get_block_hash(&mut self, number: i64) -> Bytes32;

    /// Record a log entry. `topics` holds at most four entries.
    fn emit_log(&mut self, address: &Address, topics: &[Bytes32], data: &[u8]);

    // ── Calls ──

    /// Perform a nested call or create on behalf of the engine.
    fn call(&mut self, msg: &Message<'_>) -> ExecutionResult;

    // ── Access lists (EIP-2929) ──

    /// Mark the account warm, reporting its previous state.
    fn access_account(&mut self, address: &Address) -> AccessStatus;

    /// Mark the slot warm, reporting its previous state.
    fn access_storage(&mut self, address: &Address, key: &Bytes32) -> AccessStatus;
}

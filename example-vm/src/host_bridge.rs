//! Engine-side host bridge: implements `HostContext` over the callback table.
//!
//! Each method marshals arguments into wire form, calls through the table
//! with the opaque context pointer, and decodes the answer. Out-of-range
//! answers from the host are mapped to the most conservative value.

use bytes::Bytes;
use evmlink_hostapi::HostContext;
use evmlink_primitives::buffer::OwnedResult;
use evmlink_primitives::codec::{decode_result, encode_message};
use evmlink_primitives::ffi::{HostContextHandle, HostInterface};
use evmlink_primitives::{
    AccessStatus, Address, Bytes32, ExecutionResult, Message, StatusCode, StorageStatus,
    TxContext,
};

/// The host as seen from inside one `execute` call.
pub struct HostBridge<'a> {
    table: &'a HostInterface,
    context: *mut HostContextHandle,
}

impl<'a> HostBridge<'a> {
    /// # Safety
    ///
    /// `context` must be the pointer the host passed to `execute` alongside
    /// `table`, and the bridge must not outlive that call.
    pub unsafe fn new(table: &'a HostInterface, context: *mut HostContextHandle) -> Self {
        Self { table, context }
    }
}

// SAFETY (all methods): arguments are live references for the duration of
// each call, and `context` is valid until `execute` returns.
impl HostContext for HostBridge<'_> {
    fn account_exists(&mut self, address: &Address) -> bool {
        unsafe { (self.table.account_exists)(self.context, address) }
    }

    fn get_balance(&mut self, address: &Address) -> Bytes32 {
        unsafe { (self.table.get_balance)(self.context, address) }
    }

    fn get_code(&mut self, address: &Address) -> Bytes {
        let size = self.get_code_size(address);
        let mut code = vec![0u8; size];
        let written = self.copy_code(address, 0, &mut code);
        code.truncate(written);
        Bytes::from(code)
    }

    fn get_code_size(&mut self, address: &Address) -> usize {
        unsafe { (self.table.get_code_size)(self.context, address) }
    }

    fn get_code_hash(&mut self, address: &Address) -> Bytes32 {
        unsafe { (self.table.get_code_hash)(self.context, address) }
    }

    fn copy_code(&mut self, address: &Address, offset: usize, buffer: &mut [u8]) -> usize {
        let written = unsafe {
            (self.table.copy_code)(
                self.context,
                address,
                offset,
                buffer.as_mut_ptr(),
                buffer.len(),
            )
        };
        written.min(buffer.len())
    }

    fn selfdestruct(&mut self, address: &Address, beneficiary: &Address) -> bool {
        unsafe { (self.table.selfdestruct)(self.context, address, beneficiary) }
    }

    fn get_storage(&mut self, address: &Address, key: &Bytes32) -> Bytes32 {
        unsafe { (self.table.get_storage)(self.context, address, key) }
    }

    fn set_storage(&mut self, address: &Address, key: &Bytes32, value: &Bytes32) -> StorageStatus {
        let raw = unsafe { (self.table.set_storage)(self.context, address, key, value) };
        StorageStatus::from_i32(raw).unwrap_or(StorageStatus::Assigned)
    }

    fn get_tx_context(&mut self) -> TxContext {
        let raw = unsafe { (self.table.get_tx_context)(self.context) };
        TxContext::from(&raw)
    }

    fn get_block_hash(&mut self, number: i64) -> Bytes32 {
        unsafe { (self.table.get_block_hash)(self.context, number) }
    }

    fn emit_log(&mut self, address: &Address, topics: &[Bytes32], data: &[u8]) {
        unsafe {
            (self.table.emit_log)(
                self.context,
                address,
                data.as_ptr(),
                data.len(),
                topics.as_ptr(),
                topics.len(),
            )
        }
    }

    fn call(&mut self, msg: &Message<'_>) -> ExecutionResult {
        let raw_msg = encode_message(msg);
        let raw = unsafe { (self.table.call)(self.context, &raw_msg) };
        // The host's output buffer is released when `owned` drops.
        let owned = unsafe { OwnedResult::from_raw(raw) };
        decode_result(&owned, msg.kind)
            .unwrap_or_else(|_| ExecutionResult::with_status(StatusCode::INTERNAL_ERROR, 0))
    }

    fn access_account(&mut self, address: &Address) -> AccessStatus {
        let raw = unsafe { (self.table.access_account)(self.context, address) };
        AccessStatus::from_i32(raw).unwrap_or(AccessStatus::Cold)
    }

    fn access_storage(&mut self, address: &Address, key: &Bytes32) -> AccessStatus {
        let raw = unsafe { (self.table.access_storage)(self.context, address, key) };
        AccessStatus::from_i32(raw).unwrap_or(AccessStatus::Cold)
    }
}

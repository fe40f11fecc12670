//! The fixed-layout wire contract between a host and an engine module.
//!
//! Every structure here is `#[repr(C)]` and every function pointer is
//! `extern "C"`. Enumerations travel as raw integers so that an
//! out-of-range value from the other side is a decoding error, not
//! undefined behavior.
//!
//! Lifecycle of a module:
//!
//! 1. The host resolves a [`CreateFn`] symbol and calls it.
//! 2. The returned [`VmDescriptor`] must carry [`CONTRACT_VERSION`] as its
//!    first field; nothing else is read if it does not.
//! 3. The host calls `execute` any number of times, passing a
//!    [`HostInterface`] table and an opaque [`HostContextHandle`].
//! 4. The host calls `destroy` exactly once.

use core::ffi::c_char;

use crate::types::{Address, Bytes32};

/// Version of this contract. Bumped whenever any layout below changes.
pub const CONTRACT_VERSION: i32 = 1;

/// Prefix of the name-derived discovery symbol (`evmlink_create_<name>`).
pub const CREATE_SYMBOL_PREFIX: &str = "evmlink_create_";

/// Discovery symbol tried when no name-derived symbol is exported.
pub const DEFAULT_CREATE_SYMBOL: &str = "evmlink_create";

/// `set_option` outcome codes.
pub const SET_OPTION_SUCCESS: i32 = 0;
pub const SET_OPTION_INVALID_NAME: i32 = 1;
pub const SET_OPTION_INVALID_VALUE: i32 = 2;

/// Opaque per-execution host context. Engines only pass the pointer back.
#[repr(C)]
pub struct HostContextHandle {
    _private: [u8; 0],
}

/// A call or create request.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RawMessage {
    pub kind: i32,
    pub flags: u32,
    pub depth: i32,
    pub gas: i64,
    pub recipient: Address,
    pub sender: Address,
    pub input_data: *const u8,
    pub input_size: usize,
    pub value: Bytes32,
    pub create2_salt: Bytes32,
    pub code_address: Address,
}

/// Releases the output buffer of the result it is attached to.
pub type ReleaseResultFn = unsafe extern "C" fn(result: *const RawResult);

/// An execution outcome.
///
/// Whoever produced a result with non-null `output_data` also set
/// `release`; the receiver must call it exactly once. Deliberately not
/// `Copy`.
#[repr(C)]
#[derive(Debug)]
pub struct RawResult {
    pub status_code: i32,
    pub gas_left: i64,
    pub gas_refund: i64,
    pub output_data: *const u8,
    pub output_size: usize,
    pub release: Option<ReleaseResultFn>,
    pub create_address: Address,
    pub padding: [u8; 4],
}

impl RawResult {
    /// A result with no output buffer.
    pub fn empty(status_code: i32, gas_left: i64) -> Self {
        Self {
            status_code,
            gas_left,
            gas_refund: 0,
            output_data: core::ptr::null(),
            output_size: 0,
            release: None,
            create_address: Address::ZERO,
            padding: [0; 4],
        }
    }
}

/// Transaction and block parameters.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct RawTxContext {
    pub tx_gas_price: Bytes32,
    pub tx_origin: Address,
    pub block_coinbase: Address,
    pub block_number: i64,
    pub block_timestamp: i64,
    pub block_gas_limit: i64,
    pub block_prev_randao: Bytes32,
    pub chain_id: Bytes32,
    pub block_base_fee: Bytes32,
}

// ── Host callbacks ──

pub type AccountExistsFn =
    unsafe extern "C" fn(context: *mut HostContextHandle, address: *const Address) -> bool;

pub type GetStorageFn = unsafe extern "C" fn(
    context: *mut HostContextHandle,
    address: *const Address,
    key: *const Bytes32,
) -> Bytes32;

/// Returns a storage status discriminant.
pub type SetStorageFn = unsafe extern "C" fn(
    context: *mut HostContextHandle,
    address: *const Address,
    key: *const Bytes32,
    value: *const Bytes32,
) -> i32;

pub type GetBalanceFn =
    unsafe extern "C" fn(context: *mut HostContextHandle, address: *const Address) -> Bytes32;

pub type GetCodeSizeFn =
    unsafe extern "C" fn(context: *mut HostContextHandle, address: *const Address) -> usize;

pub type GetCodeHashFn =
    unsafe extern "C" fn(context: *mut HostContextHandle, address: *const Address) -> Bytes32;

/// Copies up to `buffer_size` code bytes from `code_offset`; returns the
/// count written.
pub type CopyCodeFn = unsafe extern "C" fn(
    context: *mut HostContextHandle,
    address: *const Address,
    code_offset: usize,
    buffer_data: *mut u8,
    buffer_size: usize,
) -> usize;

pub type SelfdestructFn = unsafe extern "C" fn(
    context: *mut HostContextHandle,
    address: *const Address,
    beneficiary: *const Address,
) -> bool;

pub type GetTxContextFn = unsafe extern "C" fn(context: *mut HostContextHandle) -> RawTxContext;

pub type GetBlockHashFn =
    unsafe extern "C" fn(context: *mut HostContextHandle, number: i64) -> Bytes32;

pub type EmitLogFn = unsafe extern "C" fn(
    context: *mut HostContextHandle,
    address: *const Address,
    data: *const u8,
    data_size: usize,
    topics: *const Bytes32,
    topics_count: usize,
);

/// The returned result's output belongs to the host; the engine releases it.
pub type CallFn =
    unsafe extern "C" fn(context: *mut HostContextHandle, msg: *const RawMessage) -> RawResult;

/// Returns an access status discriminant.
pub type AccessAccountFn =
    unsafe extern "C" fn(context: *mut HostContextHandle, address: *const Address) -> i32;

/// Returns an access status discriminant.
pub type AccessStorageFn = unsafe extern "C" fn(
    context: *mut HostContextHandle,
    address: *const Address,
    key: *const Bytes32,
) -> i32;

/// The table of host callbacks handed to every `execute`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct HostInterface {
    pub account_exists: AccountExistsFn,
    pub get_storage: GetStorageFn,
    pub set_storage: SetStorageFn,
    pub get_balance: GetBalanceFn,
    pub get_code_size: GetCodeSizeFn,
    pub get_code_hash: GetCodeHashFn,
    pub copy_code: CopyCodeFn,
    pub selfdestruct: SelfdestructFn,
    pub get_tx_context: GetTxContextFn,
    pub get_block_hash: GetBlockHashFn,
    pub emit_log: EmitLogFn,
    pub call: CallFn,
    pub access_account: AccessAccountFn,
    pub access_storage: AccessStorageFn,
}

// ── Module entry points ──

pub type DestroyFn = unsafe extern "C" fn(vm: *mut VmDescriptor);

pub type ExecuteFn = unsafe extern "C" fn(
    vm: *mut VmDescriptor,
    host: *const HostInterface,
    context: *mut HostContextHandle,
    revision: i32,
    msg: *const RawMessage,
    code: *const u8,
    code_size: usize,
) -> RawResult;

/// Returns one of the `SET_OPTION_*` codes.
pub type SetOptionFn =
    unsafe extern "C" fn(vm: *mut VmDescriptor, name: *const c_char, value: *const c_char) -> i32;

/// Signature of the discovery symbol. Returns null on failure.
pub type CreateFn = unsafe extern "C" fn() -> *mut VmDescriptor;

/// Descriptor returned by a module's create function.
///
/// Engines embed it as the first field of their own `#[repr(C)]` instance
/// struct and cast the pointer back in their entry points.
#[repr(C)]
#[derive(Debug)]
pub struct VmDescriptor {
    pub contract_version: i32,
    pub name: *const c_char,
    pub version: *const c_char,
    pub capabilities: u32,
    pub destroy: Option<DestroyFn>,
    pub execute: Option<ExecuteFn>,
    pub set_option: Option<SetOptionFn>,
}

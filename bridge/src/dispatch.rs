//! Host callback dispatcher: the `extern "C"` table handed to engines.
//!
//! Every entry follows the same shape:
//!
//! 1. Turn the context pointer back into a token and look it up.
//! 2. Decode the engine's arguments into native values.
//! 3. Call the matching `HostContext` method with the registry unlocked.
//! 4. Encode the answer.
//!
//! A failure in steps 1–2 (or a panicking host) is a protocol violation:
//! it is logged, aborts the process in debug builds, and otherwise yields
//! a neutral value.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};

use evmlink_hostapi::HostContext;
use evmlink_primitives::buffer::{borrowed_slice, borrowed_slice_mut};
use evmlink_primitives::codec::decode_message;
use evmlink_primitives::ffi::{
    HostContextHandle, HostInterface, RawMessage, RawResult, RawTxContext,
};
use evmlink_primitives::{
    AccessStatus, Address, Bytes32, CodecError, StatusCode, StorageStatus,
};
use tracing::{error, trace};

use crate::error::ProtocolError;
use crate::memory::into_raw_result;
use crate::registry::{self, HandleToken};

/// Maximum number of log topics.
const MAX_TOPICS: usize = 4;

static VIOLATIONS: AtomicUsize = AtomicUsize::new(0);

/// The callback table passed to every engine `execute`.
pub static HOST_INTERFACE: HostInterface = HostInterface {
    account_exists,
    get_storage,
    set_storage,
    get_balance,
    get_code_size,
    get_code_hash,
    copy_code,
    selfdestruct,
    get_tx_context,
    get_block_hash,
    emit_log,
    call,
    access_account,
    access_storage,
};

/// Report a broken calling contract. Fatal in debug builds, except under
/// this crate's unit tests, which observe it through [`violation_count`].
pub(crate) fn violation(operation: &'static str, err: ProtocolError) {
    VIOLATIONS.fetch_add(1, Ordering::Relaxed);
    error!(operation, %err, "engine protocol violation");
    if cfg!(all(debug_assertions, not(test))) {
        std::process::abort();
    }
}

/// Number of protocol violations reported since process start.
pub fn violation_count() -> usize {
    VIOLATIONS.load(Ordering::Relaxed)
}

/// Resolve the context and run `f` against it, falling back on violation.
///
/// # Safety
///
/// Must only be called from a callback entry point with the context
/// pointer the engine was given.
unsafe fn with_context<R>(
    context: *mut HostContextHandle,
    operation: &'static str,
    fallback: R,
    f: impl FnOnce(&mut dyn HostContext) -> Result<R, ProtocolError>,
) -> R {
    let token = HandleToken::from_context_ptr(context);
    trace!(operation, token = token.get(), "host callback");

    // The registry lock is released before `f` runs.
    let host = match registry::global().lookup(token) {
        Ok(ptr) => ptr,
        Err(err) => {
            violation(operation, err);
            return fallback;
        }
    };

    match catch_unwind(AssertUnwindSafe(|| f(host.as_mut()))) {
        Ok(Ok(value)) => value,
        Ok(Err(err)) => {
            violation(operation, err);
            fallback
        }
        Err(_) => {
            error!(operation, token = token.get(), "host callback panicked");
            fallback
        }
    }
}

/// Borrow a pointer argument, rejecting null.
unsafe fn arg<'a, T>(ptr: *const T) -> Result<&'a T, ProtocolError> {
    ptr.as_ref()
        .ok_or(ProtocolError::Malformed(CodecError::NullData(std::mem::size_of::<T>())))
}

// ── Accounts ──

unsafe extern "C" fn account_exists(
    context: *mut HostContextHandle,
    address: *const Address,
) -> bool {
    with_context(context, "account_exists", false, |host| {
        Ok(host.account_exists(arg(address)?))
    })
}

unsafe extern "C" fn get_balance(
    context: *mut HostContextHandle,
    address: *const Address,
) -> Bytes32 {
    with_context(context, "get_balance", Bytes32::ZERO, |host| {
        Ok(host.get_balance(arg(address)?))
    })
}

unsafe extern "C" fn get_code_size(
    context: *mut HostContextHandle,
    address: *const Address,
) -> usize {
    with_context(context, "get_code_size", 0, |host| {
        Ok(host.get_code_size(arg(address)?))
    })
}

unsafe extern "C" fn get_code_hash(
    context: *mut HostContextHandle,
    address: *const Address,
) -> Bytes32 {
    with_context(context, "get_code_hash", Bytes32::ZERO, |host| {
        Ok(host.get_code_hash(arg(address)?))
    })
}

unsafe extern "C" fn copy_code(
    context: *mut HostContextHandle,
    address: *const Address,
    code_offset: usize,
    buffer_data: *mut u8,
    buffer_size: usize,
) -> usize {
    with_context(context, "copy_code", 0, |host| {
        let address = arg(address)?;
        let buffer = borrowed_slice_mut(buffer_data, buffer_size)?;
        // Never report more than the engine's buffer holds.
        Ok(host.copy_code(address, code_offset, buffer).min(buffer_size))
    })
}

unsafe extern "C" fn selfdestruct(
    context: *mut HostContextHandle,
    address: *const Address,
    beneficiary: *const Address,
) -> bool {
    with_context(context, "selfdestruct", false, |host| {
        Ok(host.selfdestruct(arg(address)?, arg(beneficiary)?))
    })
}

// ── Storage ──

unsafe extern "C" fn get_storage(
    context: *mut HostContextHandle,
    address: *const Address,
    key: *const Bytes32,
) -> Bytes32 {
    with_context(context, "get_storage", Bytes32::ZERO, |host| {
        Ok(host.get_storage(arg(address)?, arg(key)?))
    })
}

unsafe extern "C" fn set_storage(
    context: *mut HostContextHandle,
    address: *const Address,
    key: *const Bytes32,
    value: *const Bytes32,
) -> i32 {
    let fallback = StorageStatus::Assigned.as_i32();
    with_context(context, "set_storage", fallback, |host| {
        let status = host.set_storage(arg(address)?, arg(key)?, arg(value)?);
        Ok(status.as_i32())
    })
}

// ── Environment ──

unsafe extern "C" fn get_tx_context(context: *mut HostContextHandle) -> RawTxContext {
    with_context(context, "get_tx_context", RawTxContext::default(), |host| {
        Ok(RawTxContext::from(&host.get_tx_context()))
    })
}

unsafe extern "C" fn get_block_hash(context: *mut HostContextHandle, number: i64) -> Bytes32 {
    with_context(context, "get_block_hash", Bytes32::ZERO, |host| {
        Ok(host.get_block_hash(number))
    })
}

unsafe extern "C" fn emit_log(
    context: *mut HostContextHandle,
    address: *const Address,
    data: *const u8,
    data_size: usize,
    topics: *const Bytes32,
    topics_count: usize,
) {
    with_context(context, "emit_log", (), |host| {
        let address = arg(address)?;
        let data = borrowed_slice(data, data_size)?;
        let topics = topic_slice(topics, topics_count)?;
        host.emit_log(address, topics, data);
        Ok(())
    })
}

unsafe fn topic_slice<'a>(
    topics: *const Bytes32,
    count: usize,
) -> Result<&'a [Bytes32], ProtocolError> {
    if count > MAX_TOPICS {
        return Err(CodecError::BadLength {
            expected: MAX_TOPICS,
            got: count,
        }
        .into());
    }
    if count == 0 {
        return Ok(&[]);
    }
    if topics.is_null() {
        return Err(CodecError::NullData(count * std::mem::size_of::<Bytes32>()).into());
    }
    Ok(std::slice::from_raw_parts(topics, count))
}

// ── Calls ──

unsafe extern "C" fn call(context: *mut HostContextHandle, msg: *const RawMessage) -> RawResult {
    let fallback = RawResult::empty(StatusCode::INTERNAL_ERROR.as_i32(), 0);
    with_context(context, "call", fallback, |host| {
        let message = decode_message(arg(msg)?)?;
        Ok(into_raw_result(host.call(&message)))
    })
}

// ── Access lists ──

unsafe extern "C" fn access_account(
    context: *mut HostContextHandle,
    address: *const Address,
) -> i32 {
    with_context(context, "access_account", AccessStatus::Cold.as_i32(), |host| {
        Ok(host.access_account(arg(address)?).as_i32())
    })
}

unsafe extern "C" fn access_storage(
    context: *mut HostContextHandle,
    address: *const Address,
    key: *const Bytes32,
) -> i32 {
    with_context(context, "access_storage", AccessStatus::Cold.as_i32(), |host| {
        Ok(host.access_storage(arg(address)?, arg(key)?).as_i32())
    })
}

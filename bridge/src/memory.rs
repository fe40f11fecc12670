//! Host-side output buffers handed to engines.
//!
//! When a host `call` produces output, the engine receives a pointer to a
//! host allocation plus [`release_host_output`]. The ledger below records
//! every outstanding allocation so a second release, or a release of a
//! buffer this host never issued, is caught before anything is freed.

use std::collections::HashMap;

use evmlink_primitives::ffi::RawResult;
use evmlink_primitives::ExecutionResult;
use once_cell::sync::Lazy;
use parking_lot::Mutex;

use crate::error::ProtocolError;

/// Outstanding allocations: address → length.
static OUTSTANDING: Lazy<Mutex<HashMap<usize, usize>>> = Lazy::new(|| Mutex::new(HashMap::new()));

/// Convert a host result into wire form, transferring its output to the
/// engine. Empty output yields a null pointer and no release function.
pub fn into_raw_result(result: ExecutionResult) -> RawResult {
    let mut raw = RawResult::empty(result.status.as_i32(), result.gas_left);
    raw.gas_refund = result.gas_refund;
    raw.create_address = result.create_address.unwrap_or_default();

    if !result.output.is_empty() {
        let buffer = Vec::<u8>::from(result.output).into_boxed_slice();
        let len = buffer.len();
        let data = Box::into_raw(buffer) as *mut u8;
        OUTSTANDING.lock().insert(data as usize, len);
        raw.output_data = data;
        raw.output_size = len;
        raw.release = Some(release_host_output);
    }
    raw
}

/// Free a buffer previously issued by [`into_raw_result`].
///
/// The ledger entry must match both address and length; otherwise nothing
/// is freed and [`ProtocolError::UnknownBuffer`] is returned.
pub fn reclaim(data: *const u8, len: usize) -> Result<(), ProtocolError> {
    let addr = data as usize;
    {
        let mut outstanding = OUTSTANDING.lock();
        match outstanding.get(&addr) {
            Some(&issued) if issued == len => {
                outstanding.remove(&addr);
            }
            _ => return Err(ProtocolError::UnknownBuffer(addr)),
        }
    }
    // SAFETY: the ledger proves this exact allocation came from
    // `into_raw_result` as a Box<[u8]> of `len` bytes and has not been freed.
    unsafe {
        drop(Box::from_raw(std::ptr::slice_from_raw_parts_mut(
            data as *mut u8,
            len,
        )));
    }
    Ok(())
}

/// Number of host buffers not yet released.
pub fn outstanding_count() -> usize {
    OUTSTANDING.lock().len()
}

/// Release function attached to host-produced results.
///
/// # Safety
///
/// `result` must point to a result produced by [`into_raw_result`].
pub unsafe extern "C" fn release_host_output(result: *const RawResult) {
    if result.is_null() {
        crate::dispatch::violation("release", ProtocolError::UnknownBuffer(0));
        return;
    }
    let result = &*result;
    if let Err(err) = reclaim(result.output_data, result.output_size) {
        crate::dispatch::violation("release", err);
    }
}

//! Exported entry points.
//!
//! - `evmlink_create_example_vm` / `evmlink_create` — allocate an instance
//! - `destroy` — free it
//! - `execute` — interpret code, calling back into the host
//! - `set_option` — `verbose` in -1..=9
//!
//! Outputs are handed to the host as boxed slices with `release_output`
//! attached. None of these functions may unwind.

use std::ffi::{c_char, CStr};
use std::sync::atomic::{AtomicI32, Ordering};

use evmlink_primitives::buffer::borrowed_slice;
use evmlink_primitives::codec::decode_message;
use evmlink_primitives::ffi::{
    HostContextHandle, HostInterface, RawMessage, RawResult, VmDescriptor, CONTRACT_VERSION,
    SET_OPTION_INVALID_NAME, SET_OPTION_INVALID_VALUE, SET_OPTION_SUCCESS,
};
use evmlink_primitives::{Capability, Revision, StatusCode};
use tracing::debug;

use crate::host_bridge::HostBridge;
use crate::interpreter::{self, Outcome};

const NAME: &[u8] = b"example_vm\0";
const VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();

/// Instance layout. The descriptor must stay the first field.
#[repr(C)]
struct ExampleVm {
    descriptor: VmDescriptor,
    verbose: AtomicI32,
}

/// Create an instance.
#[no_mangle]
pub extern "C" fn evmlink_create_example_vm() -> *mut VmDescriptor {
    let vm = Box::new(ExampleVm {
        descriptor: VmDescriptor {
            contract_version: CONTRACT_VERSION,
            name: NAME.as_ptr() as *const c_char,
            version: VERSION.as_ptr() as *const c_char,
            capabilities: Capability::Evm1.bit(),
            destroy: Some(destroy),
            execute: Some(execute),
            set_option: Some(set_option),
        },
        verbose: AtomicI32::new(0),
    });
    Box::into_raw(vm) as *mut VmDescriptor
}

/// Generic discovery symbol, for when the library is renamed.
#[no_mangle]
pub extern "C" fn evmlink_create() -> *mut VmDescriptor {
    evmlink_create_example_vm()
}

unsafe extern "C" fn destroy(vm: *mut VmDescriptor) {
    if vm.is_null() {
        return;
    }
    drop(Box::from_raw(vm as *mut ExampleVm));
}

unsafe extern "C" fn execute(
    vm: *mut VmDescriptor,
    host: *const HostInterface,
    context: *mut HostContextHandle,
    revision: i32,
    msg: *const RawMessage,
    code: *const u8,
    code_size: usize,
) -> RawResult {
    let internal_error = || RawResult::empty(StatusCode::INTERNAL_ERROR.as_i32(), 0);

    let (Some(vm), Some(table), Some(raw_msg)) = (
        (vm as *const ExampleVm).as_ref(),
        host.as_ref(),
        msg.as_ref(),
    ) else {
        return internal_error();
    };
    let Ok(revision) = Revision::from_i32(revision) else {
        return RawResult::empty(StatusCode::REJECTED.as_i32(), 0);
    };
    let (Ok(mut message), Ok(code)) = (decode_message(raw_msg), borrowed_slice(code, code_size))
    else {
        return internal_error();
    };
    message.code = code;

    let verbose = vm.verbose.load(Ordering::Relaxed);
    if verbose >= 1 {
        debug!(?revision, depth = message.depth, gas = message.gas, code_size, "execution started");
    }

    let mut bridge = HostBridge::new(table, context);
    let outcome = interpreter::execute(&mut bridge, revision, &message, verbose);

    if verbose >= 1 {
        debug!(status = %outcome.status, gas_left = outcome.gas_left, "execution finished");
    }
    into_raw(outcome)
}

fn into_raw(outcome: Outcome) -> RawResult {
    let mut raw = RawResult::empty(outcome.status.as_i32(), outcome.gas_left);
    raw.gas_refund = outcome.gas_refund;
    if !outcome.output.is_empty() {
        let output = outcome.output.into_boxed_slice();
        raw.output_size = output.len();
        raw.output_data = Box::into_raw(output) as *const u8;
        raw.release = Some(release_output);
    }
    raw
}

unsafe extern "C" fn release_output(result: *const RawResult) {
    let Some(result) = result.as_ref() else {
        return;
    };
    if result.output_data.is_null() {
        return;
    }
    drop(Box::from_raw(std::ptr::slice_from_raw_parts_mut(
        result.output_data as *mut u8,
        result.output_size,
    )));
}

unsafe extern "C" fn set_option(
    vm: *mut VmDescriptor,
    name: *const c_char,
    value: *const c_char,
) -> i32 {
    let Some(vm) = (vm as *const ExampleVm).as_ref() else {
        return SET_OPTION_INVALID_NAME;
    };
    if name.is_null() || CStr::from_ptr(name).to_bytes() != b"verbose" {
        return SET_OPTION_INVALID_NAME;
    }
    if value.is_null() {
        return SET_OPTION_INVALID_VALUE;
    }
    let level = CStr::from_ptr(value)
        .to_str()
        .ok()
        .and_then(|text| text.trim().parse::<i32>().ok())
        .filter(|level| (-1..=9).contains(level));
    match level {
        Some(level) => {
            vm.verbose.store(level, Ordering::Relaxed);
            SET_OPTION_SUCCESS
        }
        None => SET_OPTION_INVALID_VALUE,
    }
}

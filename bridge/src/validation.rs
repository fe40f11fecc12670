//! Module descriptor validation: contract compatibility checks.
//!
//! A descriptor returned by a create function is accepted only if:
//!
//! 1. Its contract version equals `CONTRACT_VERSION` (checked first; no
//!    other field is read otherwise, since the layout may differ)
//! 2. `name` and `version` are non-null UTF-8 strings
//! 3. `execute` and `destroy` are present

use std::ffi::CStr;
use std::ptr::NonNull;

use evmlink_primitives::ffi::{DestroyFn, ExecuteFn, SetOptionFn, VmDescriptor, CONTRACT_VERSION};
use tracing::warn;

use crate::error::BridgeError;

/// The parts of an accepted descriptor the bridge keeps.
#[derive(Debug)]
pub struct ValidDescriptor {
    pub name: String,
    pub version: String,
    pub capabilities: u32,
    pub execute: ExecuteFn,
    pub destroy: DestroyFn,
    pub set_option: Option<SetOptionFn>,
}

/// Validate a freshly created descriptor.
///
/// # Safety
///
/// `vm` must point to a live descriptor whose first field is an `i32`.
pub unsafe fn validate_descriptor(
    vm: NonNull<VmDescriptor>,
) -> Result<ValidDescriptor, BridgeError> {
    // The version is the only field with a stable offset across versions.
    let found = vm.cast::<i32>().as_ptr().read();
    if found != CONTRACT_VERSION {
        return Err(BridgeError::IncompatibleVersion {
            expected: CONTRACT_VERSION,
            found,
        });
    }

    let desc = vm.as_ref();
    let name = read_str(desc.name, "name")?;
    let version = read_str(desc.version, "version")?;
    let execute = desc
        .execute
        .ok_or_else(|| BridgeError::InvalidDescriptor("missing execute".into()))?;
    let destroy = desc
        .destroy
        .ok_or_else(|| BridgeError::InvalidDescriptor("missing destroy".into()))?;

    Ok(ValidDescriptor {
        name,
        version,
        capabilities: desc.capabilities,
        execute,
        destroy,
        set_option: desc.set_option,
    })
}

/// Dispose of a descriptor that failed validation.
///
/// A descriptor of another contract version is leaked: its `destroy`
/// cannot be located safely.
///
/// # Safety
///
/// `vm` must point to a live descriptor that is not used afterwards.
pub unsafe fn discard(vm: NonNull<VmDescriptor>) {
    let version = vm.cast::<i32>().as_ptr().read();
    if version != CONTRACT_VERSION {
        warn!(version, "leaking module instance of unknown contract version");
        return;
    }
    if let Some(destroy) = vm.as_ref().destroy {
        destroy(vm.as_ptr());
    }
}

unsafe fn read_str(ptr: *const std::ffi::c_char, field: &str) -> Result<String, BridgeError> {
    if ptr.is_null() {
        return Err(BridgeError::InvalidDescriptor(format!("{field} is null")));
    }
    CStr::from_ptr(ptr)
        .to_str()
        .map(str::to_owned)
        .map_err(|_| BridgeError::InvalidDescriptor(format!("{field} is not UTF-8")))
}

//! Module loading and lifecycle tests with hand-built descriptors.

use std::ffi::c_char;
use std::ptr;
use std::sync::atomic::{AtomicUsize, Ordering};

use evmlink_bridge::{BridgeError, Message, Revision, StatusCode, Vm};
use evmlink_hostapi::MemHost;
use evmlink_primitives::ffi::{
    HostContextHandle, HostInterface, RawMessage, RawResult, VmDescriptor, CONTRACT_VERSION,
};

// ── Fixture module ──

static DESTROYED: AtomicUsize = AtomicUsize::new(0);

unsafe extern "C" fn counting_destroy(vm: *mut VmDescriptor) {
    drop(Box::from_raw(vm));
    DESTROYED.fetch_add(1, Ordering::SeqCst);
}

unsafe extern "C" fn fixed_execute(
    _vm: *mut VmDescriptor,
    _host: *const HostInterface,
    _context: *mut HostContextHandle,
    _revision: i32,
    msg: *const RawMessage,
    _code: *const u8,
    _code_size: usize,
) -> RawResult {
    let gas = msg.as_ref().map(|msg| msg.gas).unwrap_or(0);
    RawResult::empty(StatusCode::SUCCESS.as_i32(), gas / 2)
}

fn descriptor(contract_version: i32) -> *mut VmDescriptor {
    Box::into_raw(Box::new(VmDescriptor {
        contract_version,
        name: b"fixture\0".as_ptr() as *const c_char,
        version: b"0.0.1\0".as_ptr() as *const c_char,
        capabilities: 0,
        destroy: Some(counting_destroy),
        execute: Some(fixed_execute),
        set_option: None,
    }))
}

unsafe extern "C" fn create_fixture() -> *mut VmDescriptor {
    descriptor(CONTRACT_VERSION)
}

unsafe extern "C" fn create_future_version() -> *mut VmDescriptor {
    descriptor(999)
}

unsafe extern "C" fn create_without_execute() -> *mut VmDescriptor {
    let vm = descriptor(CONTRACT_VERSION);
    (*vm).execute = None;
    vm
}

unsafe extern "C" fn create_null() -> *mut VmDescriptor {
    ptr::null_mut()
}

// ── Test: creation failures ──

#[test]
fn test_null_instance() {
    let err = unsafe { Vm::from_create_fn(create_null) }.unwrap_err();
    assert!(matches!(err, BridgeError::InstanceCreationFailure));
}

#[test]
fn test_incompatible_version() {
    let err = unsafe { Vm::from_create_fn(create_future_version) }.unwrap_err();
    assert!(matches!(
        err,
        BridgeError::IncompatibleVersion { expected: CONTRACT_VERSION, found: 999 }
    ));
    assert!(err.to_string().contains("999"));
}

#[test]
fn test_invalid_descriptor_is_destroyed() {
    let before = DESTROYED.load(Ordering::SeqCst);
    let err = unsafe { Vm::from_create_fn(create_without_execute) }.unwrap_err();
    assert!(matches!(err, BridgeError::InvalidDescriptor(_)));
    assert!(DESTROYED.load(Ordering::SeqCst) > before);
}

// ── Test: lifecycle ──

#[test]
fn test_fixture_executes_and_has_no_options() {
    let mut vm = unsafe { Vm::from_create_fn(create_fixture) }.unwrap();
    assert_eq!(vm.name(), "fixture");
    assert_eq!(vm.version(), "0.0.1");
    assert_eq!(vm.capabilities(), 0);

    let mut host = MemHost::new();
    let msg = Message {
        gas: 100,
        ..Message::default()
    };
    let result = vm.execute(&mut host, Revision::Cancun, &msg);
    assert_eq!(result.status, StatusCode::SUCCESS);
    assert_eq!(result.gas_left, 50);

    assert!(matches!(
        vm.set_option("verbose", "1"),
        Err(BridgeError::UnknownOption { name }) if name == "verbose"
    ));
}

#[test]
fn test_destroy_runs_once() {
    let vm = unsafe { Vm::from_create_fn(create_fixture) }.unwrap();
    let before = DESTROYED.load(Ordering::SeqCst);
    vm.destroy();
    // Other tests in this file may destroy fixtures concurrently.
    assert!(DESTROYED.load(Ordering::SeqCst) >= before + 1);
}

#[test]
fn test_debug_output() {
    let vm = unsafe { Vm::from_create_fn(create_fixture) }.unwrap();
    let text = format!("{vm:?}");
    assert!(text.contains("fixture"));
    assert!(text.contains("dynamic: false"));
}

// ── Test: dynamic loading errors ──

#[test]
fn test_empty_path() {
    assert!(matches!(Vm::load(""), Err(BridgeError::InvalidArgument(_))));
}

#[test]
fn test_missing_library() {
    let err = Vm::load("/nonexistent/dir/libno_such_vm.so").unwrap_err();
    assert!(matches!(err, BridgeError::CannotOpen { .. }));
    assert!(err.to_string().contains("libno_such_vm.so"));
}

#[test]
fn test_config_syntax_errors() {
    for config in ["", ",verbose=1", "vm.so,=1", "vm.so,,x"] {
        assert!(
            matches!(
                Vm::load_and_configure(config),
                Err(BridgeError::InvalidConfigSyntax(_))
            ),
            "config {config:?} should be rejected"
        );
    }
}

#[cfg(all(target_os = "linux", target_env = "gnu"))]
#[test]
fn test_library_without_create_symbol() {
    match Vm::load("libc.so.6") {
        Err(BridgeError::SymbolNotFound { tried, .. }) => {
            assert_eq!(tried, vec!["evmlink_create_c".to_owned(), "evmlink_create".to_owned()]);
        }
        other => panic!("expected SymbolNotFound, got {other:?}"),
    }
}

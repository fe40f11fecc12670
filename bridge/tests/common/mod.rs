//! Shared test helpers for integration tests.
//!
//! Provides engine factories (in-process and from the built shared
//! library), message builders, and `NestingHost`, a host whose `call`
//! re-enters the engine.

#![allow(dead_code)]

use std::path::PathBuf;

use bytes::Bytes;
use evmlink_bridge::{
    registry, AccessStatus, Address, Bytes32, ExecutionResult, HostContext, Message, Revision,
    StorageStatus, TxContext, Vm,
};
use evmlink_hostapi::MemHost;

/// Output returned by test hosts for outgoing calls.
pub const CALL_OUTPUT: &[u8] = b"output from testHostContext.Call()";

/// `NUMBER; PUSH1 0; MSTORE; MSIZE; PUSH1 0; RETURN`
pub const NUMBER_CODE: &[u8] = &[0x43, 0x60, 0x00, 0x52, 0x59, 0x60, 0x00, 0xf3];

/// `PUSH1 34; PUSH1 0; DUP1 x5; CALL; MSIZE; PUSH1 0; RETURN`
pub const CALL_CODE: &[u8] = &[
    0x60, 0x22, 0x60, 0x00, 0x80, 0x80, 0x80, 0x80, 0x80, 0xf1, 0x59, 0x60, 0x00, 0xf3,
];

// ── Engines ──

/// The example engine linked into this test binary.
pub fn example_vm() -> Vm {
    unsafe { Vm::from_create_fn(example_vm::evmlink_create_example_vm) }
        .expect("in-process example vm must load")
}

/// Path of the built example engine shared library, if present.
///
/// Honors `EVMLINK_EXAMPLE_VM`, then looks in the workspace target dir.
pub fn example_vm_artifact() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os("EVMLINK_EXAMPLE_VM") {
        return Some(PathBuf::from(path));
    }
    let file_name = format!(
        "{}example_vm{}",
        std::env::consts::DLL_PREFIX,
        std::env::consts::DLL_SUFFIX
    );
    let target = std::env::var_os("CARGO_TARGET_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/../target")));
    ["debug", "release"]
        .iter()
        .flat_map(|profile| {
            [
                target.join(profile).join(&file_name),
                target.join(profile).join("deps").join(&file_name),
            ]
        })
        .find(|path| path.exists())
}

// ── Messages ──

pub fn addr(n: u8) -> Address {
    Address([n; 20])
}

/// A plain call to `addr(0xaa)` running `code`.
pub fn message(code: &[u8], gas: i64) -> Message<'_> {
    Message {
        gas,
        recipient: addr(0xaa),
        sender: addr(0xbb),
        code,
        ..Message::default()
    }
}

/// A host with block number 42 and `CALL_OUTPUT` as the call result.
pub fn test_host() -> MemHost {
    let mut host = MemHost::with_tx_context(TxContext {
        block_number: 42,
        ..TxContext::default()
    });
    host.set_call_result(evmlink_bridge::StatusCode::SUCCESS, CALL_OUTPUT);
    host
}

// ── Re-entrant host ──

/// A host whose `call` runs the callee's code on the same engine, up to
/// `max_depth`. Deeper calls return `CALL_OUTPUT` without executing.
pub struct NestingHost<'v> {
    pub vm: &'v Vm,
    pub world: MemHost,
    pub max_depth: i32,
    /// Depth of each message that reached `call`.
    pub call_depths: Vec<i32>,
    /// Registry size observed at each `call`.
    pub live_handles: Vec<usize>,
}

impl<'v> NestingHost<'v> {
    pub fn new(vm: &'v Vm, max_depth: i32) -> Self {
        Self {
            vm,
            world: test_host(),
            max_depth,
            call_depths: Vec::new(),
            live_handles: Vec::new(),
        }
    }
}

/// Code that calls `target` with 1000 gas and returns the first 34 bytes
/// of the callee's output.
pub fn self_call_code(target: Address) -> Vec<u8> {
    let mut code = vec![
        0x60, 0x22, // out_size = 34
        0x60, 0x00, // out_offset
        0x80, 0x80, 0x80, // in_size, in_offset, value
        0x73, // PUSH20 target
    ];
    code.extend_from_slice(&target.0);
    code.extend_from_slice(&[
        0x61, 0x03, 0xe8, // gas = 1000
        0xf1, // CALL
        0x60, 0x22, 0x60, 0x00, 0xf3, // RETURN(0, 34)
    ]);
    code
}

impl HostContext for NestingHost<'_> {
    fn account_exists(&mut self, address: &Address) -> bool {
        self.world.account_exists(address)
    }

    fn get_balance(&mut self, address: &Address) -> Bytes32 {
        self.world.get_balance(address)
    }

    fn get_code(&mut self, address: &Address) -> Bytes {
        self.world.get_code(address)
    }

    fn get_code_hash(&mut self, address: &Address) -> Bytes32 {
        self.world.get_code_hash(address)
    }

    fn selfdestruct(&mut self, address: &Address, beneficiary: &Address) -> bool {
        self.world.selfdestruct(address, beneficiary)
    }

    fn get_storage(&mut self, address: &Address, key: &Bytes32) -> Bytes32 {
        self.world.get_storage(address, key)
    }

    fn set_storage(&mut self, address: &Address, key: &Bytes32, value: &Bytes32) -> StorageStatus {
        self.world.set_storage(address, key, value)
    }

    fn get_tx_context(&mut self) -> TxContext {
        self.world.get_tx_context()
    }

    fn get_block_hash(&mut self, number: i64) -> Bytes32 {
        self.world.get_block_hash(number)
    }

    fn emit_log(&mut self, address: &Address, topics: &[Bytes32], data: &[u8]) {
        self.world.emit_log(address, topics, data)
    }

    fn call(&mut self, msg: &Message<'_>) -> ExecutionResult {
        self.call_depths.push(msg.depth);
        self.live_handles.push(registry::global().live_count());
        if msg.depth >= self.max_depth {
            return ExecutionResult::success(msg.gas, CALL_OUTPUT);
        }
        let code = self.world.get_code(&msg.recipient);
        let nested = Message {
            code: &code,
            ..msg.clone()
        };
        let vm = self.vm;
        vm.execute(self, Revision::Shanghai, &nested)
    }

    fn access_account(&mut self, address: &Address) -> AccessStatus {
        self.world.access_account(address)
    }

    fn access_storage(&mut self, address: &Address, key: &Bytes32) -> AccessStatus {
        self.world.access_storage(address, key)
    }
}

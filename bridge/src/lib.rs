//! `evmlink-bridge` — loads EVM engine modules and runs code through them.
//!
//! The bridge sits between an embedder's world state and an engine module
//! built against the fixed-layout contract in `evmlink_primitives::ffi`:
//!
//! - `Vm` — load (`load`, `load_and_configure`, `from_create_fn`), query,
//!   configure and execute; dropping it destroys the instance
//! - `ModuleConfig` — `<path>[,name[=value]]*` configuration strings
//! - `registry` — tokens standing in for the live `HostContext` of each
//!   execution, safe under nesting and across threads
//! - `dispatch` — the `extern "C"` callback table engines call into
//! - `memory` — ownership ledger for output buffers handed to engines
//!
//! No logging subscriber is installed; events are emitted with `tracing`.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod loader;
pub mod memory;
pub mod registry;
pub mod runtime;
pub mod validation;

pub use config::ModuleConfig;
pub use error::{BridgeError, ProtocolError};
pub use runtime::Vm;

pub use evmlink_hostapi::HostContext;
pub use evmlink_primitives::{
    AccessStatus, Address, Bytes32, CallKind, Capability, ExecutionResult, Message, Revision,
    StatusCode, StorageStatus, TxContext, FLAG_STATIC,
};

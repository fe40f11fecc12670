//! `evmlink-primitives` — shared vocabulary for the evmlink execution boundary.
//!
//! This crate is used by both sides of the boundary:
//!
//! - **Hosts** (`evmlink-bridge`) encode messages, decode results and
//!   dispatch callbacks using the wire types in [`ffi`].
//! - **Engine modules** (`evmlink-example-vm`) export a descriptor built
//!   from the same types and call back into the host through them.
//!
//! The native types ([`Address`], [`Bytes32`], [`Message`],
//! [`ExecutionResult`], [`TxContext`]) are what embedders work with.
//! [`codec`] converts between them and the `#[repr(C)]` layouts.

pub mod buffer;
pub mod codec;
pub mod error;
pub mod execution;
pub mod ffi;
pub mod types;

pub use error::{CodecError, StatusCode};
pub use execution::{
    AccessStatus, CallKind, Capability, ExecutionResult, Message, Revision, StorageStatus,
    TxContext, FLAG_STATIC,
};
pub use ffi::CONTRACT_VERSION;
pub use types::{Address, Bytes32};

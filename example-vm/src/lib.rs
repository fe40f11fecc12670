//! `evmlink-example-vm` — a minimal engine module for the evmlink contract.
//!
//! Builds as a `cdylib` exporting the discovery symbols
//! `evmlink_create_example_vm` and `evmlink_create`, and as an `rlib` so
//! hosts can link it in-process.
//!
//! - `exports` — create function and the descriptor's entry points
//! - `host_bridge` — `HostContext` implemented over the host callback table
//! - `interpreter` — a small EVM subset that runs against any `HostContext`
//!
//! Every instruction costs 1 gas. Memory is 1024 bytes and the stack holds
//! 1024 words.

mod exports;
mod host_bridge;
pub mod interpreter;

// In-process hosts link these directly instead of going through dlopen.
pub use exports::{evmlink_create, evmlink_create_example_vm};
pub use interpreter::Outcome;

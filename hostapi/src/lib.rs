//! `evmlink-hostapi` — the host side of the execution boundary.
//!
//! An engine module reaches the world state only through the host. This
//! crate provides:
//!
//! - `HostContext` trait — one method per host callback an engine can make
//! - `MemHost` — an in-memory `HostContext` for tests and simple embedders
//! - `Account`, `LogRecord`, `SelfdestructRecord` — the state `MemHost` keeps
//!
//! The bridge (`evmlink-bridge`) turns engine callbacks into calls on a
//! `&mut dyn HostContext` supplied for the duration of one execution.

pub mod mem_host;
pub mod traits;
pub mod types;

pub use mem_host::{MemHost, RecordedCall};
pub use traits::HostContext;
pub use types::{Account, LogRecord, SelfdestructRecord, StorageSlot};

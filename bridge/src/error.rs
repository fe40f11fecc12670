//! Bridge error types.

use std::path::PathBuf;

use evmlink_primitives::CodecError;

/// Errors from loading and configuring an engine module.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// The caller supplied an unusable argument (e.g. an empty path).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The module file could not be opened by the dynamic linker.
    #[error("cannot open {path}: {source}")]
    CannotOpen {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },

    /// None of the candidate discovery symbols is exported.
    #[error("no create function in {path} (tried {tried:?})")]
    SymbolNotFound { path: PathBuf, tried: Vec<String> },

    /// The create function returned null.
    #[error("module create function returned null")]
    InstanceCreationFailure,

    /// The module speaks a different contract version.
    #[error("incompatible contract version: expected {expected}, found {found}")]
    IncompatibleVersion { expected: i32, found: i32 },

    /// The descriptor is malformed (missing entry point, bad name, ...).
    #[error("invalid module descriptor: {0}")]
    InvalidDescriptor(String),

    /// The configuration string could not be parsed.
    #[error("invalid config syntax: {0}")]
    InvalidConfigSyntax(String),

    /// The module does not recognize the option.
    #[error("unknown option '{name}'")]
    UnknownOption { name: String },

    /// The module rejected the value for a known option.
    #[error("invalid value '{value}' for option '{name}'")]
    InvalidOptionValue { name: String, value: String },
}

/// A counterparty broke the calling contract mid-execution.
///
/// These never surface through `Vm::execute`: inside a callback they are
/// logged and turned into neutral values. They are returned directly by
/// the registry and buffer ledger so tests can observe them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("unknown host context handle {0}")]
    UnknownHandle(usize),

    /// Released twice, or never issued by this host.
    #[error("buffer {0:#x} is not outstanding")]
    UnknownBuffer(usize),

    #[error("malformed value from engine: {0}")]
    Malformed(#[from] CodecError),
}

//! Execution status codes and boundary decoding errors.

use core::fmt;

use thiserror::Error;

/// Outcome classification of an execution.
///
/// Wraps the raw `i32` carried in a result so that codes outside the
/// known vocabulary survive a round trip unchanged. Negative codes are
/// internal engine failures; non-negative codes are EVM-level outcomes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct StatusCode(pub i32);

impl StatusCode {
    pub const SUCCESS: Self = Self(0);
    pub const FAILURE: Self = Self(1);
    pub const REVERT: Self = Self(2);
    pub const OUT_OF_GAS: Self = Self(3);
    pub const INVALID_INSTRUCTION: Self = Self(4);
    pub const UNDEFINED_INSTRUCTION: Self = Self(5);
    pub const STACK_OVERFLOW: Self = Self(6);
    pub const STACK_UNDERFLOW: Self = Self(7);
    pub const BAD_JUMP_DESTINATION: Self = Self(8);
    pub const INVALID_MEMORY_ACCESS: Self = Self(9);
    pub const CALL_DEPTH_EXCEEDED: Self = Self(10);
    pub const STATIC_MODE_VIOLATION: Self = Self(11);
    pub const PRECOMPILE_FAILURE: Self = Self(12);
    pub const CONTRACT_VALIDATION_FAILURE: Self = Self(13);
    pub const ARGUMENT_OUT_OF_RANGE: Self = Self(14);
    pub const WASM_UNREACHABLE_INSTRUCTION: Self = Self(15);
    pub const WASM_TRAP: Self = Self(16);
    pub const INSUFFICIENT_BALANCE: Self = Self(17);
    pub const INTERNAL_ERROR: Self = Self(-1);
    pub const REJECTED: Self = Self(-2);
    pub const OUT_OF_MEMORY: Self = Self(-3);

    /// Construct from the raw integer carried in a result.
    pub const fn from_i32(code: i32) -> Self {
        Self(code)
    }

    /// Return the raw integer representation.
    pub const fn as_i32(self) -> i32 {
        self.0
    }

    /// Returns true for [`StatusCode::SUCCESS`].
    pub const fn is_success(self) -> bool {
        self.0 == 0
    }

    /// Returns true for engine-internal failures (negative codes).
    pub const fn is_internal(self) -> bool {
        self.0 < 0
    }

    /// Human-readable text. Total: unknown codes map to `"<unknown>"`.
    pub const fn as_str(self) -> &'static str {
        match self.0 {
            0 => "success",
            1 => "failure",
            2 => "revert",
            3 => "out of gas",
            4 => "invalid instruction",
            5 => "undefined instruction",
            6 => "stack overflow",
            7 => "stack underflow",
            8 => "bad jump destination",
            9 => "invalid memory access",
            10 => "call depth exceeded",
            11 => "static mode violation",
            12 => "precompile failure",
            13 => "contract validation failure",
            14 => "argument out of range",
            15 => "wasm unreachable instruction",
            16 => "wasm trap",
            17 => "insufficient balance",
            -1 => "internal error",
            -2 => "rejected",
            -3 => "out of memory",
            _ => "<unknown>",
        }
    }
}

/// Free-function form of [`StatusCode::as_str`] for raw integers.
pub fn status_code_to_string(code: i32) -> &'static str {
    StatusCode(code).as_str()
}

impl Default for StatusCode {
    fn default() -> Self {
        Self::SUCCESS
    }
}

impl From<i32> for StatusCode {
    fn from(code: i32) -> Self {
        Self(code)
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StatusCode({}: {})", self.0, self.as_str())
    }
}

/// A value crossing the boundary (or parsed from text) that does not fit
/// the vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("unknown {kind} discriminant {value}")]
    UnknownDiscriminant { kind: &'static str, value: i32 },

    #[error("bad length: expected {expected} bytes, got {got}")]
    BadLength { expected: usize, got: usize },

    #[error("invalid hex: {0:?}")]
    InvalidHex(String),

    #[error("null pointer with non-zero length {0}")]
    NullData(usize),
}

//! Native execution types: messages, results, transaction context and the
//! small enumerations that accompany them.
//!
//! Enumerations cross the boundary as raw integers; `from_i32` is the
//! checked way back.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{CodecError, StatusCode};
use crate::types::{Address, Bytes32};

/// Message flag: the callee must not modify state.
pub const FLAG_STATIC: u32 = 1;

/// Kind of call a message describes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum CallKind {
    #[default]
    Call = 0,
    DelegateCall = 1,
    CallCode = 2,
    Create = 3,
    Create2 = 4,
}

impl CallKind {
    pub fn from_i32(value: i32) -> Result<Self, CodecError> {
        match value {
            0 => Ok(Self::Call),
            1 => Ok(Self::DelegateCall),
            2 => Ok(Self::CallCode),
            3 => Ok(Self::Create),
            4 => Ok(Self::Create2),
            _ => Err(CodecError::UnknownDiscriminant {
                kind: "call kind",
                value,
            }),
        }
    }

    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Returns true for the contract-creating kinds.
    pub fn is_create(self) -> bool {
        matches!(self, Self::Create | Self::Create2)
    }
}

/// Protocol revision the engine must follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum Revision {
    Frontier = 0,
    Homestead = 1,
    TangerineWhistle = 2,
    SpuriousDragon = 3,
    Byzantium = 4,
    Constantinople = 5,
    Petersburg = 6,
    Istanbul = 7,
    Berlin = 8,
    London = 9,
    Paris = 10,
    Shanghai = 11,
    Cancun = 12,
    Prague = 13,
}

impl Revision {
    /// Highest revision in the vocabulary.
    pub const MAX: Self = Self::Prague;

    /// Newest revision considered stable.
    pub const LATEST_STABLE: Self = Self::Shanghai;

    pub fn from_i32(value: i32) -> Result<Self, CodecError> {
        Ok(match value {
            0 => Self::Frontier,
            1 => Self::Homestead,
            2 => Self::TangerineWhistle,
            3 => Self::SpuriousDragon,
            4 => Self::Byzantium,
            5 => Self::Constantinople,
            6 => Self::Petersburg,
            7 => Self::Istanbul,
            8 => Self::Berlin,
            9 => Self::London,
            10 => Self::Paris,
            11 => Self::Shanghai,
            12 => Self::Cancun,
            13 => Self::Prague,
            _ => {
                return Err(CodecError::UnknownDiscriminant {
                    kind: "revision",
                    value,
                })
            }
        })
    }

    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

/// Effect of a storage write, classified relative to the value at the
/// start of the transaction (original) and the value before this write
/// (current).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum StorageStatus {
    /// New value equals current value, or a dirty slot is modified again.
    Assigned = 0,
    /// Clean zero slot set to non-zero.
    Added = 1,
    /// Clean non-zero slot set to zero.
    Deleted = 2,
    /// Clean non-zero slot set to a different non-zero value.
    Modified = 3,
    /// Slot deleted earlier in the transaction, now set to non-zero.
    DeletedAdded = 4,
    /// Slot modified earlier in the transaction, now set to zero.
    ModifiedDeleted = 5,
    /// Slot deleted earlier in the transaction, now restored to original.
    DeletedRestored = 6,
    /// Slot added earlier in the transaction, now set back to zero.
    AddedDeleted = 7,
    /// Slot modified earlier in the transaction, now restored to original.
    ModifiedRestored = 8,
}

impl StorageStatus {
    /// The write did not change the slot.
    pub const UNCHANGED: Self = Self::Assigned;

    pub fn from_i32(value: i32) -> Result<Self, CodecError> {
        Ok(match value {
            0 => Self::Assigned,
            1 => Self::Added,
            2 => Self::Deleted,
            3 => Self::Modified,
            4 => Self::DeletedAdded,
            5 => Self::ModifiedDeleted,
            6 => Self::DeletedRestored,
            7 => Self::AddedDeleted,
            8 => Self::ModifiedRestored,
            _ => {
                return Err(CodecError::UnknownDiscriminant {
                    kind: "storage status",
                    value,
                })
            }
        })
    }

    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

/// Warm/cold access state (EIP-2929).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum AccessStatus {
    #[default]
    Cold = 0,
    Warm = 1,
}

impl AccessStatus {
    pub fn from_i32(value: i32) -> Result<Self, CodecError> {
        match value {
            0 => Ok(Self::Cold),
            1 => Ok(Self::Warm),
            _ => Err(CodecError::UnknownDiscriminant {
                kind: "access status",
                value,
            }),
        }
    }

    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

/// Capabilities an engine module may advertise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Capability {
    Evm1 = 1,
    Ewasm = 2,
    Precompiles = 4,
}

impl Capability {
    pub fn bit(self) -> u32 {
        self as u32
    }

    /// Returns true if `set` contains this capability.
    pub fn is_in(self, set: u32) -> bool {
        set & self.bit() != 0
    }
}

/// A call or create request, as seen by the host.
///
/// Input and code are borrowed; the bridge never copies them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message<'a> {
    pub kind: CallKind,
    pub flags: u32,
    pub depth: i32,
    pub gas: i64,
    pub recipient: Address,
    pub sender: Address,
    pub input: &'a [u8],
    pub value: Bytes32,
    pub create2_salt: Bytes32,
    pub code_address: Address,
    /// Code to execute. Empty for messages an engine sends back to the host.
    pub code: &'a [u8],
}

impl Message<'_> {
    pub fn is_static(&self) -> bool {
        self.flags & FLAG_STATIC != 0
    }
}

/// Outcome of an execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionResult {
    pub status: StatusCode,
    pub gas_left: i64,
    pub gas_refund: i64,
    pub output: Bytes,
    /// Address of the created contract; present only for create kinds.
    pub create_address: Option<Address>,
}

impl ExecutionResult {
    /// A successful result carrying `output`.
    pub fn success(gas_left: i64, output: impl Into<Bytes>) -> Self {
        Self {
            status: StatusCode::SUCCESS,
            gas_left,
            output: output.into(),
            ..Self::default()
        }
    }

    /// A result with no output.
    pub fn with_status(status: StatusCode, gas_left: i64) -> Self {
        Self {
            status,
            gas_left,
            ..Self::default()
        }
    }
}

/// Transaction and block parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxContext {
    pub gas_price: Bytes32,
    pub origin: Address,
    pub coinbase: Address,
    pub block_number: i64,
    pub block_timestamp: i64,
    pub block_gas_limit: i64,
    /// Difficulty before the merge, prev-randao after.
    pub prev_randao: Bytes32,
    pub chain_id: Bytes32,
    pub base_fee: Bytes32,
}

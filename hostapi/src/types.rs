//! World-state records kept by `MemHost`.

use std::collections::BTreeMap;

use bytes::Bytes;
use evmlink_primitives::{Address, Bytes32, StorageStatus};

/// A storage slot with its value at transaction start and its value now.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StorageSlot {
    pub original: Bytes32,
    pub current: Bytes32,
}

impl StorageSlot {
    /// A slot that already holds `value` when the transaction starts.
    pub fn committed(value: Bytes32) -> Self {
        Self {
            original: value,
            current: value,
        }
    }

    /// Classify writing `new` into this slot (EIP-2200).
    pub fn classify(&self, new: &Bytes32) -> StorageStatus {
        let (original, current) = (&self.original, &self.current);
        if current == new {
            return StorageStatus::Assigned;
        }

        if original == current {
            // Clean slot.
            return if original.is_zero() {
                StorageStatus::Added
            } else if new.is_zero() {
                StorageStatus::Deleted
            } else {
                StorageStatus::Modified
            };
        }

        // Dirty slot.
        match (original.is_zero(), current.is_zero(), new.is_zero()) {
            (false, true, _) if new == original => StorageStatus::DeletedRestored,
            (false, true, _) => StorageStatus::DeletedAdded,
            (false, false, true) => StorageStatus::ModifiedDeleted,
            (false, false, false) if new == original => StorageStatus::ModifiedRestored,
            (true, false, true) => StorageStatus::AddedDeleted,
            _ => StorageStatus::Assigned,
        }
    }
}

/// An account in the in-memory world state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Account {
    pub balance: Bytes32,
    pub code: Bytes,
    pub storage: BTreeMap<Bytes32, StorageSlot>,
}

impl Account {
    pub fn with_balance(balance: u128) -> Self {
        Self {
            balance: Bytes32::from_u128(balance),
            ..Self::default()
        }
    }

    pub fn with_code(code: impl Into<Bytes>) -> Self {
        Self {
            code: code.into(),
            ..Self::default()
        }
    }
}

/// A log entry emitted during execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub address: Address,
    pub topics: Vec<Bytes32>,
    pub data: Bytes,
}

/// A self-destruct registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelfdestructRecord {
    pub address: Address,
    pub beneficiary: Address,
}

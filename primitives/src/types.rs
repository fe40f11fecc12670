//! Fixed-width value types exchanged across the execution boundary.
//!
//! An [`Address`] is 20 bytes and a [`Bytes32`] is a 32-byte big-endian
//! word (storage keys and values, balances, hashes, chain id). Both are
//! plain byte arrays on the wire; the wrappers here add hex text, serde
//! and integer helpers.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CodecError;

/// Length of an account address in bytes.
pub const ADDRESS_LEN: usize = 20;

/// Length of a 256-bit word in bytes.
pub const WORD_LEN: usize = 32;

macro_rules! fixed_bytes {
    ($(#[$meta:meta])* $name:ident, $len:expr) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[repr(transparent)]
        pub struct $name(pub [u8; $len]);

        impl $name {
            /// The all-zero value.
            pub const ZERO: Self = Self([0u8; $len]);

            /// Borrow the raw bytes.
            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }

            /// Returns true if every byte is zero.
            pub fn is_zero(&self) -> bool {
                self.0.iter().all(|b| *b == 0)
            }

            /// Copy from a slice of exactly the right length.
            pub fn from_slice(bytes: &[u8]) -> Result<Self, CodecError> {
                let array: [u8; $len] = bytes.try_into().map_err(|_| CodecError::BadLength {
                    expected: $len,
                    got: bytes.len(),
                })?;
                Ok(Self(array))
            }
        }

        impl From<[u8; $len]> for $name {
            fn from(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }
        }

        impl From<$name> for [u8; $len] {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("0x")?;
                for byte in &self.0 {
                    write!(f, "{:02x}", byte)?;
                }
                Ok(())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self)
            }
        }

        impl FromStr for $name {
            type Err = CodecError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let mut out = [0u8; $len];
                decode_hex_into(s, &mut out)?;
                Ok(Self(out))
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let text = String::deserialize(deserializer)?;
                text.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

fixed_bytes!(
    /// A 20-byte account address.
    Address,
    ADDRESS_LEN
);

fixed_bytes!(
    /// A 32-byte big-endian word.
    Bytes32,
    WORD_LEN
);

impl Bytes32 {
    /// Encode a `u64` as a big-endian word.
    pub fn from_u64(value: u64) -> Self {
        Self::from_u128(value as u128)
    }

    /// Encode a `u128` as a big-endian word.
    pub fn from_u128(value: u128) -> Self {
        let mut out = [0u8; WORD_LEN];
        out[16..].copy_from_slice(&value.to_be_bytes());
        Self(out)
    }

    /// Decode as `u128`. Returns `None` if the upper 16 bytes are not zero.
    pub fn to_u128(&self) -> Option<u128> {
        if self.0[..16].iter().any(|b| *b != 0) {
            return None;
        }
        let mut low = [0u8; 16];
        low.copy_from_slice(&self.0[16..]);
        Some(u128::from_be_bytes(low))
    }

    /// Decode as `u64`. Returns `None` if the value does not fit.
    pub fn to_u64(&self) -> Option<u64> {
        self.to_u128().and_then(|v| u64::try_from(v).ok())
    }

    /// The low 20 bytes, interpreted as an address.
    pub fn to_address(&self) -> Address {
        let mut out = [0u8; ADDRESS_LEN];
        out.copy_from_slice(&self.0[WORD_LEN - ADDRESS_LEN..]);
        Address(out)
    }
}

impl From<Address> for Bytes32 {
    /// Left-pad an address to a word.
    fn from(addr: Address) -> Self {
        let mut out = [0u8; WORD_LEN];
        out[WORD_LEN - ADDRESS_LEN..].copy_from_slice(&addr.0);
        Self(out)
    }
}

/// Decode hex text into a fixed buffer. Shorter input is left-padded with
/// zeros; longer input is rejected.
fn decode_hex_into(text: &str, out: &mut [u8]) -> Result<(), CodecError> {
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text)
        .as_bytes();
    if digits.len() > out.len() * 2 {
        return Err(CodecError::BadLength {
            expected: out.len(),
            got: digits.len().div_ceil(2),
        });
    }

    // Walk from the least significant nibble so odd lengths pad on the left.
    out.fill(0);
    for (i, ch) in digits.iter().rev().enumerate() {
        let nibble = match ch {
            b'0'..=b'9' => ch - b'0',
            b'a'..=b'f' => ch - b'a' + 10,
            b'A'..=b'F' => ch - b'A' + 10,
            _ => return Err(CodecError::InvalidHex(text.to_owned())),
        };
        let index = out.len() - 1 - i / 2;
        if i % 2 == 0 {
            out[index] |= nibble;
        } else {
            out[index] |= nibble << 4;
        }
    }
    Ok(())
}

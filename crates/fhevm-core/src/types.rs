//! Value and ciphertext shapes shared by the encryption and decryption paths

use alloy_primitives::{Address, Bytes, B256};
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::Result;

/// Closed set of logical types the platform can encrypt.
///
/// Discriminants are the platform's on-wire ciphertext type ids, which is
/// why the set is not contiguous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum FheType {
    Bool = 0,
    Uint8 = 2,
    Uint16 = 3,
    Uint32 = 4,
    Uint64 = 5,
    Address = 7,
}

impl FheType {
    /// On-wire type tag carried by ciphertext handles.
    pub const fn tag(self) -> u8 {
        self as u8
    }

    /// Plaintext width in bits.
    pub const fn bit_width(self) -> u32 {
        match self {
            FheType::Bool => 1,
            FheType::Uint8 => 8,
            FheType::Uint16 => 16,
            FheType::Uint32 => 32,
            FheType::Uint64 => 64,
            FheType::Address => 160,
        }
    }

    /// Encoded plaintext length in bytes.
    pub const fn byte_len(self) -> usize {
        (self.bit_width() as usize).div_ceil(8)
    }

    /// Reverse mapping from an on-wire tag. `None` for foreign tags.
    pub const fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(FheType::Bool),
            2 => Some(FheType::Uint8),
            3 => Some(FheType::Uint16),
            4 => Some(FheType::Uint32),
            5 => Some(FheType::Uint64),
            7 => Some(FheType::Address),
            _ => None,
        }
    }
}

impl std::fmt::Display for FheType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FheType::Bool => write!(f, "bool"),
            FheType::Uint8 => write!(f, "uint8"),
            FheType::Uint16 => write!(f, "uint16"),
            FheType::Uint32 => write!(f, "uint32"),
            FheType::Uint64 => write!(f, "uint64"),
            FheType::Address => write!(f, "address"),
        }
    }
}

/// A plaintext value before encryption or after decryption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClearValue {
    Bool(bool),
    Uint(u64),
    Address(Address),
}

impl std::fmt::Display for ClearValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClearValue::Bool(b) => write!(f, "{b}"),
            ClearValue::Uint(v) => write!(f, "{v}"),
            ClearValue::Address(a) => write!(f, "{a}"),
        }
    }
}

impl From<bool> for ClearValue {
    fn from(v: bool) -> Self {
        ClearValue::Bool(v)
    }
}

impl From<u8> for ClearValue {
    fn from(v: u8) -> Self {
        ClearValue::Uint(v as u64)
    }
}

impl From<u16> for ClearValue {
    fn from(v: u16) -> Self {
        ClearValue::Uint(v as u64)
    }
}

impl From<u32> for ClearValue {
    fn from(v: u32) -> Self {
        ClearValue::Uint(v as u64)
    }
}

impl From<u64> for ClearValue {
    fn from(v: u64) -> Self {
        ClearValue::Uint(v)
    }
}

impl From<Address> for ClearValue {
    fn from(v: Address) -> Self {
        ClearValue::Address(v)
    }
}

/// A plaintext value paired with the logical type it should be encrypted
/// as. Consumed once by the encryption orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedValue {
    pub value: ClearValue,
    pub ty: FheType,
}

impl TypedValue {
    pub fn new(value: impl Into<ClearValue>, ty: FheType) -> Self {
        Self {
            value: value.into(),
            ty,
        }
    }
}

/// An encrypted value produced by the encryption capability.
///
/// The type tag is stored raw so that a tag outside the supported set is
/// representable; it fails [`Error::UnsupportedType`] at decryption time
/// instead of being coerced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedValue {
    /// Opaque ciphertext bytes.
    pub ciphertext: Bytes,
    /// On-wire type tag, authoritative at decryption time.
    pub type_tag: u8,
    /// Handle assigned by the encryption capability, used to correlate
    /// decryption requests.
    pub handle: Option<B256>,
}

impl EncryptedValue {
    /// Resolve the stored tag against the closed type set.
    pub fn ty(&self) -> Result<FheType> {
        FheType::from_tag(self.type_tag).ok_or(Error::UnsupportedType(self.type_tag))
    }

    /// The handle assigned by the encryption capability, required to
    /// correlate a decryption request.
    pub fn require_handle(&self) -> Result<B256> {
        self.handle
            .ok_or_else(|| Error::DecryptionFailed("ciphertext has no handle".into()))
    }
}

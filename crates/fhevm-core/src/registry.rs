//! Type registry: serialization rules for the closed set of logical types
//!
//! Both the encryption and decryption paths resolve values through this
//! module so that a value is always interpreted under the same rules it
//! was encoded with. Pure functions, no I/O.

use alloy_primitives::{Address, Bytes};

use crate::error::Error;
use crate::types::{ClearValue, FheType, TypedValue};
use crate::Result;

/// Serialization rules for one logical type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeInfo {
    pub ty: FheType,
    pub bit_width: u32,
}

/// Resolve an on-wire type tag against the closed set.
pub fn resolve(tag: u8) -> Result<TypeInfo> {
    let ty = FheType::from_tag(tag).ok_or(Error::UnsupportedType(tag))?;
    Ok(TypeInfo {
        ty,
        bit_width: ty.bit_width(),
    })
}

/// Check that a value fits its declared type's bit width.
pub fn check_range(item: &TypedValue) -> Result<()> {
    let fits = match (&item.value, item.ty) {
        (ClearValue::Bool(_), FheType::Bool) => true,
        (ClearValue::Uint(v), FheType::Uint8) => *v <= u8::MAX as u64,
        (ClearValue::Uint(v), FheType::Uint16) => *v <= u16::MAX as u64,
        (ClearValue::Uint(v), FheType::Uint32) => *v <= u32::MAX as u64,
        (ClearValue::Uint(_), FheType::Uint64) => true,
        (ClearValue::Address(_), FheType::Address) => true,
        // Variant/type mismatch: the value cannot be represented at all.
        _ => false,
    };

    if fits {
        Ok(())
    } else {
        Err(Error::ValueOutOfRange {
            value: item.value.to_string(),
            ty: item.ty,
        })
    }
}

/// Encode an in-range value as fixed-width big-endian plaintext bytes.
///
/// Callers must run [`check_range`] first; encoding truncates silently
/// otherwise.
pub fn encode(item: &TypedValue) -> Bytes {
    let len = item.ty.byte_len();
    match &item.value {
        ClearValue::Bool(b) => Bytes::from(vec![u8::from(*b)]),
        ClearValue::Uint(v) => Bytes::copy_from_slice(&v.to_be_bytes()[8 - len..]),
        ClearValue::Address(a) => Bytes::copy_from_slice(a.as_slice()),
    }
}

/// Decode plaintext bytes under a logical type's rules.
pub fn decode(plaintext: &[u8], ty: FheType) -> Result<ClearValue> {
    if plaintext.len() != ty.byte_len() {
        return Err(Error::DecryptionFailed(format!(
            "plaintext length {} does not match {} (expected {})",
            plaintext.len(),
            ty,
            ty.byte_len()
        )));
    }

    match ty {
        FheType::Bool => match plaintext[0] {
            0 => Ok(ClearValue::Bool(false)),
            1 => Ok(ClearValue::Bool(true)),
            b => Err(Error::DecryptionFailed(format!(
                "invalid bool plaintext byte {b:#04x}"
            ))),
        },
        FheType::Uint8 | FheType::Uint16 | FheType::Uint32 | FheType::Uint64 => {
            let mut buf = [0u8; 8];
            buf[8 - plaintext.len()..].copy_from_slice(plaintext);
            Ok(ClearValue::Uint(u64::from_be_bytes(buf)))
        }
        FheType::Address => Ok(ClearValue::Address(Address::from_slice(plaintext))),
    }
}

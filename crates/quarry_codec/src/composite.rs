//! Composite key byte layout.
//!
//! Multi-component partition and clustering keys are serialized as a
//! sequence of components, each written as:
//!
//! ```text
//! ┌──────────────┬───────────────┬─────────┐
//! │ len: u16 BE  │ bytes[len]    │ eoc: u8 │
//! └──────────────┴───────────────┴─────────┘
//! ```
//!
//! The end-of-component byte is always `0` for stored keys. Single
//! component keys are never wrapped in this layout.

use crate::compare::compare;
use crate::error::{CodecError, CodecResult};
use crate::types::CellType;
use std::cmp::Ordering;

/// Splits composite bytes into exactly `expected` components.
///
/// # Errors
///
/// Returns [`CodecError::ComponentMismatch`] when the bytes hold a
/// different number of components, and a decoding error when a
/// component is truncated or carries a non-zero end-of-component byte.
pub fn split(bytes: &[u8], expected: usize) -> CodecResult<Vec<&[u8]>> {
    let mut components = Vec::with_capacity(expected);
    let mut pos = 0usize;

    while pos < bytes.len() {
        if bytes.len() < pos + 2 {
            return Err(CodecError::decoding_failed("composite key truncated"));
        }
        let len = u16::from_be_bytes([bytes[pos], bytes[pos + 1]]) as usize;
        pos += 2;

        // Component bytes plus the end-of-component marker.
        if bytes.len() < pos + len + 1 {
            return Err(CodecError::decoding_failed("composite key truncated"));
        }
        components.push(&bytes[pos..pos + len]);
        pos += len;

        if bytes[pos] != 0 {
            return Err(CodecError::decoding_failed(format!(
                "unexpected end-of-component byte {:#04x}",
                bytes[pos]
            )));
        }
        pos += 1;
    }

    if components.len() != expected {
        return Err(CodecError::ComponentMismatch {
            expected,
            actual: components.len(),
        });
    }
    Ok(components)
}

/// Builds composite bytes from serialized components.
///
/// # Errors
///
/// Returns an error if a component is longer than `u16::MAX` bytes.
pub fn build<C: AsRef<[u8]>>(components: &[C]) -> CodecResult<Vec<u8>> {
    let total: usize = components.iter().map(|c| c.as_ref().len() + 3).sum();
    let mut result = Vec::with_capacity(total);

    for component in components {
        let component = component.as_ref();
        let len = u16::try_from(component.len()).map_err(|_| {
            CodecError::encoding_failed(format!(
                "composite component of {} bytes exceeds u16",
                component.len()
            ))
        })?;
        result.extend_from_slice(&len.to_be_bytes());
        result.extend_from_slice(component);
        result.push(0);
    }
    Ok(result)
}

/// Compares two composite keys component by component.
///
/// Each component uses its own native comparator; a key that is a
/// strict prefix of the other sorts first. Malformed input falls back
/// to byte order.
pub fn compare_composite(types: &[CellType], a: &[u8], b: &[u8]) -> Ordering {
    let (Ok(ca), Ok(cb)) = (split_all(a), split_all(b)) else {
        return a.cmp(b);
    };
    for (i, t) in types.iter().enumerate() {
        match (ca.get(i), cb.get(i)) {
            (Some(x), Some(y)) => {
                let ord = compare(t, x, y);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (None, None) => return Ordering::Equal,
        }
    }
    Ordering::Equal
}

/// Like [`split`] but accepts any component count (prefixes included).
///
/// # Errors
///
/// Returns a decoding error for truncated input or a bad end-of-component byte.
pub fn split_all(bytes: &[u8]) -> CodecResult<Vec<&[u8]>> {
    let mut count = 0usize;
    let mut pos = 0usize;
    while pos + 2 <= bytes.len() {
        let len = u16::from_be_bytes([bytes[pos], bytes[pos + 1]]) as usize;
        pos += 2 + len + 1;
        count += 1;
    }
    split(bytes, count)
}

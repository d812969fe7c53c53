//! Native comparators over serialized cell values.
//!
//! These reproduce the storage engine's own ordering so that anything
//! sorted by the index agrees with a native scan. Byte-lexicographic
//! order is only correct for text and blobs; integers compare signed,
//! floats numerically, and time UUIDs by their embedded timestamp.

use crate::types::CellType;
use std::cmp::Ordering;

/// Compares two serialized values of `cell_type` in native order.
///
/// Empty values sort before any non-empty value. Malformed input never
/// panics; it falls back to byte order.
pub fn compare(cell_type: &CellType, a: &[u8], b: &[u8]) -> Ordering {
    if let CellType::Reversed(inner) = cell_type {
        return compare(inner, a, b).reverse();
    }
    match (a.is_empty(), b.is_empty()) {
        (true, true) => return Ordering::Equal,
        (true, false) => return Ordering::Less,
        (false, true) => return Ordering::Greater,
        (false, false) => {}
    }

    match cell_type {
        CellType::TinyInt
        | CellType::SmallInt
        | CellType::Int
        | CellType::BigInt
        | CellType::Counter
        | CellType::Timestamp => compare_signed(a, b),
        CellType::Float => match (read_f32(a), read_f32(b)) {
            (Some(x), Some(y)) => x.total_cmp(&y),
            _ => a.cmp(b),
        },
        CellType::Double => match (read_f64(a), read_f64(b)) {
            (Some(x), Some(y)) => x.total_cmp(&y),
            _ => a.cmp(b),
        },
        CellType::Boolean | CellType::Ascii | CellType::Text | CellType::Blob => a.cmp(b),
        CellType::TimeUuid => compare_timeuuid(a, b),
        CellType::Uuid => compare_uuid(a, b),
        CellType::List(element) | CellType::Set(element) => {
            compare_collection(a, b, |i| if i == 0 { None } else { Some(&**element) })
        }
        CellType::Map(key, value) => compare_collection(a, b, |i| {
            if i == 0 {
                None
            } else if i % 2 == 1 {
                Some(&**key)
            } else {
                Some(&**value)
            }
        }),
        CellType::Tuple(types) => compare_sized_fields(a, b, types.iter()),
        CellType::Udt { fields, .. } => compare_sized_fields(a, b, fields.iter().map(|(_, t)| t)),
        CellType::Reversed(_) => Ordering::Equal,
    }
}

fn compare_signed(a: &[u8], b: &[u8]) -> Ordering {
    if a.len() != b.len() {
        return a.len().cmp(&b.len());
    }
    // Flip the sign bit of the first byte, then compare as unsigned.
    match (a[0] ^ 0x80).cmp(&(b[0] ^ 0x80)) {
        Ordering::Equal => a[1..].cmp(&b[1..]),
        ord => ord,
    }
}

fn read_f32(bytes: &[u8]) -> Option<f32> {
    let arr: [u8; 4] = bytes.try_into().ok()?;
    Some(f32::from_be_bytes(arr))
}

fn read_f64(bytes: &[u8]) -> Option<f64> {
    let arr: [u8; 8] = bytes.try_into().ok()?;
    Some(f64::from_be_bytes(arr))
}

/// Extracts the 60-bit timestamp of a version 1 UUID.
fn uuid_timestamp(bytes: &[u8]) -> Option<u64> {
    if bytes.len() != 16 {
        return None;
    }
    let time_low = u64::from(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]));
    let time_mid = u64::from(u16::from_be_bytes([bytes[4], bytes[5]]));
    let time_hi = u64::from(u16::from_be_bytes([bytes[6], bytes[7]]) & 0x0fff);
    Some((time_hi << 48) | (time_mid << 32) | time_low)
}

fn compare_timeuuid(a: &[u8], b: &[u8]) -> Ordering {
    match (uuid_timestamp(a), uuid_timestamp(b)) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        _ => a.cmp(b),
    }
}

fn compare_uuid(a: &[u8], b: &[u8]) -> Ordering {
    if a.len() != 16 || b.len() != 16 {
        return a.cmp(b);
    }
    let version_a = a[6] >> 4;
    let version_b = b[6] >> 4;
    match version_a.cmp(&version_b) {
        Ordering::Equal if version_a == 1 => compare_timeuuid(a, b),
        Ordering::Equal => a.cmp(b),
        ord => ord,
    }
}

/// Splits `i32`-length-prefixed components; `None` marks a null component.
fn sized_components(bytes: &[u8]) -> Option<Vec<Option<&[u8]>>> {
    let mut out = Vec::new();
    let mut pos = 0usize;
    while pos < bytes.len() {
        let len_bytes: [u8; 4] = bytes.get(pos..pos + 4)?.try_into().ok()?;
        let len = i32::from_be_bytes(len_bytes);
        pos += 4;
        if len < 0 {
            out.push(None);
            continue;
        }
        let end = pos + len as usize;
        out.push(Some(bytes.get(pos..end)?));
        pos = end;
    }
    Some(out)
}

fn compare_component(t: &CellType, a: Option<&[u8]>, b: Option<&[u8]>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => compare(t, x, y),
    }
}

fn compare_sized_fields<'t>(
    a: &[u8],
    b: &[u8],
    types: impl Iterator<Item = &'t CellType>,
) -> Ordering {
    let (Some(ca), Some(cb)) = (sized_components(a), sized_components(b)) else {
        return a.cmp(b);
    };
    for (i, t) in types.enumerate() {
        let ord = compare_component(t, ca.get(i).copied().flatten(), cb.get(i).copied().flatten());
        if ord != Ordering::Equal {
            return ord;
        }
    }
    ca.len().cmp(&cb.len())
}

/// Compares collections serialized as an `i32` count followed by sized
/// elements. `type_at(i)` gives the type of the i-th `i32` slot, where
/// slot 0 is the count itself.
fn compare_collection<'t>(
    a: &[u8],
    b: &[u8],
    type_at: impl Fn(usize) -> Option<&'t CellType>,
) -> Ordering {
    if a.len() < 4 || b.len() < 4 {
        return a.cmp(b);
    }
    let (Some(ca), Some(cb)) = (sized_components(&a[4..]), sized_components(&b[4..])) else {
        return a.cmp(b);
    };
    for (i, (x, y)) in ca.iter().zip(cb.iter()).enumerate() {
        let Some(t) = type_at(i + 1) else {
            continue;
        };
        let ord = compare_component(t, *x, *y);
        if ord != Ordering::Equal {
            return ord;
        }
    }
    ca.len().cmp(&cb.len())
}

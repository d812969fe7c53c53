//! Native cell value encoder.

use crate::error::{CodecError, CodecResult};
use crate::types::CellType;
use crate::value::Value;

/// Encode a value using the native serialization of `cell_type`.
///
/// This is the exact inverse of [`crate::decode`].
///
/// # Errors
///
/// Returns an error if the value kind does not fit the declared type or
/// a number is out of range for it.
pub fn encode(cell_type: &CellType, value: &Value) -> CodecResult<Vec<u8>> {
    let mut encoder = CellEncoder::new();
    encoder.encode(cell_type, value)?;
    Ok(encoder.into_bytes())
}

/// An encoder producing native cell bytes.
pub struct CellEncoder {
    buffer: Vec<u8>,
}

impl CellEncoder {
    /// Create a new encoder.
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    /// Consume this encoder and return the encoded bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    /// Encode one value, unprefixed.
    pub fn encode(&mut self, cell_type: &CellType, value: &Value) -> CodecResult<()> {
        let mismatch = || CodecError::type_mismatch(cell_type.to_string(), value.kind_name());

        if value.is_null() {
            // Only fixed-width types have an empty representation.
            return if cell_type.fixed_width().is_some() {
                Ok(())
            } else {
                Err(mismatch())
            };
        }

        match cell_type.base() {
            CellType::Boolean => {
                let b = value.as_bool().ok_or_else(mismatch)?;
                self.buffer.push(u8::from(b));
            }
            CellType::TinyInt => {
                let n = int_in_range::<i8>(cell_type, value)?;
                self.buffer.extend_from_slice(&n.to_be_bytes());
            }
            CellType::SmallInt => {
                let n = int_in_range::<i16>(cell_type, value)?;
                self.buffer.extend_from_slice(&n.to_be_bytes());
            }
            CellType::Int => {
                let n = int_in_range::<i32>(cell_type, value)?;
                self.buffer.extend_from_slice(&n.to_be_bytes());
            }
            CellType::BigInt | CellType::Counter => match value {
                Value::Integer(n) => self.buffer.extend_from_slice(&n.to_be_bytes()),
                _ => return Err(mismatch()),
            },
            CellType::Timestamp => {
                let n = value.as_integer().ok_or_else(mismatch)?;
                self.buffer.extend_from_slice(&n.to_be_bytes());
            }
            #[allow(clippy::cast_possible_truncation)]
            CellType::Float => {
                let d = value.as_double().ok_or_else(mismatch)?;
                self.buffer.extend_from_slice(&(d as f32).to_be_bytes());
            }
            CellType::Double => {
                let d = value.as_double().ok_or_else(mismatch)?;
                self.buffer.extend_from_slice(&d.to_be_bytes());
            }
            CellType::Ascii => {
                let s = value.as_text().ok_or_else(mismatch)?;
                if !s.is_ascii() {
                    return Err(CodecError::InvalidAscii);
                }
                self.buffer.extend_from_slice(s.as_bytes());
            }
            CellType::Text => {
                let s = value.as_text().ok_or_else(mismatch)?;
                self.buffer.extend_from_slice(s.as_bytes());
            }
            CellType::Blob => {
                let b = value.as_bytes().ok_or_else(mismatch)?;
                self.buffer.extend_from_slice(b);
            }
            CellType::Uuid | CellType::TimeUuid => {
                let u = value.as_uuid().ok_or_else(mismatch)?;
                self.buffer.extend_from_slice(u.as_bytes());
            }
            CellType::List(element) | CellType::Set(element) => {
                let items = match value {
                    Value::List(items) | Value::Set(items) => items,
                    _ => return Err(mismatch()),
                };
                self.write_count(items.len())?;
                for item in items {
                    self.encode_sized(element, item)?;
                }
            }
            CellType::Map(key_type, value_type) => {
                let Value::Map(entries) = value else {
                    return Err(mismatch());
                };
                self.write_count(entries.len())?;
                for (k, v) in entries {
                    self.encode_sized(key_type, k)?;
                    self.encode_sized(value_type, v)?;
                }
            }
            CellType::Tuple(types) => {
                let Value::Tuple(items) = value else {
                    return Err(mismatch());
                };
                if items.len() != types.len() {
                    return Err(CodecError::encoding_failed(format!(
                        "tuple arity {} does not match {}",
                        items.len(),
                        types.len()
                    )));
                }
                for (t, item) in types.iter().zip(items) {
                    self.encode_sized(t, item)?;
                }
            }
            CellType::Udt { fields, .. } => {
                let Value::Udt(items) = value else {
                    return Err(mismatch());
                };
                for (name, t) in fields {
                    let item = items
                        .iter()
                        .find(|(n, _)| n == name)
                        .map_or(&Value::Null, |(_, v)| v);
                    self.encode_sized(t, item)?;
                }
            }
            CellType::Reversed(_) => {
                return Err(CodecError::encoding_failed(
                    "reversed type was not unwrapped",
                ))
            }
        }
        Ok(())
    }

    /// Encode one value with an `i32` length prefix; null is `-1`.
    pub fn encode_sized(&mut self, cell_type: &CellType, value: &Value) -> CodecResult<()> {
        if value.is_null() {
            self.buffer.extend_from_slice(&(-1i32).to_be_bytes());
            return Ok(());
        }
        let mut inner = CellEncoder::new();
        inner.encode(cell_type, value)?;
        let bytes = inner.into_bytes();
        self.write_count(bytes.len())?;
        self.buffer.extend_from_slice(&bytes);
        Ok(())
    }

    fn write_count(&mut self, n: usize) -> CodecResult<()> {
        let n = i32::try_from(n)
            .map_err(|_| CodecError::encoding_failed(format!("size {n} exceeds i32")))?;
        self.buffer.extend_from_slice(&n.to_be_bytes());
        Ok(())
    }
}

impl Default for CellEncoder {
    fn default() -> Self {
        Self::new()
    }
}

fn int_in_range<T: TryFrom<i64>>(cell_type: &CellType, value: &Value) -> CodecResult<T> {
    let n = match value {
        Value::Integer(n) => *n,
        other => {
            return Err(CodecError::type_mismatch(
                cell_type.to_string(),
                other.kind_name(),
            ))
        }
    };
    T::try_from(n).map_err(|_| {
        CodecError::encoding_failed(format!("{n} out of range for {}", cell_type.name()))
    })
}

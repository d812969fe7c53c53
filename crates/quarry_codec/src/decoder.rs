//! Native cell value decoder.

use crate::error::{CodecError, CodecResult};
use crate::types::CellType;
use crate::value::Value;
use uuid::Uuid;

/// Decode raw cell bytes according to their declared type.
///
/// The whole input must be consumed; trailing bytes are an error.
///
/// # Errors
///
/// Returns an error if the bytes do not match the declared type.
pub fn decode(cell_type: &CellType, bytes: &[u8]) -> CodecResult<Value> {
    let mut decoder = CellDecoder::new(bytes);
    let value = decoder.decode_value(cell_type, bytes.len())?;
    if !decoder.is_empty() {
        return Err(CodecError::TrailingBytes {
            remaining: decoder.remaining().len(),
        });
    }
    Ok(value)
}

/// Maximum allowed element count for collections.
/// Guards allocation against corrupt length prefixes.
const MAX_COLLECTION_ELEMENTS: u64 = 16 * 1024 * 1024;

/// A decoder over the native serialization of one cell value.
pub struct CellDecoder<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> CellDecoder<'a> {
    /// Create a new decoder for the given bytes.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Check if all bytes have been consumed.
    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Get remaining bytes.
    pub fn remaining(&self) -> &[u8] {
        &self.data[self.pos..]
    }

    /// Decode a value of `cell_type` that occupies the next `len` bytes.
    pub fn decode_value(&mut self, cell_type: &CellType, len: usize) -> CodecResult<Value> {
        let bytes = self.read_bytes(len)?;

        // An empty buffer is the engine's "empty value" for fixed-width types.
        if bytes.is_empty() && cell_type.fixed_width().is_some() {
            return Ok(Value::Null);
        }
        if let Some(width) = cell_type.fixed_width() {
            if bytes.len() != width {
                return Err(CodecError::invalid_length(
                    cell_type.name(),
                    width,
                    bytes.len(),
                ));
            }
        }

        match cell_type.base() {
            CellType::Boolean => Ok(Value::Bool(bytes[0] != 0)),
            CellType::TinyInt => Ok(Value::Integer(i64::from(bytes[0] as i8))),
            CellType::SmallInt => Ok(Value::Integer(i64::from(i16::from_be_bytes([
                bytes[0], bytes[1],
            ])))),
            CellType::Int => Ok(Value::Integer(i64::from(i32::from_be_bytes(
                fixed::<4>(bytes),
            )))),
            CellType::BigInt | CellType::Counter => {
                Ok(Value::Integer(i64::from_be_bytes(fixed::<8>(bytes))))
            }
            CellType::Timestamp => Ok(Value::Timestamp(i64::from_be_bytes(fixed::<8>(bytes)))),
            CellType::Float => Ok(Value::Double(f64::from(f32::from_be_bytes(fixed::<4>(
                bytes,
            ))))),
            CellType::Double => Ok(Value::Double(f64::from_be_bytes(fixed::<8>(bytes)))),
            CellType::Ascii => {
                if !bytes.is_ascii() {
                    return Err(CodecError::InvalidAscii);
                }
                let text = std::str::from_utf8(bytes).map_err(|_| CodecError::InvalidAscii)?;
                Ok(Value::Text(text.to_string()))
            }
            CellType::Text => {
                let text = std::str::from_utf8(bytes).map_err(|_| CodecError::InvalidUtf8)?;
                Ok(Value::Text(text.to_string()))
            }
            CellType::Blob => Ok(Value::Bytes(bytes.to_vec())),
            CellType::Uuid | CellType::TimeUuid => {
                Ok(Value::Uuid(Uuid::from_bytes(fixed::<16>(bytes))))
            }
            CellType::List(element) => {
                let items = CellDecoder::new(bytes).decode_elements(element)?;
                Ok(Value::List(items))
            }
            CellType::Set(element) => {
                let items = CellDecoder::new(bytes).decode_elements(element)?;
                Ok(Value::Set(items))
            }
            CellType::Map(key_type, value_type) => {
                let mut inner = CellDecoder::new(bytes);
                let count = inner.read_count()?;
                let mut entries = Vec::with_capacity(count);
                for _ in 0..count {
                    let key = inner.decode_sized(key_type)?;
                    let value = inner.decode_sized(value_type)?;
                    entries.push((key, value));
                }
                inner.finish()?;
                Ok(Value::Map(entries))
            }
            CellType::Tuple(types) => {
                let mut inner = CellDecoder::new(bytes);
                let mut items = Vec::with_capacity(types.len());
                for t in types {
                    // Older values may omit trailing components.
                    if inner.is_empty() {
                        items.push(Value::Null);
                        continue;
                    }
                    items.push(inner.decode_sized(t)?);
                }
                inner.finish()?;
                Ok(Value::Tuple(items))
            }
            CellType::Udt { fields, .. } => {
                let mut inner = CellDecoder::new(bytes);
                let mut items = Vec::with_capacity(fields.len());
                for (name, t) in fields {
                    let value = if inner.is_empty() {
                        Value::Null
                    } else {
                        inner.decode_sized(t)?
                    };
                    items.push((name.clone(), value));
                }
                inner.finish()?;
                Ok(Value::Udt(items))
            }
            CellType::Reversed(_) => Err(CodecError::decoding_failed(
                "reversed type was not unwrapped",
            )),
        }
    }

    /// Decode an `i32`-length-prefixed value; a negative length is null.
    pub fn decode_sized(&mut self, cell_type: &CellType) -> CodecResult<Value> {
        let len = self.read_i32()?;
        if len < 0 {
            return Ok(Value::Null);
        }
        self.decode_value(cell_type, len as usize)
    }

    fn decode_elements(&mut self, element: &CellType) -> CodecResult<Vec<Value>> {
        let count = self.read_count()?;
        let mut items = Vec::with_capacity(count);
        for _ in 0..count {
            items.push(self.decode_sized(element)?);
        }
        self.finish()?;
        Ok(items)
    }

    fn finish(&self) -> CodecResult<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(CodecError::TrailingBytes {
                remaining: self.remaining().len(),
            })
        }
    }

    fn read_count(&mut self) -> CodecResult<usize> {
        let count = self.read_i32()?;
        if count < 0 {
            return Err(CodecError::decoding_failed("negative collection size"));
        }
        let count = count as u64;
        if count > MAX_COLLECTION_ELEMENTS {
            return Err(CodecError::SizeLimitExceeded {
                claimed: count,
                max_allowed: MAX_COLLECTION_ELEMENTS,
            });
        }
        Ok(count as usize)
    }

    #[inline]
    fn read_i32(&mut self) -> CodecResult<i32> {
        let bytes = self.read_bytes(4)?;
        Ok(i32::from_be_bytes(fixed::<4>(bytes)))
    }

    #[inline]
    fn read_bytes(&mut self, len: usize) -> CodecResult<&'a [u8]> {
        if self.pos + len > self.data.len() {
            return Err(CodecError::UnexpectedEof);
        }
        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }
}

/// Copies an already length-checked slice into an array.
fn fixed<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[..N]);
    out
}

//! # Quarry Codec
//!
//! Native cell serialization for the Quarry secondary index.
//!
//! The storage engine hands the index raw bytes for keys and cells. This
//! crate provides:
//! - [`CellType`] descriptors for every supported column type
//! - Decoding raw bytes into typed [`Value`]s, and the inverse encoding
//! - Native comparators that agree with the engine's key ordering
//! - The composite key layout used by multi-component keys
//! - Order-preserving fixed-width encodings for sortable index fields
//!
//! ## Usage
//!
//! ```
//! use quarry_codec::{decode, encode, CellType, Value};
//!
//! let t = CellType::list(CellType::Int);
//! let value = Value::List(vec![Value::Integer(1), Value::Integer(-2)]);
//! let bytes = encode(&t, &value).unwrap();
//! assert_eq!(decode(&t, &bytes).unwrap(), value);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod compare;
pub mod composite;
mod decoder;
mod encoder;
mod error;
pub mod ordered;
mod types;
mod value;

pub use compare::compare;
pub use decoder::{decode, CellDecoder};
pub use encoder::{encode, CellEncoder};
pub use error::{CodecError, CodecResult};
pub use types::CellType;
pub use value::Value;

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn scalar_strategy() -> impl Strategy<Value = (CellType, Value)> {
        prop_oneof![
            any::<i32>().prop_map(|n| (CellType::Int, Value::Integer(i64::from(n)))),
            any::<i64>().prop_map(|n| (CellType::BigInt, Value::Integer(n))),
            any::<i16>().prop_map(|n| (CellType::SmallInt, Value::Integer(i64::from(n)))),
            any::<bool>().prop_map(|b| (CellType::Boolean, Value::Bool(b))),
            ".{0,24}".prop_map(|s| (CellType::Text, Value::Text(s))),
            prop::collection::vec(any::<u8>(), 0..32)
                .prop_map(|b| (CellType::Blob, Value::Bytes(b))),
        ]
    }

    proptest! {
        #[test]
        fn decode_inverts_encode((t, v) in scalar_strategy()) {
            let bytes = encode(&t, &v).unwrap();
            prop_assert_eq!(decode(&t, &bytes).unwrap(), v);
        }

        #[test]
        fn int_comparator_matches_numeric(a in any::<i32>(), b in any::<i32>()) {
            let ea = encode(&CellType::Int, &Value::Integer(i64::from(a))).unwrap();
            let eb = encode(&CellType::Int, &Value::Integer(i64::from(b))).unwrap();
            prop_assert_eq!(compare(&CellType::Int, &ea, &eb), a.cmp(&b));
        }
    }

    #[test]
    fn trailing_bytes_rejected() {
        let err = decode(&CellType::Int, &[0, 0, 0, 1, 9]).unwrap_err();
        assert!(matches!(err, CodecError::InvalidLength { .. }));

        let mut list = encode(&CellType::list(CellType::Int), &Value::List(vec![])).unwrap();
        list.push(0);
        assert!(decode(&CellType::list(CellType::Int), &list).is_err());
    }
}

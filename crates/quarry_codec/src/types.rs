//! Cell type descriptors.
//!
//! A [`CellType`] describes how the storage engine serializes a column
//! value and how it orders two serialized values. Descriptors nest: a
//! list of user-defined types carries the full UDT field layout.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A column type as declared by the table schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellType {
    /// One byte, `0` is false.
    Boolean,
    /// 8-bit signed integer.
    TinyInt,
    /// 16-bit signed integer.
    SmallInt,
    /// 32-bit signed integer.
    Int,
    /// 64-bit signed integer.
    BigInt,
    /// 64-bit counter value.
    Counter,
    /// IEEE-754 single precision.
    Float,
    /// IEEE-754 double precision.
    Double,
    /// US-ASCII text.
    Ascii,
    /// UTF-8 text.
    Text,
    /// Arbitrary bytes.
    Blob,
    /// 16-byte UUID, ordered by version then bytes.
    Uuid,
    /// Version-1 UUID, ordered by embedded timestamp.
    TimeUuid,
    /// Milliseconds since the epoch, signed 64-bit.
    Timestamp,
    /// Ordered collection.
    List(Box<CellType>),
    /// Unordered collection of unique elements.
    Set(Box<CellType>),
    /// Key/value collection.
    Map(Box<CellType>, Box<CellType>),
    /// Fixed-arity tuple.
    Tuple(Vec<CellType>),
    /// User-defined composite type.
    Udt {
        /// Type name.
        name: String,
        /// Ordered `(field name, field type)` pairs.
        fields: Vec<(String, CellType)>,
        /// Whether the UDT is stored as a single frozen cell.
        frozen: bool,
    },
    /// Wraps a clustering component declared with descending order.
    Reversed(Box<CellType>),
}

impl CellType {
    /// Shorthand for a list type.
    #[must_use]
    pub fn list(element: CellType) -> Self {
        CellType::List(Box::new(element))
    }

    /// Shorthand for a set type.
    #[must_use]
    pub fn set(element: CellType) -> Self {
        CellType::Set(Box::new(element))
    }

    /// Shorthand for a map type.
    #[must_use]
    pub fn map(key: CellType, value: CellType) -> Self {
        CellType::Map(Box::new(key), Box::new(value))
    }

    /// Shorthand for a descending clustering component.
    #[must_use]
    pub fn reversed(inner: CellType) -> Self {
        CellType::Reversed(Box::new(inner))
    }

    /// Shorthand for a non-frozen user-defined type.
    #[must_use]
    pub fn udt(name: impl Into<String>, fields: Vec<(&str, CellType)>) -> Self {
        CellType::Udt {
            name: name.into(),
            fields: fields
                .into_iter()
                .map(|(n, t)| (n.to_string(), t))
                .collect(),
            frozen: false,
        }
    }

    /// Strips any `Reversed` wrapper.
    #[must_use]
    pub fn base(&self) -> &CellType {
        match self {
            CellType::Reversed(inner) => inner.base(),
            other => other,
        }
    }

    /// Returns true for list, set and map types.
    #[must_use]
    pub fn is_collection(&self) -> bool {
        matches!(
            self.base(),
            CellType::List(_) | CellType::Set(_) | CellType::Map(_, _)
        )
    }

    /// Returns true if values of this type are spread across several cells.
    ///
    /// Collections are always multi-cell here; UDTs only when not frozen.
    #[must_use]
    pub fn is_multi_cell(&self) -> bool {
        match self.base() {
            CellType::List(_) | CellType::Set(_) | CellType::Map(_, _) => true,
            CellType::Udt { frozen, .. } => !frozen,
            _ => false,
        }
    }

    /// Returns the fixed serialized width, if the type has one.
    #[must_use]
    pub fn fixed_width(&self) -> Option<usize> {
        match self.base() {
            CellType::Boolean | CellType::TinyInt => Some(1),
            CellType::SmallInt => Some(2),
            CellType::Int | CellType::Float => Some(4),
            CellType::BigInt | CellType::Counter | CellType::Double | CellType::Timestamp => {
                Some(8)
            }
            CellType::Uuid | CellType::TimeUuid => Some(16),
            _ => None,
        }
    }

    /// Short type name used in error messages.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            CellType::Boolean => "boolean",
            CellType::TinyInt => "tinyint",
            CellType::SmallInt => "smallint",
            CellType::Int => "int",
            CellType::BigInt => "bigint",
            CellType::Counter => "counter",
            CellType::Float => "float",
            CellType::Double => "double",
            CellType::Ascii => "ascii",
            CellType::Text => "text",
            CellType::Blob => "blob",
            CellType::Uuid => "uuid",
            CellType::TimeUuid => "timeuuid",
            CellType::Timestamp => "timestamp",
            CellType::List(_) => "list",
            CellType::Set(_) => "set",
            CellType::Map(_, _) => "map",
            CellType::Tuple(_) => "tuple",
            CellType::Udt { .. } => "udt",
            CellType::Reversed(inner) => inner.name(),
        }
    }
}

impl fmt::Display for CellType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellType::List(e) => write!(f, "list<{e}>"),
            CellType::Set(e) => write!(f, "set<{e}>"),
            CellType::Map(k, v) => write!(f, "map<{k}, {v}>"),
            CellType::Tuple(ts) => {
                write!(f, "tuple<")?;
                for (i, t) in ts.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{t}")?;
                }
                write!(f, ">")
            }
            CellType::Udt { name, frozen, .. } if *frozen => write!(f, "frozen<{name}>"),
            CellType::Udt { name, .. } => write!(f, "{name}"),
            CellType::Reversed(inner) => write!(f, "{inner} desc"),
            other => f.write_str(other.name()),
        }
    }
}

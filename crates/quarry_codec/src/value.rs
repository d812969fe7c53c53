//! Decoded cell values.

use uuid::Uuid;

/// A decoded column value.
///
/// This is the typed view of a cell's raw bytes, produced by
/// [`crate::decode`] from the cell's declared [`crate::CellType`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Null (absent tuple/UDT field, or an explicitly empty value).
    Null,
    /// Boolean value.
    Bool(bool),
    /// Any signed integer type widened to 64 bits.
    Integer(i64),
    /// Any floating point type widened to 64 bits.
    Double(f64),
    /// Text (ascii or UTF-8).
    Text(String),
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// UUID or timeuuid.
    Uuid(Uuid),
    /// Milliseconds since the epoch.
    Timestamp(i64),
    /// List elements in order.
    List(Vec<Value>),
    /// Set elements in the engine's element order.
    Set(Vec<Value>),
    /// Map entries in the engine's key order.
    Map(Vec<(Value, Value)>),
    /// Tuple components.
    Tuple(Vec<Value>),
    /// UDT fields as `(name, value)` in declaration order.
    Udt(Vec<(String, Value)>),
}

impl Value {
    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Get this value as a boolean, if it is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get this value as an integer, if it is one.
    ///
    /// Timestamps are returned as their millisecond value.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(n) | Value::Timestamp(n) => Some(*n),
            _ => None,
        }
    }

    /// Get this value as a double, widening integers.
    #[allow(clippy::cast_precision_loss)]
    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Double(d) => Some(*d),
            Value::Integer(n) => Some(*n as f64),
            _ => None,
        }
    }

    /// Get this value as a string, if it is text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Get this value as bytes, if it is a blob.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Get this value as a UUID, if it is one.
    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            Value::Uuid(u) => Some(*u),
            _ => None,
        }
    }

    /// Look up a field of a UDT value.
    pub fn field(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Udt(fields) => fields.iter().find(|(n, _)| n == name).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Name of the value kind, for error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Double(_) => "double",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
            Value::Uuid(_) => "uuid",
            Value::Timestamp(_) => "timestamp",
            Value::List(_) => "list",
            Value::Set(_) => "set",
            Value::Map(_) => "map",
            Value::Tuple(_) => "tuple",
            Value::Udt(_) => "udt",
        }
    }

    /// Renders scalar values as plain strings; `None` for collections.
    pub fn to_plain_string(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::Bool(b) => Some(b.to_string()),
            Value::Integer(n) | Value::Timestamp(n) => Some(n.to_string()),
            Value::Double(d) => Some(d.to_string()),
            Value::Text(s) => Some(s.clone()),
            Value::Bytes(b) => Some(b.iter().map(|x| format!("{x:02x}")).collect()),
            Value::Uuid(u) => Some(u.to_string()),
            Value::List(_) | Value::Set(_) | Value::Map(_) | Value::Tuple(_) | Value::Udt(_) => {
                None
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Integer(i64::from(n))
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::Double(d)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(b)
    }
}

impl From<Uuid> for Value {
    fn from(u: Uuid) -> Self {
        Value::Uuid(u)
    }
}

//! Decoded columns produced from keys and rows.
//!
//! A [`Column`] is always a scalar: collections contribute one column per
//! element and UDTs or tuples one column per (nested) field. Names are
//! built from the cell name, a dotted path for UDT/tuple fields, and a
//! `$key` suffix for map entries:
//!
//! | source                          | mapper name     | full name           |
//! |---------------------------------|-----------------|---------------------|
//! | `name text`                     | `name`          | `name`              |
//! | `tags set<text>` element        | `tags`          | `tags`              |
//! | `props map<text,int>` entry `a` | `props`         | `props$a`           |
//! | `addr address` field `city`     | `addr.city`     | `addr.city`         |

use quarry_codec::{CellType, Value};

/// Separator between a column and a UDT or tuple field.
pub const UDT_SEPARATOR: char = '.';

/// Separator between a column and a map key.
pub const MAP_SEPARATOR: char = '$';

/// One decoded scalar value and where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    cell_name: String,
    udt_path: Vec<String>,
    map_key: Option<String>,
    cell_type: CellType,
    value: Value,
}

impl Column {
    /// Creates a top-level column.
    pub fn new(cell_name: impl Into<String>, cell_type: CellType, value: Value) -> Self {
        Self {
            cell_name: cell_name.into(),
            udt_path: Vec::new(),
            map_key: None,
            cell_type,
            value,
        }
    }

    /// Returns the name of the cell this column was read from.
    pub fn cell_name(&self) -> &str {
        &self.cell_name
    }

    /// Returns the map key, if the value came from a map entry.
    pub fn map_key(&self) -> Option<&str> {
        self.map_key.as_deref()
    }

    /// Name without the map key suffix.
    pub fn mapper_name(&self) -> String {
        let mut name = self.cell_name.clone();
        for field in &self.udt_path {
            name.push(UDT_SEPARATOR);
            name.push_str(field);
        }
        name
    }

    /// Name including the map key suffix.
    pub fn full_name(&self) -> String {
        let mut name = self.mapper_name();
        if let Some(key) = &self.map_key {
            name.push(MAP_SEPARATOR);
            name.push_str(key);
        }
        name
    }

    /// Returns the scalar type of the value.
    pub fn cell_type(&self) -> &CellType {
        &self.cell_type
    }

    /// Returns the decoded value.
    pub fn value(&self) -> &Value {
        &self.value
    }
}

/// Returns the top-level cell name of a column reference such as
/// `addr.city` or `props$a`.
pub fn base_cell_name(reference: &str) -> &str {
    reference
        .split([UDT_SEPARATOR, MAP_SEPARATOR])
        .next()
        .unwrap_or(reference)
}

/// An ordered collection of decoded columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Columns {
    columns: Vec<Column>,
}

impl Columns {
    /// Creates an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one column.
    pub fn push(&mut self, column: Column) {
        self.columns.push(column);
    }

    /// Appends every column of `other`.
    pub fn extend(&mut self, other: Columns) {
        self.columns.extend(other.columns);
    }

    /// Returns the number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns true if there are no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Iterates over all columns.
    pub fn iter(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter()
    }

    /// Returns the columns addressed by `reference`: every column whose
    /// mapper name matches, or the single map entry named by `col$key`.
    pub fn values_for<'a>(&'a self, reference: &'a str) -> impl Iterator<Item = &'a Column> {
        let by_entry = reference.contains(MAP_SEPARATOR);
        self.columns.iter().filter(move |c| {
            if by_entry {
                c.full_name() == reference
            } else {
                c.mapper_name() == reference
            }
        })
    }

    /// Returns true if any column was read from the cell `cell_name`.
    pub fn contains_cell(&self, cell_name: &str) -> bool {
        self.columns.iter().any(|c| c.cell_name == cell_name)
    }

    /// Adds `value` of type `cell_type` under `cell_name`, flattening
    /// collections, tuples and UDTs. Null values add nothing.
    pub fn add_flattened(&mut self, cell_name: &str, cell_type: &CellType, value: Value) {
        let root = Column::new(cell_name, cell_type.clone(), Value::Null);
        self.flatten(&root, cell_type, value);
    }

    /// Adds a map entry value under `cell_name$key`.
    pub(crate) fn add_map_entry(
        &mut self,
        cell_name: &str,
        key: &Value,
        value_type: &CellType,
        value: Value,
    ) {
        let root = Column::new(cell_name, value_type.clone(), Value::Null);
        self.flatten_entry(&root, key, value_type, value);
    }

    /// Adds a non-frozen UDT field value under `cell_name.field`.
    pub(crate) fn add_udt_field(
        &mut self,
        cell_name: &str,
        field: &str,
        field_type: &CellType,
        value: Value,
    ) {
        let mut root = Column::new(cell_name, field_type.clone(), Value::Null);
        root.udt_path.push(field.to_string());
        self.flatten(&root, field_type, value);
    }

    fn flatten(&mut self, at: &Column, cell_type: &CellType, value: Value) {
        match (cell_type.base(), value) {
            (_, Value::Null) => {}
            (CellType::List(element) | CellType::Set(element), Value::List(items) | Value::Set(items)) => {
                for item in items {
                    self.flatten(at, element, item);
                }
            }
            (CellType::Map(_, value_type), Value::Map(entries)) => {
                for (key, item) in entries {
                    self.flatten_entry(at, &key, value_type, item);
                }
            }
            (CellType::Udt { fields, .. }, Value::Udt(values)) => {
                for (name, field_type) in fields {
                    let Some((_, item)) = values.iter().find(|(n, _)| n == name) else {
                        continue;
                    };
                    let mut child = at.clone();
                    child.udt_path.push(name.clone());
                    self.flatten(&child, field_type, item.clone());
                }
            }
            (CellType::Tuple(types), Value::Tuple(items)) => {
                for (i, (t, item)) in types.iter().zip(items).enumerate() {
                    let mut child = at.clone();
                    child.udt_path.push(i.to_string());
                    self.flatten(&child, t, item);
                }
            }
            (_, value) => {
                let mut column = at.clone();
                column.cell_type = cell_type.base().clone();
                column.value = value;
                self.columns.push(column);
            }
        }
    }

    fn flatten_entry(&mut self, at: &Column, key: &Value, value_type: &CellType, value: Value) {
        let mut child = at.clone();
        // Nested maps keep the outermost key.
        if child.map_key.is_none() {
            child.map_key = key.to_plain_string();
        }
        self.flatten(&child, value_type, value);
    }
}

impl IntoIterator for Columns {
    type Item = Column;
    type IntoIter = std::vec::IntoIter<Column>;

    fn into_iter(self) -> Self::IntoIter {
        self.columns.into_iter()
    }
}

impl<'a> IntoIterator for &'a Columns {
    type Item = &'a Column;
    type IntoIter = std::slice::Iter<'a, Column>;

    fn into_iter(self) -> Self::IntoIter {
        self.columns.iter()
    }
}

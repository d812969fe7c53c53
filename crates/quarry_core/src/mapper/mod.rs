//! Field mappers.
//!
//! An [`IndexSchema`] maps logical field names to typed mappers. It is
//! declared in the index options as JSON:
//!
//! ```json
//! {
//!   "default_analyzer": "standard",
//!   "fields": {
//!     "name":  {"type": "string", "case_sensitive": false},
//!     "bio":   {"type": "text"},
//!     "age":   {"type": "integer", "validated": true},
//!     "place": {"type": "geo_point", "latitude": "lat", "longitude": "lon"}
//!   }
//! }
//! ```
//!
//! Each mapper reads one or more source columns (by mapper name, or
//! `column$key` for one map entry) and emits zero or more fields.

pub mod geo;
pub mod tokenizer;

use crate::columns::{base_cell_name, Column, Columns};
use crate::document::{Field, FieldValue};
use crate::error::{IndexError, IndexResult};
use crate::schema::TableSchema;
use geo::{GeoTransformation, Point, Shape};
use quarry_codec::Value;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tokenizer::{Tokenizer, TokenizerConfig};
use tracing::debug;
use uuid::Uuid;

/// Name of the built-in analyzer.
pub const STANDARD_ANALYZER: &str = "standard";

/// Declarative description of one field mapper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MapperOptions {
    /// Untokenized string.
    String {
        /// Source column; defaults to the field name.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        column: Option<String>,
        /// Whether the source column is required.
        #[serde(default)]
        validated: bool,
        /// Whether values keep their case.
        #[serde(default = "default_true")]
        case_sensitive: bool,
    },
    /// Tokenized text.
    Text {
        /// Source column; defaults to the field name.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        column: Option<String>,
        /// Whether the source column is required.
        #[serde(default)]
        validated: bool,
        /// Analyzer name; defaults to the schema's default analyzer.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        analyzer: Option<String>,
    },
    /// 32-bit integer.
    Integer {
        /// Source column; defaults to the field name.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        column: Option<String>,
        /// Whether the source column is required.
        #[serde(default)]
        validated: bool,
    },
    /// 64-bit integer.
    Bigint {
        /// Source column; defaults to the field name.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        column: Option<String>,
        /// Whether the source column is required.
        #[serde(default)]
        validated: bool,
    },
    /// Floating point number.
    Double {
        /// Source column; defaults to the field name.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        column: Option<String>,
        /// Whether the source column is required.
        #[serde(default)]
        validated: bool,
    },
    /// Boolean, indexed as `"true"` / `"false"`.
    Boolean {
        /// Source column; defaults to the field name.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        column: Option<String>,
        /// Whether the source column is required.
        #[serde(default)]
        validated: bool,
    },
    /// Timestamp in milliseconds.
    Date {
        /// Source column; defaults to the field name.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        column: Option<String>,
        /// Whether the source column is required.
        #[serde(default)]
        validated: bool,
    },
    /// UUID, indexed in hyphenated form.
    Uuid {
        /// Source column; defaults to the field name.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        column: Option<String>,
        /// Whether the source column is required.
        #[serde(default)]
        validated: bool,
    },
    /// Raw bytes.
    Blob {
        /// Source column; defaults to the field name.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        column: Option<String>,
        /// Whether the source column is required.
        #[serde(default)]
        validated: bool,
    },
    /// Point built from two numeric columns.
    GeoPoint {
        /// Latitude column.
        latitude: String,
        /// Longitude column.
        longitude: String,
        /// Whether the source columns are required.
        #[serde(default)]
        validated: bool,
    },
    /// Shape parsed from a WKT column.
    GeoShape {
        /// Source column; defaults to the field name.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        column: Option<String>,
        /// Whether the source column is required.
        #[serde(default)]
        validated: bool,
        /// Transformations applied in order before indexing.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        transformations: Vec<GeoTransformation>,
    },
}

fn default_true() -> bool {
    true
}

/// Declarative index schema, as found in the index options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexSchemaOptions {
    /// Named analyzers, in addition to `standard`.
    pub analyzers: BTreeMap<String, TokenizerConfig>,
    /// Analyzer for text fields that name none.
    pub default_analyzer: Option<String>,
    /// Field mappers by field name.
    pub fields: BTreeMap<String, MapperOptions>,
}

/// Resolved mapper behaviour.
#[derive(Debug, Clone, PartialEq)]
pub enum MapperKind {
    /// Untokenized string.
    String {
        /// Whether values keep their case.
        case_sensitive: bool,
    },
    /// Tokenized text.
    Text(Tokenizer),
    /// 32-bit integer.
    Integer,
    /// 64-bit integer.
    BigInt,
    /// Floating point number.
    Double,
    /// Boolean.
    Boolean,
    /// Timestamp in milliseconds.
    Date,
    /// UUID.
    Uuid,
    /// Raw bytes.
    Blob,
    /// Point from latitude and longitude columns.
    GeoPoint {
        /// Latitude column.
        latitude: String,
        /// Longitude column.
        longitude: String,
    },
    /// Shape from a WKT column.
    GeoShape(Vec<GeoTransformation>),
}

impl MapperKind {
    fn name(&self) -> &'static str {
        match self {
            MapperKind::String { .. } => "string",
            MapperKind::Text(_) => "text",
            MapperKind::Integer => "integer",
            MapperKind::BigInt => "bigint",
            MapperKind::Double => "double",
            MapperKind::Boolean => "boolean",
            MapperKind::Date => "date",
            MapperKind::Uuid => "uuid",
            MapperKind::Blob => "blob",
            MapperKind::GeoPoint { .. } => "geo_point",
            MapperKind::GeoShape(_) => "geo_shape",
        }
    }
}

/// One configured field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldMapper {
    name: String,
    kind: MapperKind,
    column: String,
    validated: bool,
}

impl FieldMapper {
    /// Returns the field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the resolved mapper kind.
    pub fn kind(&self) -> &MapperKind {
        &self.kind
    }

    /// Returns true if a missing source column rejects the document.
    pub fn is_validated(&self) -> bool {
        self.validated
    }

    /// Returns the column references this mapper reads.
    pub fn columns(&self) -> Vec<&str> {
        match &self.kind {
            MapperKind::GeoPoint {
                latitude,
                longitude,
            } => vec![latitude.as_str(), longitude.as_str()],
            _ => vec![self.column.as_str()],
        }
    }

    /// Emits the fields for `columns`.
    ///
    /// # Errors
    ///
    /// For validated mappers, returns a mapper assembly error when a source
    /// column is absent or a value cannot be converted. Unvalidated
    /// mappers skip such values.
    pub fn fields(&self, columns: &Columns) -> IndexResult<Vec<Field>> {
        if let MapperKind::GeoPoint {
            latitude,
            longitude,
        } = &self.kind
        {
            return self.point_fields(columns, latitude, longitude);
        }

        let values: Vec<&Column> = columns.values_for(&self.column).collect();
        if values.is_empty() {
            return self.missing(&self.column);
        }
        let mut fields = Vec::with_capacity(values.len());
        for column in values {
            match self.convert(column.value()) {
                Ok(value) => fields.push(Field::new(self.name.clone(), value)),
                Err(message) => self.reject(&column.full_name(), message)?,
            }
        }
        Ok(fields)
    }

    fn point_fields(
        &self,
        columns: &Columns,
        latitude: &str,
        longitude: &str,
    ) -> IndexResult<Vec<Field>> {
        let lats: Vec<&Column> = columns.values_for(latitude).collect();
        let lons: Vec<&Column> = columns.values_for(longitude).collect();
        if lats.is_empty() {
            return self.missing(latitude);
        }
        if lons.is_empty() {
            return self.missing(longitude);
        }

        let mut fields = Vec::new();
        for (lat, lon) in lats.iter().zip(&lons) {
            let point = match (lat.value().as_double(), lon.value().as_double()) {
                (Some(lat), Some(lon)) => Point::checked(lon, lat),
                _ => Err(format!(
                    "cannot map {} and {} values to a point",
                    lat.value().kind_name(),
                    lon.value().kind_name()
                )),
            };
            match point {
                Ok(point) => fields.push(Field::new(self.name.clone(), FieldValue::Point(point))),
                Err(message) => self.reject(&lat.full_name(), message)?,
            }
        }
        Ok(fields)
    }

    fn missing(&self, column: &str) -> IndexResult<Vec<Field>> {
        if self.validated {
            Err(IndexError::mapper_assembly(
                &self.name,
                format!("required column {column} is missing"),
            ))
        } else {
            Ok(Vec::new())
        }
    }

    fn reject(&self, column: &str, message: String) -> IndexResult<()> {
        if self.validated {
            return Err(IndexError::mapper_assembly(&self.name, message));
        }
        debug!(field = %self.name, column, reason = %message, "skipping unmappable value");
        Ok(())
    }

    fn convert(&self, value: &Value) -> Result<FieldValue, String> {
        let unsupported = || format!("cannot map {} value to {}", value.kind_name(), self.kind.name());
        match &self.kind {
            MapperKind::String { case_sensitive } => {
                let text = value.to_plain_string().ok_or_else(unsupported)?;
                Ok(FieldValue::Keyword(if *case_sensitive {
                    text
                } else {
                    text.to_lowercase()
                }))
            }
            MapperKind::Text(tokenizer) => {
                let text = value.to_plain_string().ok_or_else(unsupported)?;
                Ok(FieldValue::Tokens(tokenizer.tokenize(&text)))
            }
            MapperKind::Integer => {
                let n = integer(value).ok_or_else(unsupported)?;
                i32::try_from(n)
                    .map(|n| FieldValue::Long(i64::from(n)))
                    .map_err(|_| format!("{n} is out of range for integer"))
            }
            MapperKind::BigInt => integer(value).map(FieldValue::Long).ok_or_else(unsupported),
            MapperKind::Date => match value {
                Value::Timestamp(ms) | Value::Integer(ms) => Ok(FieldValue::Long(*ms)),
                _ => Err(unsupported()),
            },
            MapperKind::Double => {
                let d = match value {
                    Value::Text(s) => s.trim().parse::<f64>().ok(),
                    other => other.as_double(),
                };
                d.map(FieldValue::Double).ok_or_else(unsupported)
            }
            MapperKind::Boolean => {
                let b = match value {
                    Value::Text(s) if s.eq_ignore_ascii_case("true") => Some(true),
                    Value::Text(s) if s.eq_ignore_ascii_case("false") => Some(false),
                    other => other.as_bool(),
                };
                b.map(|b| FieldValue::Keyword(b.to_string()))
                    .ok_or_else(unsupported)
            }
            MapperKind::Uuid => {
                let uuid = match value {
                    Value::Text(s) => Uuid::parse_str(s.trim()).ok(),
                    other => other.as_uuid(),
                };
                uuid.map(|u| FieldValue::Keyword(u.hyphenated().to_string()))
                    .ok_or_else(unsupported)
            }
            MapperKind::Blob => value
                .as_bytes()
                .map(|b| FieldValue::Bytes(b.to_vec()))
                .ok_or_else(unsupported),
            MapperKind::GeoShape(transformations) => {
                let text = value.as_text().ok_or_else(unsupported)?;
                let shape = Shape::parse_wkt(text)?;
                let shape = transformations
                    .iter()
                    .fold(shape, |shape, t| t.apply(&shape));
                Ok(FieldValue::Shape(shape))
            }
            MapperKind::GeoPoint { .. } => Err(unsupported()),
        }
    }
}

fn integer(value: &Value) -> Option<i64> {
    match value {
        Value::Text(s) => s.trim().parse().ok(),
        Value::Double(d) if d.fract() == 0.0 && d.is_finite() => Some(*d as i64),
        other => other.as_integer(),
    }
}

/// The validated set of field mappers of an index.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexSchema {
    mappers: Vec<FieldMapper>,
    mapped_columns: BTreeSet<String>,
    maps_multi_cell: bool,
}

impl IndexSchema {
    /// Parses and validates an index schema from JSON.
    ///
    /// # Errors
    ///
    /// Returns an invalid schema error for malformed JSON or any error
    /// [`Self::build`] reports.
    pub fn from_json(json: &str, table: &TableSchema) -> IndexResult<Self> {
        let options: IndexSchemaOptions = serde_json::from_str(json)?;
        Self::build(&options, table)
    }

    /// Validates `options` against the table.
    ///
    /// # Errors
    ///
    /// Returns an invalid schema error if a mapper names an unknown column
    /// or analyzer, a field name is reserved, or a geo transformation is
    /// malformed.
    pub fn build(options: &IndexSchemaOptions, table: &TableSchema) -> IndexResult<Self> {
        let analyzer = |name: Option<&String>| -> IndexResult<Tokenizer> {
            let name = name
                .or(options.default_analyzer.as_ref())
                .map_or(STANDARD_ANALYZER, String::as_str);
            match options.analyzers.get(name) {
                Some(config) => Ok(Tokenizer::new(config.clone())),
                None if name == STANDARD_ANALYZER => Ok(Tokenizer::default()),
                None => Err(IndexError::invalid_schema(format!("unknown analyzer {name}"))),
            }
        };
        // Fail early on a bad default even when no text field uses it.
        analyzer(None)?;

        let mut mappers = Vec::with_capacity(options.fields.len());
        for (name, mapper) in &options.fields {
            if name.starts_with('_') {
                return Err(IndexError::invalid_schema(format!(
                    "field name {name} is reserved"
                )));
            }
            let source = |column: &Option<String>| column.clone().unwrap_or_else(|| name.clone());
            let (kind, column, validated) = match mapper {
                MapperOptions::String {
                    column,
                    validated,
                    case_sensitive,
                } => (
                    MapperKind::String {
                        case_sensitive: *case_sensitive,
                    },
                    source(column),
                    *validated,
                ),
                MapperOptions::Text {
                    column,
                    validated,
                    analyzer: name,
                } => (MapperKind::Text(analyzer(name.as_ref())?), source(column), *validated),
                MapperOptions::Integer { column, validated } => {
                    (MapperKind::Integer, source(column), *validated)
                }
                MapperOptions::Bigint { column, validated } => {
                    (MapperKind::BigInt, source(column), *validated)
                }
                MapperOptions::Double { column, validated } => {
                    (MapperKind::Double, source(column), *validated)
                }
                MapperOptions::Boolean { column, validated } => {
                    (MapperKind::Boolean, source(column), *validated)
                }
                MapperOptions::Date { column, validated } => {
                    (MapperKind::Date, source(column), *validated)
                }
                MapperOptions::Uuid { column, validated } => {
                    (MapperKind::Uuid, source(column), *validated)
                }
                MapperOptions::Blob { column, validated } => {
                    (MapperKind::Blob, source(column), *validated)
                }
                MapperOptions::GeoPoint {
                    latitude,
                    longitude,
                    validated,
                } => (
                    MapperKind::GeoPoint {
                        latitude: latitude.clone(),
                        longitude: longitude.clone(),
                    },
                    name.clone(),
                    *validated,
                ),
                MapperOptions::GeoShape {
                    column,
                    validated,
                    transformations,
                } => {
                    for transformation in transformations {
                        transformation.validate()?;
                    }
                    (
                        MapperKind::GeoShape(transformations.clone()),
                        source(column),
                        *validated,
                    )
                }
            };
            mappers.push(FieldMapper {
                name: name.clone(),
                kind,
                column,
                validated,
            });
        }

        let mut mapped_columns = BTreeSet::new();
        let mut maps_multi_cell = false;
        for mapper in &mappers {
            for reference in mapper.columns() {
                let cell = base_cell_name(reference);
                let def = table.column(cell).ok_or_else(|| {
                    IndexError::invalid_schema(format!(
                        "field {} maps unknown column {cell}",
                        mapper.name
                    ))
                })?;
                maps_multi_cell |= def.cell_type.is_multi_cell();
                mapped_columns.insert(cell.to_string());
            }
        }

        Ok(Self {
            mappers,
            mapped_columns,
            maps_multi_cell,
        })
    }

    /// Returns the mappers in field name order.
    pub fn mappers(&self) -> &[FieldMapper] {
        &self.mappers
    }

    /// Returns the top-level cells read by any mapper.
    pub fn mapped_columns(&self) -> &BTreeSet<String> {
        &self.mapped_columns
    }

    /// Returns true if a mapper reads a non-frozen collection or UDT.
    ///
    /// Updates to such columns only carry the changed elements, so they
    /// always need the stored row.
    pub fn maps_multi_cell(&self) -> bool {
        self.maps_multi_cell
    }

    /// Returns every field all mappers emit for `columns`.
    ///
    /// # Errors
    ///
    /// Returns the first mapper assembly error of a validated mapper.
    pub fn index_fields(&self, columns: &Columns) -> IndexResult<Vec<Field>> {
        let mut fields = Vec::new();
        for mapper in &self.mappers {
            fields.extend(mapper.fields(columns)?);
        }
        Ok(fields)
    }
}

//! Index documents and their assembly.

use crate::backend::Term;
use crate::columns::Columns;
use crate::error::IndexResult;
use crate::key::{ClusteringKey, DecoratedKey, KeyMapper};
use crate::mapper::geo::{Point, Shape};
use crate::mapper::IndexSchema;
use quarry_codec::ordered;
use std::sync::Arc;

/// Value of an indexed field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Untokenized string.
    Keyword(String),
    /// Analyzed text.
    Tokens(Vec<String>),
    /// Signed integer, sortable.
    Long(i64),
    /// Floating point number, sortable.
    Double(f64),
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// Geographic point.
    Point(Point),
    /// Geographic shape.
    Shape(Shape),
}

/// A named field of a document.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// Field name.
    pub name: String,
    /// Field value.
    pub value: FieldValue,
    /// Whether the value is kept for retrieval.
    pub stored: bool,
}

impl Field {
    /// Creates an indexed, unstored field.
    pub fn new(name: impl Into<String>, value: FieldValue) -> Self {
        Self {
            name: name.into(),
            value,
            stored: false,
        }
    }

    /// Marks the field as stored.
    #[must_use]
    pub fn stored(mut self) -> Self {
        self.stored = true;
        self
    }

    /// Returns the terms this field contributes to the inverted index.
    ///
    /// Geographic fields have no terms; they are matched by shape.
    pub fn terms(&self) -> Vec<Term> {
        let bytes: Vec<Vec<u8>> = match &self.value {
            FieldValue::Keyword(s) => vec![s.as_bytes().to_vec()],
            FieldValue::Tokens(tokens) => tokens.iter().map(|t| t.as_bytes().to_vec()).collect(),
            FieldValue::Long(n) => vec![ordered::encode_i64(*n).to_vec()],
            FieldValue::Double(d) => vec![ordered::encode_f64(*d).to_vec()],
            FieldValue::Bytes(b) => vec![b.clone()],
            FieldValue::Point(_) | FieldValue::Shape(_) => Vec::new(),
        };
        bytes
            .into_iter()
            .map(|b| Term::new(self.name.clone(), b))
            .collect()
    }
}

/// A document: an ordered list of possibly repeated fields.
///
/// Documents are never mutated once handed to the backend; updates
/// replace them wholesale.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    fields: Vec<Field>,
}

impl Document {
    /// Creates an empty document.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field.
    pub fn add(&mut self, field: Field) {
        self.fields.push(field);
    }

    /// Returns every field.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Returns the number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the document has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns the first field named `name`.
    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Returns every value of the field `name`.
    pub fn values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a FieldValue> {
        self.fields
            .iter()
            .filter(move |f| f.name == name)
            .map(|f| &f.value)
    }

    /// Returns the stored bytes of the field `name`.
    pub fn stored_bytes(&self, name: &str) -> Option<&[u8]> {
        self.fields
            .iter()
            .find(|f| f.name == name && f.stored)
            .and_then(|f| match &f.value {
                FieldValue::Bytes(b) => Some(b.as_slice()),
                _ => None,
            })
    }

    /// Returns every term of every field.
    pub fn terms(&self) -> Vec<Term> {
        self.fields.iter().flat_map(Field::terms).collect()
    }
}

/// Combines key fields and mapped columns into documents.
#[derive(Debug, Clone)]
pub struct DocumentAssembler {
    key_mapper: KeyMapper,
    schema: Arc<IndexSchema>,
}

impl DocumentAssembler {
    /// Creates an assembler.
    pub fn new(key_mapper: KeyMapper, schema: Arc<IndexSchema>) -> Self {
        Self { key_mapper, schema }
    }

    /// Returns the key mapper.
    pub fn key_mapper(&self) -> &KeyMapper {
        &self.key_mapper
    }

    /// Returns the field mapping schema.
    pub fn schema(&self) -> &IndexSchema {
        &self.schema
    }

    /// Builds the document for one partition (skinny) or row (wide).
    ///
    /// `columns` holds the projected row plus the decoded key columns.
    ///
    /// # Errors
    ///
    /// Returns a key decoding error if the key does not match the schema,
    /// or a mapper assembly error if a validated mapper's column is absent.
    pub fn assemble(
        &self,
        key: &DecoratedKey,
        clustering: Option<&ClusteringKey>,
        columns: &Columns,
    ) -> IndexResult<Document> {
        let mut document = Document::new();
        for field in self.key_mapper.key_fields(key, clustering)? {
            document.add(field);
        }
        for field in self.schema.index_fields(columns)? {
            document.add(field);
        }
        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IndexError;
    use crate::key::{HashPartitioner, PARTITION_KEY_FIELD};
    use crate::schema::TableSchema;
    use quarry_codec::{CellType, Value};

    fn assembler(fields: &str) -> (DocumentAssembler, TableSchema) {
        let table = TableSchema::new("ks", "users")
            .partition_key("id", CellType::Text)
            .regular("name", CellType::Text)
            .regular("age", CellType::Int);
        let schema = IndexSchema::from_json(fields, &table).unwrap();
        let keys = KeyMapper::new(&table, Arc::new(HashPartitioner)).unwrap();
        (DocumentAssembler::new(keys, Arc::new(schema)), table)
    }

    #[test]
    fn field_terms() {
        let field = Field::new("tags", FieldValue::Tokens(vec!["a".into(), "b".into()]));
        assert_eq!(field.terms().len(), 2);
        let point = Field::new("at", FieldValue::Point(Point::new(0.0, 0.0)));
        assert!(point.terms().is_empty());
    }

    #[test]
    fn stored_bytes_only_for_stored_fields() {
        let mut doc = Document::new();
        doc.add(Field::new("a", FieldValue::Bytes(vec![1])));
        doc.add(Field::new("b", FieldValue::Bytes(vec![2])).stored());
        assert_eq!(doc.stored_bytes("a"), None);
        assert_eq!(doc.stored_bytes("b"), Some([2u8].as_slice()));
    }

    #[test]
    fn assembles_key_and_mapped_fields() {
        let (assembler, _) = assembler(
            r#"{"fields": {"name": {"type": "string"}, "age": {"type": "integer"}}}"#,
        );
        let key = assembler
            .key_mapper()
            .partition()
            .decorate(bytes::Bytes::from_static(b"u1"));
        let mut columns = Columns::new();
        columns.add_flattened("name", &CellType::Text, Value::from("Ana"));
        columns.add_flattened("age", &CellType::Int, Value::Integer(33));

        let doc = assembler.assemble(&key, None, &columns).unwrap();
        assert!(doc.stored_bytes(PARTITION_KEY_FIELD).is_some());
        assert_eq!(
            doc.values("name").collect::<Vec<_>>(),
            vec![&FieldValue::Keyword("Ana".into())]
        );
        assert_eq!(doc.values("age").collect::<Vec<_>>(), vec![&FieldValue::Long(33)]);
    }

    #[test]
    fn unmapped_columns_are_ignored() {
        let (assembler, _) = assembler(r#"{"fields": {"name": {"type": "string"}}}"#);
        let key = assembler
            .key_mapper()
            .partition()
            .decorate(bytes::Bytes::from_static(b"u1"));
        let mut columns = Columns::new();
        columns.add_flattened("age", &CellType::Int, Value::Integer(1));
        let doc = assembler.assemble(&key, None, &columns).unwrap();
        assert!(doc.get("age").is_none());
        assert!(doc.get("name").is_none());
    }

    #[test]
    fn missing_validated_column_rejects_document() {
        let (assembler, _) =
            assembler(r#"{"fields": {"name": {"type": "string", "validated": true}}}"#);
        let key = assembler
            .key_mapper()
            .partition()
            .decorate(bytes::Bytes::from_static(b"u1"));
        let err = assembler.assemble(&key, None, &Columns::new()).unwrap_err();
        assert!(matches!(err, IndexError::MapperAssembly { .. }));
    }
}

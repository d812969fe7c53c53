//! Table schema metadata consumed by the index.

use quarry_codec::CellType;

/// Role of a column in the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnKind {
    /// Component of the partition key.
    PartitionKey,
    /// Component of the clustering key.
    Clustering,
    /// Regular per-row column.
    Regular,
    /// Column shared by every row of a partition.
    Static,
}

/// A column definition.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    /// Column name.
    pub name: String,
    /// Declared type.
    pub cell_type: CellType,
    /// Role in the table.
    pub kind: ColumnKind,
}

impl ColumnDef {
    /// Creates a new column definition.
    pub fn new(name: impl Into<String>, cell_type: CellType, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            cell_type,
            kind,
        }
    }

    /// Returns true if this column is part of the primary key.
    #[must_use]
    pub fn is_primary_key(&self) -> bool {
        matches!(self.kind, ColumnKind::PartitionKey | ColumnKind::Clustering)
    }
}

/// Schema of the indexed table.
///
/// ```
/// use quarry_codec::CellType;
/// use quarry_core::TableSchema;
///
/// let schema = TableSchema::new("ks", "events")
///     .partition_key("device", CellType::Text)
///     .clustering("at", CellType::Timestamp)
///     .regular("reading", CellType::Double);
/// assert!(schema.is_wide());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct TableSchema {
    keyspace: String,
    table: String,
    columns: Vec<ColumnDef>,
}

impl TableSchema {
    /// Creates an empty schema for `keyspace.table`.
    pub fn new(keyspace: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            keyspace: keyspace.into(),
            table: table.into(),
            columns: Vec::new(),
        }
    }

    /// Appends a partition key component.
    #[must_use]
    pub fn partition_key(self, name: impl Into<String>, cell_type: CellType) -> Self {
        self.with(ColumnDef::new(name, cell_type, ColumnKind::PartitionKey))
    }

    /// Appends a clustering key component.
    #[must_use]
    pub fn clustering(self, name: impl Into<String>, cell_type: CellType) -> Self {
        self.with(ColumnDef::new(name, cell_type, ColumnKind::Clustering))
    }

    /// Adds a regular column.
    #[must_use]
    pub fn regular(self, name: impl Into<String>, cell_type: CellType) -> Self {
        self.with(ColumnDef::new(name, cell_type, ColumnKind::Regular))
    }

    /// Adds a static column.
    #[must_use]
    pub fn static_column(self, name: impl Into<String>, cell_type: CellType) -> Self {
        self.with(ColumnDef::new(name, cell_type, ColumnKind::Static))
    }

    fn with(mut self, def: ColumnDef) -> Self {
        self.columns.retain(|c| c.name != def.name);
        self.columns.push(def);
        self
    }

    /// Returns the keyspace name.
    pub fn keyspace(&self) -> &str {
        &self.keyspace
    }

    /// Returns the table name.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Returns true if the table has clustering columns.
    #[must_use]
    pub fn is_wide(&self) -> bool {
        self.columns.iter().any(|c| c.kind == ColumnKind::Clustering)
    }

    /// Looks up a column by name.
    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Returns every column in declaration order.
    pub fn columns(&self) -> impl Iterator<Item = &ColumnDef> {
        self.columns.iter()
    }

    /// Returns the columns of the given kind in declaration order.
    pub fn columns_of(&self, kind: ColumnKind) -> impl Iterator<Item = &ColumnDef> {
        self.columns.iter().filter(move |c| c.kind == kind)
    }

    /// Returns the partition key components.
    pub fn partition_key_columns(&self) -> Vec<&ColumnDef> {
        self.columns_of(ColumnKind::PartitionKey).collect()
    }

    /// Returns the clustering key components.
    pub fn clustering_columns(&self) -> Vec<&ColumnDef> {
        self.columns_of(ColumnKind::Clustering).collect()
    }

    /// Returns the partition key component types in order.
    pub fn partition_key_types(&self) -> Vec<CellType> {
        self.columns_of(ColumnKind::PartitionKey)
            .map(|c| c.cell_type.clone())
            .collect()
    }

    /// Returns the clustering component types in order.
    pub fn clustering_types(&self) -> Vec<CellType> {
        self.columns_of(ColumnKind::Clustering)
            .map(|c| c.cell_type.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users() -> TableSchema {
        TableSchema::new("ks", "users")
            .partition_key("id", CellType::Uuid)
            .regular("name", CellType::Text)
            .regular("tags", CellType::set(CellType::Text))
    }

    #[test]
    fn skinny_table() {
        let schema = users();
        assert!(!schema.is_wide());
        assert_eq!(schema.partition_key_types(), vec![CellType::Uuid]);
        assert!(schema.clustering_types().is_empty());
        assert_eq!(schema.keyspace(), "ks");
        assert_eq!(schema.table(), "users");
    }

    #[test]
    fn composite_partition_key() {
        let schema = TableSchema::new("ks", "t")
            .partition_key("a", CellType::Text)
            .partition_key("b", CellType::Int);
        assert_eq!(
            schema.partition_key_types(),
            vec![CellType::Text, CellType::Int]
        );
        assert_eq!(schema.partition_key_columns().len(), 2);
    }

    #[test]
    fn column_lookup() {
        let schema = users();
        let tags = schema.column("tags").unwrap();
        assert_eq!(tags.kind, ColumnKind::Regular);
        assert!(tags.cell_type.is_multi_cell());
        assert!(schema.column("id").unwrap().is_primary_key());
        assert!(schema.column("missing").is_none());
    }

    #[test]
    fn redefining_column_replaces_it() {
        let schema = users().regular("name", CellType::Ascii);
        assert_eq!(schema.columns().count(), 3);
        assert_eq!(schema.column("name").unwrap().cell_type, CellType::Ascii);
    }
}

//! Column Projector: live cells of a row to decoded [`Columns`].

use crate::columns::Columns;
use crate::error::{IndexError, IndexResult};
use crate::row::{Cell, Row};
use crate::schema::{ColumnDef, TableSchema};
use quarry_codec::{compare, decode, CellType};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::warn;

/// Result of projecting a row.
#[derive(Debug, Default)]
pub struct Projection {
    /// Decoded columns.
    pub columns: Columns,
    /// Columns left out because their cells did not decode.
    pub dropped: Vec<IndexError>,
}

/// Decodes rows against the table schema.
///
/// Projection never mutates the row. Dead cells are skipped, and a column
/// whose cells fail to decode is dropped as a whole with a warning so the
/// rest of the row can still be indexed.
#[derive(Debug, Clone)]
pub struct ColumnProjector {
    schema: Arc<TableSchema>,
}

impl ColumnProjector {
    /// Creates a projector.
    pub fn new(schema: Arc<TableSchema>) -> Self {
        Self { schema }
    }

    /// Projects a row, plus the partition's static row when given.
    pub fn project(&self, row: &Row, static_row: Option<&Row>, now_in_sec: i64) -> Projection {
        let mut projection = Projection::default();
        self.project_into(row, now_in_sec, &mut projection);
        if let Some(static_row) = static_row {
            if !row.is_static() {
                self.project_into(static_row, now_in_sec, &mut projection);
            }
        }
        projection
    }

    fn project_into(&self, row: &Row, now_in_sec: i64, out: &mut Projection) {
        let mut by_column: BTreeMap<&str, Vec<&Cell>> = BTreeMap::new();
        for cell in row.live_cells(now_in_sec) {
            by_column.entry(cell.column.as_str()).or_default().push(cell);
        }

        for (name, cells) in by_column {
            let result = match self.schema.column(name) {
                Some(def) if !def.is_primary_key() => project_column(def, &cells),
                Some(_) => Err(IndexError::column_projection(
                    name,
                    "primary key columns have no cells",
                )),
                None => Err(IndexError::column_projection(name, "column is not in the schema")),
            };
            match result {
                Ok(columns) => out.columns.extend(columns),
                Err(err) => {
                    warn!(column = name, error = %err, "dropping column from document");
                    out.dropped.push(err);
                }
            }
        }
    }
}

fn project_column(def: &ColumnDef, cells: &[&Cell]) -> IndexResult<Columns> {
    let name = def.name.as_str();
    let fail = |e: quarry_codec::CodecError| IndexError::column_projection(name, e.to_string());
    let mut columns = Columns::new();

    if !def.cell_type.is_multi_cell() {
        // A single-cell column has one live cell; keep the newest if not.
        let newest = cells.iter().max_by_key(|c| c.timestamp);
        if let Some(cell) = newest {
            let value = decode(&def.cell_type, &cell.value).map_err(fail)?;
            columns.add_flattened(name, &def.cell_type, value);
        }
        return Ok(columns);
    }

    let path = |cell: &&Cell| -> IndexResult<Vec<u8>> {
        cell.path
            .as_ref()
            .map(|p| p.to_vec())
            .ok_or_else(|| IndexError::column_projection(name, "collection cell has no path"))
    };

    match def.cell_type.base() {
        CellType::List(element) => {
            let mut sorted = cells.to_vec();
            sorted.sort_by(|a, b| {
                let (pa, pb) = (a.path.as_deref().unwrap_or(&[]), b.path.as_deref().unwrap_or(&[]));
                compare(&CellType::TimeUuid, pa, pb)
            });
            for cell in sorted {
                path(&cell)?;
                let value = decode(element, &cell.value).map_err(fail)?;
                columns.add_flattened(name, element, value);
            }
        }
        CellType::Set(element) => {
            let mut elements = Vec::with_capacity(cells.len());
            for cell in cells {
                elements.push(path(cell)?);
            }
            elements.sort_by(|a, b| compare(element, a, b));
            for bytes in elements {
                let value = decode(element, &bytes).map_err(fail)?;
                columns.add_flattened(name, element, value);
            }
        }
        CellType::Map(key_type, value_type) => {
            let mut entries = Vec::with_capacity(cells.len());
            for cell in cells {
                entries.push((path(cell)?, *cell));
            }
            entries.sort_by(|a, b| compare(key_type, &a.0, &b.0));
            for (key_bytes, cell) in entries {
                let key = decode(key_type, &key_bytes).map_err(fail)?;
                let value = decode(value_type, &cell.value).map_err(fail)?;
                columns.add_map_entry(name, &key, value_type, value);
            }
        }
        CellType::Udt { fields, .. } => {
            let mut indexed = Vec::with_capacity(cells.len());
            for cell in cells {
                let bytes = path(cell)?;
                let index: [u8; 2] = bytes.as_slice().try_into().map_err(|_| {
                    IndexError::column_projection(name, "UDT field path is not an i16")
                })?;
                indexed.push((i16::from_be_bytes(index), *cell));
            }
            indexed.sort_by_key(|(i, _)| *i);
            for (index, cell) in indexed {
                let (field, field_type) = usize::try_from(index)
                    .ok()
                    .and_then(|i| fields.get(i))
                    .ok_or_else(|| {
                        IndexError::column_projection(name, format!("no UDT field {index}"))
                    })?;
                let value = decode(field_type, &cell.value).map_err(fail)?;
                columns.add_udt_field(name, field, field_type, value);
            }
        }
        other => {
            return Err(IndexError::column_projection(
                name,
                format!("{other} is not a multi-cell type"),
            ))
        }
    }
    Ok(columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::LivenessInfo;
    use quarry_codec::{encode, Value};

    const NOW: i64 = 1_700_000_000;

    fn schema() -> Arc<TableSchema> {
        Arc::new(
            TableSchema::new("ks", "users")
                .partition_key("id", CellType::Text)
                .regular("name", CellType::Text)
                .regular("age", CellType::Int)
                .regular("tags", CellType::set(CellType::Text))
                .regular("scores", CellType::list(CellType::Int))
                .regular("props", CellType::map(CellType::Text, CellType::Int))
                .regular(
                    "addr",
                    CellType::udt("address", vec![("city", CellType::Text), ("zip", CellType::Int)]),
                )
                .static_column("region", CellType::Text),
        )
    }

    fn enc(t: &CellType, v: Value) -> Vec<u8> {
        encode(t, &v).unwrap()
    }

    fn timeuuid(ticks: u8) -> Vec<u8> {
        let mut bytes = vec![0u8; 16];
        bytes[3] = ticks;
        bytes[6] = 0x10;
        bytes
    }

    fn names(columns: &Columns) -> Vec<String> {
        columns.iter().map(|c| c.full_name()).collect()
    }

    #[test]
    fn scalars_decoded() {
        let row = Row::new()
            .with_liveness(LivenessInfo::new(1))
            .with_cell(Cell::live("name", enc(&CellType::Text, Value::from("Ana")), 1))
            .with_cell(Cell::live("age", enc(&CellType::Int, Value::Integer(33)), 1));
        let projection = ColumnProjector::new(schema()).project(&row, None, NOW);
        assert!(projection.dropped.is_empty());
        assert_eq!(names(&projection.columns), vec!["age", "name"]);
    }

    #[test]
    fn dead_cells_omitted() {
        let row = Row::new()
            .with_cell(Cell::tombstone("name", 2, NOW))
            .with_cell(Cell::expiring("age", enc(&CellType::Int, Value::Integer(1)), 1, 10, NOW - 20));
        let projection = ColumnProjector::new(schema()).project(&row, None, NOW);
        assert!(projection.columns.is_empty());
    }

    #[test]
    fn bad_bytes_drop_only_that_column() {
        let row = Row::new()
            .with_cell(Cell::live("age", vec![1u8, 2, 3], 1))
            .with_cell(Cell::live("name", enc(&CellType::Text, Value::from("Ana")), 1));
        let projection = ColumnProjector::new(schema()).project(&row, None, NOW);
        assert_eq!(names(&projection.columns), vec!["name"]);
        assert_eq!(projection.dropped.len(), 1);
        assert!(matches!(
            &projection.dropped[0],
            IndexError::ColumnProjection { column, .. } if column == "age"
        ));
    }

    #[test]
    fn unknown_column_dropped() {
        let row = Row::new().with_cell(Cell::live("ghost", vec![1u8], 1));
        let projection = ColumnProjector::new(schema()).project(&row, None, NOW);
        assert!(projection.columns.is_empty());
        assert_eq!(projection.dropped.len(), 1);
    }

    #[test]
    fn set_elements_from_paths() {
        let row = Row::new()
            .with_cell(Cell::live("tags", Vec::<u8>::new(), 1).with_path(b"b".to_vec()))
            .with_cell(Cell::live("tags", Vec::<u8>::new(), 1).with_path(b"a".to_vec()));
        let projection = ColumnProjector::new(schema()).project(&row, None, NOW);
        let values: Vec<_> = projection.columns.iter().map(|c| c.value().clone()).collect();
        assert_eq!(values, vec![Value::from("a"), Value::from("b")]);
    }

    #[test]
    fn list_elements_in_timeuuid_order() {
        let row = Row::new()
            .with_cell(
                Cell::live("scores", enc(&CellType::Int, Value::Integer(20)), 1)
                    .with_path(timeuuid(2)),
            )
            .with_cell(
                Cell::live("scores", enc(&CellType::Int, Value::Integer(10)), 1)
                    .with_path(timeuuid(1)),
            );
        let projection = ColumnProjector::new(schema()).project(&row, None, NOW);
        let values: Vec<_> = projection.columns.iter().map(|c| c.value().clone()).collect();
        assert_eq!(values, vec![Value::Integer(10), Value::Integer(20)]);
    }

    #[test]
    fn map_entries_get_key_suffix() {
        let row = Row::new().with_cell(
            Cell::live("props", enc(&CellType::Int, Value::Integer(7)), 1)
                .with_path(enc(&CellType::Text, Value::from("color"))),
        );
        let projection = ColumnProjector::new(schema()).project(&row, None, NOW);
        assert_eq!(names(&projection.columns), vec!["props$color"]);
    }

    #[test]
    fn udt_fields_flattened() {
        let row = Row::new()
            .with_cell(
                Cell::live("addr", enc(&CellType::Int, Value::Integer(1000)), 1)
                    .with_path(1i16.to_be_bytes().to_vec()),
            )
            .with_cell(
                Cell::live("addr", enc(&CellType::Text, Value::from("Porto")), 1)
                    .with_path(0i16.to_be_bytes().to_vec()),
            );
        let projection = ColumnProjector::new(schema()).project(&row, None, NOW);
        assert_eq!(names(&projection.columns), vec!["addr.city", "addr.zip"]);
    }

    #[test]
    fn udt_field_out_of_range_dropped() {
        let row = Row::new().with_cell(
            Cell::live("addr", enc(&CellType::Int, Value::Integer(1)), 1)
                .with_path(9i16.to_be_bytes().to_vec()),
        );
        let projection = ColumnProjector::new(schema()).project(&row, None, NOW);
        assert!(projection.columns.is_empty());
        assert_eq!(projection.dropped.len(), 1);
    }

    #[test]
    fn static_row_merged_once() {
        let row = Row::new().with_cell(Cell::live("name", enc(&CellType::Text, Value::from("a")), 1));
        let statics = Row::static_row()
            .with_cell(Cell::live("region", enc(&CellType::Text, Value::from("eu")), 1));
        let projector = ColumnProjector::new(schema());

        let projection = projector.project(&row, Some(&statics), NOW);
        assert_eq!(names(&projection.columns), vec!["name", "region"]);

        let projection = projector.project(&statics, Some(&statics), NOW);
        assert_eq!(names(&projection.columns), vec!["region"]);
    }

    #[test]
    fn row_is_not_mutated() {
        let row = Row::new().with_cell(Cell::live("age", vec![9u8], 1));
        let before = row.clone();
        let _ = ColumnProjector::new(schema()).project(&row, None, NOW);
        assert_eq!(row, before);
    }
}

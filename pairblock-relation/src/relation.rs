use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use arrow::array::{ArrayRef, RecordBatch};
use arrow::datatypes::SchemaRef;
use pairblock_result::{Error, Result};

use crate::cell::CellValue;

static NEXT_RELATION_ID: AtomicU64 = AtomicU64::new(1);

/// Stable opaque handle identifying one relation for its whole lifetime.
///
/// Allocated from a process-wide counter at construction time. The catalog
/// keys its entries by `RelationId`, so metadata follows the relation object
/// rather than its contents: rebuilding an identical batch yields a new id
/// and an empty catalog entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelationId(u64);

impl RelationId {
    fn next() -> Self {
        RelationId(NEXT_RELATION_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rel#{}", self.0)
    }
}

/// A named, identity-tagged table of rows.
///
/// The row data lives in a single Arrow [`RecordBatch`]; all rows share the
/// batch's column set. Relations are immutable once constructed: blocking
/// never rewrites cells, it only selects rows and projects columns into new
/// relations. Shared as `Arc<Relation>` so catalog entries can hold
/// references to source relations without copying data.
pub struct Relation {
    id: RelationId,
    name: String,
    batch: RecordBatch,
}

impl Relation {
    /// Wrap a batch as a new relation with a fresh identity.
    pub fn new(name: impl Into<String>, batch: RecordBatch) -> Arc<Self> {
        Arc::new(Self {
            id: RelationId::next(),
            name: name.into(),
            batch,
        })
    }

    pub fn id(&self) -> RelationId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    pub fn schema(&self) -> SchemaRef {
        self.batch.schema()
    }

    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    pub fn is_empty(&self) -> bool {
        self.batch.num_rows() == 0
    }

    /// Column names in schema order.
    pub fn column_names(&self) -> Vec<String> {
        self.batch
            .schema_ref()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.batch.schema_ref().index_of(name).is_ok()
    }

    /// Look up a column by name.
    pub fn column(&self, name: &str) -> Result<&ArrayRef> {
        self.batch
            .column_by_name(name)
            .ok_or_else(|| Error::missing_column(&self.name, name))
    }

    /// Extract one cell as a dynamically-typed value.
    pub fn cell(&self, row: usize, column: &str) -> Result<CellValue> {
        CellValue::from_array(self.column(column)?, row)
    }

    /// Borrowed handle to one row, for black-box predicates.
    pub fn row(&self, row: usize) -> RowView<'_> {
        RowView {
            relation: self,
            row,
        }
    }
}

impl fmt::Debug for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Relation")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("rows", &self.batch.num_rows())
            .field("columns", &self.batch.num_columns())
            .finish()
    }
}

/// A borrowed view of one row of a relation.
///
/// This is the shape handed to black-box blocking predicates: cheap to copy,
/// no ownership of the underlying batch.
#[derive(Clone, Copy)]
pub struct RowView<'a> {
    relation: &'a Relation,
    row: usize,
}

impl RowView<'_> {
    pub fn relation(&self) -> &Relation {
        self.relation
    }

    /// Position of this row within its relation.
    pub fn index(&self) -> usize {
        self.row
    }

    /// Fetch the named cell of this row.
    pub fn get(&self, column: &str) -> Result<CellValue> {
        self.relation.cell(self.row, column)
    }

    /// True when the named cell is null.
    pub fn is_null(&self, column: &str) -> Result<bool> {
        Ok(self.relation.column(column)?.is_null(self.row))
    }
}

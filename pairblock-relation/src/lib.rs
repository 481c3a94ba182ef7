//! Relation data model for the pairblock crates.
//!
//! A [`Relation`] is an Arrow [`RecordBatch`](arrow::record_batch::RecordBatch)
//! tagged with a process-unique identity ([`RelationId`]) and a display name.
//! Relations are referenced by identity, not by value: two relations built
//! from identical data are distinct entities, which is what lets the catalog
//! attach metadata to one without affecting the other.
//!
//! [`CellValue`] is the dynamically-typed view of a single cell, usable as a
//! hash-map key (floats are stored as bits). It backs join maps, inverted
//! indexes, and key-uniqueness checks. [`RowView`] is a borrowed handle to
//! one row, handed to black-box blocking predicates.

pub mod cell;
pub mod relation;

pub use cell::CellValue;
pub use relation::{Relation, RelationId, RowView};

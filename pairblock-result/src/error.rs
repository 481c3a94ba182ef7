use thiserror::Error;

/// Unified error type for all pairblock operations.
///
/// Every failure mode across the stack lives here, from catalog lookups to
/// blocking preconditions. Errors are raised synchronously and abort the
/// whole operation; no partial candidate set is ever returned alongside an
/// error.
#[derive(Error, Debug)]
pub enum Error {
    /// A referenced column is absent from a relation's schema.
    ///
    /// Raised during precondition validation when a block attribute, overlap
    /// attribute, or requested output attribute does not exist in the
    /// relation it was named against.
    #[error("schema error: {0}")]
    Schema(String),

    /// A declared or required key column fails the key-attribute check.
    ///
    /// A key column must be non-null and pairwise distinct across all rows
    /// (vacuously satisfied by an empty relation). This is raised both for
    /// user-declared keys on base relations and for the surrogate key
    /// manufactured on every candidate set.
    #[error("key constraint violation: {0}")]
    KeyConstraintViolation(String),

    /// A candidate set's foreign-key column fails validation against the
    /// key of its registered source relation.
    #[error("referential integrity error: {0}")]
    ReferentialIntegrity(String),

    /// Invalid blocker configuration.
    ///
    /// Raised when mutually exclusive options are set together (word-level
    /// tokenization with a q-gram size) or a required callback is missing
    /// (black-box blocking without a predicate). Checked before any join
    /// work begins.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A catalog lookup referenced a relation with no catalog entry.
    #[error("relation not registered in the catalog: {0}")]
    NotRegistered(String),

    /// A catalog entry exists for the relation, but lacks the named property.
    #[error("property not found in catalog entry: {0}")]
    PropertyNotFound(String),

    /// Arrow library error during columnar data operations.
    ///
    /// Wraps failures from batch construction and compute kernels (`take`,
    /// `cast`). These typically indicate data-shape incompatibilities rather
    /// than user mistakes.
    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Internal error indicating a bug or unexpected state.
    ///
    /// Should never occur during normal operation; the message describes the
    /// violated invariant (e.g. a cell type the blocking layer does not
    /// support as a join value).
    #[error("an internal operation failed: {0}")]
    Internal(String),
}

impl Error {
    /// Create a schema error naming the missing column and its relation.
    #[inline]
    pub fn missing_column(relation: &str, column: &str) -> Self {
        Error::Schema(format!(
            "column '{column}' does not exist in relation '{relation}'"
        ))
    }
}

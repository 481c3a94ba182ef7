//! Metadata catalog for the pairblock crates.
//!
//! The [`Catalog`] is a registry mapping a relation's identity to a property
//! bag: which column is its unique key and, for candidate sets, which source
//! relations and foreign-key columns it derives from. It is pure storage
//! with presence checks; the blocking strategies receive a catalog reference
//! explicitly rather than reaching for process-wide state.
//!
//! The [`validate`] module holds the stateless metadata predicates: the
//! key-attribute check and the foreign-key constraint check used to decide
//! whether candidate sets are well-formed with respect to their sources.

pub mod catalog;
pub mod validate;

pub use catalog::{Catalog, PropertyValue, props};
pub use validate::{check_fk_constraint, is_key_attribute};

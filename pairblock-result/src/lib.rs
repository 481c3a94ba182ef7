//! Error types and result definitions for the pairblock crates.
//!
//! All pairblock crates share a single error enum ([`Error`]) and result type
//! alias ([`Result<T>`]). Operations that can fail return `Result<T>`, and
//! errors propagate upward with the `?` operator; there is no internal retry
//! anywhere in the stack because blocking is a deterministic computation over
//! its inputs.
//!
//! # Error Categories
//!
//! - **Schema errors** ([`Error::Schema`]): a referenced column is absent
//!   from a relation.
//! - **Key violations** ([`Error::KeyConstraintViolation`]): a declared or
//!   required key column fails the uniqueness/non-null check.
//! - **Referential integrity** ([`Error::ReferentialIntegrity`]): a candidate
//!   set's foreign-key column fails validation against its source relation.
//! - **Configuration errors** ([`Error::Configuration`]): mutually exclusive
//!   options set together, or a required callback left unset.
//! - **Catalog lookups** ([`Error::NotRegistered`], [`Error::PropertyNotFound`]):
//!   metadata requested for an unknown relation or property.
//! - **Columnar kernel failures** ([`Error::Arrow`]): Arrow compute/batch
//!   construction errors.
//! - **Internal errors** ([`Error::Internal`]): violated invariants or
//!   unsupported data shapes; these indicate bugs, not user mistakes.

pub mod error;
pub mod result;

pub use error::Error;
pub use result::Result;

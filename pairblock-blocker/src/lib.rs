//! Blocking strategies for entity resolution.
//!
//! Blocking reduces record matching between two relations from an all-pairs
//! comparison to a much smaller candidate set of tuple pairs worth comparing
//! in detail. Three strategies are provided, each exposing a
//! `block_tables` entry point over two base relations and a `block_candset`
//! counterpart that narrows an existing candidate set:
//!
//! - [`AttrEquivalenceBlocker`]: equality join on a block attribute.
//! - [`OverlapBlocker`]: token-overlap join via an inverted index.
//! - [`BlackBoxBlocker`]: arbitrary pairwise predicate over the full cross
//!   product.
//!
//! Every candidate set carries a manufactured surrogate key plus catalog
//! provenance (`key`, `ltable`, `rtable`, `fk_ltable`, `fk_rtable`), so a
//! candidate set produced by one strategy can be refined by another without
//! re-supplying the source relations. Blockers receive their
//! [`Catalog`](pairblock_catalog::Catalog) explicitly at construction; there
//! is no process-wide registry.
//!
//! Output ordering is part of the contract: `block_tables` output is
//! left-major for the equi-join and black-box strategies and right-major
//! (probe order) for the overlap strategy; `block_candset` preserves input
//! row order. Rows with a null value in a block attribute are silently
//! excluded during blocking — that is the sole supported missing-value
//! policy, not an error path.

pub mod attr_equiv;
pub mod black_box;
mod common;
mod output;
pub mod overlap;

pub use attr_equiv::AttrEquivalenceBlocker;
pub use black_box::{BlackBoxBlocker, BlockingFunction};
pub use overlap::{OverlapBlocker, OverlapOptions};

/// Options controlling candidate-set output shape.
///
/// Shared by all `block_tables` implementations. The two key columns are
/// always emitted (prefixed); `l_output_attrs`/`r_output_attrs` select any
/// further source columns to carry along, also prefixed. A source key listed
/// among the output attributes is dropped silently, since it is already
/// emitted first.
#[derive(Clone, Debug)]
pub struct OutputOptions {
    /// Extra left-relation columns to carry into the output.
    pub l_output_attrs: Vec<String>,
    /// Extra right-relation columns to carry into the output.
    pub r_output_attrs: Vec<String>,
    /// Prefix applied to left-derived output columns.
    pub l_output_prefix: String,
    /// Prefix applied to right-derived output columns.
    pub r_output_prefix: String,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            l_output_attrs: Vec::new(),
            r_output_attrs: Vec::new(),
            l_output_prefix: "ltable_".to_string(),
            r_output_prefix: "rtable_".to_string(),
        }
    }
}

impl OutputOptions {
    /// Select extra left-relation output columns.
    pub fn with_l_output_attrs(mut self, attrs: &[&str]) -> Self {
        self.l_output_attrs = attrs.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Select extra right-relation output columns.
    pub fn with_r_output_attrs(mut self, attrs: &[&str]) -> Self {
        self.r_output_attrs = attrs.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Override both output prefixes.
    pub fn with_prefixes(mut self, l_prefix: &str, r_prefix: &str) -> Self {
        self.l_output_prefix = l_prefix.to_string();
        self.r_output_prefix = r_prefix.to_string();
        self
    }
}

//! Black-box blocking: an arbitrary user-supplied pairwise predicate.
//!
//! No index is possible for an opaque predicate, so `block_tables` scans the
//! full cross product. The predicate convention is retained from the
//! original design and is deliberately inverted: **true means drop the
//! pair**, false means the pair survives blocking. [`BlackBoxBlocker::block_tuples`]
//! exposes the survives-boolean directly for callers probing a single pair.

use std::sync::Arc;

use pairblock_catalog::Catalog;
use pairblock_relation::{Relation, RowView};
use pairblock_result::{Error, Result};

use crate::OutputOptions;
use crate::common::{candset_metadata, key_row_map, process_output_attrs, require_registered_key, resolve_fk};
use crate::output::{CandsetSpec, assemble_candset, retain_candset_rows};

/// Pairwise drop-predicate: returns true to exclude the pair.
pub type BlockingFunction = Arc<dyn Fn(&RowView<'_>, &RowView<'_>) -> bool + Send + Sync>;

/// Pairs scanned between progress events.
const PROGRESS_LOG_INTERVAL: usize = 1 << 17;

/// Blocks tuple pairs with a caller-supplied predicate.
pub struct BlackBoxBlocker {
    catalog: Arc<Catalog>,
    function: Option<BlockingFunction>,
}

impl BlackBoxBlocker {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            catalog,
            function: None,
        }
    }

    /// Install the drop-predicate (true = drop the pair).
    pub fn set_black_box_function<F>(&mut self, function: F)
    where
        F: Fn(&RowView<'_>, &RowView<'_>) -> bool + Send + Sync + 'static,
    {
        self.function = Some(Arc::new(function));
    }

    fn function(&self) -> Result<&(dyn Fn(&RowView<'_>, &RowView<'_>) -> bool + Send + Sync)> {
        self.function
            .as_deref()
            .ok_or_else(|| Error::Configuration("black-box function is not set".to_string()))
    }

    /// Block two base relations with the installed predicate.
    ///
    /// Scans the full cross product, left-major, retaining pairs for which
    /// the predicate returns false. Progress is reported as debug-level
    /// events; that reporting is observable but not part of the correctness
    /// contract.
    pub fn block_tables(
        &self,
        ltable: &Arc<Relation>,
        rtable: &Arc<Relation>,
        output: &OutputOptions,
    ) -> Result<Arc<Relation>> {
        let function = self.function()?;
        tracing::info!(
            ltable = %ltable.name(),
            rtable = %rtable.name(),
            "required metadata: ltable key, rtable key"
        );
        let l_key = require_registered_key(&self.catalog, ltable, "left")?;
        let r_key = require_registered_key(&self.catalog, rtable, "right")?;
        let l_output_attrs =
            process_output_attrs(ltable, &l_key, &output.l_output_attrs, "left")?;
        let r_output_attrs =
            process_output_attrs(rtable, &r_key, &output.r_output_attrs, "right")?;

        let total = ltable.num_rows() * rtable.num_rows();
        let mut scanned = 0usize;
        let mut pairs: Vec<(u32, u32)> = Vec::new();
        for l_row in 0..ltable.num_rows() {
            for r_row in 0..rtable.num_rows() {
                scanned += 1;
                if scanned % PROGRESS_LOG_INTERVAL == 0 {
                    tracing::debug!(scanned, total, "cross-product blocking progress");
                }
                if !function(&ltable.row(l_row), &rtable.row(r_row)) {
                    pairs.push((l_row as u32, r_row as u32));
                }
            }
        }

        let spec = CandsetSpec {
            ltable,
            rtable,
            l_key: &l_key,
            r_key: &r_key,
            l_output_attrs,
            r_output_attrs,
            l_prefix: &output.l_output_prefix,
            r_prefix: &output.r_output_prefix,
        };
        assemble_candset(&self.catalog, &spec, &pairs)
    }

    /// Narrow an existing candidate set with the installed predicate.
    ///
    /// Applies the predicate to each already-materialized pair via the
    /// candidate set's foreign keys; no cross product is involved. All
    /// columns and provenance are preserved.
    pub fn block_candset(&self, candset: &Arc<Relation>) -> Result<Arc<Relation>> {
        let function = self.function()?;
        let meta = candset_metadata(&self.catalog, candset)?;
        let l_rows = key_row_map(&meta.ltable, &meta.l_key)?;
        let r_rows = key_row_map(&meta.rtable, &meta.r_key)?;
        let fk_l = candset.column(&meta.fk_ltable)?;
        let fk_r = candset.column(&meta.fk_rtable)?;

        let mut keep: Vec<u32> = Vec::new();
        for row in 0..candset.num_rows() {
            if (row + 1) % PROGRESS_LOG_INTERVAL == 0 {
                tracing::debug!(
                    scanned = row + 1,
                    total = candset.num_rows(),
                    "candidate-set blocking progress"
                );
            }
            let l_row = resolve_fk(&l_rows, fk_l, row, &meta.fk_ltable)? as usize;
            let r_row = resolve_fk(&r_rows, fk_r, row, &meta.fk_rtable)? as usize;
            if !function(&meta.ltable.row(l_row), &meta.rtable.row(r_row)) {
                keep.push(row as u32);
            }
        }
        retain_candset_rows(&self.catalog, candset, &meta, &keep)
    }

    /// Evaluate a single pair, returning the survives-boolean (the negation
    /// of the stored drop-predicate).
    pub fn block_tuples(&self, ltuple: &RowView<'_>, rtuple: &RowView<'_>) -> Result<bool> {
        let function = self.function()?;
        Ok(!function(ltuple, rtuple))
    }
}

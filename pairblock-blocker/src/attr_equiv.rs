//! Attribute-equivalence blocking: an equality join on a block attribute.

use std::sync::Arc;

use pairblock_catalog::Catalog;
use pairblock_relation::{CellValue, Relation};
use pairblock_result::Result;
use rustc_hash::FxHashMap;

use crate::OutputOptions;
use crate::common::{
    candset_metadata, key_row_map, process_output_attrs, require_registered_key, resolve_fk,
};
use crate::output::{CandsetSpec, assemble_candset, retain_candset_rows};

/// Blocks tuple pairs whose block-attribute values are equal.
///
/// The join is hash-based: right-side rows are indexed by block value once,
/// then the left side probes in a single pass, so cost is proportional to
/// input size plus match count rather than the cross product.
pub struct AttrEquivalenceBlocker {
    catalog: Arc<Catalog>,
}

impl AttrEquivalenceBlocker {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }

    /// Block two base relations on attribute equality.
    ///
    /// Rows with a null block-attribute value on either side are silently
    /// excluded. Output is left-major: all matches for the first left row,
    /// then the second, and so on, with right matches in right-row order.
    pub fn block_tables(
        &self,
        ltable: &Arc<Relation>,
        rtable: &Arc<Relation>,
        l_block_attr: &str,
        r_block_attr: &str,
        output: &OutputOptions,
    ) -> Result<Arc<Relation>> {
        tracing::info!(
            ltable = %ltable.name(),
            rtable = %rtable.name(),
            "required metadata: ltable key, rtable key"
        );
        let l_key = require_registered_key(&self.catalog, ltable, "left")?;
        let r_key = require_registered_key(&self.catalog, rtable, "right")?;
        let l_block = ltable.column(l_block_attr)?;
        let r_block = rtable.column(r_block_attr)?;
        let l_output_attrs =
            process_output_attrs(ltable, &l_key, &output.l_output_attrs, "left")?;
        let r_output_attrs =
            process_output_attrs(rtable, &r_key, &output.r_output_attrs, "right")?;

        // Index the right side by block value; nulls never participate.
        let mut by_value: FxHashMap<CellValue, Vec<u32>> = FxHashMap::default();
        for row in 0..rtable.num_rows() {
            let value = CellValue::from_array(r_block, row)?;
            if value.is_null() {
                continue;
            }
            by_value.entry(value).or_default().push(row as u32);
        }

        let mut pairs: Vec<(u32, u32)> = Vec::new();
        for row in 0..ltable.num_rows() {
            let value = CellValue::from_array(l_block, row)?;
            if value.is_null() {
                continue;
            }
            if let Some(matches) = by_value.get(&value) {
                for &r_row in matches {
                    pairs.push((row as u32, r_row));
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

    /// Narrow an existing candidate set to pairs whose block-attribute
    /// values are present and equal.
    ///
    /// Source relations and foreign keys are recovered from the candidate
    /// set's catalog entry; all columns (surrogate key values included) are
    /// preserved. An empty candidate set yields an empty result of the same
    /// shape.
    pub fn block_candset(
        &self,
        candset: &Arc<Relation>,
        l_block_attr: &str,
        r_block_attr: &str,
    ) -> Result<Arc<Relation>> {
        let meta = candset_metadata(&self.catalog, candset)?;
        let l_block = meta.ltable.column(l_block_attr)?;
        let r_block = meta.rtable.column(r_block_attr)?;
        let l_rows = key_row_map(&meta.ltable, &meta.l_key)?;
        let r_rows = key_row_map(&meta.rtable, &meta.r_key)?;
        let fk_l = candset.column(&meta.fk_ltable)?;
        let fk_r = candset.column(&meta.fk_rtable)?;

        let mut keep: Vec<u32> = Vec::new();
        for row in 0..candset.num_rows() {
            let l_row = resolve_fk(&l_rows, fk_l, row, &meta.fk_ltable)?;
            let r_row = resolve_fk(&r_rows, fk_r, row, &meta.fk_rtable)?;
            let l_value = CellValue::from_array(l_block, l_row as usize)?;
            let r_value = CellValue::from_array(r_block, r_row as usize)?;
            if !l_value.is_null() && !r_value.is_null() && l_value == r_value {
                keep.push(row as u32);
            }
        }
        retain_candset_rows(&self.catalog, candset, &meta, &keep)
    }
}

//! Candidate-set assembly shared by the three blocking strategies.
//!
//! Matched row pairs are gathered into output columns with Arrow `take`
//! kernels, a surrogate key column is manufactured by name probing, and the
//! result is registered in the catalog with full provenance before being
//! returned.

use std::sync::Arc;

use arrow::array::{ArrayRef, RecordBatch, UInt32Array, UInt64Array};
use arrow::compute::take;
use arrow::datatypes::{DataType, Field, Schema};
use pairblock_catalog::Catalog;
use pairblock_relation::Relation;
use pairblock_result::{Error, Result};
use rustc_hash::FxHashSet;

use crate::common::CandsetMeta;

/// Everything `assemble_candset` needs besides the matched pairs.
pub(crate) struct CandsetSpec<'a> {
    pub ltable: &'a Arc<Relation>,
    pub rtable: &'a Arc<Relation>,
    pub l_key: &'a str,
    pub r_key: &'a str,
    /// Already validated and key-filtered.
    pub l_output_attrs: Vec<String>,
    pub r_output_attrs: Vec<String>,
    pub l_prefix: &'a str,
    pub r_prefix: &'a str,
}

#[derive(Clone, Copy)]
enum Side {
    Left,
    Right,
}

/// Materialize matched `(left_row, right_row)` pairs as a registered
/// candidate set.
///
/// Output columns, in order: surrogate key, prefixed left key, prefixed
/// right key, prefixed left output attributes, prefixed right output
/// attributes. Post-prefix name ties are resolved by numeric suffixing.
pub(crate) fn assemble_candset(
    catalog: &Catalog,
    spec: &CandsetSpec<'_>,
    pairs: &[(u32, u32)],
) -> Result<Arc<Relation>> {
    let mut used: FxHashSet<String> = FxHashSet::default();
    let mut planned: Vec<(String, Side, &str)> = Vec::new();

    let fk_ltable = resolve_collision(format!("{}{}", spec.l_prefix, spec.l_key), &mut used);
    planned.push((fk_ltable.clone(), Side::Left, spec.l_key));
    let fk_rtable = resolve_collision(format!("{}{}", spec.r_prefix, spec.r_key), &mut used);
    planned.push((fk_rtable.clone(), Side::Right, spec.r_key));
    for attr in &spec.l_output_attrs {
        let name = resolve_collision(format!("{}{attr}", spec.l_prefix), &mut used);
        planned.push((name, Side::Left, attr));
    }
    for attr in &spec.r_output_attrs {
        let name = resolve_collision(format!("{}{attr}", spec.r_prefix), &mut used);
        planned.push((name, Side::Right, attr));
    }

    let l_indices = UInt32Array::from(pairs.iter().map(|p| p.0).collect::<Vec<_>>());
    let r_indices = UInt32Array::from(pairs.iter().map(|p| p.1).collect::<Vec<_>>());

    let mut fields = Vec::with_capacity(planned.len() + 1);
    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(planned.len() + 1);
    for (name, side, source) in &planned {
        let (relation, indices) = match side {
            Side::Left => (spec.ltable, &l_indices),
            Side::Right => (spec.rtable, &r_indices),
        };
        let column = relation.column(source)?;
        let schema = relation.schema();
        let source_field = schema.field_with_name(source)?;
        fields.push(Field::new(
            name.as_str(),
            source_field.data_type().clone(),
            source_field.is_nullable(),
        ));
        arrays.push(take(column.as_ref(), indices, None)?);
    }

    let key_name = surrogate_key_name(&used);
    fields.insert(0, Field::new(key_name.as_str(), DataType::UInt64, false));
    arrays.insert(
        0,
        Arc::new(UInt64Array::from_iter_values(0..pairs.len() as u64)),
    );

    let batch = RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)?;
    let candset = Relation::new(
        format!("candset({},{})", spec.ltable.name(), spec.rtable.name()),
        batch,
    );

    if !pairblock_catalog::is_key_attribute(&candset, &key_name)? {
        return Err(Error::KeyConstraintViolation(format!(
            "manufactured surrogate key '{key_name}' does not qualify as a key"
        )));
    }
    catalog.set_candset_properties(
        &candset,
        &key_name,
        &fk_ltable,
        &fk_rtable,
        spec.ltable,
        spec.rtable,
    );
    Ok(candset)
}

/// Retain a subset of candidate-set rows, preserving all columns (surrogate
/// key values included) and re-registering the same provenance.
pub(crate) fn retain_candset_rows(
    catalog: &Catalog,
    candset: &Relation,
    meta: &CandsetMeta,
    keep: &[u32],
) -> Result<Arc<Relation>> {
    let indices = UInt32Array::from(keep.to_vec());
    let mut arrays = Vec::with_capacity(candset.batch().num_columns());
    for column in candset.batch().columns() {
        arrays.push(take(column.as_ref(), &indices, None)?);
    }
    let batch = RecordBatch::try_new(candset.schema(), arrays)?;
    let out = Relation::new(candset.name().to_string(), batch);
    catalog.set_candset_properties(
        &out,
        &meta.key,
        &meta.fk_ltable,
        &meta.fk_rtable,
        &meta.ltable,
        &meta.rtable,
    );
    Ok(out)
}

/// Claim `base` if free, else probe `base_1`, `base_2`, ... until a free
/// name is found.
fn resolve_collision(base: String, used: &mut FxHashSet<String>) -> String {
    if used.insert(base.clone()) {
        return base;
    }
    let mut i = 1usize;
    loop {
        let candidate = format!("{base}_{i}");
        if used.insert(candidate.clone()) {
            return candidate;
        }
        i += 1;
    }
}

/// First of `_id`, `_id0`, `_id1`, ... not already taken by an output column.
fn surrogate_key_name(columns: &FxHashSet<String>) -> String {
    if !columns.contains("_id") {
        return "_id".to_string();
    }
    let mut i = 0usize;
    loop {
        let candidate = format!("_id{i}");
        if !columns.contains(&candidate) {
            return candidate;
        }
        i += 1;
    }
}

//! Validation and metadata-recovery helpers shared by the blockers.

use std::sync::Arc;

use arrow::array::ArrayRef;
use pairblock_catalog::{Catalog, PropertyValue, check_fk_constraint, is_key_attribute, props};
use pairblock_relation::{CellValue, Relation};
use pairblock_result::{Error, Result};
use rustc_hash::FxHashMap;

/// Fetch a relation's registered key and re-validate it.
pub(crate) fn require_registered_key(
    catalog: &Catalog,
    relation: &Relation,
    side: &str,
) -> Result<String> {
    let key = catalog.get_key(relation)?;
    if !is_key_attribute(relation, &key)? {
        return Err(Error::KeyConstraintViolation(format!(
            "{side} table key '{}' does not qualify as a key for relation '{}'",
            key,
            relation.name()
        )));
    }
    Ok(key)
}

/// Validate requested output attributes and drop the source key from them.
///
/// The key column is always emitted first, so listing it again among the
/// output attributes would only duplicate it.
pub(crate) fn process_output_attrs(
    relation: &Relation,
    key: &str,
    attrs: &[String],
    side: &str,
) -> Result<Vec<String>> {
    let mut out = Vec::with_capacity(attrs.len());
    for attr in attrs {
        if !relation.has_column(attr) {
            return Err(Error::Schema(format!(
                "{side} output attribute '{attr}' is not in relation '{}'",
                relation.name()
            )));
        }
        if attr != key {
            out.push(attr.clone());
        }
    }
    Ok(out)
}

/// Provenance recovered from a candidate set's catalog entry, validated.
pub(crate) struct CandsetMeta {
    pub key: String,
    pub fk_ltable: String,
    pub fk_rtable: String,
    pub ltable: Arc<Relation>,
    pub rtable: Arc<Relation>,
    pub l_key: String,
    pub r_key: String,
}

/// Recover and validate the metadata every `block_candset` path relies on.
///
/// Checks, in order: both base-relation keys, the candidate set's own key,
/// and both foreign-key constraints. An empty candidate set passes all of
/// these vacuously.
pub(crate) fn candset_metadata(catalog: &Catalog, candset: &Relation) -> Result<CandsetMeta> {
    tracing::info!(
        candset = %candset.name(),
        "required metadata: candset key, fk_ltable, fk_rtable, ltable, rtable, ltable key, rtable key"
    );

    let key = catalog.get_key(candset)?;
    let fk_ltable = text_property(catalog, candset, props::FK_LTABLE)?;
    let fk_rtable = text_property(catalog, candset, props::FK_RTABLE)?;
    let ltable = relation_property(catalog, candset, props::LTABLE)?;
    let rtable = relation_property(catalog, candset, props::RTABLE)?;
    let l_key = require_registered_key(catalog, &ltable, "left")?;
    let r_key = require_registered_key(catalog, &rtable, "right")?;

    if !is_key_attribute(candset, &key)? {
        return Err(Error::KeyConstraintViolation(format!(
            "candidate-set key '{}' does not qualify as a key for relation '{}'",
            key,
            candset.name()
        )));
    }
    if !check_fk_constraint(candset, &fk_ltable, &ltable, &l_key)? {
        return Err(Error::ReferentialIntegrity(format!(
            "attribute '{fk_ltable}' does not satisfy the foreign-key constraint to '{}'",
            ltable.name()
        )));
    }
    if !check_fk_constraint(candset, &fk_rtable, &rtable, &r_key)? {
        return Err(Error::ReferentialIntegrity(format!(
            "attribute '{fk_rtable}' does not satisfy the foreign-key constraint to '{}'",
            rtable.name()
        )));
    }

    Ok(CandsetMeta {
        key,
        fk_ltable,
        fk_rtable,
        ltable,
        rtable,
        l_key,
        r_key,
    })
}

/// Build an O(1)-lookup map from key value to row position.
pub(crate) fn key_row_map(relation: &Relation, key: &str) -> Result<FxHashMap<CellValue, u32>> {
    let array = relation.column(key)?;
    let mut map = FxHashMap::default();
    for row in 0..relation.num_rows() {
        let value = CellValue::from_array(array, row)?;
        if value.is_null() {
            continue;
        }
        map.insert(value, row as u32);
    }
    Ok(map)
}

/// Resolve one foreign-key cell to a source row position.
///
/// The fk constraint check is a parent-side uniqueness proxy, so a dangling
/// value can still reach this point; surface it as a referential-integrity
/// failure rather than producing a wrong pair.
pub(crate) fn resolve_fk(
    map: &FxHashMap<CellValue, u32>,
    fk_array: &ArrayRef,
    row: usize,
    fk_column: &str,
) -> Result<u32> {
    let value = CellValue::from_array(fk_array, row)?;
    map.get(&value).copied().ok_or_else(|| {
        Error::ReferentialIntegrity(format!(
            "foreign-key value '{value}' in column '{fk_column}' has no matching source row"
        ))
    })
}

fn text_property(catalog: &Catalog, relation: &Relation, name: &str) -> Result<String> {
    match catalog.get_property(relation, name)? {
        PropertyValue::Text(s) => Ok(s),
        PropertyValue::Relation(_) => Err(Error::Internal(format!(
            "property '{}' of relation '{}' is not text",
            name,
            relation.name()
        ))),
    }
}

fn relation_property(
    catalog: &Catalog,
    relation: &Relation,
    name: &str,
) -> Result<Arc<Relation>> {
    match catalog.get_property(relation, name)? {
        PropertyValue::Relation(r) => Ok(r),
        PropertyValue::Text(_) => Err(Error::Internal(format!(
            "property '{}' of relation '{}' is not a relation reference",
            name,
            relation.name()
        ))),
    }
}

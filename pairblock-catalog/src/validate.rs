//! Stateless metadata predicates.

use pairblock_relation::{CellValue, Relation};
use pairblock_result::Result;
use rustc_hash::FxHashSet;

/// Check whether `column` qualifies as a key attribute of `relation`.
///
/// True when the relation is empty, or when the column's values are all
/// non-null and pairwise distinct. Fails with a schema error when the column
/// does not exist.
pub fn is_key_attribute(relation: &Relation, column: &str) -> Result<bool> {
    let array = relation.column(column)?;
    if relation.is_empty() {
        return Ok(true);
    }

    let mut seen: FxHashSet<CellValue> = FxHashSet::default();
    for row in 0..relation.num_rows() {
        let value = CellValue::from_array(array, row)?;
        if value.is_null() {
            return Ok(false);
        }
        if !seen.insert(value) {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Check the foreign-key relationship from `child[fk_column]` to
/// `parent[parent_key]`.
///
/// Restricts the parent to rows whose key value occurs among the distinct
/// non-null values of the child's foreign-key column, then tests that this
/// restricted subset satisfies the key-attribute property. Note this is a
/// parent-side uniqueness check of the referenced keys, not a containment
/// check of child values in the parent: a child value absent from the parent
/// does not fail here.
pub fn check_fk_constraint(
    child: &Relation,
    fk_column: &str,
    parent: &Relation,
    parent_key: &str,
) -> Result<bool> {
    let fk_array = child.column(fk_column)?;
    let key_array = parent.column(parent_key)?;

    let mut referenced: FxHashSet<CellValue> = FxHashSet::default();
    for row in 0..child.num_rows() {
        let value = CellValue::from_array(fk_array, row)?;
        if !value.is_null() {
            referenced.insert(value);
        }
    }

    // Uniqueness over the restricted parent subset; an empty subset passes
    // vacuously, matching the key-attribute rule for empty relations.
    let mut seen: FxHashSet<CellValue> = FxHashSet::default();
    for row in 0..parent.num_rows() {
        let value = CellValue::from_array(key_array, row)?;
        if value.is_null() || !referenced.contains(&value) {
            continue;
        }
        if !seen.insert(value) {
            return Ok(false);
        }
    }
    Ok(true)
}

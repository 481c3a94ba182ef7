use std::sync::{Arc, RwLock};

use pairblock_relation::{Relation, RelationId};
use pairblock_result::{Error, Result};
use rustc_hash::FxHashMap;

use crate::validate::is_key_attribute;

/// Well-known property names.
///
/// Base relations carry [`props::KEY`]; candidate sets additionally carry
/// the four provenance properties recorded by every blocking operation.
pub mod props {
    /// Name of the relation's unique key column.
    pub const KEY: &str = "key";
    /// Left source relation of a candidate set.
    pub const LTABLE: &str = "ltable";
    /// Right source relation of a candidate set.
    pub const RTABLE: &str = "rtable";
    /// Candidate-set column holding left-source key values.
    pub const FK_LTABLE: &str = "fk_ltable";
    /// Candidate-set column holding right-source key values.
    pub const FK_RTABLE: &str = "fk_rtable";
}

/// A property value stored in a catalog entry.
///
/// Properties are either plain text (key and foreign-key column names) or
/// references to other relations (a candidate set's source tables).
#[derive(Clone, Debug)]
pub enum PropertyValue {
    Text(String),
    Relation(Arc<Relation>),
}

impl PropertyValue {
    pub fn text(value: impl Into<String>) -> Self {
        PropertyValue::Text(value.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            PropertyValue::Text(s) => Some(s),
            PropertyValue::Relation(_) => None,
        }
    }

    pub fn as_relation(&self) -> Option<&Arc<Relation>> {
        match self {
            PropertyValue::Relation(r) => Some(r),
            PropertyValue::Text(_) => None,
        }
    }
}

type Entry = FxHashMap<String, PropertyValue>;

/// Registry mapping relation identities to property bags.
///
/// Entries are created lazily on first property write and keyed by
/// [`RelationId`], so the catalog never keeps a described relation alive
/// through its key; property *values* may hold `Arc<Relation>` references to
/// other relations (the `ltable`/`rtable` provenance of a candidate set).
///
/// All operations take `&self`; mutation is guarded by an interior `RwLock`
/// so concurrent callers are safe, though blocking itself is synchronous.
#[derive(Default)]
pub struct Catalog {
    entries: RwLock<FxHashMap<RelationId, Entry>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set one property, creating the relation's entry if absent.
    ///
    /// Overwriting an existing property is permitted; it is logged as an
    /// informational event, never an error.
    pub fn set_property(&self, relation: &Relation, name: &str, value: PropertyValue) {
        let mut entries = self.entries.write().unwrap();
        let entry = entries.entry(relation.id()).or_default();
        if entry.insert(name.to_string(), value).is_some() {
            tracing::info!(
                relation = %relation.name(),
                property = name,
                "overwriting existing catalog property"
            );
        }
    }

    /// Fetch one property.
    pub fn get_property(&self, relation: &Relation, name: &str) -> Result<PropertyValue> {
        let entries = self.entries.read().unwrap();
        let entry = entries
            .get(&relation.id())
            .ok_or_else(|| Error::NotRegistered(relation.name().to_string()))?;
        entry
            .get(name)
            .cloned()
            .ok_or_else(|| property_not_found(relation, name))
    }

    /// Fetch the whole property bag for a relation.
    pub fn get_all_properties(&self, relation: &Relation) -> Result<FxHashMap<String, PropertyValue>> {
        let entries = self.entries.read().unwrap();
        entries
            .get(&relation.id())
            .cloned()
            .ok_or_else(|| Error::NotRegistered(relation.name().to_string()))
    }

    /// Delete one property.
    pub fn del_property(&self, relation: &Relation, name: &str) -> Result<()> {
        let mut entries = self.entries.write().unwrap();
        let entry = entries
            .get_mut(&relation.id())
            .ok_or_else(|| Error::NotRegistered(relation.name().to_string()))?;
        entry
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| property_not_found(relation, name))
    }

    /// Delete a relation's entire entry.
    pub fn del_all_properties(&self, relation: &Relation) -> Result<()> {
        let mut entries = self.entries.write().unwrap();
        entries
            .remove(&relation.id())
            .map(|_| ())
            .ok_or_else(|| Error::NotRegistered(relation.name().to_string()))
    }

    /// True when the relation has a catalog entry.
    pub fn contains_relation(&self, relation: &Relation) -> bool {
        self.entries.read().unwrap().contains_key(&relation.id())
    }

    /// True when the relation's entry holds the named property.
    pub fn contains_property(&self, relation: &Relation, name: &str) -> Result<bool> {
        let entries = self.entries.read().unwrap();
        let entry = entries
            .get(&relation.id())
            .ok_or_else(|| Error::NotRegistered(relation.name().to_string()))?;
        Ok(entry.contains_key(name))
    }

    /// Number of relations with entries.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries.write().unwrap().clear();
    }

    /// Declare `column` as the relation's key, validating it first.
    pub fn set_key(&self, relation: &Relation, column: &str) -> Result<()> {
        if !is_key_attribute(relation, column)? {
            return Err(Error::KeyConstraintViolation(format!(
                "attribute '{}' does not qualify as a key for relation '{}'",
                column,
                relation.name()
            )));
        }
        self.set_property(relation, props::KEY, PropertyValue::text(column));
        Ok(())
    }

    /// Fetch the relation's key column name.
    pub fn get_key(&self, relation: &Relation) -> Result<String> {
        match self.get_property(relation, props::KEY)? {
            PropertyValue::Text(s) => Ok(s),
            PropertyValue::Relation(_) => Err(Error::Internal(format!(
                "key property of relation '{}' is not text",
                relation.name()
            ))),
        }
    }

    /// Record full candidate-set provenance in one call.
    ///
    /// Every blocking output passes through here before being returned to
    /// the caller.
    pub fn set_candset_properties(
        &self,
        candset: &Relation,
        key: &str,
        fk_ltable: &str,
        fk_rtable: &str,
        ltable: &Arc<Relation>,
        rtable: &Arc<Relation>,
    ) {
        self.set_property(candset, props::KEY, PropertyValue::text(key));
        self.set_property(candset, props::FK_LTABLE, PropertyValue::text(fk_ltable));
        self.set_property(candset, props::FK_RTABLE, PropertyValue::text(fk_rtable));
        self.set_property(
            candset,
            props::LTABLE,
            PropertyValue::Relation(Arc::clone(ltable)),
        );
        self.set_property(
            candset,
            props::RTABLE,
            PropertyValue::Relation(Arc::clone(rtable)),
        );
    }

    /// Clone `src`'s entry onto `dst`, replacing any existing entry.
    pub fn copy_properties(&self, src: &Relation, dst: &Relation) -> Result<()> {
        let properties = self.get_all_properties(src)?;
        let mut entries = self.entries.write().unwrap();
        entries.insert(dst.id(), properties);
        Ok(())
    }
}

fn property_not_found(relation: &Relation, name: &str) -> Error {
    Error::PropertyNotFound(format!(
        "'{}' for relation '{}'",
        name,
        relation.name()
    ))
}

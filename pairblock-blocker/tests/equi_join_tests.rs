//! Integration tests for attribute-equivalence blocking.

use std::sync::Arc;

use arrow::array::{ArrayRef, Int64Array, RecordBatch, StringArray, UInt64Array};
use arrow::datatypes::{DataType, Field, Schema};
use pairblock_blocker::{AttrEquivalenceBlocker, OutputOptions};
use pairblock_catalog::{Catalog, props};
use pairblock_relation::{CellValue, Relation};
use pairblock_result::Error;

fn relation(
    name: &str,
    ids: Vec<i64>,
    zips: Vec<Option<i64>>,
    names: Vec<Option<&str>>,
) -> Arc<Relation> {
    pairblock_test_utils::init_tracing_for_tests();
    let schema = Arc::new(Schema::new(vec![
        Field::new("id", DataType::Int64, false),
        Field::new("zip", DataType::Int64, true),
        Field::new("name", DataType::Utf8, true),
    ]));
    let batch = RecordBatch::try_new(
        schema,
        vec![
            Arc::new(Int64Array::from(ids)) as ArrayRef,
            Arc::new(Int64Array::from(zips)) as ArrayRef,
            Arc::new(StringArray::from(names)) as ArrayRef,
        ],
    )
    .unwrap();
    Relation::new(name, batch)
}

fn setup() -> (Arc<Catalog>, AttrEquivalenceBlocker) {
    let catalog = Arc::new(Catalog::new());
    let blocker = AttrEquivalenceBlocker::new(Arc::clone(&catalog));
    (catalog, blocker)
}

fn int_column(candset: &Relation, column: &str) -> Vec<i64> {
    let array = candset.column(column).unwrap();
    let array = array.as_any().downcast_ref::<Int64Array>().unwrap();
    (0..array.len()).map(|i| array.value(i)).collect()
}

fn key_column(candset: &Relation, column: &str) -> Vec<u64> {
    let array = candset.column(column).unwrap();
    let array = array.as_any().downcast_ref::<UInt64Array>().unwrap();
    (0..array.len()).map(|i| array.value(i)).collect()
}

#[test]
fn zip_scenario_yields_exactly_one_pair() {
    let (catalog, blocker) = setup();
    let l = relation(
        "l",
        vec![1, 2],
        vec![Some(90210), Some(10001)],
        vec![Some("a"), Some("b")],
    );
    let r = relation(
        "r",
        vec![1, 2],
        vec![Some(90210), Some(99999)],
        vec![Some("c"), Some("d")],
    );
    catalog.set_key(&l, "id").unwrap();
    catalog.set_key(&r, "id").unwrap();

    let candset = blocker
        .block_tables(&l, &r, "zip", "zip", &OutputOptions::default())
        .unwrap();

    assert_eq!(candset.num_rows(), 1);
    assert_eq!(int_column(&candset, "ltable_id"), vec![1]);
    assert_eq!(int_column(&candset, "rtable_id"), vec![1]);
}

#[test]
fn candidate_count_matches_non_null_equal_pairs() {
    let (catalog, blocker) = setup();
    // zip 7 appears twice on each side (4 pairs), zip 8 once on each (1
    // pair); nulls never match anything, including each other.
    let l = relation(
        "l",
        vec![1, 2, 3, 4],
        vec![Some(7), Some(7), Some(8), None],
        vec![None; 4],
    );
    let r = relation(
        "r",
        vec![10, 11, 12, 13],
        vec![Some(7), Some(7), Some(8), None],
        vec![None; 4],
    );
    catalog.set_key(&l, "id").unwrap();
    catalog.set_key(&r, "id").unwrap();

    let candset = blocker
        .block_tables(&l, &r, "zip", "zip", &OutputOptions::default())
        .unwrap();
    assert_eq!(candset.num_rows(), 5);

    // Left-major output order, right matches in right-row order.
    assert_eq!(int_column(&candset, "ltable_id"), vec![1, 1, 2, 2, 3]);
    assert_eq!(int_column(&candset, "rtable_id"), vec![10, 11, 10, 11, 12]);
}

#[test]
fn surrogate_key_is_dense_and_registered() {
    let (catalog, blocker) = setup();
    let l = relation("l", vec![1, 2], vec![Some(5), Some(5)], vec![None; 2]);
    let r = relation("r", vec![3, 4], vec![Some(5), Some(5)], vec![None; 2]);
    catalog.set_key(&l, "id").unwrap();
    catalog.set_key(&r, "id").unwrap();

    let candset = blocker
        .block_tables(&l, &r, "zip", "zip", &OutputOptions::default())
        .unwrap();

    assert_eq!(candset.num_rows(), 4);
    assert_eq!(catalog.get_key(&candset).unwrap(), "_id");
    let ids = candset.column("_id").unwrap();
    let ids = ids.as_any().downcast_ref::<UInt64Array>().unwrap();
    let values: Vec<u64> = (0..ids.len()).map(|i| ids.value(i)).collect();
    assert_eq!(values, vec![0, 1, 2, 3]);
}

#[test]
fn surrogate_key_name_probes_past_existing_columns() {
    let (catalog, blocker) = setup();
    // With empty prefixes the left key lands in the output as `_id`, so the
    // surrogate key must fall back to `_id0`.
    let schema = Arc::new(Schema::new(vec![
        Field::new("_id", DataType::Int64, false),
        Field::new("zip", DataType::Int64, true),
    ]));
    let l = Relation::new(
        "l",
        RecordBatch::try_new(
            Arc::clone(&schema),
            vec![
                Arc::new(Int64Array::from(vec![1])) as ArrayRef,
                Arc::new(Int64Array::from(vec![Some(5)])) as ArrayRef,
            ],
        )
        .unwrap(),
    );
    let r = Relation::new(
        "r",
        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Int64Array::from(vec![2])) as ArrayRef,
                Arc::new(Int64Array::from(vec![Some(5)])) as ArrayRef,
            ],
        )
        .unwrap(),
    );
    catalog.set_key(&l, "_id").unwrap();
    catalog.set_key(&r, "_id").unwrap();

    let output = OutputOptions::default().with_prefixes("", "");
    let candset = blocker.block_tables(&l, &r, "zip", "zip", &output).unwrap();

    // Left `_id` claims the bare name, right `_id` is suffixed, and the
    // surrogate key probes to the first free `_id` variant.
    assert!(candset.has_column("_id"));
    assert!(candset.has_column("_id_1"));
    assert_eq!(catalog.get_key(&candset).unwrap(), "_id0");
}

#[test]
fn output_attrs_are_prefixed_and_key_duplicates_dropped() {
    let (catalog, blocker) = setup();
    let l = relation("l", vec![1], vec![Some(5)], vec![Some("ada")]);
    let r = relation("r", vec![2], vec![Some(5)], vec![Some("bob")]);
    catalog.set_key(&l, "id").unwrap();
    catalog.set_key(&r, "id").unwrap();

    let output = OutputOptions::default()
        .with_l_output_attrs(&["name", "id"])
        .with_r_output_attrs(&["name"]);
    let candset = blocker.block_tables(&l, &r, "zip", "zip", &output).unwrap();

    assert_eq!(
        candset.column_names(),
        vec!["_id", "ltable_id", "rtable_id", "ltable_name", "rtable_name"]
    );
    assert_eq!(
        candset.cell(0, "ltable_name").unwrap(),
        CellValue::Utf8("ada".into())
    );
}

#[test]
fn missing_block_attribute_is_schema_error() {
    let (catalog, blocker) = setup();
    let l = relation("l", vec![1], vec![Some(5)], vec![None]);
    let r = relation("r", vec![2], vec![Some(5)], vec![None]);
    catalog.set_key(&l, "id").unwrap();
    catalog.set_key(&r, "id").unwrap();

    let err = blocker
        .block_tables(&l, &r, "zipcode", "zip", &OutputOptions::default())
        .unwrap_err();
    assert!(matches!(err, Error::Schema(_)));
}

#[test]
fn unregistered_key_fails_before_joining() {
    let (_catalog, blocker) = setup();
    let l = relation("l", vec![1], vec![Some(5)], vec![None]);
    let r = relation("r", vec![2], vec![Some(5)], vec![None]);

    let err = blocker
        .block_tables(&l, &r, "zip", "zip", &OutputOptions::default())
        .unwrap_err();
    assert!(matches!(err, Error::NotRegistered(_)));
}

#[test]
fn invalid_registered_key_is_a_key_violation() {
    let (catalog, blocker) = setup();
    let l = relation("l", vec![1, 2], vec![Some(5), Some(5)], vec![None; 2]);
    let r = relation("r", vec![3], vec![Some(5)], vec![None]);
    // Register a key that was valid at declaration time only in appearance:
    // set the property directly to sidestep set_key's validation.
    catalog.set_property(&l, props::KEY, pairblock_catalog::PropertyValue::text("zip"));
    catalog.set_key(&r, "id").unwrap();

    let err = blocker
        .block_tables(&l, &r, "zip", "zip", &OutputOptions::default())
        .unwrap_err();
    assert!(matches!(err, Error::KeyConstraintViolation(_)));
}

#[test]
fn provenance_foreign_keys_lie_in_source_key_domains() {
    let (catalog, blocker) = setup();
    let l = relation(
        "l",
        vec![1, 2, 3],
        vec![Some(7), Some(7), Some(9)],
        vec![None; 3],
    );
    let r = relation(
        "r",
        vec![4, 5],
        vec![Some(7), Some(9)],
        vec![None; 2],
    );
    catalog.set_key(&l, "id").unwrap();
    catalog.set_key(&r, "id").unwrap();

    let candset = blocker
        .block_tables(&l, &r, "zip", "zip", &OutputOptions::default())
        .unwrap();

    let ltable = catalog
        .get_property(&candset, props::LTABLE)
        .unwrap();
    assert_eq!(ltable.as_relation().unwrap().id(), l.id());
    assert_eq!(
        catalog
            .get_property(&candset, props::FK_LTABLE)
            .unwrap()
            .as_text(),
        Some("ltable_id")
    );

    let l_ids: Vec<i64> = int_column(&l, "id");
    let r_ids: Vec<i64> = int_column(&r, "id");
    for fk in int_column(&candset, "ltable_id") {
        assert!(l_ids.contains(&fk));
    }
    for fk in int_column(&candset, "rtable_id") {
        assert!(r_ids.contains(&fk));
    }
}

#[test]
fn block_candset_is_idempotent_over_block_tables() {
    let (catalog, blocker) = setup();
    let l = relation(
        "l",
        vec![1, 2, 3],
        vec![Some(7), Some(8), Some(7)],
        vec![None; 3],
    );
    let r = relation(
        "r",
        vec![4, 5],
        vec![Some(7), Some(8)],
        vec![None; 2],
    );
    catalog.set_key(&l, "id").unwrap();
    catalog.set_key(&r, "id").unwrap();

    let candset = blocker
        .block_tables(&l, &r, "zip", "zip", &OutputOptions::default())
        .unwrap();
    let refined = blocker.block_candset(&candset, "zip", "zip").unwrap();

    assert_eq!(refined.num_rows(), candset.num_rows());
    assert_eq!(
        int_column(&refined, "ltable_id"),
        int_column(&candset, "ltable_id")
    );
    assert_eq!(
        int_column(&refined, "rtable_id"),
        int_column(&candset, "rtable_id")
    );
    assert_eq!(key_column(&refined, "_id"), key_column(&candset, "_id"));
}

#[test]
fn block_candset_filters_on_a_second_attribute() {
    let (catalog, blocker) = setup();
    let l = relation(
        "l",
        vec![1, 2],
        vec![Some(7), Some(7)],
        vec![Some("ada"), Some("bob")],
    );
    let r = relation(
        "r",
        vec![3, 4],
        vec![Some(7), Some(7)],
        vec![Some("ada"), Some("eve")],
    );
    catalog.set_key(&l, "id").unwrap();
    catalog.set_key(&r, "id").unwrap();

    let candset = blocker
        .block_tables(&l, &r, "zip", "zip", &OutputOptions::default())
        .unwrap();
    assert_eq!(candset.num_rows(), 4);

    let refined = blocker.block_candset(&candset, "name", "name").unwrap();
    assert_eq!(refined.num_rows(), 1);
    assert_eq!(int_column(&refined, "ltable_id"), vec![1]);
    assert_eq!(int_column(&refined, "rtable_id"), vec![3]);
    // Surrogate key values are preserved, not re-densified.
    assert_eq!(key_column(&refined, "_id"), vec![0]);
}

#[test]
fn block_candset_on_empty_input_returns_empty_same_shape() {
    let (catalog, blocker) = setup();
    let l = relation("l", vec![1], vec![Some(7)], vec![None]);
    let r = relation("r", vec![2], vec![Some(9)], vec![None]);
    catalog.set_key(&l, "id").unwrap();
    catalog.set_key(&r, "id").unwrap();

    let candset = blocker
        .block_tables(&l, &r, "zip", "zip", &OutputOptions::default())
        .unwrap();
    assert_eq!(candset.num_rows(), 0);

    let refined = blocker.block_candset(&candset, "zip", "zip").unwrap();
    assert_eq!(refined.num_rows(), 0);
    assert_eq!(refined.column_names(), candset.column_names());
}

#[test]
fn block_candset_without_provenance_fails() {
    let (catalog, blocker) = setup();
    let bare = relation("bare", vec![1], vec![Some(7)], vec![None]);
    catalog.set_key(&bare, "id").unwrap();

    let err = blocker.block_candset(&bare, "zip", "zip").unwrap_err();
    assert!(matches!(err, Error::PropertyNotFound(_)));
}

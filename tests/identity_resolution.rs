//! Identity Resolution Invariant Tests
//!
//! The locator's decision logic is pure over document trees; these tests
//! pin the stage-4 scan semantics and the fixed alternate-field order
//! without a running store.

use bson::{doc, Bson};
use docbridge::locator::{contains_identity, IdMatcher, Located, ALTERNATE_ID_FIELDS};

// =============================================================================
// Alternate identifier fields
// =============================================================================

#[test]
fn test_alternate_field_order_is_fixed() {
    assert_eq!(
        ALTERNATE_ID_FIELDS,
        ["id", "id2", "slug", "uuid", "email", "username"]
    );
}

// =============================================================================
// Stage-4 nested scan
// =============================================================================

#[test]
fn test_top_level_identifier_is_found() {
    let order = doc! { "id": "ord-1", "total": 10 };
    assert!(contains_identity(&order, &IdMatcher::new("ord-1")));
}

#[test]
fn test_identifier_only_inside_embedded_array() {
    // The identifier is absent at top level and lives inside an array
    // element; the scan must still flag the containing document.
    let order = doc! {
        "_id": "x",
        "customer": { "name": "a" },
        "lines": [
            { "sku": "s1", "refs": { "id2": 991_i64 } },
            { "sku": "s2" },
        ],
    };
    assert!(contains_identity(&order, &IdMatcher::new("991")));
    assert!(!contains_identity(&order, &IdMatcher::new("992")));
}

#[test]
fn test_deeply_nested_mixed_containers() {
    let document = doc! {
        "a": [ { "b": [ { "c": { "id": "deep" } } ] } ],
    };
    assert!(contains_identity(&document, &IdMatcher::new("deep")));
}

#[test]
fn test_similar_key_names_do_not_match() {
    let document = doc! {
        "order_id": "abc",
        "identity": "abc",
        "ids": ["abc"],
    };
    assert!(!contains_identity(&document, &IdMatcher::new("abc")));
}

#[test]
fn test_string_and_numeric_equality_are_both_honored() {
    let stored_as_int = doc! { "meta": { "id": 42_i32 } };
    let stored_as_string = doc! { "meta": { "id": "42" } };
    let matcher = IdMatcher::new("42");
    assert!(contains_identity(&stored_as_int, &matcher));
    assert!(contains_identity(&stored_as_string, &matcher));

    // A non-numeric identifier never matches a numeric value.
    let matcher = IdMatcher::new("forty-two");
    assert!(!contains_identity(&stored_as_int, &matcher));
}

#[test]
fn test_scalar_array_members_are_not_identifier_keys() {
    // Values in an array under an `id` key are not "a key named id".
    let document = doc! { "tags": [ "id", "x" ] };
    assert!(!contains_identity(&document, &IdMatcher::new("id")));
}

// =============================================================================
// Result shape
// =============================================================================

#[test]
fn test_single_and_container_results_expose_one_target() {
    let single = Located::Document(doc! { "_id": 1 });
    assert_eq!(
        single.into_first().unwrap().get("_id"),
        Some(&Bson::Int32(1))
    );

    let containers = Located::Containers(vec![doc! { "_id": 1 }, doc! { "_id": 2 }]);
    assert_eq!(
        containers.into_first().unwrap().get("_id"),
        Some(&Bson::Int32(1))
    );
}

#[test]
fn test_numeric_candidates_for_alternate_lookup() {
    let candidates = IdMatcher::new("42").numeric_candidates();
    assert!(candidates.contains(&Bson::String("42".to_string())));
    assert!(candidates.contains(&Bson::Int64(42)));

    // Plain strings stay a single candidate, so lookups hit the
    // straightforward equality path.
    assert_eq!(IdMatcher::new("a-slug").numeric_candidates().len(), 1);
}

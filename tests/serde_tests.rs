#![cfg(feature = "serde")]

//! Integration tests for serde support.
//!
//! Serialization covers the current version's content only; history and
//! nesting wires are rebuilt fresh on deserialization.

use rewind::{VersionedMap, VersionedVector};
use rstest::rstest;

// =============================================================================
// VersionedVector Integration Tests
// =============================================================================

#[rstest]
fn test_vector_serializes_as_a_json_array() {
    let vector: VersionedVector<i32> = (1..=3).collect();
    assert_eq!(serde_json::to_string(&vector).unwrap(), "[1,2,3]");
}

#[rstest]
fn test_vector_serializes_the_current_version_only() {
    let mut vector: VersionedVector<i32> = (1..=3).collect();
    vector.undo();
    assert_eq!(serde_json::to_string(&vector).unwrap(), "[1,2]");
}

#[rstest]
fn test_vector_json_roundtrip() {
    let vector: VersionedVector<i32> = (1..=100).collect();
    let json = serde_json::to_string(&vector).unwrap();
    let restored: VersionedVector<i32> = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, vector);
}

#[rstest]
fn test_deserialized_vector_replays_one_version_per_element() {
    let mut restored: VersionedVector<i32> = serde_json::from_str("[5, 6, 7]").unwrap();
    assert_eq!(restored.version_count(), 4);
    restored.undo();
    assert_eq!(restored.to_vec(), vec![5, 6]);
}

#[rstest]
fn test_vector_nested_structures() {
    let mut outer: VersionedVector<VersionedVector<i32>> = VersionedVector::new();
    outer.push_back((1..=3).collect()).unwrap();
    outer.push_back((4..=6).collect()).unwrap();

    let json = serde_json::to_string(&outer).unwrap();
    assert_eq!(json, "[[1,2,3],[4,5,6]]");

    let restored: VersionedVector<VersionedVector<i32>> = serde_json::from_str(&json).unwrap();
    assert_eq!(restored.len(), 2);
    for (original, restored_inner) in outer.iter().zip(restored.iter()) {
        assert_eq!(original, restored_inner);
    }
}

#[rstest]
fn test_empty_vector_json_roundtrip() {
    let vector: VersionedVector<i32> = VersionedVector::new();
    let json = serde_json::to_string(&vector).unwrap();
    assert_eq!(json, "[]");
    let restored: VersionedVector<i32> = serde_json::from_str(&json).unwrap();
    assert!(restored.is_empty());
    assert_eq!(restored.version_count(), 1);
}

// =============================================================================
// VersionedMap Integration Tests
// =============================================================================

#[rstest]
fn test_map_serializes_as_a_json_object() {
    let mut map = VersionedMap::new();
    map.put(String::from("k"), 1).unwrap();
    let value = serde_json::to_value(&map).unwrap();
    assert_eq!(value, serde_json::json!({ "k": 1 }));
}

#[rstest]
fn test_map_serializes_the_current_version_only() {
    let mut map = VersionedMap::new();
    map.put(String::from("kept"), 1).unwrap();
    map.put(String::from("undone"), 2).unwrap();
    map.undo();
    let value = serde_json::to_value(&map).unwrap();
    assert_eq!(value, serde_json::json!({ "kept": 1 }));
}

#[rstest]
fn test_map_json_roundtrip() {
    let map: VersionedMap<String, i32> = (0..20).map(|key| (format!("key-{key}"), key)).collect();
    let json = serde_json::to_string(&map).unwrap();
    let restored: VersionedMap<String, i32> = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, map);
}

#[rstest]
fn test_deserialized_map_has_an_undoable_history() {
    let mut restored: VersionedMap<String, i32> =
        serde_json::from_str(r#"{"a": 1, "b": 2}"#).unwrap();
    assert_eq!(restored.version_count(), 3);
    restored.undo();
    assert_eq!(restored.len(), 1);
    assert_eq!(restored.get("a"), Some(1));
}

#[rstest]
fn test_map_nested_structures() {
    let mut map: VersionedMap<String, VersionedVector<i32>> = VersionedMap::new();
    map.put(String::from("list"), (1..=3).collect()).unwrap();

    let json = serde_json::to_string(&map).unwrap();
    assert_eq!(json, r#"{"list":[1,2,3]}"#);

    let restored: VersionedMap<String, VersionedVector<i32>> =
        serde_json::from_str(&json).unwrap();
    assert_eq!(restored.get("list").unwrap().to_vec(), vec![1, 2, 3]);
}

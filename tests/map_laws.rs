//! Property-based tests for VersionedMap invariants.
//!
//! The central property drives random edit sequences against a snapshot
//! stack of plain maps, simultaneously on a one-bucket map (everything
//! collides) and the default-width map, so the bucket layout is proven
//! unobservable.

use std::collections::BTreeMap;

use proptest::prelude::*;
use rewind::VersionedMap;

// =============================================================================
// Model
// =============================================================================

#[derive(Default)]
struct Model {
    back: Vec<BTreeMap<u8, i32>>,
    current: BTreeMap<u8, i32>,
    forward: Vec<BTreeMap<u8, i32>>,
}

impl Model {
    fn commit(&mut self, next: BTreeMap<u8, i32>) {
        self.back.push(std::mem::replace(&mut self.current, next));
        self.forward.clear();
    }

    fn undo(&mut self) {
        if let Some(previous) = self.back.pop() {
            self.forward.push(std::mem::replace(&mut self.current, previous));
        }
    }

    fn redo(&mut self) {
        if let Some(next) = self.forward.pop() {
            self.back.push(std::mem::replace(&mut self.current, next));
        }
    }

    fn entries(&self) -> Vec<(u8, i32)> {
        self.current.iter().map(|(&key, &value)| (key, value)).collect()
    }

    fn version_count(&self) -> usize {
        self.back.len() + self.forward.len() + 1
    }
}

#[derive(Debug, Clone)]
enum Op {
    Put(u8, i32),
    Remove(u8),
    Clear,
    Undo,
    Redo,
}

// A tight key space forces overwrites, removals of hits and misses, and
// collisions even in the wide map.
fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        5 => ((0_u8..24), any::<i32>()).prop_map(|(key, value)| Op::Put(key, value)),
        3 => (0_u8..24).prop_map(Op::Remove),
        1 => Just(Op::Clear),
        3 => Just(Op::Undo),
        2 => Just(Op::Redo),
    ]
}

fn sorted_entries(map: &VersionedMap<u8, i32>) -> Vec<(u8, i32)> {
    let mut entries = map.entries();
    entries.sort_unstable();
    entries
}

// =============================================================================
// Model conformance
// =============================================================================

proptest! {
    /// Every reachable state of a random edit sequence agrees with the
    /// snapshot-stack model, on one bucket and on sixteen.
    #[test]
    fn prop_random_edits_match_the_model(
        ops in prop::collection::vec(op_strategy(), 0..70)
    ) {
        let mut narrow = VersionedMap::with_buckets(1);
        let mut wide = VersionedMap::new();
        let mut model = Model::default();

        for op in ops {
            match op {
                Op::Put(key, value) => {
                    let expected = model.current.get(&key).copied();
                    prop_assert_eq!(narrow.put(key, value).unwrap(), expected);
                    prop_assert_eq!(wide.put(key, value).unwrap(), expected);
                    let mut next = model.current.clone();
                    next.insert(key, value);
                    model.commit(next);
                }
                Op::Remove(key) => {
                    let expected = model.current.get(&key).copied();
                    prop_assert_eq!(narrow.remove(&key), expected);
                    prop_assert_eq!(wide.remove(&key), expected);
                    if expected.is_some() {
                        let mut next = model.current.clone();
                        next.remove(&key);
                        model.commit(next);
                    }
                }
                Op::Clear => {
                    narrow.clear();
                    wide.clear();
                    model.commit(BTreeMap::new());
                }
                Op::Undo => {
                    narrow.undo();
                    wide.undo();
                    model.undo();
                }
                Op::Redo => {
                    narrow.redo();
                    wide.redo();
                    model.redo();
                }
            }
            prop_assert_eq!(sorted_entries(&narrow), model.entries());
            prop_assert_eq!(sorted_entries(&wide), model.entries());
            prop_assert_eq!(narrow.len(), model.current.len());
        }
        prop_assert_eq!(narrow.version_count(), model.version_count());
        prop_assert_eq!(wide.version_count(), model.version_count());
    }
}

// =============================================================================
// Named laws
// =============================================================================

proptest! {
    /// What was put is what get answers.
    #[test]
    fn prop_put_then_get(
        pairs in prop::collection::vec(((0_u8..32), any::<i32>()), 0..40),
        key in 0_u8..32,
        value: i32
    ) {
        let mut map: VersionedMap<u8, i32> = pairs.into_iter().collect();
        map.put(key, value).unwrap();
        prop_assert_eq!(map.get(&key), Some(value));
    }

    /// Undo after an overwrite restores the previous binding.
    #[test]
    fn prop_overwrite_then_undo_restores(
        key: u8,
        first: i32,
        second: i32
    ) {
        let mut map = VersionedMap::new();
        map.put(key, first).unwrap();
        map.put(key, second).unwrap();
        map.undo();
        prop_assert_eq!(map.get(&key), Some(first));
    }

    /// Undo after a hit remove restores the binding.
    #[test]
    fn prop_remove_then_undo_restores(
        pairs in prop::collection::vec(((0_u8..16), any::<i32>()), 1..30)
    ) {
        let mut map: VersionedMap<u8, i32> = pairs.clone().into_iter().collect();
        let (key, _) = pairs[0];
        let before = map.get(&key);
        if map.remove(&key).is_some() {
            map.undo();
            prop_assert_eq!(map.get(&key), before);
        }
    }

    /// Clear then undo restores every binding.
    #[test]
    fn prop_clear_then_undo_is_identity(
        pairs in prop::collection::vec(((0_u8..32), any::<i32>()), 0..40)
    ) {
        let mut map: VersionedMap<u8, i32> = pairs.into_iter().collect();
        let before = sorted_entries(&map);
        map.clear();
        prop_assert!(map.is_empty());
        map.undo();
        prop_assert_eq!(sorted_entries(&map), before);
    }

    /// Maps built from the same pairs compare equal regardless of bucket
    /// count and insertion order artifacts.
    #[test]
    fn prop_bucket_layout_is_unobservable(
        pairs in prop::collection::vec(((0_u8..32), any::<i32>()), 0..40)
    ) {
        let narrow: VersionedMap<u8, i32> = {
            let mut map = VersionedMap::with_buckets(1);
            map.extend(pairs.clone());
            map
        };
        let wide: VersionedMap<u8, i32> = {
            let mut map = VersionedMap::with_buckets(64);
            map.extend(pairs);
            map
        };
        prop_assert_eq!(narrow, wide);
    }

    /// A fork never observes edits made to the original afterwards.
    #[test]
    fn prop_forks_are_isolated(
        pairs in prop::collection::vec(((0_u8..16), any::<i32>()), 0..30),
        key in 0_u8..16,
        value: i32
    ) {
        let mut map: VersionedMap<u8, i32> = pairs.into_iter().collect();
        let before = sorted_entries(&map);
        let fork = map.fork();
        map.put(key, value).unwrap();
        prop_assert_eq!(sorted_entries(&fork), before);
    }
}

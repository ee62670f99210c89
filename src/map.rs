//! Versioned hash map built from bucketed [`VersionedVector`]s.
//!
//! [`VersionedMap`] spreads its entries over a fixed, power-of-two number of
//! buckets by key hash; every bucket is itself a versioned vector, so each
//! map mutation is recorded twice: as a new version inside the touched
//! bucket, and as a marker in the map's own history saying which bucket to
//! roll when the map is undone. Undoing the map therefore never rebuilds
//! anything, it just replays the right bucket's history one step.
//!
//! Like the vector, a `VersionedMap` value is a handle: `Clone` aliases the
//! same container, [`fork`](VersionedMap::fork) copies it. Values that are
//! themselves versioned containers are adopted on
//! [`put`](VersionedMap::put) and cascade through the map's undo.
//!
//! # Examples
//!
//! ```rust
//! use rewind::VersionedMap;
//!
//! let mut map = VersionedMap::new();
//! map.put("one", 1)?;
//! map.put("two", 2)?;
//! map.put("one", 10)?;
//! assert_eq!(map.get("one"), Some(10));
//!
//! map.undo();
//! assert_eq!(map.get("one"), Some(1));
//! map.undo();
//! assert_eq!(map.get("two"), None);
//! # Ok::<(), rewind::VersionError>(())
//! ```

use std::borrow::Borrow;
use std::cell::RefCell;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::{Rc, Weak};

use crate::causality::{Tracked, VersionHandle, Versioned};
use crate::error::VersionError;
use crate::vector::VersionedVector;

/// Buckets used by [`VersionedMap::new`].
pub(crate) const DEFAULT_BUCKETS: usize = 16;

// =============================================================================
// Entries and history markers
// =============================================================================

/// One key/value pair inside a bucket.
#[derive(Clone)]
struct Entry<K, V> {
    key: K,
    value: V,
}

// Entries are plain elements of their bucket. Nested containers stored as
// values are adopted by the map itself, not by the bucket, so an entry never
// exposes a handle of its own.
impl<K, V> Tracked for Entry<K, V> {}

/// What one map-level edit touched, and therefore what an undo step of the
/// map must roll back.
#[derive(Clone, Debug)]
enum BucketChange {
    /// A single bucket recorded one version.
    One(usize),
    /// Every bucket recorded one version (a `clear`).
    All,
}

// =============================================================================
// Core
// =============================================================================

/// Shared state behind every handle of one map.
///
/// The map's own `back`/`forward` stacks hold [`BucketChange`] markers
/// rather than content; content versions live inside the buckets.
struct MapCore<K, V> {
    buckets: Vec<VersionedVector<Entry<K, V>>>,
    back: Vec<BucketChange>,
    forward: Vec<BucketChange>,
    child_undo: Vec<Rc<dyn Versioned>>,
    child_redo: Vec<Rc<dyn Versioned>>,
    parent: Option<Weak<dyn Versioned>>,
}

impl<K, V> MapCore<K, V> {
    fn new(bucket_count: usize) -> Self {
        assert!(
            bucket_count.is_power_of_two(),
            "bucket count must be a power of two, got {bucket_count}"
        );
        Self {
            buckets: (0..bucket_count).map(|_| VersionedVector::new()).collect(),
            back: Vec::new(),
            forward: Vec::new(),
            child_undo: Vec::new(),
            child_redo: Vec::new(),
            parent: None,
        }
    }

    fn len(&self) -> usize {
        self.buckets.iter().map(VersionedVector::len).sum()
    }

    fn commit(&mut self, change: BucketChange) {
        self.back.push(change);
        self.forward.clear();
        self.child_redo.clear();
    }

    fn record_child_edit(&mut self, child: Rc<dyn Versioned>) {
        self.child_undo.push(child);
        self.child_redo.clear();
        self.forward.clear();
    }

    /// One undo transition; same discipline as the vector core. Rolling a
    /// bucket happens here, under the map borrow, because buckets live in
    /// their own cells.
    fn undo_step(&mut self) -> Option<Rc<dyn Versioned>> {
        if let Some(child) = self.child_undo.pop() {
            self.child_redo.push(Rc::clone(&child));
            return Some(child);
        }
        if let Some(change) = self.back.pop() {
            match &change {
                BucketChange::One(bucket) => self.buckets[*bucket].undo(),
                BucketChange::All => {
                    for bucket in &mut self.buckets {
                        bucket.undo();
                    }
                }
            }
            self.forward.push(change);
        }
        None
    }

    fn redo_step(&mut self) -> Option<Rc<dyn Versioned>> {
        if let Some(child) = self.child_redo.pop() {
            self.child_undo.push(Rc::clone(&child));
            return Some(child);
        }
        if let Some(change) = self.forward.pop() {
            match &change {
                BucketChange::One(bucket) => self.buckets[*bucket].redo(),
                BucketChange::All => {
                    for bucket in &mut self.buckets {
                        bucket.redo();
                    }
                }
            }
            self.back.push(change);
        }
        None
    }

    fn parent_handle(&self) -> Option<Rc<dyn Versioned>> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    /// Independent copy: forks every bucket, keeps the marker history,
    /// starts unparented with no pending children.
    fn fork(&self) -> Self {
        Self {
            buckets: self.buckets.iter().map(VersionedVector::fork).collect(),
            back: self.back.clone(),
            forward: self.forward.clone(),
            child_undo: Vec::new(),
            child_redo: Vec::new(),
            parent: None,
        }
    }
}

impl<K: Hash + Eq, V> MapCore<K, V> {
    fn bucket_index<Q>(&self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: Hash + ?Sized,
    {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() as usize) & (self.buckets.len() - 1)
    }
}

impl<K, V> MapCore<K, V>
where
    K: Hash + Eq + Clone + 'static,
    V: Clone + 'static,
{
    fn put(&mut self, key: K, value: V) -> Result<Option<V>, VersionError> {
        let bucket = self.bucket_index(&key);
        let slot = self.buckets[bucket].position_by(|entry| entry.key == key);
        let previous = match slot {
            Some(index) => Some(self.buckets[bucket].replace_at(index, Entry { key, value }).value),
            None => {
                self.buckets[bucket].push_back(Entry { key, value })?;
                None
            }
        };
        self.commit(BucketChange::One(bucket));
        Ok(previous)
    }

    fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let bucket = self.bucket_index(key);
        let index = self.buckets[bucket].position_by(|entry| entry.key.borrow() == key)?;
        let removed = self.buckets[bucket].remove_entry_at(index);
        self.commit(BucketChange::One(bucket));
        Some(removed.value)
    }

    fn clear(&mut self) {
        // Every bucket records a version, the empty ones included, so the
        // matching undo can roll all of them uniformly.
        for bucket in &mut self.buckets {
            bucket.clear();
        }
        self.commit(BucketChange::All);
    }
}

impl<K, V> Versioned for RefCell<MapCore<K, V>> {
    fn undo(&self) {
        let step = self.borrow_mut().undo_step();
        if let Some(child) = step {
            child.undo();
        }
    }

    fn redo(&self) {
        let step = self.borrow_mut().redo_step();
        if let Some(child) = step {
            child.redo();
        }
    }

    fn attach_parent(&self, parent: Weak<dyn Versioned>) {
        self.borrow_mut().parent = Some(parent);
    }

    fn record_child_edit(&self, child: Rc<dyn Versioned>) {
        self.borrow_mut().record_child_edit(child);
    }
}

// =============================================================================
// VersionedMap Definition
// =============================================================================

/// A hash map that remembers every version of itself.
///
/// Mutations are recorded in per-bucket histories plus a map-level marker
/// stack, so [`undo`](Self::undo)/[`redo`](Self::redo) replay exactly the
/// touched bucket. Iteration order is unspecified (bucket order, then
/// insertion order within a bucket).
///
/// # Time Complexity
///
/// With `n` entries spread over `b` buckets:
///
/// | Operation | Complexity        |
/// |-----------|-------------------|
/// | `get`     | O(n / b) expected |
/// | `put`     | O(n / b) expected |
/// | `remove`  | O(n / b) expected |
/// | `undo`    | O(1), O(b) after `clear` |
///
/// # Examples
///
/// ```rust
/// use rewind::VersionedMap;
///
/// let mut ages = VersionedMap::new();
/// ages.put("alice", 31)?;
/// ages.put("bob", 27)?;
/// assert_eq!(ages.len(), 2);
/// assert!(ages.contains_key("alice"));
/// # Ok::<(), rewind::VersionError>(())
/// ```
pub struct VersionedMap<K, V> {
    core: Rc<RefCell<MapCore<K, V>>>,
}

// Manual impl: a clone is another handle to the same container.
impl<K, V> Clone for VersionedMap<K, V> {
    fn clone(&self) -> Self {
        Self {
            core: Rc::clone(&self.core),
        }
    }
}

// =============================================================================
// Construction and version observation
// =============================================================================

impl<K, V> VersionedMap<K, V> {
    /// Creates an empty map with sixteen buckets.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rewind::VersionedMap;
    ///
    /// let map: VersionedMap<String, i32> = VersionedMap::new();
    /// assert!(map.is_empty());
    /// assert_eq!(map.version_count(), 1);
    /// ```
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::from_core(MapCore::new(DEFAULT_BUCKETS))
    }

    /// Creates an empty map with `bucket_count` buckets.
    ///
    /// A single bucket degrades every operation to a linear scan but is
    /// handy for forcing collisions in tests.
    ///
    /// # Panics
    ///
    /// Panics when `bucket_count` is not a power of two.
    #[must_use]
    pub fn with_buckets(bucket_count: usize) -> Self {
        Self::from_core(MapCore::new(bucket_count))
    }

    fn from_core(core: MapCore<K, V>) -> Self {
        Self {
            core: Rc::new(RefCell::new(core)),
        }
    }

    /// Returns the number of entries in the current version.
    #[must_use]
    pub fn len(&self) -> usize {
        RefCell::borrow(&self.core).len()
    }

    /// Returns `true` when the current version holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of hash buckets; fixed for the container's lifetime.
    #[must_use]
    pub fn bucket_count(&self) -> usize {
        RefCell::borrow(&self.core).buckets.len()
    }

    /// Number of versions in the map's own history (undone versions
    /// included; pending edits of nested children are not counted).
    #[must_use]
    pub fn version_count(&self) -> usize {
        let core = RefCell::borrow(&self.core);
        core.back.len() + core.forward.len() + 1
    }

    /// Returns `true` when `undo` would change anything.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        let core = RefCell::borrow(&self.core);
        !core.child_undo.is_empty() || !core.back.is_empty()
    }

    /// Returns `true` when `redo` would change anything.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        let core = RefCell::borrow(&self.core);
        !core.child_redo.is_empty() || !core.forward.is_empty()
    }

    /// Steps back one edit event: the most recent pending child edit if one
    /// exists, otherwise the map's own latest edit. No-op at the initial
    /// version.
    pub fn undo(&mut self) {
        Versioned::undo(self.core.as_ref());
    }

    /// Steps forward one previously undone edit event. No-op when nothing
    /// was undone, and after any fresh mutation anywhere beneath this map.
    pub fn redo(&mut self) {
        Versioned::redo(self.core.as_ref());
    }

    /// Creates an independent map with this one's content and history.
    ///
    /// Bucket versions are shared by reference. Values that are nested
    /// containers stay aliased: the copy sees the same child containers,
    /// but their future edits cascade only through the container they were
    /// inserted into.
    #[must_use]
    pub fn fork(&self) -> Self {
        Self::from_core(RefCell::borrow(&self.core).fork())
    }
}

// =============================================================================
// Reads
// =============================================================================

impl<K, V> VersionedMap<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    /// Returns a clone of the value stored under `key`, if any.
    ///
    /// The key may be borrowed, as with the std maps: a `VersionedMap<String, _>`
    /// answers `get("...")`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rewind::VersionedMap;
    ///
    /// let mut map = VersionedMap::new();
    /// map.put(String::from("k"), 1)?;
    /// assert_eq!(map.get("k"), Some(1));
    /// assert_eq!(map.get("missing"), None);
    /// # Ok::<(), rewind::VersionError>(())
    /// ```
    #[must_use]
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let core = RefCell::borrow(&self.core);
        let bucket = core.bucket_index(key);
        core.buckets[bucket].scan(|entry| (entry.key.borrow() == key).then(|| entry.value.clone()))
    }

    /// Returns `true` when `key` is present in the current version.
    #[must_use]
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let core = RefCell::borrow(&self.core);
        let bucket = core.bucket_index(key);
        core.buckets[bucket]
            .position_by(|entry| entry.key.borrow() == key)
            .is_some()
    }

    /// Iterator over clones of the current version's entries, in
    /// unspecified order. Later mutations do not show through it.
    #[must_use]
    pub fn iter(&self) -> MapIter<K, V> {
        let core = RefCell::borrow(&self.core);
        let mut entries = Vec::with_capacity(core.len());
        for bucket in &core.buckets {
            entries.extend(bucket.iter().map(|entry| (entry.key, entry.value)));
        }
        MapIter {
            entries: entries.into_iter(),
        }
    }

    /// Clones of every key, in unspecified order.
    #[must_use]
    pub fn keys(&self) -> Vec<K> {
        self.iter().map(|(key, _)| key).collect()
    }

    /// Clones of every value, in unspecified order.
    #[must_use]
    pub fn values(&self) -> Vec<V> {
        self.iter().map(|(_, value)| value).collect()
    }

    /// Clones of every entry, in unspecified order.
    #[must_use]
    pub fn entries(&self) -> Vec<(K, V)> {
        self.iter().collect()
    }
}

// =============================================================================
// Mutators
// =============================================================================

impl<K, V> VersionedMap<K, V>
where
    K: Hash + Eq + Clone + 'static,
    V: Tracked + Clone + 'static,
{
    /// Inserts or overwrites the value under `key`, returning the displaced
    /// value and recording a new version.
    ///
    /// If `value` is itself a versioned container, the map adopts it: the
    /// child's future mutations cascade through the map's
    /// [`undo`](Self::undo). Putting a container into itself stores the
    /// value but skips the adoption.
    ///
    /// # Errors
    ///
    /// [`VersionError::CapacityExceeded`] when the target bucket is full;
    /// the failed call records nothing.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rewind::VersionedMap;
    ///
    /// let mut map = VersionedMap::new();
    /// assert_eq!(map.put("k", 1)?, None);
    /// assert_eq!(map.put("k", 2)?, Some(1));
    /// # Ok::<(), rewind::VersionError>(())
    /// ```
    pub fn put(&mut self, key: K, value: V) -> Result<Option<V>, VersionError> {
        let child = value.version_handle();
        let (previous, parent) = {
            let mut core = self.core.borrow_mut();
            let previous = core.put(key, value)?;
            (previous, core.parent_handle())
        };
        self.adopt(child);
        self.notify_parent(parent);
        Ok(previous)
    }

    /// Removes and returns the value under `key`, recording a new version.
    /// Removing an absent key changes nothing and records nothing.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rewind::VersionedMap;
    ///
    /// let mut map = VersionedMap::new();
    /// map.put("k", 1)?;
    /// assert_eq!(map.remove("k"), Some(1));
    /// assert_eq!(map.remove("k"), None);
    /// map.undo();
    /// assert_eq!(map.get("k"), Some(1));
    /// # Ok::<(), rewind::VersionError>(())
    /// ```
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let (removed, parent) = {
            let mut core = self.core.borrow_mut();
            match core.remove(key) {
                Some(value) => (value, core.parent_handle()),
                None => return None,
            }
        };
        self.notify_parent(parent);
        Some(removed)
    }

    /// Empties the map, recording one undoable version. Always records,
    /// even on an already empty map.
    pub fn clear(&mut self) {
        let parent = {
            let mut core = self.core.borrow_mut();
            core.clear();
            core.parent_handle()
        };
        self.notify_parent(parent);
    }

    /// Returns an independent copy with `key` bound to `value`, leaving the
    /// original untouched.
    ///
    /// # Errors
    ///
    /// [`VersionError::CapacityExceeded`] when the target bucket is full.
    pub fn assoc(&self, key: K, value: V) -> Result<Self, VersionError> {
        let mut copy = self.fork();
        copy.put(key, value)?;
        Ok(copy)
    }

    /// Returns an independent copy without `key`, leaving the original
    /// untouched. Dissociating an absent key yields a plain fork.
    #[must_use]
    pub fn dissoc<Q>(&self, key: &Q) -> Self
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut copy = self.fork();
        copy.remove(key);
        copy
    }
}

// =============================================================================
// Causality plumbing
// =============================================================================

impl<K: 'static, V: 'static> VersionedMap<K, V> {
    fn as_dyn(&self) -> Rc<dyn Versioned> {
        Rc::clone(&self.core) as Rc<dyn Versioned>
    }

    fn adopt(&self, child: Option<VersionHandle>) {
        if let Some(handle) = child {
            let this = self.as_dyn();
            if !handle.same_container(&this) {
                handle.inner.attach_parent(Rc::downgrade(&this));
            }
        }
    }

    fn notify_parent(&self, parent: Option<Rc<dyn Versioned>>) {
        if let Some(parent) = parent {
            parent.record_child_edit(self.as_dyn());
        }
    }
}

impl<K: 'static, V: 'static> Tracked for VersionedMap<K, V> {
    fn version_handle(&self) -> Option<VersionHandle> {
        Some(VersionHandle {
            inner: self.as_dyn(),
        })
    }
}

// =============================================================================
// Iterator
// =============================================================================

/// Iterator over one version of a [`VersionedMap`], yielding cloned
/// `(key, value)` pairs in unspecified order.
pub struct MapIter<K, V> {
    entries: std::vec::IntoIter<(K, V)>,
}

impl<K, V> Iterator for MapIter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<(K, V)> {
        self.entries.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.entries.size_hint()
    }
}

impl<K, V> ExactSizeIterator for MapIter<K, V> {}

impl<K, V> std::iter::FusedIterator for MapIter<K, V> {}

impl<'a, K, V> IntoIterator for &'a VersionedMap<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    type Item = (K, V);
    type IntoIter = MapIter<K, V>;

    fn into_iter(self) -> MapIter<K, V> {
        self.iter()
    }
}

impl<K, V> IntoIterator for VersionedMap<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    type Item = (K, V);
    type IntoIter = MapIter<K, V>;

    fn into_iter(self) -> MapIter<K, V> {
        self.iter()
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

impl<K, V> Default for VersionedMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> FromIterator<(K, V)> for VersionedMap<K, V>
where
    K: Hash + Eq + Clone + 'static,
    V: Tracked + Clone + 'static,
{
    /// Collects into a map with the default bucket count; later pairs win
    /// on duplicate keys.
    ///
    /// # Panics
    ///
    /// Panics when a bucket's capacity is exceeded.
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        map.extend(iter);
        map
    }
}

impl<K, V> Extend<(K, V)> for VersionedMap<K, V>
where
    K: Hash + Eq + Clone + 'static,
    V: Tracked + Clone + 'static,
{
    /// Puts every pair, recording one version each.
    ///
    /// # Panics
    ///
    /// Panics when a bucket's capacity is exceeded.
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            if let Err(error) = self.put(key, value) {
                panic!("extend failed: {error}");
            }
        }
    }
}

impl<K, V> PartialEq for VersionedMap<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone + PartialEq,
{
    /// Key/value equality of the current versions; bucket layout and
    /// history are ignored.
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(key, value)| other.get(&key).is_some_and(|found| found == value))
    }
}

impl<K, V> Eq for VersionedMap<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone + Eq,
{
}

impl<K, V> fmt::Debug for VersionedMap<K, V>
where
    K: Hash + Eq + Clone + fmt::Debug,
    V: Clone + fmt::Debug,
{
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_map().entries(self.iter()).finish()
    }
}

// =============================================================================
// Serde Support
// =============================================================================

#[cfg(feature = "serde")]
impl<K, V> serde::Serialize for VersionedMap<K, V>
where
    K: serde::Serialize + Hash + Eq + Clone,
    V: serde::Serialize + Clone,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;
        let mut state = serializer.serialize_map(Some(self.len()))?;
        for (key, value) in self.iter() {
            state.serialize_entry(&key, &value)?;
        }
        state.end()
    }
}

#[cfg(feature = "serde")]
struct VersionedMapVisitor<K, V> {
    marker: std::marker::PhantomData<(K, V)>,
}

#[cfg(feature = "serde")]
impl<K, V> VersionedMapVisitor<K, V> {
    const fn new() -> Self {
        Self {
            marker: std::marker::PhantomData,
        }
    }
}

#[cfg(feature = "serde")]
impl<'de, K, V> serde::de::Visitor<'de> for VersionedMapVisitor<K, V>
where
    K: serde::Deserialize<'de> + Hash + Eq + Clone + 'static,
    V: serde::Deserialize<'de> + Tracked + Clone + 'static,
{
    type Value = VersionedMap<K, V>;

    fn expecting(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str("a map")
    }

    fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
    where
        A: serde::de::MapAccess<'de>,
    {
        let mut map = VersionedMap::new();
        while let Some((key, value)) = access.next_entry()? {
            map.put(key, value).map_err(serde::de::Error::custom)?;
        }
        Ok(map)
    }
}

#[cfg(feature = "serde")]
impl<'de, K, V> serde::Deserialize<'de> for VersionedMap<K, V>
where
    K: serde::Deserialize<'de> + Hash + Eq + Clone + 'static,
    V: serde::Deserialize<'de> + Tracked + Clone + 'static,
{
    /// Deserializes content into a fresh container; each entry records one
    /// version, as if `put` one by one.
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_map(VersionedMapVisitor::new())
    }
}

// =============================================================================
// Tests
// =============================================================================

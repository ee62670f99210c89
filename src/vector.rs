//! Versioned vector over the path-copying trie engine.
//!
//! [`VersionedVector`] keeps every version it has ever shown: each mutation
//! builds a new trie head by path-copying and pushes the previous one onto
//! an undo stack, so [`undo`](VersionedVector::undo) and
//! [`redo`](VersionedVector::redo) are O(1) stack moves and versions share
//! all untouched subtrees.
//!
//! # Handles
//!
//! A `VersionedVector` value is a cheap handle to shared container state.
//! `Clone` yields another handle to the *same* container. This aliasing is
//! what lets a container stored inside another one still be reachable from
//! the outside, and it is what the cascade-undo wiring records. To copy the
//! container itself, use [`fork`](VersionedVector::fork), which produces an
//! independent history over the same shared trie.
//!
//! # Nested undo
//!
//! When an element is itself a versioned container, inserting it wires the
//! causality protocol: the child's later mutations become undoable from the
//! outer container, newest first, before the outer container's own history.
//!
//! # Examples
//!
//! ```rust
//! use rewind::VersionedVector;
//!
//! let mut vector = VersionedVector::new();
//! vector.push_back(1)?;
//! vector.push_back(2)?;
//! vector.push_back(3)?;
//! assert_eq!(vector.to_vec(), vec![1, 2, 3]);
//!
//! vector.undo();
//! assert_eq!(vector.to_vec(), vec![1, 2]);
//! vector.redo();
//! assert_eq!(vector.to_vec(), vec![1, 2, 3]);
//! # Ok::<(), rewind::VersionError>(())
//! ```
//!
//! Cascading into a nested container:
//!
//! ```rust
//! use rewind::VersionedVector;
//!
//! let mut outer: VersionedVector<VersionedVector<i32>> = VersionedVector::new();
//! let mut inner = VersionedVector::new();
//! outer.push_back(inner.clone())?;
//!
//! inner.push_back(10)?;
//! inner.push_back(20)?;
//!
//! // The outer undo resolves the inner container's latest edit first.
//! outer.undo();
//! assert_eq!(inner.to_vec(), vec![10]);
//! outer.undo();
//! assert!(inner.is_empty());
//! # Ok::<(), rewind::VersionError>(())
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::causality::{Tracked, VersionHandle, Versioned};
use crate::error::VersionError;
use crate::trie::{self, Head, Shape};

// =============================================================================
// Core
// =============================================================================

/// Shared state behind every handle of one container.
///
/// `head` is the current version; `back` holds strictly older versions
/// (newest last) and `forward` the undone ones, so the container always has
/// at least one version and `undo` on a fully unwound history is a no-op.
pub(crate) struct VectorCore<E> {
    shape: Shape,
    head: Head<E>,
    back: Vec<Head<E>>,
    forward: Vec<Head<E>>,
    child_undo: Vec<Rc<dyn Versioned>>,
    child_redo: Vec<Rc<dyn Versioned>>,
    parent: Option<Weak<dyn Versioned>>,
}

impl<E> VectorCore<E> {
    fn new(shape: Shape) -> Self {
        Self {
            shape,
            head: Head::empty(),
            back: Vec::new(),
            forward: Vec::new(),
            child_undo: Vec::new(),
            child_redo: Vec::new(),
            parent: None,
        }
    }

    fn check_index(&self, index: usize) -> Result<(), VersionError> {
        if index < self.head.size {
            Ok(())
        } else {
            Err(VersionError::IndexOutOfRange {
                index,
                len: self.head.size,
            })
        }
    }

    /// Installs a freshly built version. Any previously undone future, own
    /// or pending in children, is invalidated by a new edit.
    fn commit(&mut self, next: Head<E>) {
        self.back.push(std::mem::replace(&mut self.head, next));
        self.forward.clear();
        self.child_redo.clear();
    }

    fn record_child_edit(&mut self, child: Rc<dyn Versioned>) {
        self.child_undo.push(child);
        self.child_redo.clear();
        self.forward.clear();
    }

    /// One undo transition. Pending child edits win over own history; a
    /// returned handle must be cascaded into by the caller *after* this
    /// core's borrow is released.
    fn undo_step(&mut self) -> Option<Rc<dyn Versioned>> {
        if let Some(child) = self.child_undo.pop() {
            self.child_redo.push(Rc::clone(&child));
            return Some(child);
        }
        if let Some(previous) = self.back.pop() {
            self.forward.push(std::mem::replace(&mut self.head, previous));
        }
        None
    }

    fn redo_step(&mut self) -> Option<Rc<dyn Versioned>> {
        if let Some(child) = self.child_redo.pop() {
            self.child_undo.push(Rc::clone(&child));
            return Some(child);
        }
        if let Some(next) = self.forward.pop() {
            self.back.push(std::mem::replace(&mut self.head, next));
        }
        None
    }

    fn parent_handle(&self) -> Option<Rc<dyn Versioned>> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    /// Independent copy: shares every version by reference, starts with no
    /// pending children and no parent.
    fn fork(&self) -> Self {
        Self {
            shape: self.shape,
            head: self.head.clone(),
            back: self.back.clone(),
            forward: self.forward.clone(),
            child_undo: Vec::new(),
            child_redo: Vec::new(),
            parent: None,
        }
    }
}

impl<E: Clone> VectorCore<E> {
    fn push_back(&mut self, value: E) -> Result<(), VersionError> {
        let capacity = self.shape.capacity();
        if self.head.size >= capacity {
            return Err(VersionError::CapacityExceeded { capacity });
        }
        let next = trie::append(&self.shape, self.head.clone(), value);
        self.commit(next);
        Ok(())
    }

    fn set(&mut self, index: usize, value: E) -> Result<E, VersionError> {
        self.check_index(index)?;
        let (next, previous) = trie::assign(&self.shape, self.head.clone(), index, value);
        self.commit(next);
        Ok(previous)
    }

    fn insert(&mut self, index: usize, value: E) -> Result<(), VersionError> {
        self.check_index(index)?;
        let capacity = self.shape.capacity();
        if self.head.size >= capacity {
            return Err(VersionError::CapacityExceeded { capacity });
        }
        let next = trie::insert_at(&self.shape, &self.head, index, value);
        self.commit(next);
        Ok(())
    }

    fn remove(&mut self, index: usize) -> Result<E, VersionError> {
        self.check_index(index)?;
        let (next, removed) = trie::remove_at(&self.shape, &self.head, index);
        self.commit(next);
        Ok(removed)
    }

    fn pop_back(&mut self) -> Result<E, VersionError> {
        if self.head.size == 0 {
            return Err(VersionError::EmptyCollection);
        }
        let (next, value) = trie::pop_last(&self.shape, self.head.clone());
        self.commit(next);
        Ok(value)
    }

    fn clear(&mut self) {
        self.commit(Head::empty());
    }
}

impl<E> Versioned for RefCell<VectorCore<E>> {
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
// VersionedVector Definition
// =============================================================================

/// A trie-backed vector that remembers every version of itself.
///
/// Reads address the current version; every mutator records a new version
/// reachable by [`undo`](Self::undo)/[`redo`](Self::redo). Elements that are
/// themselves versioned containers are wired into cascade undo when
/// inserted (see the [module docs](self)).
///
/// # Time Complexity
///
/// | Operation   | Complexity                         |
/// |-------------|------------------------------------|
/// | `get`       | O(depth)                           |
/// | `push_back` | O(depth)                           |
/// | `set`       | O(depth)                           |
/// | `pop_back`  | O(depth)                           |
/// | `insert`    | O(depth + n - index)               |
/// | `remove`    | O(depth + n - index)               |
/// | `undo`      | O(1) own edit, O(child) cascaded   |
/// | `fork`      | O(history length)                  |
///
/// # Examples
///
/// ```rust
/// use rewind::VersionedVector;
///
/// let mut vector: VersionedVector<&str> = VersionedVector::new();
/// vector.push_back("left")?;
/// vector.push_back("right")?;
/// assert_eq!(vector.get(1)?, "right");
/// assert_eq!(vector.version_count(), 3);
/// # Ok::<(), rewind::VersionError>(())
/// ```
pub struct VersionedVector<E> {
    core: Rc<RefCell<VectorCore<E>>>,
}

// Manual impl: a clone is another handle to the same container, so no bound
// on `E` is wanted.
impl<E> Clone for VersionedVector<E> {
    fn clone(&self) -> Self {
        Self {
            core: Rc::clone(&self.core),
        }
    }
}

// =============================================================================
// Construction and version observation
// =============================================================================

impl<E> VersionedVector<E> {
    /// Creates an empty vector with the default geometry (six levels of
    /// fanout 32, capacity 2³⁰).
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rewind::VersionedVector;
    ///
    /// let vector: VersionedVector<i32> = VersionedVector::new();
    /// assert!(vector.is_empty());
    /// assert_eq!(vector.version_count(), 1);
    /// ```
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::from_core(VectorCore::new(Shape::default()))
    }

    /// Creates an empty vector sized for at least `capacity` elements, using
    /// the smallest default-fanout trie that fits.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rewind::VersionedVector;
    ///
    /// let vector: VersionedVector<i32> = VersionedVector::with_capacity(100);
    /// assert!(vector.capacity() >= 100);
    /// ```
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self::from_core(VectorCore::new(Shape::from_capacity(capacity)))
    }

    /// Creates an empty vector with an explicit trie geometry of `depth`
    /// levels consuming `bits_per_level` index bits each, for a capacity of
    /// `(2^bits_per_level)^depth`.
    ///
    /// # Panics
    ///
    /// Panics when either parameter is zero, or when `depth * bits_per_level`
    /// exceeds the machine word size.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rewind::VersionedVector;
    ///
    /// let vector: VersionedVector<i32> = VersionedVector::with_shape(1, 1);
    /// assert_eq!(vector.capacity(), 2);
    /// ```
    #[must_use]
    pub fn with_shape(depth: usize, bits_per_level: usize) -> Self {
        Self::from_core(VectorCore::new(Shape::new(depth, bits_per_level)))
    }

    fn from_core(core: VectorCore<E>) -> Self {
        Self {
            core: Rc::new(RefCell::new(core)),
        }
    }

    /// Returns the number of elements in the current version.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.core.borrow().head.size
    }

    /// Returns `true` when the current version holds no elements.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of elements this container can ever hold.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.core.borrow().shape.capacity()
    }

    /// Number of versions in this container's own history (undone versions
    /// included; pending edits of nested children are not counted).
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rewind::VersionedVector;
    ///
    /// let mut vector = VersionedVector::new();
    /// vector.push_back('a')?;
    /// vector.push_back('b')?;
    /// assert_eq!(vector.version_count(), 3);
    /// vector.undo();
    /// assert_eq!(vector.version_count(), 3);
    /// # Ok::<(), rewind::VersionError>(())
    /// ```
    #[must_use]
    pub fn version_count(&self) -> usize {
        let core = self.core.borrow();
        core.back.len() + core.forward.len() + 1
    }

    /// Returns `true` when `undo` would change anything: a pending child
    /// edit or an older own version exists.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        let core = self.core.borrow();
        !core.child_undo.is_empty() || !core.back.is_empty()
    }

    /// Returns `true` when `redo` would change anything.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        let core = self.core.borrow();
        !core.child_redo.is_empty() || !core.forward.is_empty()
    }

    /// Steps back one edit event.
    ///
    /// If a nested child mutated since the last own edit, the most recent
    /// such child resolves one undo step of its own instead; otherwise the
    /// previous own version is restored. No-op when nothing is left to undo
    /// (the initial empty version is never undone away).
    pub fn undo(&mut self) {
        Versioned::undo(self.core.as_ref());
    }

    /// Steps forward one previously undone edit event; the mirror image of
    /// [`undo`](Self::undo). No-op when no edit has been undone, and after
    /// any fresh mutation anywhere beneath this container.
    pub fn redo(&mut self) {
        Versioned::redo(self.core.as_ref());
    }

    /// Creates an independent container with this one's content and history.
    ///
    /// Versions are shared by reference, so this is O(history length), not
    /// O(data). The copy starts with no parent and no pending child edits:
    /// it is not wired into any nesting until it is itself inserted into a
    /// container.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rewind::VersionedVector;
    ///
    /// let mut vector = VersionedVector::new();
    /// vector.push_back(1)?;
    /// let mut copy = vector.fork();
    /// copy.push_back(2)?;
    /// assert_eq!(vector.to_vec(), vec![1]);
    /// assert_eq!(copy.to_vec(), vec![1, 2]);
    /// # Ok::<(), rewind::VersionError>(())
    /// ```
    #[must_use]
    pub fn fork(&self) -> Self {
        Self::from_core(self.core.borrow().fork())
    }

    /// First match under `probe`, scanning in index order.
    pub(crate) fn scan<R>(&self, mut probe: impl FnMut(&E) -> Option<R>) -> Option<R> {
        let core = self.core.borrow();
        (0..core.head.size).find_map(|index| probe(trie::lookup(&core.shape, &core.head, index)))
    }

    /// Index of the first element matching `predicate`.
    pub(crate) fn position_by(&self, mut predicate: impl FnMut(&E) -> bool) -> Option<usize> {
        let core = self.core.borrow();
        (0..core.head.size).find(|&index| predicate(trie::lookup(&core.shape, &core.head, index)))
    }
}

// =============================================================================
// Reads
// =============================================================================

impl<E: Clone> VersionedVector<E> {
    /// Returns a clone of the element at `index` in the current version.
    ///
    /// # Errors
    ///
    /// [`VersionError::IndexOutOfRange`] when `index >= len()`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rewind::VersionedVector;
    ///
    /// let mut vector = VersionedVector::new();
    /// vector.push_back(7)?;
    /// assert_eq!(vector.get(0)?, 7);
    /// assert!(vector.get(1).is_err());
    /// # Ok::<(), rewind::VersionError>(())
    /// ```
    pub fn get(&self, index: usize) -> Result<E, VersionError> {
        let core = self.core.borrow();
        core.check_index(index)?;
        Ok(trie::lookup(&core.shape, &core.head, index).clone())
    }

    /// Clones the current version's elements into a `Vec`.
    #[must_use]
    pub fn to_vec(&self) -> Vec<E> {
        self.iter().collect()
    }

    /// Iterator over clones of the current version's elements.
    ///
    /// The iterator addresses the version current at the moment of this
    /// call; mutations made afterwards do not show through it.
    #[must_use]
    pub fn iter(&self) -> Iter<E> {
        let core = self.core.borrow();
        Iter {
            shape: core.shape,
            head: core.head.clone(),
            index: 0,
        }
    }

    /// Overwrites a known-valid slot, recording a version. Bucket plumbing
    /// for the map; bypasses adoption and parent notification.
    pub(crate) fn replace_at(&mut self, index: usize, value: E) -> E {
        let mut core = self.core.borrow_mut();
        debug_assert!(index < core.head.size);
        let (next, previous) = trie::assign(&core.shape, core.head.clone(), index, value);
        core.commit(next);
        previous
    }

    /// Removes a known-valid slot, recording a version. Bucket plumbing.
    pub(crate) fn remove_entry_at(&mut self, index: usize) -> E {
        let mut core = self.core.borrow_mut();
        debug_assert!(index < core.head.size);
        let (next, removed) = trie::remove_at(&core.shape, &core.head, index);
        core.commit(next);
        removed
    }
}

// =============================================================================
// Mutators
// =============================================================================

impl<E: Tracked + Clone + 'static> VersionedVector<E> {
    /// Appends `value`, recording a new version.
    ///
    /// If `value` is itself a versioned container, it is adopted: this
    /// vector becomes its parent and the child's future mutations cascade
    /// through this vector's [`undo`](Self::undo). Inserting a container
    /// into itself stores the element but skips the adoption.
    ///
    /// # Errors
    ///
    /// [`VersionError::CapacityExceeded`] when the vector is full; the
    /// failed call records nothing.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rewind::{VersionError, VersionedVector};
    ///
    /// let mut vector = VersionedVector::with_shape(1, 1);
    /// vector.push_back(1)?;
    /// vector.push_back(2)?;
    /// assert_eq!(
    ///     vector.push_back(3),
    ///     Err(VersionError::CapacityExceeded { capacity: 2 })
    /// );
    /// # Ok::<(), rewind::VersionError>(())
    /// ```
    pub fn push_back(&mut self, value: E) -> Result<(), VersionError> {
        let child = value.version_handle();
        let parent = {
            let mut core = self.core.borrow_mut();
            core.push_back(value)?;
            core.parent_handle()
        };
        self.adopt(child);
        self.notify_parent(parent);
        Ok(())
    }

    /// Overwrites the element at `index`, returning the displaced element
    /// and recording a new version. Adopts `value` like
    /// [`push_back`](Self::push_back).
    ///
    /// # Errors
    ///
    /// [`VersionError::IndexOutOfRange`] when `index >= len()`.
    pub fn set(&mut self, index: usize, value: E) -> Result<E, VersionError> {
        let child = value.version_handle();
        let (previous, parent) = {
            let mut core = self.core.borrow_mut();
            let previous = core.set(index, value)?;
            (previous, core.parent_handle())
        };
        self.adopt(child);
        self.notify_parent(parent);
        Ok(previous)
    }

    /// Inserts `value` before the element at `index`, shifting the suffix
    /// up, and records a new version. `index` must address an existing
    /// element; appending goes through [`push_back`](Self::push_back).
    ///
    /// # Errors
    ///
    /// [`VersionError::IndexOutOfRange`] when `index >= len()`;
    /// [`VersionError::CapacityExceeded`] when the vector is full.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rewind::VersionedVector;
    ///
    /// let mut vector = VersionedVector::new();
    /// vector.push_back("a")?;
    /// vector.push_back("c")?;
    /// vector.insert(1, "b")?;
    /// assert_eq!(vector.to_vec(), vec!["a", "b", "c"]);
    /// # Ok::<(), rewind::VersionError>(())
    /// ```
    pub fn insert(&mut self, index: usize, value: E) -> Result<(), VersionError> {
        let child = value.version_handle();
        let parent = {
            let mut core = self.core.borrow_mut();
            core.insert(index, value)?;
            core.parent_handle()
        };
        self.adopt(child);
        self.notify_parent(parent);
        Ok(())
    }

    /// Removes and returns the element at `index`, shifting the suffix
    /// down, and records a new version.
    ///
    /// # Errors
    ///
    /// [`VersionError::IndexOutOfRange`] when `index >= len()`.
    pub fn remove(&mut self, index: usize) -> Result<E, VersionError> {
        let (removed, parent) = {
            let mut core = self.core.borrow_mut();
            let removed = core.remove(index)?;
            (removed, core.parent_handle())
        };
        self.notify_parent(parent);
        Ok(removed)
    }

    /// Removes and returns the last element, recording a new version.
    ///
    /// # Errors
    ///
    /// [`VersionError::EmptyCollection`] when the vector is empty.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rewind::VersionedVector;
    ///
    /// let mut vector = VersionedVector::new();
    /// vector.push_back(1)?;
    /// vector.push_back(2)?;
    /// assert_eq!(vector.pop_back()?, 2);
    /// vector.undo();
    /// assert_eq!(vector.to_vec(), vec![1, 2]);
    /// # Ok::<(), rewind::VersionError>(())
    /// ```
    pub fn pop_back(&mut self) -> Result<E, VersionError> {
        let (value, parent) = {
            let mut core = self.core.borrow_mut();
            let value = core.pop_back()?;
            (value, core.parent_handle())
        };
        self.notify_parent(parent);
        Ok(value)
    }

    /// Replaces the content with a fresh empty version. Always records a
    /// version, even on an already empty vector, so `clear` is undoable.
    pub fn clear(&mut self) {
        let parent = {
            let mut core = self.core.borrow_mut();
            core.clear();
            core.parent_handle()
        };
        self.notify_parent(parent);
    }

    /// Returns an independent copy with `value` appended, leaving the
    /// original untouched.
    ///
    /// # Errors
    ///
    /// [`VersionError::CapacityExceeded`] when the vector is full.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rewind::VersionedVector;
    ///
    /// let mut vector = VersionedVector::new();
    /// vector.push_back(1)?;
    /// let extended = vector.conj(2)?;
    /// assert_eq!(vector.to_vec(), vec![1]);
    /// assert_eq!(extended.to_vec(), vec![1, 2]);
    /// # Ok::<(), rewind::VersionError>(())
    /// ```
    pub fn conj(&self, value: E) -> Result<Self, VersionError> {
        let mut copy = self.fork();
        copy.push_back(value)?;
        Ok(copy)
    }

    /// Returns an independent copy with the element at `index` overwritten,
    /// leaving the original untouched.
    ///
    /// # Errors
    ///
    /// [`VersionError::IndexOutOfRange`] when `index >= len()`.
    pub fn assoc(&self, index: usize, value: E) -> Result<Self, VersionError> {
        let mut copy = self.fork();
        copy.set(index, value)?;
        Ok(copy)
    }
}

// =============================================================================
// Causality plumbing
// =============================================================================

impl<E: 'static> VersionedVector<E> {
    fn as_dyn(&self) -> Rc<dyn Versioned> {
        Rc::clone(&self.core) as Rc<dyn Versioned>
    }

    /// Registers this vector as the parent of a freshly inserted child.
    /// Skipped when the child *is* this vector.
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

impl<E: 'static> Tracked for VersionedVector<E> {
    fn version_handle(&self) -> Option<VersionHandle> {
        Some(VersionHandle {
            inner: self.as_dyn(),
        })
    }
}

// =============================================================================
// Iterator
// =============================================================================

/// Iterator over one version of a [`VersionedVector`].
///
/// Holds its own reference to the version it was created from, so it stays
/// valid and unchanged across later mutations of the vector.
pub struct Iter<E> {
    shape: Shape,
    head: Head<E>,
    index: usize,
}

impl<E: Clone> Iterator for Iter<E> {
    type Item = E;

    fn next(&mut self) -> Option<E> {
        if self.index >= self.head.size {
            return None;
        }
        let value = trie::lookup(&self.shape, &self.head, self.index).clone();
        self.index += 1;
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.head.size - self.index;
        (remaining, Some(remaining))
    }
}

impl<E: Clone> ExactSizeIterator for Iter<E> {}

impl<E: Clone> std::iter::FusedIterator for Iter<E> {}

impl<'a, E: Clone> IntoIterator for &'a VersionedVector<E> {
    type Item = E;
    type IntoIter = Iter<E>;

    fn into_iter(self) -> Iter<E> {
        self.iter()
    }
}

impl<E: Clone> IntoIterator for VersionedVector<E> {
    type Item = E;
    type IntoIter = Iter<E>;

    fn into_iter(self) -> Iter<E> {
        self.iter()
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

impl<E> Default for VersionedVector<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Tracked + Clone + 'static> FromIterator<E> for VersionedVector<E> {
    /// Collects into a vector with the default geometry.
    ///
    /// # Panics
    ///
    /// Panics when the iterator yields more elements than the default
    /// capacity (2³⁰).
    fn from_iter<I: IntoIterator<Item = E>>(iter: I) -> Self {
        let mut vector = Self::new();
        vector.extend(iter);
        vector
    }
}

impl<E: Tracked + Clone + 'static> Extend<E> for VersionedVector<E> {
    /// Appends every element, recording one version each.
    ///
    /// # Panics
    ///
    /// Panics when an append exceeds the capacity.
    fn extend<I: IntoIterator<Item = E>>(&mut self, iter: I) {
        for element in iter {
            if let Err(error) = self.push_back(element) {
                panic!("extend failed: {error}");
            }
        }
    }
}

impl<E: Clone + PartialEq> PartialEq for VersionedVector<E> {
    /// Element-wise equality of the current versions.
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().zip(other.iter()).all(|(left, right)| left == right)
    }
}

impl<E: Clone + Eq> Eq for VersionedVector<E> {}

impl<E: Clone + fmt::Debug> fmt::Debug for VersionedVector<E> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_list().entries(self.iter()).finish()
    }
}

impl<E: Clone + fmt::Display> fmt::Display for VersionedVector<E> {
    /// Formats the current version as `[a, b, c]`.
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "[")?;
        for (position, element) in self.iter().enumerate() {
            if position > 0 {
                write!(formatter, ", ")?;
            }
            write!(formatter, "{element}")?;
        }
        write!(formatter, "]")
    }
}

// =============================================================================
// Serde Support
// =============================================================================

#[cfg(feature = "serde")]
impl<E: serde::Serialize + Clone> serde::Serialize for VersionedVector<E> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeSeq;
        let mut seq = serializer.serialize_seq(Some(self.len()))?;
        for element in self.iter() {
            seq.serialize_element(&element)?;
        }
        seq.end()
    }
}

#[cfg(feature = "serde")]
struct VersionedVectorVisitor<E> {
    marker: std::marker::PhantomData<E>,
}

#[cfg(feature = "serde")]
impl<E> VersionedVectorVisitor<E> {
    const fn new() -> Self {
        Self {
            marker: std::marker::PhantomData,
        }
    }
}

#[cfg(feature = "serde")]
impl<'de, E> serde::de::Visitor<'de> for VersionedVectorVisitor<E>
where
    E: serde::Deserialize<'de> + Tracked + Clone + 'static,
{
    type Value = VersionedVector<E>;

    fn expecting(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str("a sequence")
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: serde::de::SeqAccess<'de>,
    {
        let mut vector = VersionedVector::new();
        while let Some(element) = seq.next_element()? {
            vector
                .push_back(element)
                .map_err(serde::de::Error::custom)?;
        }
        Ok(vector)
    }
}

#[cfg(feature = "serde")]
impl<'de, E> serde::Deserialize<'de> for VersionedVector<E>
where
    E: serde::Deserialize<'de> + Tracked + Clone + 'static,
{
    /// Deserializes content into a fresh container; each element records one
    /// version, as if appended one by one.
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_seq(VersionedVectorVisitor::new())
    }
}

// =============================================================================
// Tests
// =============================================================================

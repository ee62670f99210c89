//! Bit-partitioned trie engine shared by the versioned containers.
//!
//! A container version is a [`Head`]: a root [`Node`] reference plus an
//! element count. Nodes are immutable once shared; every edit path-copies the
//! ancestors of the touched slot through [`Rc::make_mut`], so a node that is
//! still uniquely owned is edited in place while a shared node is copied. All
//! subtrees off the edit path are reused by reference.
//!
//! Index arithmetic: for a shape with `depth` levels and `bits` bits per
//! level, the child slot at trie level `L` is `(index >> L) & mask` and the
//! value slot within a leaf is `index & mask`. The populated range of a head
//! of size `s` is exactly `[0, s)`, with no gaps and no trailing nodes, which
//! is what lets truncation and append replay reconstruct any suffix.

use std::rc::Rc;

use smallvec::SmallVec;
use static_assertions::const_assert;

// =============================================================================
// Constants
// =============================================================================

/// Default bits consumed per trie level (fanout 32).
pub(crate) const DEFAULT_BITS: usize = 5;

/// Default number of trie levels.
pub(crate) const DEFAULT_DEPTH: usize = 6;

/// Inline capacity of a leaf's value sequence before it spills to the heap.
const LEAF_INLINE: usize = 8;

// The default geometry must leave every level shift below the word size.
const_assert!(DEFAULT_BITS * DEFAULT_DEPTH < usize::BITS as usize);

// =============================================================================
// Shape
// =============================================================================

/// Per-container trie geometry, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Shape {
    depth: usize,
    bits: usize,
}

impl Shape {
    /// Creates a geometry of `depth` levels consuming `bits` index bits each.
    ///
    /// Panics when either parameter is zero or when the combined bit count
    /// exceeds the word size (such a trie could never be indexed).
    pub(crate) fn new(depth: usize, bits: usize) -> Self {
        assert!(
            depth >= 1 && bits >= 1,
            "trie shape needs at least one level and one bit per level"
        );
        assert!(
            depth * bits <= usize::BITS as usize,
            "trie shape of {depth} levels at {bits} bits each cannot be indexed by usize"
        );
        Self { depth, bits }
    }

    /// Smallest default-fanout geometry whose capacity reaches `capacity`.
    pub(crate) fn from_capacity(capacity: usize) -> Self {
        let mut depth = 1;
        while 1_usize << (depth * DEFAULT_BITS) < capacity
            && (depth + 1) * DEFAULT_BITS <= usize::BITS as usize
        {
            depth += 1;
        }
        Self::new(depth, DEFAULT_BITS)
    }

    /// Maximum number of elements this geometry can hold.
    pub(crate) fn capacity(&self) -> usize {
        let total_bits = self.depth * self.bits;
        if total_bits >= usize::BITS as usize {
            usize::MAX
        } else {
            1 << total_bits
        }
    }

    /// Mask extracting one level's worth of index bits.
    #[inline]
    pub(crate) fn mask(&self) -> usize {
        (1 << self.bits) - 1
    }

    /// Shift of the topmost (root) level.
    #[inline]
    fn top_level(&self) -> usize {
        self.bits * (self.depth - 1)
    }

    /// Slots retained by a truncation-to-`index` at the node on level `level`.
    ///
    /// Branches keep the path child inclusively so the elements before
    /// `index` stay reachable; the leaf keeps only the slots strictly before
    /// `index`.
    #[inline]
    fn keep_count(&self, index: usize, level: usize) -> usize {
        if level == 0 {
            index & self.mask()
        } else {
            ((index >> level) & self.mask()) + 1
        }
    }
}

impl Default for Shape {
    fn default() -> Self {
        Self::new(DEFAULT_DEPTH, DEFAULT_BITS)
    }
}

// =============================================================================
// Node
// =============================================================================

/// A trie node: empty, an internal branch, or a leaf of values.
///
/// Child and value sequences are populated prefixes; the slot for index `i`
/// is created by the append that first reaches it and removed by the pop that
/// last leaves it.
#[derive(Clone)]
pub(crate) enum Node<E> {
    Empty,
    Branch(Vec<Rc<Node<E>>>),
    Leaf(SmallVec<[E; LEAF_INLINE]>),
}

impl<E> Node<E> {
    /// Emptiness as the pruning test after pop: no children and no values.
    fn is_empty(&self) -> bool {
        match self {
            Node::Empty => true,
            Node::Branch(children) => children.is_empty(),
            Node::Leaf(values) => values.is_empty(),
        }
    }
}

impl<E: Clone> Node<E> {
    /// Copy of this node keeping only the first `keep` slots.
    fn truncated(&self, keep: usize) -> Self {
        match self {
            Node::Empty => Node::Empty,
            Node::Branch(children) => Node::Branch(children.iter().take(keep).cloned().collect()),
            Node::Leaf(values) => Node::Leaf(values.iter().take(keep).cloned().collect()),
        }
    }
}

// =============================================================================
// Head
// =============================================================================

/// One version of a container's contents: a root reference and a size.
pub(crate) struct Head<E> {
    pub(crate) root: Rc<Node<E>>,
    pub(crate) size: usize,
}

impl<E> Head<E> {
    /// The empty version.
    pub(crate) fn empty() -> Self {
        Self {
            root: Rc::new(Node::Empty),
            size: 0,
        }
    }
}

// Manual impl: cloning a head only bumps the root's reference count, so no
// bound on `E` is wanted.
impl<E> Clone for Head<E> {
    fn clone(&self) -> Self {
        Self {
            root: Rc::clone(&self.root),
            size: self.size,
        }
    }
}

// =============================================================================
// Path-copy operations
// =============================================================================

/// Reads the element at `index`. The caller has already bounds-checked.
pub(crate) fn lookup<'head, E>(shape: &Shape, head: &'head Head<E>, index: usize) -> &'head E {
    let mut node: &Node<E> = &head.root;
    let mut level = shape.top_level();
    while level > 0 {
        let Node::Branch(children) = node else {
            unreachable!("populated index paths pass through branches only")
        };
        node = &children[(index >> level) & shape.mask()];
        level -= shape.bits;
    }
    let Node::Leaf(values) = node else {
        unreachable!("populated index paths end at a leaf")
    };
    &values[index & shape.mask()]
}

/// Appends `value` as the new last element, path-copying the nodes on the way
/// and materializing missing ones. The caller has already capacity-checked.
pub(crate) fn append<E: Clone>(shape: &Shape, head: Head<E>, value: E) -> Head<E> {
    let Head { mut root, size } = head;
    let index = size;
    let mut node = &mut root;
    let mut level = shape.top_level();
    while level > 0 {
        let current = Rc::make_mut(node);
        if matches!(current, Node::Empty) {
            *current = Node::Branch(Vec::new());
        }
        let Node::Branch(children) = current else {
            unreachable!("append path crosses branches above the leaf level")
        };
        let slot = (index >> level) & shape.mask();
        if slot == children.len() {
            children.push(Rc::new(Node::Empty));
        }
        node = &mut children[slot];
        level -= shape.bits;
    }
    let current = Rc::make_mut(node);
    if matches!(current, Node::Empty) {
        *current = Node::Leaf(SmallVec::new());
    }
    let Node::Leaf(values) = current else {
        unreachable!("append path ends at a leaf")
    };
    values.push(value);
    Head {
        root,
        size: size + 1,
    }
}

/// Overwrites the slot at `index`, returning the displaced element. Full path
/// copy; every subtree off the path is shared. The caller has bounds-checked.
pub(crate) fn assign<E: Clone>(
    shape: &Shape,
    head: Head<E>,
    index: usize,
    value: E,
) -> (Head<E>, E) {
    let Head { mut root, size } = head;
    let mut node = &mut root;
    let mut level = shape.top_level();
    while level > 0 {
        let Node::Branch(children) = Rc::make_mut(node) else {
            unreachable!("populated index paths pass through branches only")
        };
        node = &mut children[(index >> level) & shape.mask()];
        level -= shape.bits;
    }
    let Node::Leaf(values) = Rc::make_mut(node) else {
        unreachable!("populated index paths end at a leaf")
    };
    let previous = std::mem::replace(&mut values[index & shape.mask()], value);
    (Head { root, size }, previous)
}

/// Truncated copy of `head` keeping exactly the elements `[0, index)`.
///
/// Every node on the path to `index` is copied with only its leading slots;
/// the retained prefix is shared by reference. The resulting head is sized so
/// appends continue from `index`.
fn truncate_to<E: Clone>(shape: &Shape, head: &Head<E>, index: usize) -> Head<E> {
    let mut level = shape.top_level();
    let mut root = Rc::new(head.root.truncated(shape.keep_count(index, level)));
    let mut node = &mut root;
    while level > 0 {
        let slot = (index >> level) & shape.mask();
        level -= shape.bits;
        let Node::Branch(children) = Rc::make_mut(node) else {
            unreachable!("populated index paths pass through branches only")
        };
        let replacement = Rc::new(children[slot].truncated(shape.keep_count(index, level)));
        children[slot] = replacement;
        node = &mut children[slot];
    }
    Head { root, size: index }
}

/// Inserts `value` at `index`, shifting the suffix up by one.
///
/// Keeps the prefix by reference via a truncated path copy, then replays the
/// displaced suffix through ordinary appends read from the old head. O(D)
/// for the truncation plus O(n - index) appends. The caller has checked both
/// bounds and capacity.
pub(crate) fn insert_at<E: Clone>(shape: &Shape, head: &Head<E>, index: usize, value: E) -> Head<E> {
    let mut next = append(shape, truncate_to(shape, head, index), value);
    for suffix in index..head.size {
        next = append(shape, next, lookup(shape, head, suffix).clone());
    }
    next
}

/// Removes the element at `index`, shifting the suffix down by one.
///
/// Index 0 resets to a fresh empty head (the cheapest correct prefix); any
/// other index reuses the truncated prefix. The suffix replays through
/// appends. The caller has bounds-checked.
pub(crate) fn remove_at<E: Clone>(shape: &Shape, head: &Head<E>, index: usize) -> (Head<E>, E) {
    let removed = lookup(shape, head, index).clone();
    let mut next = if index == 0 {
        Head::empty()
    } else {
        truncate_to(shape, head, index)
    };
    for suffix in (index + 1)..head.size {
        next = append(shape, next, lookup(shape, head, suffix).clone());
    }
    (next, removed)
}

/// Removes and returns the last element.
///
/// Path-copies down to the final leaf, pops its last value, and prunes every
/// node the removal emptied on the way back up so repeated pops never leave
/// dead trailing nodes. The caller has checked the head is non-empty.
pub(crate) fn pop_last<E: Clone>(shape: &Shape, head: Head<E>) -> (Head<E>, E) {
    let Head { mut root, size } = head;
    let last = size - 1;
    let value = pop_step(shape, &mut root, shape.top_level(), last);
    (
        Head {
            root,
            size: last,
        },
        value,
    )
}

fn pop_step<E: Clone>(shape: &Shape, node: &mut Rc<Node<E>>, level: usize, index: usize) -> E {
    if level == 0 {
        let Node::Leaf(values) = Rc::make_mut(node) else {
            unreachable!("populated index paths end at a leaf")
        };
        match values.pop() {
            Some(value) => value,
            None => unreachable!("the leaf holding the last element is never empty"),
        }
    } else {
        let slot = (index >> level) & shape.mask();
        let Node::Branch(children) = Rc::make_mut(node) else {
            unreachable!("populated index paths pass through branches only")
        };
        let value = pop_step(shape, &mut children[slot], level - shape.bits, index);
        if children[slot].is_empty() {
            // The slot is the trailing one on the last-index path.
            children.remove(slot);
        }
        value
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn from_elements(shape: &Shape, elements: &[i32]) -> Head<i32> {
        elements
            .iter()
            .fold(Head::empty(), |head, &element| append(shape, head, element))
    }

    fn collect(shape: &Shape, head: &Head<i32>) -> Vec<i32> {
        (0..head.size).map(|i| *lookup(shape, head, i)).collect()
    }

    // =========================================================================
    // Shape
    // =========================================================================

    #[rstest]
    #[case(1, 1, 2)]
    #[case(1, 5, 32)]
    #[case(2, 5, 1024)]
    #[case(6, 5, 1 << 30)]
    fn test_shape_capacity(#[case] depth: usize, #[case] bits: usize, #[case] expected: usize) {
        assert_eq!(Shape::new(depth, bits).capacity(), expected);
    }

    #[rstest]
    #[case(0, 32)]
    #[case(1, 32)]
    #[case(32, 32)]
    #[case(33, 1024)]
    #[case(1 << 30, 1 << 30)]
    fn test_shape_from_capacity(#[case] requested: usize, #[case] capacity: usize) {
        assert_eq!(Shape::from_capacity(requested).capacity(), capacity);
    }

    #[test]
    fn test_shape_from_capacity_saturates_instead_of_overflowing() {
        let shape = Shape::from_capacity(usize::MAX);
        assert!(shape.capacity() >= 1 << 60);
    }

    #[test]
    #[should_panic(expected = "at least one level")]
    fn test_shape_rejects_zero_depth() {
        let _ = Shape::new(0, 5);
    }

    #[test]
    fn test_shape_mask() {
        assert_eq!(Shape::new(6, 5).mask(), 31);
        assert_eq!(Shape::new(3, 2).mask(), 3);
        assert_eq!(Shape::new(1, 1).mask(), 1);
    }

    // =========================================================================
    // Append / lookup
    // =========================================================================

    #[rstest]
    #[case(Shape::new(1, 1))]
    #[case(Shape::new(3, 2))]
    #[case(Shape::new(2, 5))]
    fn test_append_then_lookup_round_trips(#[case] shape: Shape) {
        let count = shape.capacity().min(50) as i32;
        let elements: Vec<i32> = (0..count).collect();
        let head = from_elements(&shape, &elements);
        assert_eq!(head.size, elements.len());
        assert_eq!(collect(&shape, &head), elements);
    }

    #[test]
    fn test_append_crosses_leaf_boundaries_with_default_shape() {
        let shape = Shape::default();
        let elements: Vec<i32> = (0..1000).collect();
        let head = from_elements(&shape, &elements);
        assert_eq!(*lookup(&shape, &head, 0), 0);
        assert_eq!(*lookup(&shape, &head, 31), 31);
        assert_eq!(*lookup(&shape, &head, 32), 32);
        assert_eq!(*lookup(&shape, &head, 999), 999);
    }

    #[test]
    fn test_append_leaves_earlier_heads_untouched() {
        let shape = Shape::new(3, 2);
        let first = from_elements(&shape, &[1, 2, 3]);
        let second = append(&shape, first.clone(), 4);
        assert_eq!(collect(&shape, &first), vec![1, 2, 3]);
        assert_eq!(collect(&shape, &second), vec![1, 2, 3, 4]);
    }

    // =========================================================================
    // Assign
    // =========================================================================

    #[rstest]
    #[case(0)]
    #[case(7)]
    #[case(19)]
    fn test_assign_overwrites_one_slot(#[case] index: usize) {
        let shape = Shape::new(3, 2);
        let elements: Vec<i32> = (0..20).collect();
        let head = from_elements(&shape, &elements);
        let (updated, previous) = assign(&shape, head.clone(), index, 99);
        assert_eq!(previous, elements[index]);
        for i in 0..elements.len() {
            let expected = if i == index { 99 } else { elements[i] };
            assert_eq!(*lookup(&shape, &updated, i), expected);
            assert_eq!(*lookup(&shape, &head, i), elements[i]);
        }
    }

    #[test]
    fn test_assign_shares_subtrees_off_the_path() {
        let shape = Shape::new(2, 2);
        let head = from_elements(&shape, &(0..16).collect::<Vec<_>>());
        let (updated, _) = assign(&shape, head.clone(), 0, -1);
        let Node::Branch(old_children) = head.root.as_ref() else {
            panic!("expected branch root");
        };
        let Node::Branch(new_children) = updated.root.as_ref() else {
            panic!("expected branch root");
        };
        // The path child was copied, the other three leaves are shared.
        assert!(!Rc::ptr_eq(&old_children[0], &new_children[0]));
        for slot in 1..4 {
            assert!(Rc::ptr_eq(&old_children[slot], &new_children[slot]));
        }
    }

    // =========================================================================
    // Insert / remove
    // =========================================================================

    #[rstest]
    #[case(0)]
    #[case(1)]
    #[case(9)]
    fn test_insert_shifts_suffix(#[case] index: usize) {
        let shape = Shape::new(3, 2);
        let elements: Vec<i32> = (0..10).collect();
        let head = from_elements(&shape, &elements);
        let inserted = insert_at(&shape, &head, index, 99);
        let mut expected = elements.clone();
        expected.insert(index, 99);
        assert_eq!(collect(&shape, &inserted), expected);
        assert_eq!(collect(&shape, &head), elements);
    }

    #[rstest]
    #[case(0)]
    #[case(4)]
    #[case(9)]
    fn test_remove_shifts_suffix(#[case] index: usize) {
        let shape = Shape::new(3, 2);
        let elements: Vec<i32> = (0..10).collect();
        let head = from_elements(&shape, &elements);
        let (removed_head, removed) = remove_at(&shape, &head, index);
        let mut expected = elements.clone();
        assert_eq!(removed, expected.remove(index));
        assert_eq!(collect(&shape, &removed_head), expected);
        assert_eq!(collect(&shape, &head), elements);
    }

    #[test]
    fn test_remove_first_of_single_element_yields_empty() {
        let shape = Shape::new(3, 2);
        let head = from_elements(&shape, &[7]);
        let (removed_head, removed) = remove_at(&shape, &head, 0);
        assert_eq!(removed, 7);
        assert_eq!(removed_head.size, 0);
    }

    // =========================================================================
    // Pop
    // =========================================================================

    #[test]
    fn test_pop_returns_elements_in_reverse() {
        let shape = Shape::new(3, 2);
        let mut head = from_elements(&shape, &(0..20).collect::<Vec<_>>());
        for expected in (0..20).rev() {
            let (next, value) = pop_last(&shape, head);
            assert_eq!(value, expected);
            head = next;
        }
        assert_eq!(head.size, 0);
    }

    #[test]
    fn test_pop_prunes_emptied_nodes_for_reuse() {
        let shape = Shape::new(3, 2);
        let mut head = from_elements(&shape, &(0..17).collect::<Vec<_>>());
        // Drain back across a subtree boundary, then grow again.
        for _ in 0..9 {
            head = pop_last(&shape, head).0;
        }
        for element in 8..30 {
            head = append(&shape, head, element);
        }
        assert_eq!(collect(&shape, &head), (0..30).collect::<Vec<_>>());
    }

    #[test]
    fn test_pop_after_shared_clone_keeps_the_clone() {
        let shape = Shape::new(3, 2);
        let head = from_elements(&shape, &[1, 2, 3]);
        let (popped, value) = pop_last(&shape, head.clone());
        assert_eq!(value, 3);
        assert_eq!(collect(&shape, &popped), vec![1, 2]);
        assert_eq!(collect(&shape, &head), vec![1, 2, 3]);
    }
}

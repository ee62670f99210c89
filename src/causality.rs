//! Parent/child wiring that lets undo and redo cascade across nesting.
//!
//! A container inserted as a value inside another container becomes that
//! container's *child*: the inserting container registers itself as the
//! child's parent at the moment of insertion, and from then on every
//! successful mutation of the child pushes the child onto the parent's
//! pending-undo stack. The parent's [`undo`](crate::VersionedVector::undo)
//! resolves those pending child edits, newest first, before touching its own
//! history.
//!
//! Participation is opt-in through the [`Tracked`] trait: a value that is
//! itself a versioned container returns a [`VersionHandle`] from
//! [`Tracked::version_handle`], and every other value uses the provided
//! `None` body. The probe happens once per insertion, never during reads.
//!
//! Parent links are weak. Dropping an outer container never keeps a child
//! alive (or vice versa), and a child whose parent has been dropped simply
//! stops notifying.

use std::rc::{Rc, Weak};

// =============================================================================
// Capability trait (crate-private)
// =============================================================================

/// Object-safe capability implemented by every container's shared core.
///
/// `undo`/`redo` take `&self` because cores live behind `RefCell`; an
/// implementation must release its own borrow before cascading into a child
/// so that mutually nested containers cannot re-enter a held cell.
pub(crate) trait Versioned {
    /// Undoes the most recent edit event known to this container.
    fn undo(&self);
    /// Replays the most recently undone edit event.
    fn redo(&self);
    /// Records the enclosing container. Last writer wins.
    fn attach_parent(&self, parent: Weak<dyn Versioned>);
    /// Notes that `child` mutated; clears this container's redo channels.
    fn record_child_edit(&self, child: Rc<dyn Versioned>);
}

// =============================================================================
// VersionHandle
// =============================================================================

/// Opaque reference to a container's version history.
///
/// Obtained from [`Tracked::version_handle`]; the only thing callers can do
/// with one is hand it back to a container, which uses it to wire the
/// causality protocol when the value is inserted.
#[derive(Clone)]
pub struct VersionHandle {
    pub(crate) inner: Rc<dyn Versioned>,
}

impl VersionHandle {
    /// Identity: do the two handles refer to the same container?
    pub(crate) fn same_container(&self, other: &Rc<dyn Versioned>) -> bool {
        Rc::ptr_eq(&self.inner, other)
    }
}

impl std::fmt::Debug for VersionHandle {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.debug_struct("VersionHandle").finish_non_exhaustive()
    }
}

// =============================================================================
// Tracked
// =============================================================================

/// Capability probe for values stored inside versioned containers.
///
/// The containers in this crate return `Some` handle; plain data keeps the
/// provided `None` body. A wrapper type holding a container can delegate to
/// make the nested container reachable by cascade undo:
///
/// ```rust
/// use rewind::{Tracked, VersionHandle, VersionedVector};
///
/// #[derive(Clone)]
/// struct Layer {
///     name: String,
///     shapes: VersionedVector<u32>,
/// }
///
/// impl Tracked for Layer {
///     fn version_handle(&self) -> Option<VersionHandle> {
///         self.shapes.version_handle()
///     }
/// }
/// ```
pub trait Tracked {
    /// Returns the container handle when this value participates in cascade
    /// undo, `None` otherwise.
    fn version_handle(&self) -> Option<VersionHandle> {
        None
    }
}

macro_rules! plain_tracked {
    ($($type:ty),* $(,)?) => {
        $(impl Tracked for $type {})*
    };
}

plain_tracked!(
    (),
    bool,
    char,
    i8,
    i16,
    i32,
    i64,
    i128,
    isize,
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    f32,
    f64,
    String,
    &'static str,
);

impl<T: Tracked> Tracked for Option<T> {
    fn version_handle(&self) -> Option<VersionHandle> {
        self.as_ref().and_then(Tracked::version_handle)
    }
}

impl<T: Tracked + ?Sized> Tracked for Box<T> {
    fn version_handle(&self) -> Option<VersionHandle> {
        (**self).version_handle()
    }
}

impl<T: Tracked + ?Sized> Tracked for Rc<T> {
    fn version_handle(&self) -> Option<VersionHandle> {
        (**self).version_handle()
    }
}

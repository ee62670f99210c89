//! # rewind
//!
//! Versioned persistent collections with structural sharing and cascading
//! undo/redo.
//!
//! ## Overview
//!
//! This library provides collections that remember every version of
//! themselves. Mutation never destroys the previous state: it builds a new
//! version sharing everything untouched, and records the old one so it can
//! be stepped back to. It includes:
//!
//! - **`VersionedVector`**: a bit-partitioned trie vector with O(depth)
//!   reads and writes, path-copying persistence, and full undo/redo
//! - **`VersionedMap`**: a hash map whose buckets are versioned vectors, so
//!   map-level undo replays exactly the touched bucket
//! - **Cascading undo**: a container stored inside another container wires
//!   itself to its parent; undoing the parent resolves the child's most
//!   recent edits first, newest first
//! - **Forks**: O(history) independent copies that share all version data
//!
//! ## Feature Flags
//!
//! - `serde`: `Serialize`/`Deserialize` for both collections (content only,
//!   history is not serialized)
//!
//! ## Example
//!
//! ```rust
//! use rewind::{VersionedMap, VersionedVector};
//!
//! let mut scores = VersionedVector::new();
//! scores.push_back(70)?;
//! scores.push_back(85)?;
//! scores.set(0, 75)?;
//! assert_eq!(scores.to_vec(), vec![75, 85]);
//!
//! scores.undo();
//! assert_eq!(scores.to_vec(), vec![70, 85]);
//! scores.redo();
//! assert_eq!(scores.to_vec(), vec![75, 85]);
//!
//! // A container nested in another cascades through the parent's undo.
//! let mut rounds = VersionedMap::new();
//! rounds.put("final", scores.clone())?;
//! scores.push_back(90)?;
//! rounds.undo();
//! assert_eq!(scores.to_vec(), vec![75, 85]);
//! # Ok::<(), rewind::VersionError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
// Note: Disabling redundant_closure_for_method_calls due to clippy 0.1.92 panic bug
#![allow(clippy::redundant_closure_for_method_calls)]

/// Prelude module for convenient imports.
///
/// Re-exports commonly used types and traits.
///
/// # Usage
///
/// ```rust
/// use rewind::prelude::*;
/// ```
pub mod prelude {
    pub use crate::causality::{Tracked, VersionHandle};
    pub use crate::error::VersionError;
    pub use crate::map::VersionedMap;
    pub use crate::vector::VersionedVector;
}

pub mod causality;
pub mod error;
pub mod map;
pub mod vector;

mod trie;

pub use causality::{Tracked, VersionHandle};
pub use error::VersionError;
pub use map::{MapIter, VersionedMap};
pub use vector::{Iter, VersionedVector};

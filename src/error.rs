//! Error types for versioned-collection operations.
//!
//! Every failure a container can report is a caller-contract violation
//! detected before any structural change: an operation that returns an error
//! has recorded no version, adopted no child, and notified no parent.

/// Represents the failures reported by [`VersionedVector`](crate::VersionedVector)
/// and [`VersionedMap`](crate::VersionedMap) operations.
///
/// All variants are synchronous and local; none is transient, so there is no
/// retry story. Lookups that merely find nothing (such as
/// [`VersionedMap::get`](crate::VersionedMap::get) on a missing key) return
/// `None` instead of an error.
///
/// # Examples
///
/// ```rust
/// use rewind::{VersionError, VersionedVector};
///
/// let vector: VersionedVector<i32> = VersionedVector::new();
/// assert_eq!(
///     vector.get(3),
///     Err(VersionError::IndexOutOfRange { index: 3, len: 0 })
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    /// The index lies outside the populated range `[0, len)`.
    IndexOutOfRange {
        /// The index that was requested.
        index: usize,
        /// The number of elements at the time of the call.
        len: usize,
    },
    /// The mutation would grow the collection beyond its fixed trie capacity.
    CapacityExceeded {
        /// The capacity of the collection, `fanout ^ depth`.
        capacity: usize,
    },
    /// A value was requested from a collection holding no elements.
    EmptyCollection,
}

impl std::fmt::Display for VersionError {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IndexOutOfRange { index, len } => {
                write!(formatter, "index {index} out of range for length {len}")
            }
            Self::CapacityExceeded { capacity } => {
                write!(formatter, "collection is at its capacity of {capacity}")
            }
            Self::EmptyCollection => write!(formatter, "collection is empty"),
        }
    }
}

impl std::error::Error for VersionError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_out_of_range_display() {
        let error = VersionError::IndexOutOfRange { index: 4, len: 4 };
        assert_eq!(format!("{error}"), "index 4 out of range for length 4");
    }

    #[test]
    fn test_capacity_exceeded_display() {
        let error = VersionError::CapacityExceeded { capacity: 2 };
        assert_eq!(format!("{error}"), "collection is at its capacity of 2");
    }

    #[test]
    fn test_empty_collection_display() {
        let error = VersionError::EmptyCollection;
        assert_eq!(format!("{error}"), "collection is empty");
    }

    #[test]
    fn test_version_error_equality() {
        let error1 = VersionError::IndexOutOfRange { index: 1, len: 3 };
        let error2 = VersionError::IndexOutOfRange { index: 1, len: 3 };
        let error3 = VersionError::IndexOutOfRange { index: 2, len: 3 };
        assert_eq!(error1, error2);
        assert_ne!(error1, error3);
        assert_ne!(error1, VersionError::EmptyCollection);
    }

    #[test]
    fn test_version_error_clone() {
        let error = VersionError::CapacityExceeded { capacity: 32 };
        let cloned = error.clone();
        assert_eq!(error, cloned);
    }

    #[test]
    fn test_version_error_debug() {
        let error = VersionError::IndexOutOfRange { index: 0, len: 0 };
        let debug_string = format!("{error:?}");
        assert!(debug_string.contains("IndexOutOfRange"));
        assert!(debug_string.contains("index"));
        assert!(debug_string.contains("len"));
    }

    #[test]
    fn test_version_error_is_error() {
        use std::error::Error;

        let error = VersionError::EmptyCollection;
        let _: &dyn Error = &error;
    }

    #[test]
    fn test_version_error_source() {
        use std::error::Error;

        let error = VersionError::CapacityExceeded { capacity: 1024 };
        assert!(error.source().is_none());
    }
}

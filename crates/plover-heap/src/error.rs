//! Error types for the plover heap.

use crate::class::Repr;
use thiserror::Error;

/// Heap error type.
///
/// Every variant except [`HeapError::AllocFailed`] is a pure validation
/// error, raised before any mutation takes place. `AllocFailed` can occur
/// mid-operation; every producer rolls back provisionally acquired storage
/// before returning it, so callers may treat it as recoverable.
#[derive(Debug, Error)]
pub enum HeapError {
    /// Index outside the valid element range.
    #[error("index [{index}] out of bound [0, {length})")]
    IndexOutOfBound {
        /// The offending index.
        index: i64,
        /// Length of the object at the time of the access.
        length: usize,
    },

    /// Backing storage could not be obtained.
    #[error("allocation of {requested} elements failed")]
    AllocFailed {
        /// Requested element count.
        requested: usize,
    },

    /// Class id outside the registry.
    #[error("undefined class [{0}]")]
    UndefinedClass(u32),

    /// Capacity outside `(0, MAX_CAPACITY]`.
    #[error("invalid capacity [{0}]")]
    InvalidCapacity(i64),

    /// A missing, stale, or dangling object reference.
    #[error("unexpected null or stale object reference")]
    UnexpectedNullPointer,

    /// An object's representation type does not match the operation.
    #[error("object of type [{actual}] where [{expected}] is required")]
    InvalidClass {
        /// Representation type the operation requires.
        expected: Repr,
        /// Representation type actually found.
        actual: Repr,
    },

    /// A length argument is invalid (e.g. a reversed range).
    #[error("invalid length [{0}]")]
    InvalidLength(i64),

    /// A missing value where one is not permitted.
    #[error("unexpected missing value in `{0}`")]
    InvalidNa(&'static str),

    /// Two arguments whose lengths must agree do not.
    #[error("incompatible lengths [{left}] and [{right}]")]
    IncompatibleLength {
        /// Length of the first argument.
        left: usize,
        /// Length of the second argument.
        right: usize,
    },

    /// Attribute lookup by a name that is not present.
    #[error("attribute `{name}` not found")]
    AttributeNotFound {
        /// The requested attribute name.
        name: String,
    },
}

/// Result type using [`HeapError`].
pub type HeapResult<T> = Result<T, HeapError>;

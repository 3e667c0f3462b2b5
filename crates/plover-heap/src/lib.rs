//! Tagged vector objects and a stop-the-world tracing collector for the
//! Plover runtime.
//!
//! Every value is a variable-length vector of one of six representation
//! types, identified by a generation-checked [`ObjRef`] handle. A
//! [`Heap`] owns all allocations and collects them with an explicit
//! mark and sweep cycle over a sorted ledger of live objects:
//!
//! ```
//! use plover_heap::{ClassId, Heap};
//!
//! let mut heap = Heap::new();
//! let xs = heap.new_from_slice(ClassId::INT, &[1, 2, 3])?;
//! heap.root(xs)?;
//! heap.extend(xs, 4i32)?;
//! heap.collect()?;
//! assert_eq!(heap.as_slice::<i32>(xs)?, &[1, 2, 3, 4]);
//! # Ok::<(), plover_heap::HeapError>(())
//! ```
//!
//! Collection is never implicit: allocation only fails when the host
//! is out of memory, and freeing happens exactly when [`Heap::collect`]
//! runs. Handles to swept objects stay valid to hold and compare; using
//! one reports [`HeapError::UnexpectedNullPointer`] instead of touching
//! recycled storage.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod class;
pub mod collector;
pub mod error;
pub mod heap;
pub mod object;
pub mod report;

mod attr;
mod convert;
mod ops;
mod table;

pub use class::{ClassId, ClassRegistry, Repr};
pub use collector::{CollectStats, RootGuard};
pub use error::{HeapError, HeapResult};
pub use heap::{Heap, HeapConfig, HeapStats};
pub use object::{
    CHAR_NA, DOUBLE_NA, Element, ExternalRef, INT_NA, LONG_NA, MAX_CAPACITY, ObjRef, is_na_index,
};
pub use report::{HeapReport, ReportRow};

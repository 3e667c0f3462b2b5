//! Object layout: references, typed buffers, NA sentinels.

use crate::class::{ClassId, Repr};
use crate::error::{HeapError, HeapResult};
use self::sealed::Buffered;

/// Maximum element capacity of a single object.
pub const MAX_CAPACITY: usize = 1 << 29;

/// NA sentinel for the CHAR representation.
///
/// The zero byte doubles as NA and as the legitimate value 0; callers
/// that need to tell them apart must track validity themselves.
pub const CHAR_NA: u8 = 0;
/// NA sentinel for the INT representation.
pub const INT_NA: i32 = i32::MAX;
/// NA sentinel for the LONG representation.
pub const LONG_NA: i64 = i64::MAX;
/// NA sentinel for the DOUBLE representation.
pub const DOUBLE_NA: f64 = f64::NAN;

/// True if an index-vector entry is the NA sentinel.
pub fn is_na_index(index: i32) -> bool {
    index == INT_NA
}

/// Generation-checked handle to a heap slot.
///
/// Identity is stable for the lifetime of the object; once the object is
/// swept, the slot's generation moves on and the handle is detectably
/// stale. Handles order by (slot, generation), which is the sort key of
/// the identity tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjRef {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl ObjRef {
    /// Packed total-order key used by the sorted identity tables.
    pub(crate) fn key(self) -> u64 {
        (u64::from(self.index) << 32) | u64::from(self.generation)
    }
}

impl PartialOrd for ObjRef {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ObjRef {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.key().cmp(&other.key())
    }
}

/// Opaque handle supplied by the embedder for EXTERNAL elements.
///
/// The collector never dereferences or scans these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExternalRef(pub usize);

pub(crate) mod sealed {
    use super::ObjData;

    /// Typed access to the matching [`ObjData`] buffer variant.
    pub trait Buffered: Copy + Sized {
        /// Borrow the buffer if the representation matches.
        fn buf(data: &ObjData) -> Option<&[Self]>;
        /// Mutably borrow the buffer if the representation matches.
        fn buf_mut(data: &mut ObjData) -> Option<&mut [Self]>;
    }
}

/// A typed element of an object buffer.
///
/// Gates the scalar and vectorized accessors to the matching
/// representation type and carries the NA sentinel for it. The trait is
/// sealed: exactly the six representation element types implement it,
/// and buffer access stays behind a crate-private supertrait.
pub trait Element: Copy + PartialEq + sealed::Buffered {
    /// Representation type whose buffers hold this element.
    const REPR: Repr;
    /// The reserved missing-value sentinel.
    const NA: Self;

    /// True if the value is the NA sentinel.
    fn is_na(self) -> bool;
}

macro_rules! element_impl {
    ($ty:ty, $repr:expr, $variant:ident, $na:expr, $is_na:expr) => {
        impl sealed::Buffered for $ty {
            fn buf(data: &ObjData) -> Option<&[Self]> {
                match data {
                    ObjData::$variant(b) => Some(b),
                    _ => None,
                }
            }

            fn buf_mut(data: &mut ObjData) -> Option<&mut [Self]> {
                match data {
                    ObjData::$variant(b) => Some(b),
                    _ => None,
                }
            }
        }

        impl Element for $ty {
            const REPR: Repr = $repr;
            const NA: Self = $na;

            fn is_na(self) -> bool {
                let f: fn($ty) -> bool = $is_na;
                f(self)
            }
        }
    };
}

element_impl!(u8, Repr::Char, Char, CHAR_NA, |v| v == CHAR_NA);
element_impl!(i32, Repr::Int, Int, INT_NA, |v| v == INT_NA);
element_impl!(i64, Repr::Long, Long, LONG_NA, |v| v == LONG_NA);
element_impl!(f64, Repr::Double, Double, DOUBLE_NA, |v: f64| v.is_nan());
element_impl!(Option<ObjRef>, Repr::List, List, None, |v: Option<ObjRef>| v
    .is_none());
element_impl!(
    Option<ExternalRef>,
    Repr::External,
    External,
    None,
    |v: Option<ExternalRef>| v.is_none()
);

/// The contiguous backing buffer of an object.
///
/// Buffer length is the object's capacity; the logically valid prefix is
/// tracked by the owning [`Object`]. Unused capacity holds NA.
pub(crate) enum ObjData {
    Char(Box<[u8]>),
    Int(Box<[i32]>),
    Long(Box<[i64]>),
    Double(Box<[f64]>),
    List(Box<[Option<ObjRef>]>),
    External(Box<[Option<ExternalRef>]>),
}

fn na_buf<T: Element>(capacity: usize) -> HeapResult<Box<[T]>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(capacity)
        .map_err(|_| HeapError::AllocFailed {
            requested: capacity,
        })?;
    buf.resize(capacity, T::NA);
    Ok(buf.into_boxed_slice())
}

fn resized_buf<T: Element>(old: &[T], capacity: usize) -> HeapResult<Box<[T]>> {
    let mut buf = na_buf::<T>(capacity)?;
    let keep = old.len().min(capacity);
    buf[..keep].copy_from_slice(&old[..keep]);
    Ok(buf)
}

impl ObjData {
    /// Fresh NA-filled buffer for a representation type.
    pub(crate) fn with_capacity(repr: Repr, capacity: usize) -> HeapResult<ObjData> {
        Ok(match repr {
            Repr::Char => ObjData::Char(na_buf(capacity)?),
            Repr::Int => ObjData::Int(na_buf(capacity)?),
            Repr::Long => ObjData::Long(na_buf(capacity)?),
            Repr::Double => ObjData::Double(na_buf(capacity)?),
            Repr::List => ObjData::List(na_buf(capacity)?),
            Repr::External => ObjData::External(na_buf(capacity)?),
        })
    }

    pub(crate) fn repr(&self) -> Repr {
        match self {
            ObjData::Char(_) => Repr::Char,
            ObjData::Int(_) => Repr::Int,
            ObjData::Long(_) => Repr::Long,
            ObjData::Double(_) => Repr::Double,
            ObjData::List(_) => Repr::List,
            ObjData::External(_) => Repr::External,
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        match self {
            ObjData::Char(b) => b.len(),
            ObjData::Int(b) => b.len(),
            ObjData::Long(b) => b.len(),
            ObjData::Double(b) => b.len(),
            ObjData::List(b) => b.len(),
            ObjData::External(b) => b.len(),
        }
    }

    /// Reallocate to exactly `capacity` elements.
    ///
    /// On failure the previous buffer remains intact and valid.
    pub(crate) fn resize(&mut self, capacity: usize) -> HeapResult<()> {
        match self {
            ObjData::Char(b) => *b = resized_buf(b, capacity)?,
            ObjData::Int(b) => *b = resized_buf(b, capacity)?,
            ObjData::Long(b) => *b = resized_buf(b, capacity)?,
            ObjData::Double(b) => *b = resized_buf(b, capacity)?,
            ObjData::List(b) => *b = resized_buf(b, capacity)?,
            ObjData::External(b) => *b = resized_buf(b, capacity)?,
        }
        Ok(())
    }

    /// Size of the backing buffer in bytes.
    pub(crate) fn byte_size(&self) -> usize {
        self.capacity() * self.repr().elem_size()
    }
}

/// A heap object: class tag, valid length, optional attribute link, and
/// the typed buffer.
pub(crate) struct Object {
    pub(crate) class: ClassId,
    pub(crate) length: usize,
    pub(crate) attribute: Option<ObjRef>,
    pub(crate) data: ObjData,
}

impl Object {
    pub(crate) fn capacity(&self) -> usize {
        self.data.capacity()
    }

    /// Header plus buffer footprint, as surfaced by the memory report.
    pub(crate) fn byte_size(&self) -> usize {
        size_of::<Object>() + self.data.byte_size()
    }
}

/// Borrow a LIST object's elements.
pub(crate) fn list_elems(object: &Object) -> HeapResult<&[Option<ObjRef>]> {
    <Option<ObjRef>>::buf(&object.data).ok_or(HeapError::InvalidClass {
        expected: Repr::List,
        actual: object.data.repr(),
    })
}

/// Mutably borrow a LIST object's elements.
pub(crate) fn list_elems_mut(object: &mut Object) -> HeapResult<&mut [Option<ObjRef>]> {
    let actual = object.data.repr();
    <Option<ObjRef>>::buf_mut(&mut object.data).ok_or(HeapError::InvalidClass {
        expected: Repr::List,
        actual,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_na_sentinels() {
        assert!(CHAR_NA.is_na());
        assert!(INT_NA.is_na());
        assert!(LONG_NA.is_na());
        assert!(DOUBLE_NA.is_na());
        assert!(<Option<ObjRef>>::NA.is_na());
        assert!(!1i32.is_na());
        assert!(!0.0f64.is_na());
        // The CHAR collision: byte zero is NA by definition.
        assert!(0u8.is_na());
    }

    #[test]
    fn test_buffer_capacity_and_fill() {
        let data = ObjData::with_capacity(Repr::Int, 4).unwrap();
        assert_eq!(data.capacity(), 4);
        assert_eq!(data.byte_size(), 16);
        let ints = i32::buf(&data).unwrap();
        assert!(ints.iter().all(|v| v.is_na()));
    }

    #[test]
    fn test_resize_preserves_prefix() {
        let mut data = ObjData::with_capacity(Repr::Long, 2).unwrap();
        i64::buf_mut(&mut data).unwrap()[0] = 7;
        data.resize(8).unwrap();
        assert_eq!(data.capacity(), 8);
        assert_eq!(i64::buf(&data).unwrap()[0], 7);
        assert!(i64::buf(&data).unwrap()[7].is_na());
        data.resize(1).unwrap();
        assert_eq!(i64::buf(&data).unwrap()[0], 7);
    }

    #[test]
    fn test_ref_ordering_key() {
        let a = ObjRef {
            index: 1,
            generation: 9,
        };
        let b = ObjRef {
            index: 2,
            generation: 0,
        };
        assert!(a < b);
        assert!(a.key() < b.key());
    }
}

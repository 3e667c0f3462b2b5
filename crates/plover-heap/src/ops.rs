//! Element access and vector operations.
//!
//! Scalar and slice accessors are generic over [`Element`], so the type
//! system enforces the buffer/representation match. Whole-object
//! operations (`copy`, `subset`, `remove`, ...) dispatch on the object's
//! representation at runtime.

use crate::class::{ClassId, Repr};
use crate::error::{HeapError, HeapResult};
use crate::heap::Heap;
use crate::object::{Element, ExternalRef, MAX_CAPACITY, ObjRef, Object, is_na_index};

fn elems<T: Element>(object: &Object) -> HeapResult<&[T]> {
    let actual = object.data.repr();
    T::buf(&object.data).ok_or(HeapError::InvalidClass {
        expected: T::REPR,
        actual,
    })
}

fn elems_mut<T: Element>(object: &mut Object) -> HeapResult<&mut [T]> {
    let actual = object.data.repr();
    T::buf_mut(&mut object.data).ok_or(HeapError::InvalidClass {
        expected: T::REPR,
        actual,
    })
}

fn check_index(index: i32, length: usize) -> HeapResult<usize> {
    if index >= 0 && (index as usize) < length {
        Ok(index as usize)
    } else {
        Err(HeapError::IndexOutOfBound {
            index: i64::from(index),
            length,
        })
    }
}

fn na_eq<T: Element>(a: T, b: T) -> bool {
    a == b || (a.is_na() && b.is_na())
}

/// Instantiate a generic method for the representation at hand.
macro_rules! dispatch {
    ($self:ident . $method:ident ( $repr:expr $(, $arg:expr)* )) => {
        match $repr {
            Repr::Char => $self.$method::<u8>($($arg),*),
            Repr::Int => $self.$method::<i32>($($arg),*),
            Repr::Long => $self.$method::<i64>($($arg),*),
            Repr::Double => $self.$method::<f64>($($arg),*),
            Repr::List => $self.$method::<Option<ObjRef>>($($arg),*),
            Repr::External => $self.$method::<Option<ExternalRef>>($($arg),*),
        }
    };
}

impl Heap {
    fn check_repr<T: Element>(&self, x: ObjRef) -> HeapResult<()> {
        let actual = self.repr_of(x)?;
        if actual == T::REPR {
            Ok(())
        } else {
            Err(HeapError::InvalidClass {
                expected: T::REPR,
                actual,
            })
        }
    }

    /// Unregister a freshly created object and release its slot. Rollback
    /// path for constructors that fail after `new_object` succeeded.
    pub(crate) fn discard(&mut self, x: ObjRef) {
        if let Some(global) = self.global {
            let _ = self.table_untrack(global, x);
        }
        let _ = self.free_slot(x);
    }

    // ---------------------------------------------------------------
    // Scalar access
    // ---------------------------------------------------------------

    /// Overwrite one element. An NA index is a silent no-op.
    pub fn set<T: Element>(&mut self, x: ObjRef, index: i32, value: T) -> HeapResult<()> {
        if is_na_index(index) {
            return Ok(());
        }
        let object = self.object_mut(x)?;
        let pos = check_index(index, object.length)?;
        elems_mut::<T>(object)?[pos] = value;
        Ok(())
    }

    /// Read one element. An NA index reads as NA.
    pub fn extract<T: Element>(&self, x: ObjRef, index: i32) -> HeapResult<T> {
        if is_na_index(index) {
            return Ok(T::NA);
        }
        let object = self.object(x)?;
        let pos = check_index(index, object.length)?;
        Ok(elems::<T>(object)?[pos])
    }

    /// Append one element, growing the buffer as needed.
    pub fn extend<T: Element>(&mut self, x: ObjRef, value: T) -> HeapResult<()> {
        self.check_repr::<T>(x)?;
        let length = self.length(x)?;
        self.reserve(x, length + 1)?;
        let object = self.object_mut(x)?;
        elems_mut::<T>(object)?[length] = value;
        object.length = length + 1;
        Ok(())
    }

    // ---------------------------------------------------------------
    // Slice access
    // ---------------------------------------------------------------

    /// The valid elements as a slice.
    pub fn as_slice<T: Element>(&self, x: ObjRef) -> HeapResult<&[T]> {
        let object = self.object(x)?;
        Ok(&elems::<T>(object)?[..object.length])
    }

    /// The valid elements as a mutable slice.
    pub fn as_slice_mut<T: Element>(&mut self, x: ObjRef) -> HeapResult<&mut [T]> {
        let object = self.object_mut(x)?;
        let length = object.length;
        Ok(&mut elems_mut::<T>(object)?[..length])
    }

    // ---------------------------------------------------------------
    // Vectorized mutation
    // ---------------------------------------------------------------

    /// Scatter `items` to `indices`, pairwise. All bounds are validated
    /// before the first write; NA indices skip their item.
    pub fn set_by_indices<T: Element>(
        &mut self,
        x: ObjRef,
        indices: &[i32],
        items: &[T],
    ) -> HeapResult<()> {
        if indices.len() != items.len() {
            return Err(HeapError::IncompatibleLength {
                left: indices.len(),
                right: items.len(),
            });
        }
        let object = self.object_mut(x)?;
        let length = object.length;
        for &i in indices {
            if !is_na_index(i) {
                check_index(i, length)?;
            }
        }
        let buf = elems_mut::<T>(object)?;
        for (&i, &v) in indices.iter().zip(items) {
            if !is_na_index(i) {
                buf[i as usize] = v;
            }
        }
        Ok(())
    }

    /// Overwrite the inclusive range `[start, end]` with `items`.
    pub fn set_range<T: Element>(
        &mut self,
        x: ObjRef,
        start: i32,
        end: i32,
        items: &[T],
    ) -> HeapResult<()> {
        if is_na_index(start) {
            return Err(HeapError::InvalidNa("start"));
        }
        if is_na_index(end) {
            return Err(HeapError::InvalidNa("end"));
        }
        let object = self.object_mut(x)?;
        let length = object.length;
        let start = check_index(start, length)?;
        let end = check_index(end, length)?;
        if start > end {
            return Err(HeapError::InvalidLength(end as i64 - start as i64 + 1));
        }
        let count = end - start + 1;
        if count != items.len() {
            return Err(HeapError::IncompatibleLength {
                left: count,
                right: items.len(),
            });
        }
        elems_mut::<T>(object)?[start..=end].copy_from_slice(items);
        Ok(())
    }

    /// Scatter `items` to the positions where `mask` is nonzero. The mask
    /// covers the whole object and must be NA-free.
    pub fn set_by_bool<T: Element>(
        &mut self,
        x: ObjRef,
        mask: &[i32],
        items: &[T],
    ) -> HeapResult<()> {
        let object = self.object_mut(x)?;
        let length = object.length;
        if mask.len() != length {
            return Err(HeapError::IncompatibleLength {
                left: length,
                right: mask.len(),
            });
        }
        if mask.iter().any(|&m| is_na_index(m)) {
            return Err(HeapError::InvalidNa("mask"));
        }
        let ones = mask.iter().filter(|&&m| m != 0).count();
        if ones != items.len() {
            return Err(HeapError::IncompatibleLength {
                left: ones,
                right: items.len(),
            });
        }
        let buf = elems_mut::<T>(object)?;
        let mut next = 0;
        for (pos, &m) in mask.iter().enumerate() {
            if m != 0 {
                buf[pos] = items[next];
                next += 1;
            }
        }
        Ok(())
    }

    // ---------------------------------------------------------------
    // Constructors
    // ---------------------------------------------------------------

    /// New object of `class` holding a copy of `items`.
    pub fn new_from_slice<T: Element>(
        &mut self,
        class: ClassId,
        items: &[T],
    ) -> HeapResult<ObjRef> {
        let repr = self.registry().repr(class)?;
        if repr != T::REPR {
            return Err(HeapError::InvalidClass {
                expected: T::REPR,
                actual: repr,
            });
        }
        let x = self.new_object(class, items.len().max(1))?;
        if let Err(e) = self.fill(x, items) {
            self.discard(x);
            return Err(e);
        }
        Ok(x)
    }

    fn fill<T: Element>(&mut self, x: ObjRef, items: &[T]) -> HeapResult<()> {
        let object = self.object_mut(x)?;
        elems_mut::<T>(object)?[..items.len()].copy_from_slice(items);
        object.length = items.len();
        Ok(())
    }

    /// Shallow copy: same class, same elements, no attribute.
    pub fn copy(&mut self, x: ObjRef) -> HeapResult<ObjRef> {
        let repr = self.repr_of(x)?;
        dispatch!(self.copy_t(repr, x))
    }

    fn copy_t<T: Element>(&mut self, x: ObjRef) -> HeapResult<ObjRef> {
        let class = self.class_of(x)?;
        let items = self.as_slice::<T>(x)?.to_vec();
        self.new_from_slice(class, &items)
    }

    /// New object gathering `x[indices]`. An NA index gathers NA.
    pub fn subset(&mut self, x: ObjRef, indices: &[i32]) -> HeapResult<ObjRef> {
        let repr = self.repr_of(x)?;
        dispatch!(self.subset_t(repr, x, indices))
    }

    fn subset_t<T: Element>(&mut self, x: ObjRef, indices: &[i32]) -> HeapResult<ObjRef> {
        let class = self.class_of(x)?;
        let src = self.as_slice::<T>(x)?;
        let mut out = Vec::with_capacity(indices.len());
        for &i in indices {
            if is_na_index(i) {
                out.push(T::NA);
            } else {
                out.push(src[check_index(i, src.len())?]);
            }
        }
        self.new_from_slice(class, &out)
    }

    /// New object keeping every element of `x` whose position is not in
    /// `indices`. NA and duplicate indices are ignored.
    pub fn subset_exclude(&mut self, x: ObjRef, indices: &[i32]) -> HeapResult<ObjRef> {
        if indices.is_empty() {
            return self.copy(x);
        }
        let length = self.length(x)?;
        let mut keep = vec![true; length];
        for &i in indices {
            if !is_na_index(i) {
                keep[check_index(i, length)?] = false;
            }
        }
        let kept: Vec<i32> = (0..length as i32).filter(|&p| keep[p as usize]).collect();
        self.subset(x, &kept)
    }

    /// New object keeping the elements of `x` where `mask` is nonzero.
    pub fn subset_by_bool(&mut self, x: ObjRef, mask: &[i32]) -> HeapResult<ObjRef> {
        let length = self.length(x)?;
        if mask.len() != length {
            return Err(HeapError::IncompatibleLength {
                left: length,
                right: mask.len(),
            });
        }
        if mask.iter().any(|&m| is_na_index(m)) {
            return Err(HeapError::InvalidNa("mask"));
        }
        let selected: Vec<i32> = (0..length as i32)
            .filter(|&p| mask[p as usize] != 0)
            .collect();
        self.subset(x, &selected)
    }

    // ---------------------------------------------------------------
    // In-place removal
    // ---------------------------------------------------------------

    /// Remove the inclusive range `[start, end]`, shifting the tail down.
    pub fn remove(&mut self, x: ObjRef, start: i32, end: i32) -> HeapResult<()> {
        let repr = self.repr_of(x)?;
        dispatch!(self.remove_t(repr, x, start, end))
    }

    fn remove_t<T: Element>(&mut self, x: ObjRef, start: i32, end: i32) -> HeapResult<()> {
        if is_na_index(start) {
            return Err(HeapError::InvalidNa("start"));
        }
        if is_na_index(end) {
            return Err(HeapError::InvalidNa("end"));
        }
        let object = self.object_mut(x)?;
        let length = object.length;
        let start = check_index(start, length)?;
        let end = check_index(end, length)?;
        if start > end {
            return Err(HeapError::InvalidLength(end as i64 - start as i64 + 1));
        }
        let removed = end - start + 1;
        let buf = elems_mut::<T>(object)?;
        buf.copy_within(end + 1..length, start);
        for v in &mut buf[length - removed..length] {
            *v = T::NA;
        }
        object.length = length - removed;
        Ok(())
    }

    /// Remove the elements at `indices` in place. NA and duplicate
    /// indices are ignored; an empty index set is a no-op.
    pub fn remove_by_indices(&mut self, x: ObjRef, indices: &[i32]) -> HeapResult<()> {
        if indices.is_empty() {
            return Ok(());
        }
        let repr = self.repr_of(x)?;
        dispatch!(self.remove_by_indices_t(repr, x, indices))
    }

    fn remove_by_indices_t<T: Element>(&mut self, x: ObjRef, indices: &[i32]) -> HeapResult<()> {
        let length = self.length(x)?;
        let mut keep = vec![true; length];
        for &i in indices {
            if !is_na_index(i) {
                keep[check_index(i, length)?] = false;
            }
        }
        let object = self.object_mut(x)?;
        let buf = elems_mut::<T>(object)?;
        let mut write = 0;
        for read in 0..length {
            if keep[read] {
                buf[write] = buf[read];
                write += 1;
            }
        }
        for v in &mut buf[write..length] {
            *v = T::NA;
        }
        object.length = write;
        Ok(())
    }

    // ---------------------------------------------------------------
    // Concatenation
    // ---------------------------------------------------------------

    /// Append every element of `y` to `x`. `x` and `y` may alias.
    pub fn extend_from(&mut self, x: ObjRef, y: ObjRef) -> HeapResult<()> {
        let repr = self.repr_of(x)?;
        let source = self.repr_of(y)?;
        if repr != source {
            return Err(HeapError::InvalidClass {
                expected: repr,
                actual: source,
            });
        }
        dispatch!(self.extend_from_t(repr, x, y))
    }

    fn extend_from_t<T: Element>(&mut self, x: ObjRef, y: ObjRef) -> HeapResult<()> {
        let items = self.as_slice::<T>(y)?.to_vec();
        let length = self.length(x)?;
        let total = length + items.len();
        if total > MAX_CAPACITY {
            return Err(HeapError::InvalidCapacity(total as i64));
        }
        if items.is_empty() {
            return Ok(());
        }
        self.reserve(x, total)?;
        let object = self.object_mut(x)?;
        elems_mut::<T>(object)?[length..total].copy_from_slice(&items);
        object.length = total;
        Ok(())
    }

    /// Append a reference to a LIST object. The item must be live.
    pub fn append(&mut self, list: ObjRef, item: ObjRef) -> HeapResult<()> {
        self.object(item)?;
        self.extend::<Option<ObjRef>>(list, Some(item))
    }

    // ---------------------------------------------------------------
    // Membership and formatting
    // ---------------------------------------------------------------

    /// Per-element membership of `x` in `y` as a fresh INT object of
    /// zeros and ones. NA matches NA, including DOUBLE NaN.
    pub fn is_in(&mut self, x: ObjRef, y: ObjRef) -> HeapResult<ObjRef> {
        let repr = self.repr_of(x)?;
        let source = self.repr_of(y)?;
        if repr != source {
            return Err(HeapError::InvalidClass {
                expected: repr,
                actual: source,
            });
        }
        dispatch!(self.is_in_t(repr, x, y))
    }

    fn is_in_t<T: Element>(&mut self, x: ObjRef, y: ObjRef) -> HeapResult<ObjRef> {
        let haystack = self.as_slice::<T>(y)?.to_vec();
        let flags: Vec<i32> = self
            .as_slice::<T>(x)?
            .iter()
            .map(|&v| i32::from(haystack.iter().any(|&h| na_eq(v, h))))
            .collect();
        self.new_from_slice(ClassId::INT, &flags)
    }

    /// Human-readable rendering of the valid elements.
    pub fn format_object(&self, x: ObjRef) -> HeapResult<String> {
        let repr = self.repr_of(x)?;
        let mut out = String::from("[");
        match repr {
            Repr::Char => {
                for (i, &v) in self.as_slice::<u8>(x)?.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    if v.is_na() {
                        out.push_str("NA");
                    } else {
                        out.push(v as char);
                    }
                }
            }
            Repr::Int => {
                for (i, &v) in self.as_slice::<i32>(x)?.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    if v.is_na() {
                        out.push_str("NA");
                    } else {
                        out.push_str(&v.to_string());
                    }
                }
            }
            Repr::Long => {
                for (i, &v) in self.as_slice::<i64>(x)?.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    if v.is_na() {
                        out.push_str("NA");
                    } else {
                        out.push_str(&format!("{v}L"));
                    }
                }
            }
            Repr::Double => {
                for (i, &v) in self.as_slice::<f64>(x)?.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    if v.is_na() {
                        out.push_str("NA");
                    } else {
                        out.push_str(&format!("{v:.2}"));
                    }
                }
            }
            Repr::List => {
                let elems = self.as_slice::<Option<ObjRef>>(x)?.to_vec();
                for (i, v) in elems.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    match v {
                        Some(r) => {
                            let name = self.registry().name(self.class_of(*r)?)?;
                            out.push_str(&format!("<{name}>"));
                        }
                        None => out.push_str("NA"),
                    }
                }
            }
            Repr::External => {
                for (i, v) in self.as_slice::<Option<ExternalRef>>(x)?.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    match v {
                        Some(h) => out.push_str(&format!("<external:{}>", h.0)),
                        None => out.push_str("NA"),
                    }
                }
            }
        }
        out.push(']');
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{DOUBLE_NA, INT_NA};

    fn ints(heap: &mut Heap, items: &[i32]) -> ObjRef {
        heap.new_from_slice(ClassId::INT, items).unwrap()
    }

    #[test]
    fn test_set_and_extract() {
        let mut heap = Heap::new();
        let x = ints(&mut heap, &[10, 20, 30]);
        heap.set(x, 1, 99).unwrap();
        assert_eq!(heap.extract::<i32>(x, 1).unwrap(), 99);
        assert_eq!(heap.as_slice::<i32>(x).unwrap(), &[10, 99, 30]);
    }

    #[test]
    fn test_na_index_semantics() {
        let mut heap = Heap::new();
        let x = ints(&mut heap, &[1, 2]);
        // NA writes are dropped, NA reads produce NA.
        heap.set(x, INT_NA, 7).unwrap();
        assert_eq!(heap.as_slice::<i32>(x).unwrap(), &[1, 2]);
        assert!(heap.extract::<i32>(x, INT_NA).unwrap().is_na());
    }

    #[test]
    fn test_bounds_checked() {
        let mut heap = Heap::new();
        let x = ints(&mut heap, &[1, 2]);
        assert!(matches!(
            heap.set(x, 2, 0),
            Err(HeapError::IndexOutOfBound {
                index: 2,
                length: 2
            })
        ));
        assert!(matches!(
            heap.extract::<i32>(x, -1),
            Err(HeapError::IndexOutOfBound { .. })
        ));
    }

    #[test]
    fn test_wrong_element_type_rejected() {
        let mut heap = Heap::new();
        let x = ints(&mut heap, &[1]);
        assert!(matches!(
            heap.extract::<f64>(x, 0),
            Err(HeapError::InvalidClass {
                expected: Repr::Double,
                actual: Repr::Int
            })
        ));
    }

    #[test]
    fn test_extend_grows_length() {
        let mut heap = Heap::new();
        let x = heap.new_object(ClassId::LONG, 1).unwrap();
        for v in 0..10i64 {
            heap.extend(x, v).unwrap();
        }
        assert_eq!(heap.length(x).unwrap(), 10);
        assert_eq!(heap.extract::<i64>(x, 9).unwrap(), 9);
    }

    #[test]
    fn test_set_by_indices_validates_before_writing() {
        let mut heap = Heap::new();
        let x = ints(&mut heap, &[0, 0, 0]);
        // Second index is out of bounds: nothing may be written.
        assert!(heap.set_by_indices(x, &[0, 5], &[7, 8]).is_err());
        assert_eq!(heap.as_slice::<i32>(x).unwrap(), &[0, 0, 0]);

        heap.set_by_indices(x, &[2, INT_NA, 0], &[9, 1, 5]).unwrap();
        assert_eq!(heap.as_slice::<i32>(x).unwrap(), &[5, 0, 9]);
    }

    #[test]
    fn test_set_range() {
        let mut heap = Heap::new();
        let x = ints(&mut heap, &[0, 0, 0, 0, 0]);
        heap.set_range(x, 1, 3, &[7, 8, 9]).unwrap();
        assert_eq!(heap.as_slice::<i32>(x).unwrap(), &[0, 7, 8, 9, 0]);

        assert!(matches!(
            heap.set_range(x, 3, 1, &[1, 1, 1]),
            Err(HeapError::InvalidLength(_))
        ));
        assert!(matches!(
            heap.set_range(x, 0, 1, &[1]),
            Err(HeapError::IncompatibleLength { .. })
        ));
        assert!(matches!(
            heap.set_range(x, INT_NA, 1, &[1]),
            Err(HeapError::InvalidNa("start"))
        ));
    }

    #[test]
    fn test_set_by_bool() {
        let mut heap = Heap::new();
        let x = ints(&mut heap, &[1, 2, 3, 4]);
        heap.set_by_bool(x, &[0, 1, 0, 1], &[20, 40]).unwrap();
        assert_eq!(heap.as_slice::<i32>(x).unwrap(), &[1, 20, 3, 40]);

        assert!(heap.set_by_bool(x, &[1, 0], &[9]).is_err());
        assert!(matches!(
            heap.set_by_bool(x, &[1, INT_NA, 0, 0], &[9]),
            Err(HeapError::InvalidNa("mask"))
        ));
    }

    #[test]
    fn test_copy_is_shallow_and_detached() {
        let mut heap = Heap::new();
        let x = ints(&mut heap, &[1, 2, 3]);
        let y = heap.copy(x).unwrap();
        heap.set(x, 0, 99).unwrap();
        assert_eq!(heap.as_slice::<i32>(y).unwrap(), &[1, 2, 3]);
        assert_eq!(heap.class_of(y).unwrap(), ClassId::INT);
    }

    #[test]
    fn test_subset_gathers_with_na() {
        let mut heap = Heap::new();
        let x = ints(&mut heap, &[10, 20, 30]);
        let y = heap.subset(x, &[2, INT_NA, 0, 0]).unwrap();
        assert_eq!(heap.as_slice::<i32>(y).unwrap(), &[30, INT_NA, 10, 10]);
        assert!(heap.subset(x, &[3]).is_err());
    }

    #[test]
    fn test_subset_with_no_indices_yields_empty_object() {
        let mut heap = Heap::new();
        let x = ints(&mut heap, &[10, 20, 30]);
        let y = heap.subset(x, &[]).unwrap();
        assert_ne!(y, x);
        assert_eq!(heap.class_of(y).unwrap(), ClassId::INT);
        assert_eq!(heap.length(y).unwrap(), 0);
        assert!(heap.as_slice::<i32>(y).unwrap().is_empty());
    }

    #[test]
    fn test_subset_exclude_and_bool() {
        let mut heap = Heap::new();
        let x = ints(&mut heap, &[10, 20, 30, 40]);
        let y = heap.subset_exclude(x, &[1, 1, INT_NA, 3]).unwrap();
        assert_eq!(heap.as_slice::<i32>(y).unwrap(), &[10, 30]);

        let z = heap.subset_by_bool(x, &[1, 0, 0, 1]).unwrap();
        assert_eq!(heap.as_slice::<i32>(z).unwrap(), &[10, 40]);

        let all = heap.subset_exclude(x, &[]).unwrap();
        assert_eq!(heap.as_slice::<i32>(all).unwrap(), &[10, 20, 30, 40]);
    }

    #[test]
    fn test_remove_range() {
        let mut heap = Heap::new();
        let x = ints(&mut heap, &[0, 1, 2, 3, 4]);
        heap.remove(x, 1, 2).unwrap();
        assert_eq!(heap.as_slice::<i32>(x).unwrap(), &[0, 3, 4]);

        assert!(matches!(
            heap.remove(x, 2, 1),
            Err(HeapError::InvalidLength(_))
        ));
        assert!(heap.remove(x, 0, 5).is_err());
    }

    #[test]
    fn test_remove_by_indices() {
        let mut heap = Heap::new();
        let x = ints(&mut heap, &[0, 1, 2, 3, 4]);
        heap.remove_by_indices(x, &[4, 0, 0, INT_NA]).unwrap();
        assert_eq!(heap.as_slice::<i32>(x).unwrap(), &[1, 2, 3]);
        heap.remove_by_indices(x, &[]).unwrap();
        assert_eq!(heap.length(x).unwrap(), 3);
    }

    #[test]
    fn test_extend_from_and_self_append() {
        let mut heap = Heap::new();
        let x = ints(&mut heap, &[1, 2]);
        let y = ints(&mut heap, &[3, 4]);
        heap.extend_from(x, y).unwrap();
        assert_eq!(heap.as_slice::<i32>(x).unwrap(), &[1, 2, 3, 4]);

        // Self-concatenation reads the pre-append contents.
        heap.extend_from(x, x).unwrap();
        assert_eq!(
            heap.as_slice::<i32>(x).unwrap(),
            &[1, 2, 3, 4, 1, 2, 3, 4]
        );

        let d = heap.new_from_slice(ClassId::DOUBLE, &[1.0]).unwrap();
        assert!(matches!(
            heap.extend_from(x, d),
            Err(HeapError::InvalidClass { .. })
        ));
    }

    #[test]
    fn test_is_in_with_na_matching() {
        let mut heap = Heap::new();
        let x = heap
            .new_from_slice(ClassId::DOUBLE, &[1.0, DOUBLE_NA, 3.0])
            .unwrap();
        let y = heap
            .new_from_slice(ClassId::DOUBLE, &[DOUBLE_NA, 1.0])
            .unwrap();
        let r = heap.is_in(x, y).unwrap();
        assert_eq!(heap.as_slice::<i32>(r).unwrap(), &[1, 1, 0]);
    }

    #[test]
    fn test_format_object() {
        let mut heap = Heap::new();
        let x = ints(&mut heap, &[1, INT_NA, 3]);
        assert_eq!(heap.format_object(x).unwrap(), "[1, NA, 3]");

        let l = heap.new_from_slice(ClassId::LONG, &[5i64]).unwrap();
        assert_eq!(heap.format_object(l).unwrap(), "[5L]");

        let list = heap.new_object(ClassId::LIST, 2).unwrap();
        heap.append(list, x).unwrap();
        heap.extend::<Option<ObjRef>>(list, None).unwrap();
        assert_eq!(heap.format_object(list).unwrap(), "[<INT>, NA]");
    }
}

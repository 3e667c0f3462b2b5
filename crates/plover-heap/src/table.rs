//! Sorted identity tables.
//!
//! A table is an ordinary LIST object whose valid prefix is kept sorted
//! by the packed (slot, generation) key. Membership is a binary search;
//! insertion and removal shift the tail. The global ledger, the root set,
//! and the collector's working sets all use this shape.

use crate::error::HeapResult;
use crate::heap::Heap;
use crate::object::{ObjRef, list_elems, list_elems_mut};

impl Heap {
    /// Position of `x` in the table, if recorded.
    pub(crate) fn table_find(&self, table: ObjRef, x: ObjRef) -> HeapResult<Option<usize>> {
        let object = self.object(table)?;
        let entries = &list_elems(object)?[..object.length];
        Ok(entries
            .binary_search_by(|entry| {
                // Valid entries are always Some; an unset slot inside the
                // prefix would be a table invariant violation.
                entry.map_or(u64::MAX, ObjRef::key).cmp(&x.key())
            })
            .ok())
    }

    /// Record `x`, keeping the table sorted. Returns false if already
    /// present. Grows the table as needed; on allocation failure the
    /// table is unchanged.
    pub(crate) fn table_record(&mut self, table: ObjRef, x: ObjRef) -> HeapResult<bool> {
        let object = self.object(table)?;
        let entries = &list_elems(object)?[..object.length];
        let pos = match entries
            .binary_search_by(|entry| entry.map_or(u64::MAX, ObjRef::key).cmp(&x.key()))
        {
            Ok(_) => return Ok(false),
            Err(pos) => pos,
        };

        let length = object.length;
        self.reserve(table, length + 1)?;
        let object = self.object_mut(table)?;
        let elems = list_elems_mut(object)?;
        elems.copy_within(pos..length, pos + 1);
        elems[pos] = Some(x);
        object.length = length + 1;
        Ok(true)
    }

    /// Remove `x` from the table. No-op if absent.
    pub(crate) fn table_untrack(&mut self, table: ObjRef, x: ObjRef) -> HeapResult<()> {
        let Some(pos) = self.table_find(table, x)? else {
            return Ok(());
        };
        let object = self.object_mut(table)?;
        let length = object.length;
        let elems = list_elems_mut(object)?;
        elems.copy_within(pos + 1..length, pos);
        elems[length - 1] = None;
        object.length = length - 1;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn table_entries(&self, table: ObjRef) -> HeapResult<Vec<ObjRef>> {
        let object = self.object(table)?;
        Ok(list_elems(object)?[..object.length]
            .iter()
            .map(|e| e.unwrap())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::ClassId;

    fn table(heap: &mut Heap) -> ObjRef {
        heap.alloc_untracked(ClassId::LIST, 2).unwrap()
    }

    #[test]
    fn test_record_keeps_sorted_order() {
        let mut heap = Heap::new();
        let t = table(&mut heap);
        let mut refs: Vec<ObjRef> = (0..5)
            .map(|_| heap.alloc_untracked(ClassId::INT, 1).unwrap())
            .collect();
        // Insert out of order.
        refs.reverse();
        for &r in &refs {
            assert!(heap.table_record(t, r).unwrap());
        }
        let mut sorted = refs.clone();
        sorted.sort();
        assert_eq!(heap.table_entries(t).unwrap(), sorted);
    }

    #[test]
    fn test_record_is_idempotent() {
        let mut heap = Heap::new();
        let t = table(&mut heap);
        let r = heap.alloc_untracked(ClassId::INT, 1).unwrap();
        assert!(heap.table_record(t, r).unwrap());
        assert!(!heap.table_record(t, r).unwrap());
        assert_eq!(heap.length(t).unwrap(), 1);
    }

    #[test]
    fn test_find_and_untrack() {
        let mut heap = Heap::new();
        let t = table(&mut heap);
        let a = heap.alloc_untracked(ClassId::INT, 1).unwrap();
        let b = heap.alloc_untracked(ClassId::INT, 1).unwrap();
        heap.table_record(t, a).unwrap();
        heap.table_record(t, b).unwrap();
        assert!(heap.table_find(t, a).unwrap().is_some());

        heap.table_untrack(t, a).unwrap();
        assert!(heap.table_find(t, a).unwrap().is_none());
        assert!(heap.table_find(t, b).unwrap().is_some());
        assert_eq!(heap.length(t).unwrap(), 1);

        // Untracking an absent entry is a no-op.
        heap.table_untrack(t, a).unwrap();
        assert_eq!(heap.length(t).unwrap(), 1);
    }

    #[test]
    fn test_table_grows_past_initial_capacity() {
        let mut heap = Heap::new();
        let t = table(&mut heap);
        let refs: Vec<ObjRef> = (0..40)
            .map(|_| heap.alloc_untracked(ClassId::INT, 1).unwrap())
            .collect();
        for &r in &refs {
            heap.table_record(t, r).unwrap();
        }
        assert_eq!(heap.length(t).unwrap(), 40);
        assert!(heap.capacity_of(t).unwrap() >= 40);
        for &r in &refs {
            assert!(heap.table_find(t, r).unwrap().is_some());
        }
    }
}

//! Stop-the-world tracing collection.
//!
//! Marking is a breadth-first walk: the root set seeds a worklist, each
//! item's LIST elements and attribute link are scanned, and membership
//! in the reachable table deduplicates visits, so reference cycles
//! terminate. Sweeping frees every global-ledger entry absent from the
//! reachable table, then rewrites the ledger from the survivors.

use crate::error::{HeapError, HeapResult};
use crate::heap::Heap;
use crate::object::{ObjRef, list_elems, list_elems_mut};
use std::ops::{Deref, DerefMut};

/// Outcome of one collection cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectStats {
    /// Objects in the global ledger when the cycle started.
    pub examined: usize,
    /// Objects freed by the sweep.
    pub freed: usize,
    /// Objects surviving the cycle.
    pub live: usize,
    /// False if the post-sweep ledger shrink could not allocate; the
    /// heap is still fully consistent, just not compacted.
    pub compacted: bool,
}

/// Scope guard keeping one object rooted.
///
/// Borrows the heap exclusively for its lifetime and derefs to it, so
/// the protected object cannot be collected while operations run
/// through the guard. Dropping the guard unroots the object.
pub struct RootGuard<'h> {
    heap: &'h mut Heap,
    obj: ObjRef,
}

impl RootGuard<'_> {
    /// The guarded object.
    pub fn obj(&self) -> ObjRef {
        self.obj
    }
}

impl Deref for RootGuard<'_> {
    type Target = Heap;

    fn deref(&self) -> &Heap {
        self.heap
    }
}

impl DerefMut for RootGuard<'_> {
    fn deref_mut(&mut self) -> &mut Heap {
        self.heap
    }
}

impl Drop for RootGuard<'_> {
    fn drop(&mut self) {
        // Unrooting never requires the object to still be live.
        let _ = self.heap.unroot(self.obj);
    }
}

impl Heap {
    /// True once any tracked allocation has been made and [`Heap::kill`]
    /// has not torn the bookkeeping down.
    pub fn is_active(&self) -> bool {
        self.global.is_some()
    }

    /// Pin `x` so collection cannot free it or anything it reaches.
    /// Returns false if it was already rooted.
    pub fn root(&mut self, x: ObjRef) -> HeapResult<bool> {
        self.object(x)?;
        let roots = self.ensure_roots()?;
        self.table_record(roots, x)
    }

    /// Release the pin on `x`. No-op if not rooted; never fails on a
    /// stale reference.
    pub fn unroot(&mut self, x: ObjRef) -> HeapResult<()> {
        let Some(roots) = self.roots else {
            return Ok(());
        };
        self.table_untrack(roots, x)
    }

    /// Root every reference in order, stopping at the first failure.
    pub fn root_all(&mut self, xs: &[ObjRef]) -> HeapResult<()> {
        for &x in xs {
            self.root(x)?;
        }
        Ok(())
    }

    /// Unroot every reference.
    pub fn unroot_all(&mut self, xs: &[ObjRef]) -> HeapResult<()> {
        for &x in xs {
            self.unroot(x)?;
        }
        Ok(())
    }

    /// Root `x` for the lifetime of the returned guard.
    pub fn root_guard(&mut self, x: ObjRef) -> HeapResult<RootGuard<'_>> {
        self.root(x)?;
        Ok(RootGuard { heap: self, obj: x })
    }

    /// Run one full mark and sweep cycle.
    ///
    /// Everything reachable from the root set survives; every other
    /// tracked object is freed and its slot retired. Errors during
    /// marking abort the cycle before anything has been freed.
    pub fn collect(&mut self) -> HeapResult<CollectStats> {
        let global = self.ensure_global()?;
        let roots = self.ensure_roots()?;
        let reachable = self.ensure_reachable()?;
        let worklist = self.ensure_worklist()?;

        let examined = self.length(global)?;
        #[cfg(feature = "gc_logging")]
        tracing::debug!(target: "plover::gc", tracked = examined, "collection start");

        // Working sets are kept across cycles; reset their lengths.
        self.object_mut(reachable)?.length = 0;
        self.object_mut(worklist)?.length = 0;

        let seeds: Vec<ObjRef> = self
            .as_slice::<Option<ObjRef>>(roots)?
            .iter()
            .filter_map(|e| *e)
            .collect();
        for &seed in &seeds {
            if self.table_record(reachable, seed)? {
                self.extend::<Option<ObjRef>>(worklist, Some(seed))?;
            }
        }

        let mut head = 0;
        let mut children = Vec::new();
        while head < self.length(worklist)? {
            let item = self.as_slice::<Option<ObjRef>>(worklist)?[head];
            head += 1;
            let Some(item) = item else { continue };

            children.clear();
            {
                let object = self.object(item)?;
                if self.registry().repr(object.class)?.scanned() {
                    children.extend(
                        list_elems(object)?[..object.length].iter().filter_map(|e| *e),
                    );
                }
                if let Some(attr) = object.attribute {
                    children.push(attr);
                }
            }
            for &child in &children {
                // LIST elements may dangle from earlier cycles.
                if !self.is_live(child) {
                    continue;
                }
                if self.table_record(reachable, child)? {
                    self.extend::<Option<ObjRef>>(worklist, Some(child))?;
                }
            }
        }

        // Sweep: free every tracked object the mark did not reach.
        let tracked: Vec<ObjRef> = self
            .as_slice::<Option<ObjRef>>(global)?
            .iter()
            .filter_map(|e| *e)
            .collect();
        let mut freed = 0;
        for &entry in &tracked {
            if self.table_find(reachable, entry)?.is_none() {
                self.free_slot(entry)?;
                freed += 1;
            }
        }

        // The reachable table is sorted, so it becomes the new ledger
        // as-is. The old ledger held a superset; no growth is needed.
        let survivors: Vec<Option<ObjRef>> = self.as_slice::<Option<ObjRef>>(reachable)?.to_vec();
        let live = survivors.len();
        {
            let object = self.object_mut(global)?;
            let buf = list_elems_mut(object)?;
            buf[..live].copy_from_slice(&survivors);
            for v in &mut buf[live..] {
                *v = None;
            }
            object.length = live;
        }

        // Shrink is best effort: failure to reallocate leaves a valid,
        // merely oversized ledger.
        let mut compacted = true;
        if let Err(e) = self.resize(global, live.max(1)) {
            match e {
                HeapError::AllocFailed { .. } => {
                    compacted = false;
                    #[cfg(feature = "gc_logging")]
                    tracing::warn!(target: "plover::gc", "ledger shrink failed, keeping capacity");
                }
                other => return Err(other),
            }
        }

        self.stats.collections += 1;
        self.stats.last_freed = freed;
        #[cfg(feature = "gc_logging")]
        tracing::info!(
            target: "plover::gc",
            examined,
            freed,
            live,
            "collection complete"
        );

        Ok(CollectStats {
            examined,
            freed,
            live,
            compacted,
        })
    }

    /// Free every tracked object and the bookkeeping tables themselves.
    ///
    /// The slot arena is retained, so references into the killed heap
    /// remain detectably stale. Allocating again re-creates the
    /// bookkeeping lazily.
    pub fn kill(&mut self) -> HeapResult<()> {
        if let Some(global) = self.global {
            let tracked: Vec<ObjRef> = self
                .as_slice::<Option<ObjRef>>(global)?
                .iter()
                .filter_map(|e| *e)
                .collect();
            for entry in tracked {
                self.free_slot(entry)?;
            }
        }
        let tables = [
            self.global.take(),
            self.roots.take(),
            self.reachable.take(),
            self.worklist.take(),
        ];
        for table in tables.into_iter().flatten() {
            self.free_slot(table)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::ClassId;

    #[test]
    fn test_unrooted_objects_are_swept() {
        let mut heap = Heap::new();
        let a = heap.new_object(ClassId::INT, 1).unwrap();
        let b = heap.new_object(ClassId::INT, 1).unwrap();
        heap.root(a).unwrap();
        let stats = heap.collect().unwrap();
        assert_eq!(stats.examined, 2);
        assert_eq!(stats.freed, 1);
        assert_eq!(stats.live, 1);
        assert!(stats.compacted);
        assert!(heap.is_live(a));
        assert!(!heap.is_live(b));
    }

    #[test]
    fn test_list_elements_kept_transitively() {
        let mut heap = Heap::new();
        let inner = heap.new_object(ClassId::INT, 1).unwrap();
        let mid = heap.new_object(ClassId::LIST, 1).unwrap();
        let outer = heap.new_object(ClassId::LIST, 1).unwrap();
        heap.append(mid, inner).unwrap();
        heap.append(outer, mid).unwrap();
        heap.root(outer).unwrap();
        heap.collect().unwrap();
        assert!(heap.is_live(inner));
        heap.unroot(outer).unwrap();
        let stats = heap.collect().unwrap();
        assert_eq!(stats.freed, 3);
        assert_eq!(heap.live_objects(), 0);
    }

    #[test]
    fn test_cycles_terminate_and_are_collected() {
        let mut heap = Heap::new();
        let a = heap.new_object(ClassId::LIST, 1).unwrap();
        let b = heap.new_object(ClassId::LIST, 1).unwrap();
        heap.append(a, b).unwrap();
        heap.append(b, a).unwrap();
        heap.root(a).unwrap();
        let stats = heap.collect().unwrap();
        assert_eq!(stats.live, 2);
        heap.unroot(a).unwrap();
        let stats = heap.collect().unwrap();
        assert_eq!(stats.freed, 2);
    }

    #[test]
    fn test_attribute_chain_is_reachable() {
        let mut heap = Heap::new();
        let x = heap.new_from_slice(ClassId::INT, &[1]).unwrap();
        let dim = heap.new_from_slice(ClassId::INT, &[1, 1]).unwrap();
        heap.set_attr(x, "dim", dim).unwrap();
        heap.root(x).unwrap();
        heap.collect().unwrap();
        assert!(heap.is_live(dim));
        assert_eq!(heap.get_attr(x, "dim").unwrap(), dim);
    }

    #[test]
    fn test_aliasing_entries_freed_once() {
        let mut heap = Heap::new();
        let x = heap.new_object(ClassId::INT, 1).unwrap();
        let l = heap.new_object(ClassId::LIST, 2).unwrap();
        heap.append(l, x).unwrap();
        heap.append(l, x).unwrap();
        heap.root(l).unwrap();
        let stats = heap.collect().unwrap();
        assert_eq!(stats.live, 2);
        heap.unroot(l).unwrap();
        let stats = heap.collect().unwrap();
        assert_eq!(stats.freed, 2);
    }

    #[test]
    fn test_dangling_list_element_is_skipped() {
        let mut heap = Heap::new();
        let l = heap.new_object(ClassId::LIST, 1).unwrap();
        heap.root(l).unwrap();
        let x = heap.new_object(ClassId::INT, 1).unwrap();
        heap.append(l, x).unwrap();
        // Drop the element from the list, collect, then put the now
        // stale reference back.
        heap.remove(l, 0, 0).unwrap();
        heap.collect().unwrap();
        assert!(!heap.is_live(x));
        heap.extend::<Option<ObjRef>>(l, Some(x)).unwrap();
        heap.collect().unwrap();
        assert!(heap.is_live(l));
    }

    #[test]
    fn test_root_guard_unroots_on_drop() {
        let mut heap = Heap::new();
        let x = heap.new_object(ClassId::INT, 1).unwrap();
        {
            let mut guard = heap.root_guard(x).unwrap();
            assert_eq!(guard.obj(), x);
            guard.collect().unwrap();
            assert!(guard.is_live(x));
        }
        heap.collect().unwrap();
        assert!(!heap.is_live(x));
    }

    #[test]
    fn test_double_root_is_single_entry() {
        let mut heap = Heap::new();
        let x = heap.new_object(ClassId::INT, 1).unwrap();
        assert!(heap.root(x).unwrap());
        assert!(!heap.root(x).unwrap());
        heap.unroot(x).unwrap();
        heap.collect().unwrap();
        assert!(!heap.is_live(x));
    }

    #[test]
    fn test_kill_and_reinit() {
        let mut heap = Heap::new();
        let x = heap.new_object(ClassId::INT, 1).unwrap();
        heap.root(x).unwrap();
        assert!(heap.is_active());
        heap.kill().unwrap();
        assert!(!heap.is_active());
        assert!(!heap.is_live(x));
        assert_eq!(heap.live_objects(), 0);

        // The heap comes back up lazily.
        let y = heap.new_object(ClassId::INT, 1).unwrap();
        assert!(heap.is_active());
        assert!(heap.is_live(y));
    }

    #[test]
    fn test_stats_accumulate() {
        let mut heap = Heap::new();
        heap.new_object(ClassId::INT, 1).unwrap();
        heap.collect().unwrap();
        heap.collect().unwrap();
        assert_eq!(heap.stats().collections, 2);
        assert_eq!(heap.stats().last_freed, 0);
    }
}

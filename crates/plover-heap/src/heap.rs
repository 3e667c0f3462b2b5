//! The heap: slot arena, allocation, growth policy, bookkeeping state.

use crate::class::{ClassId, ClassRegistry, Repr};
use crate::error::{HeapError, HeapResult};
use crate::object::{MAX_CAPACITY, ObjData, ObjRef, Object};

/// Tunables for a [`Heap`].
#[derive(Debug, Clone)]
pub struct HeapConfig {
    /// Initial capacity of the bookkeeping tables (default: 8).
    pub table_capacity: usize,
    /// Element count at which buffer growth switches from doubling to
    /// additive steps of this size (default: 128 Ki elements).
    pub linear_growth_threshold: usize,
}

impl Default for HeapConfig {
    fn default() -> Self {
        Self {
            table_capacity: 8,
            linear_growth_threshold: 1 << 17,
        }
    }
}

/// Cumulative collector statistics.
#[derive(Debug, Default, Clone)]
pub struct HeapStats {
    /// Number of collections performed.
    pub collections: u64,
    /// Objects freed by the last collection.
    pub last_freed: usize,
}

struct Slot {
    generation: u32,
    object: Option<Object>,
}

/// An independent object heap and its garbage collector.
///
/// Owns every allocation: the slot arena, the class registry, the global
/// allocation ledger, the root ledger, and the collector's working sets.
/// All operations are methods taking `&self`/`&mut self`; nothing is
/// global, so independent heaps can coexist (one per interpreter, one per
/// test).
///
/// Single-threaded by design: collection and every table mutation run to
/// completion with no suspension points, and there is no interior
/// mutability to contend over.
pub struct Heap {
    config: HeapConfig,
    registry: ClassRegistry,
    slots: Vec<Slot>,
    free: Vec<u32>,
    pub(crate) global: Option<ObjRef>,
    pub(crate) roots: Option<ObjRef>,
    pub(crate) reachable: Option<ObjRef>,
    pub(crate) worklist: Option<ObjRef>,
    pub(crate) stats: HeapStats,
}

impl Heap {
    /// Heap with the built-in classes and default tunables.
    pub fn new() -> Self {
        Self::with_registry(ClassRegistry::new(), HeapConfig::default())
    }

    /// Heap with default classes and custom tunables.
    pub fn with_config(config: HeapConfig) -> Self {
        Self::with_registry(ClassRegistry::new(), config)
    }

    /// Heap owning a caller-assembled class registry.
    pub fn with_registry(registry: ClassRegistry, config: HeapConfig) -> Self {
        Self {
            config,
            registry,
            slots: Vec::new(),
            free: Vec::new(),
            global: None,
            roots: None,
            reachable: None,
            worklist: None,
            stats: HeapStats::default(),
        }
    }

    /// The class registry this heap resolves types against.
    pub fn registry(&self) -> &ClassRegistry {
        &self.registry
    }

    /// Cumulative collector statistics.
    pub fn stats(&self) -> &HeapStats {
        &self.stats
    }

    // ---------------------------------------------------------------
    // Slot access
    // ---------------------------------------------------------------

    pub(crate) fn object(&self, x: ObjRef) -> HeapResult<&Object> {
        self.slots
            .get(x.index as usize)
            .filter(|slot| slot.generation == x.generation)
            .and_then(|slot| slot.object.as_ref())
            .ok_or(HeapError::UnexpectedNullPointer)
    }

    pub(crate) fn object_mut(&mut self, x: ObjRef) -> HeapResult<&mut Object> {
        self.slots
            .get_mut(x.index as usize)
            .filter(|slot| slot.generation == x.generation)
            .and_then(|slot| slot.object.as_mut())
            .ok_or(HeapError::UnexpectedNullPointer)
    }

    /// True if `x` currently names a live object.
    pub fn is_live(&self, x: ObjRef) -> bool {
        self.object(x).is_ok()
    }

    // ---------------------------------------------------------------
    // Allocation
    // ---------------------------------------------------------------

    fn check_capacity(capacity: usize) -> HeapResult<()> {
        if capacity == 0 || capacity > MAX_CAPACITY {
            return Err(HeapError::InvalidCapacity(capacity as i64));
        }
        Ok(())
    }

    /// Allocate a zero-length object without recording it in the global
    /// table. Used for the bookkeeping tables themselves.
    pub(crate) fn alloc_untracked(
        &mut self,
        class: ClassId,
        capacity: usize,
    ) -> HeapResult<ObjRef> {
        let repr = self.registry.repr(class)?;
        Self::check_capacity(capacity)?;

        // Build the buffer first: if this fails, nothing was mutated.
        let data = ObjData::with_capacity(repr, capacity)?;
        let object = Object {
            class,
            length: 0,
            attribute: None,
            data,
        };

        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.object = Some(object);
                Ok(ObjRef {
                    index,
                    generation: slot.generation,
                })
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    object: Some(object),
                });
                Ok(ObjRef {
                    index,
                    generation: 0,
                })
            }
        }
    }

    /// Release an object's storage and retire its identity.
    pub(crate) fn free_slot(&mut self, x: ObjRef) -> HeapResult<()> {
        self.object(x)?;
        let slot = &mut self.slots[x.index as usize];
        slot.object = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(x.index);
        Ok(())
    }

    /// Allocate a zero-length object and record it in the global table.
    ///
    /// Lazily initializes the global table. If registration fails, the
    /// fresh object is freed before the error propagates: no leak, no
    /// partial registration.
    pub fn new_object(&mut self, class: ClassId, capacity: usize) -> HeapResult<ObjRef> {
        let global = self.ensure_global()?;
        let x = self.alloc_untracked(class, capacity)?;
        if let Err(e) = self.table_record(global, x) {
            let _ = self.free_slot(x);
            return Err(e);
        }
        Ok(x)
    }

    // ---------------------------------------------------------------
    // Growth
    // ---------------------------------------------------------------

    /// Reallocate the backing buffer to exactly `capacity` elements.
    ///
    /// Shrinking below the current length truncates the length; that data
    /// loss is by design, not an error. On `AllocFailed` the previous
    /// buffer and contents remain intact.
    pub fn resize(&mut self, x: ObjRef, capacity: usize) -> HeapResult<()> {
        Self::check_capacity(capacity)?;
        let object = self.object_mut(x)?;
        object.data.resize(capacity)?;
        if object.length > capacity {
            object.length = capacity;
        }
        Ok(())
    }

    /// Grow the backing buffer to hold at least `capacity` elements.
    ///
    /// No-op when already satisfied. Doubles until the linear-growth
    /// threshold, then grows by fixed additive steps, capped at
    /// [`MAX_CAPACITY`].
    pub fn reserve(&mut self, x: ObjRef, capacity: usize) -> HeapResult<()> {
        Self::check_capacity(capacity)?;
        if self.object(x)?.capacity() >= capacity {
            return Ok(());
        }

        let threshold = self.config.linear_growth_threshold;
        let mut target = 1usize;
        while target <= capacity {
            if target < threshold {
                target *= 2;
            } else {
                target += threshold;
            }
        }
        self.resize(x, target.min(MAX_CAPACITY))
    }

    // ---------------------------------------------------------------
    // Bookkeeping tables
    // ---------------------------------------------------------------

    pub(crate) fn ensure_global(&mut self) -> HeapResult<ObjRef> {
        if let Some(t) = self.global {
            return Ok(t);
        }
        let t = self.alloc_untracked(ClassId::LIST, self.config.table_capacity)?;
        self.global = Some(t);
        Ok(t)
    }

    pub(crate) fn ensure_roots(&mut self) -> HeapResult<ObjRef> {
        if let Some(t) = self.roots {
            return Ok(t);
        }
        let t = self.alloc_untracked(ClassId::LIST, self.config.table_capacity)?;
        self.roots = Some(t);
        Ok(t)
    }

    pub(crate) fn ensure_reachable(&mut self) -> HeapResult<ObjRef> {
        if let Some(t) = self.reachable {
            return Ok(t);
        }
        let t = self.alloc_untracked(ClassId::LIST, self.config.table_capacity)?;
        self.reachable = Some(t);
        Ok(t)
    }

    pub(crate) fn ensure_worklist(&mut self) -> HeapResult<ObjRef> {
        if let Some(t) = self.worklist {
            return Ok(t);
        }
        let t = self.alloc_untracked(ClassId::LIST, self.config.table_capacity)?;
        self.worklist = Some(t);
        Ok(t)
    }

    // ---------------------------------------------------------------
    // Accessors
    // ---------------------------------------------------------------

    /// Class of an object, fixed at creation.
    pub fn class_of(&self, x: ObjRef) -> HeapResult<ClassId> {
        Ok(self.object(x)?.class)
    }

    /// Representation type of an object.
    pub fn repr_of(&self, x: ObjRef) -> HeapResult<Repr> {
        self.registry.repr(self.object(x)?.class)
    }

    /// Logically valid element count.
    pub fn length(&self, x: ObjRef) -> HeapResult<usize> {
        Ok(self.object(x)?.length)
    }

    /// Allocated element count.
    pub fn capacity_of(&self, x: ObjRef) -> HeapResult<usize> {
        Ok(self.object(x)?.capacity())
    }

    /// The object's attribute link, if any.
    pub fn attribute_of(&self, x: ObjRef) -> HeapResult<Option<ObjRef>> {
        Ok(self.object(x)?.attribute)
    }

    /// Number of objects currently recorded in the global table.
    pub fn live_objects(&self) -> usize {
        self.global
            .and_then(|t| self.length(t).ok())
            .unwrap_or(0)
    }
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}

//! Memory reporting over the global ledger.

use crate::error::HeapResult;
use crate::heap::Heap;
use crate::object::ObjRef;
use std::fmt;

/// One tracked object in a [`HeapReport`].
#[derive(Debug, Clone)]
pub struct ReportRow {
    /// Position in the global ledger.
    pub index: usize,
    /// The object itself.
    pub obj: ObjRef,
    /// Registry name of the object's class.
    pub class_name: String,
    /// Valid element count.
    pub length: usize,
    /// Allocated element count.
    pub capacity: usize,
    /// Bytes per element.
    pub elem_size: usize,
    /// Header plus buffer footprint.
    pub bytes: usize,
}

/// Snapshot of every tracked object, in ledger order.
#[derive(Debug, Clone)]
pub struct HeapReport {
    /// One row per tracked object.
    pub rows: Vec<ReportRow>,
    /// Allocated capacity of the global ledger.
    pub table_capacity: usize,
    /// Number of ledger entries.
    pub table_length: usize,
    /// Sum of all row footprints.
    pub total_bytes: usize,
}

impl Heap {
    /// Snapshot the tracked objects and their memory footprint.
    ///
    /// Bookkeeping tables are not included; only objects in the global
    /// ledger appear.
    pub fn report(&self) -> HeapResult<HeapReport> {
        let Some(global) = self.global else {
            return Ok(HeapReport {
                rows: Vec::new(),
                table_capacity: 0,
                table_length: 0,
                total_bytes: 0,
            });
        };

        let mut rows = Vec::new();
        let mut total_bytes = 0;
        for (index, entry) in self.as_slice::<Option<ObjRef>>(global)?.iter().enumerate() {
            let Some(obj) = *entry else { continue };
            let object = self.object(obj)?;
            let bytes = object.byte_size();
            rows.push(ReportRow {
                index,
                obj,
                class_name: self.registry().name(object.class)?.to_string(),
                length: object.length,
                capacity: object.capacity(),
                elem_size: self.registry().elem_size(object.class)?,
                bytes,
            });
            total_bytes += bytes;
        }

        Ok(HeapReport {
            rows,
            table_capacity: self.capacity_of(global)?,
            table_length: self.length(global)?,
            total_bytes,
        })
    }
}

impl fmt::Display for HeapReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "object table: length [{}], capacity [{}], total [{} bytes]",
            self.table_length, self.table_capacity, self.total_bytes
        )?;
        for row in &self.rows {
            writeln!(
                f,
                "  [{:>4}] {:>8} {:<10} length [{:>8}] capacity [{:>8}] x {:>2} bytes [{:>10}]",
                row.index,
                format!("{}@{}", row.obj.index, row.obj.generation),
                row.class_name,
                row.length,
                row.capacity,
                row.elem_size,
                row.bytes,
            )?;
        }
        Ok(())
    }
}

//! Named attributes.
//!
//! An object's attribute link points at a two-element LIST pair: element
//! 0 is a LIST of CHAR name objects, element 1 a LIST of values, kept
//! pairwise in insertion order. Lookup is a linear scan; attribute sets
//! are expected to stay small. All four structural objects live in the
//! global ledger, so attributes keep their values reachable.

use crate::class::ClassId;
use crate::error::{HeapError, HeapResult};
use crate::heap::Heap;
use crate::object::ObjRef;

impl Heap {
    fn attr_tables(&self, x: ObjRef) -> HeapResult<Option<(ObjRef, ObjRef)>> {
        let Some(pair) = self.object(x)?.attribute else {
            return Ok(None);
        };
        let names = self.extract::<Option<ObjRef>>(pair, 0)?;
        let values = self.extract::<Option<ObjRef>>(pair, 1)?;
        match (names, values) {
            (Some(names), Some(values)) => Ok(Some((names, values))),
            _ => Err(HeapError::UnexpectedNullPointer),
        }
    }

    fn attr_index(&self, names: ObjRef, name: &str) -> HeapResult<Option<usize>> {
        let entries = self.as_slice::<Option<ObjRef>>(names)?;
        for (i, entry) in entries.iter().enumerate() {
            let Some(n) = entry else { continue };
            if self.as_slice::<u8>(*n)? == name.as_bytes() {
                return Ok(Some(i));
            }
        }
        Ok(None)
    }

    /// True if `x` carries an attribute under `name`.
    pub fn has_attr(&self, x: ObjRef, name: &str) -> HeapResult<bool> {
        match self.attr_tables(x)? {
            Some((names, _)) => Ok(self.attr_index(names, name)?.is_some()),
            None => Ok(false),
        }
    }

    /// The value stored under `name`.
    pub fn get_attr(&self, x: ObjRef, name: &str) -> HeapResult<ObjRef> {
        if let Some((names, values)) = self.attr_tables(x)? {
            if let Some(idx) = self.attr_index(names, name)? {
                if let Some(value) = self.extract::<Option<ObjRef>>(values, idx as i32)? {
                    return Ok(value);
                }
            }
        }
        Err(HeapError::AttributeNotFound {
            name: name.to_string(),
        })
    }

    /// Names of all attributes of `x`, in insertion order.
    pub fn attr_names(&self, x: ObjRef) -> HeapResult<Vec<String>> {
        let Some((names, _)) = self.attr_tables(x)? else {
            return Ok(Vec::new());
        };
        let mut out = Vec::new();
        for entry in self.as_slice::<Option<ObjRef>>(names)? {
            if let Some(n) = entry {
                out.push(String::from_utf8_lossy(self.as_slice::<u8>(*n)?).into_owned());
            }
        }
        Ok(out)
    }

    /// Store `value` under `name`, replacing any existing binding.
    ///
    /// Allocation failure while building the attribute structures rolls
    /// back every object created for this call; `x` is left exactly as
    /// it was.
    pub fn set_attr(&mut self, x: ObjRef, name: &str, value: ObjRef) -> HeapResult<()> {
        self.object(x)?;
        self.object(value)?;

        if let Some((names, values)) = self.attr_tables(x)? {
            if let Some(idx) = self.attr_index(names, name)? {
                return self.set(values, idx as i32, Some(value));
            }
            let name_obj = self.new_from_slice(ClassId::CHAR, name.as_bytes())?;
            if let Err(e) = self.push_attr(names, values, name_obj, value) {
                self.discard(name_obj);
                return Err(e);
            }
            return Ok(());
        }

        let name_obj = self.new_from_slice(ClassId::CHAR, name.as_bytes())?;
        match self.new_attr_pair(name_obj, value) {
            Ok(pair) => {
                // The link is set last, after the pair is fully built.
                self.object_mut(x)?.attribute = Some(pair);
                Ok(())
            }
            Err(e) => {
                self.discard(name_obj);
                Err(e)
            }
        }
    }

    fn push_attr(
        &mut self,
        names: ObjRef,
        values: ObjRef,
        name_obj: ObjRef,
        value: ObjRef,
    ) -> HeapResult<()> {
        // Reserve both lists up front so neither append can fail after
        // the first has landed.
        let n = self.length(names)?;
        self.reserve(names, n + 1)?;
        let v = self.length(values)?;
        self.reserve(values, v + 1)?;
        self.append(names, name_obj)?;
        self.append(values, value)
    }

    fn new_attr_pair(&mut self, name_obj: ObjRef, value: ObjRef) -> HeapResult<ObjRef> {
        let names = self.new_object(ClassId::LIST, 1)?;
        let values = match self.new_object(ClassId::LIST, 1) {
            Ok(v) => v,
            Err(e) => {
                self.discard(names);
                return Err(e);
            }
        };
        let pair = match self.new_object(ClassId::LIST, 2) {
            Ok(p) => p,
            Err(e) => {
                self.discard(values);
                self.discard(names);
                return Err(e);
            }
        };
        if let Err(e) = self.fill_attr_pair(pair, names, values, name_obj, value) {
            self.discard(pair);
            self.discard(values);
            self.discard(names);
            return Err(e);
        }
        Ok(pair)
    }

    fn fill_attr_pair(
        &mut self,
        pair: ObjRef,
        names: ObjRef,
        values: ObjRef,
        name_obj: ObjRef,
        value: ObjRef,
    ) -> HeapResult<()> {
        self.append(names, name_obj)?;
        self.append(values, value)?;
        self.append(pair, names)?;
        self.append(pair, values)
    }

    /// Drop the binding under `name`. No-op if absent.
    pub fn remove_attr(&mut self, x: ObjRef, name: &str) -> HeapResult<()> {
        let Some((names, values)) = self.attr_tables(x)? else {
            return Ok(());
        };
        let Some(idx) = self.attr_index(names, name)? else {
            return Ok(());
        };
        self.remove(names, idx as i32, idx as i32)?;
        self.remove(values, idx as i32, idx as i32)
    }
}

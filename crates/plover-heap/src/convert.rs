//! Numeric coercions between the scalar representations.
//!
//! Every conversion produces a fresh object of the target built-in
//! class. NA converts to the target's NA, and so does any value the
//! target cannot represent; conversion never errors on values, only on
//! non-numeric sources.

use crate::class::{ClassId, Repr};
use crate::error::{HeapError, HeapResult};
use crate::heap::Heap;
use crate::object::{CHAR_NA, DOUBLE_NA, Element, INT_NA, LONG_NA, ObjRef};

fn numeric_err(expected: Repr, actual: Repr) -> HeapError {
    HeapError::InvalidClass { expected, actual }
}

impl Heap {
    /// Coerce to a fresh CHAR object. Values outside `[0, 255]` become NA.
    pub fn as_char(&mut self, x: ObjRef) -> HeapResult<ObjRef> {
        let out: Vec<u8> = match self.repr_of(x)? {
            Repr::Char => self.as_slice::<u8>(x)?.to_vec(),
            Repr::Int => self
                .as_slice::<i32>(x)?
                .iter()
                .map(|&v| {
                    if v.is_na() || !(0..=255).contains(&v) {
                        CHAR_NA
                    } else {
                        v as u8
                    }
                })
                .collect(),
            Repr::Long => self
                .as_slice::<i64>(x)?
                .iter()
                .map(|&v| {
                    if v.is_na() || !(0..=255).contains(&v) {
                        CHAR_NA
                    } else {
                        v as u8
                    }
                })
                .collect(),
            Repr::Double => self
                .as_slice::<f64>(x)?
                .iter()
                .map(|&v| {
                    if v.is_nan() || !(0.0..=255.0).contains(&v) {
                        CHAR_NA
                    } else {
                        v as u8
                    }
                })
                .collect(),
            actual => return Err(numeric_err(Repr::Char, actual)),
        };
        self.new_from_slice(ClassId::CHAR, &out)
    }

    /// Coerce to a fresh INT object. Out-of-range values become NA;
    /// doubles are truncated toward zero.
    pub fn as_int(&mut self, x: ObjRef) -> HeapResult<ObjRef> {
        let out: Vec<i32> = match self.repr_of(x)? {
            Repr::Char => self
                .as_slice::<u8>(x)?
                .iter()
                .map(|&v| if v.is_na() { INT_NA } else { i32::from(v) })
                .collect(),
            Repr::Int => self.as_slice::<i32>(x)?.to_vec(),
            Repr::Long => self
                .as_slice::<i64>(x)?
                .iter()
                .map(|&v| {
                    if v.is_na() || v < i64::from(i32::MIN) || v >= i64::from(i32::MAX) {
                        INT_NA
                    } else {
                        v as i32
                    }
                })
                .collect(),
            Repr::Double => self
                .as_slice::<f64>(x)?
                .iter()
                .map(|&v| {
                    if v.is_nan() || v < f64::from(i32::MIN) || v >= f64::from(i32::MAX) {
                        INT_NA
                    } else {
                        v as i32
                    }
                })
                .collect(),
            actual => return Err(numeric_err(Repr::Int, actual)),
        };
        self.new_from_slice(ClassId::INT, &out)
    }

    /// Coerce to a fresh LONG object. Out-of-range doubles become NA.
    pub fn as_long(&mut self, x: ObjRef) -> HeapResult<ObjRef> {
        let out: Vec<i64> = match self.repr_of(x)? {
            Repr::Char => self
                .as_slice::<u8>(x)?
                .iter()
                .map(|&v| if v.is_na() { LONG_NA } else { i64::from(v) })
                .collect(),
            Repr::Int => self
                .as_slice::<i32>(x)?
                .iter()
                .map(|&v| if v.is_na() { LONG_NA } else { i64::from(v) })
                .collect(),
            Repr::Long => self.as_slice::<i64>(x)?.to_vec(),
            Repr::Double => self
                .as_slice::<f64>(x)?
                .iter()
                .map(|&v| {
                    // i64::MAX is not exactly representable as f64; the
                    // comparison below uses the next power of two.
                    if v.is_nan() || v < -(2f64.powi(63)) || v >= 2f64.powi(63) {
                        LONG_NA
                    } else {
                        v as i64
                    }
                })
                .collect(),
            actual => return Err(numeric_err(Repr::Long, actual)),
        };
        self.new_from_slice(ClassId::LONG, &out)
    }

    /// Coerce to a fresh DOUBLE object.
    pub fn as_double(&mut self, x: ObjRef) -> HeapResult<ObjRef> {
        let out: Vec<f64> = match self.repr_of(x)? {
            Repr::Char => self
                .as_slice::<u8>(x)?
                .iter()
                .map(|&v| if v.is_na() { DOUBLE_NA } else { f64::from(v) })
                .collect(),
            Repr::Int => self
                .as_slice::<i32>(x)?
                .iter()
                .map(|&v| if v.is_na() { DOUBLE_NA } else { f64::from(v) })
                .collect(),
            Repr::Long => self
                .as_slice::<i64>(x)?
                .iter()
                .map(|&v| if v.is_na() { DOUBLE_NA } else { v as f64 })
                .collect(),
            Repr::Double => self.as_slice::<f64>(x)?.to_vec(),
            actual => return Err(numeric_err(Repr::Double, actual)),
        };
        self.new_from_slice(ClassId::DOUBLE, &out)
    }
}

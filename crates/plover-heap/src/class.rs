//! Class metadata: identities, element layout, inheritance.

use crate::error::{HeapError, HeapResult};
use crate::object::{ExternalRef, ObjRef};
use std::fmt;

/// Identity of a class in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassId(pub u32);

impl ClassId {
    /// Byte vector.
    pub const CHAR: ClassId = ClassId(0);
    /// 32-bit integer vector.
    pub const INT: ClassId = ClassId(1);
    /// 64-bit integer vector.
    pub const LONG: ClassId = ClassId(2);
    /// 64-bit float vector.
    pub const DOUBLE: ClassId = ClassId(3);
    /// Vector of object references.
    pub const LIST: ClassId = ClassId(4);
    /// Vector of opaque embedder handles.
    pub const EXTERNAL: ClassId = ClassId(5);
}

/// Physical layout of a class's elements.
///
/// Every class resolves to one of these through its inheritance chain;
/// the representation type decides buffer layout, the NA sentinel, and
/// whether the collector scans the elements for references.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repr {
    /// Raw bytes.
    Char,
    /// 32-bit integers.
    Int,
    /// 64-bit integers.
    Long,
    /// 64-bit floats.
    Double,
    /// Object references (scanned during tracing).
    List,
    /// Opaque external handles (never scanned).
    External,
}

impl Repr {
    /// The built-in class carrying this representation.
    pub fn class(self) -> ClassId {
        match self {
            Repr::Char => ClassId::CHAR,
            Repr::Int => ClassId::INT,
            Repr::Long => ClassId::LONG,
            Repr::Double => ClassId::DOUBLE,
            Repr::List => ClassId::LIST,
            Repr::External => ClassId::EXTERNAL,
        }
    }

    /// True if buffers of this representation hold references the
    /// collector must trace.
    pub fn scanned(self) -> bool {
        matches!(self, Repr::List)
    }

    /// In-memory size of one element.
    pub fn elem_size(self) -> usize {
        match self {
            Repr::Char => size_of::<u8>(),
            Repr::Int => size_of::<i32>(),
            Repr::Long => size_of::<i64>(),
            Repr::Double => size_of::<f64>(),
            Repr::List => size_of::<Option<ObjRef>>(),
            Repr::External => size_of::<Option<ExternalRef>>(),
        }
    }
}

impl fmt::Display for Repr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Repr::Char => "CHAR",
            Repr::Int => "INT",
            Repr::Long => "LONG",
            Repr::Double => "DOUBLE",
            Repr::List => "LIST",
            Repr::External => "EXTERNAL",
        };
        f.write_str(name)
    }
}

struct ClassDef {
    name: String,
    parent: Option<ClassId>,
}

/// Static class metadata: names, parent links, element layout.
///
/// The six built-in classes are always present. Derived classes may be
/// defined while the registry is being assembled; descriptors are
/// immutable once the heap takes ownership of the registry.
pub struct ClassRegistry {
    classes: Vec<ClassDef>,
}

impl ClassRegistry {
    /// Registry holding only the six built-in classes.
    pub fn new() -> Self {
        let builtin = ["CHAR", "INT", "LONG", "DOUBLE", "LIST", "EXTERNAL"];
        Self {
            classes: builtin
                .iter()
                .map(|&name| ClassDef {
                    name: name.to_string(),
                    parent: None,
                })
                .collect(),
        }
    }

    /// Number of defined classes.
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Always false; the built-ins are never removed.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Define a derived class. The parent must already exist.
    pub fn define(&mut self, name: impl Into<String>, parent: ClassId) -> HeapResult<ClassId> {
        self.check(parent)?;
        let id = ClassId(self.classes.len() as u32);
        self.classes.push(ClassDef {
            name: name.into(),
            parent: Some(parent),
        });
        Ok(id)
    }

    fn check(&self, class: ClassId) -> HeapResult<()> {
        if (class.0 as usize) < self.classes.len() {
            Ok(())
        } else {
            Err(HeapError::UndefinedClass(class.0))
        }
    }

    /// Display name of a class.
    pub fn name(&self, class: ClassId) -> HeapResult<&str> {
        self.check(class)?;
        Ok(&self.classes[class.0 as usize].name)
    }

    /// Terminal ancestor of the inheritance chain.
    pub fn type_of(&self, class: ClassId) -> HeapResult<ClassId> {
        self.check(class)?;
        let mut current = class;
        while let Some(parent) = self.classes[current.0 as usize].parent {
            current = parent;
        }
        Ok(current)
    }

    /// Representation type of a class (layout of its terminal ancestor).
    pub fn repr(&self, class: ClassId) -> HeapResult<Repr> {
        let root = self.type_of(class)?;
        Ok(match root {
            ClassId::CHAR => Repr::Char,
            ClassId::INT => Repr::Int,
            ClassId::LONG => Repr::Long,
            ClassId::DOUBLE => Repr::Double,
            ClassId::LIST => Repr::List,
            _ => Repr::External,
        })
    }

    /// In-memory size of one element of a class.
    pub fn elem_size(&self, class: ClassId) -> HeapResult<usize> {
        Ok(self.repr(class)?.elem_size())
    }

    /// True if walking `derived`'s parent chain reaches `base`.
    pub fn inherits(&self, derived: ClassId, base: ClassId) -> HeapResult<bool> {
        self.check(derived)?;
        self.check(base)?;
        let mut current = derived;
        loop {
            if current == base {
                return Ok(true);
            }
            match self.classes[current.0 as usize].parent {
                Some(parent) => current = parent,
                None => return Ok(false),
            }
        }
    }
}

impl Default for ClassRegistry {
    fn default() -> Self {
        Self::new()
    }
}

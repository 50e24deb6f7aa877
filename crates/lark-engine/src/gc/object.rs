//! Heap object representation.
//!
//! Only composite values live on the heap. Scalars, strings and function
//! references are stored inline in [`Value`](crate::runtime::value::Value).

use std::collections::BTreeMap;
use std::fmt;

use crate::runtime::value::Value;

/// A handle to an object in the heap arena.
///
/// The generation guards against stale handles: once the slot is reclaimed
/// and reused, the old handle no longer resolves.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GcRef {
    index: u32,
    generation: u32,
}

impl GcRef {
    /// Creates a handle for the given slot and generation.
    #[inline]
    pub(crate) fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Returns the arena slot this handle points at.
    #[inline]
    pub fn index(&self) -> usize {
        self.index as usize
    }

    /// Returns the generation this handle was issued for.
    #[inline]
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for GcRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GcRef({}#{})", self.index, self.generation)
    }
}

/// A garbage-collected composite.
#[derive(Debug, Clone, PartialEq)]
pub enum HeapObject {
    /// Ordered sequence of values
    Array(Vec<Value>),
    /// String-keyed map, iterated in key order
    Map(BTreeMap<String, Value>),
}

impl HeapObject {
    /// Returns the number of elements or entries.
    pub fn len(&self) -> usize {
        match self {
            HeapObject::Array(elements) => elements.len(),
            HeapObject::Map(entries) => entries.len(),
        }
    }

    /// Returns true if the object holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Trait for objects that hold references to other heap objects.
pub trait GcTrace {
    /// Pushes every heap reference held directly by this object.
    fn trace_refs(&self, gray: &mut Vec<GcRef>);
}

impl GcTrace for HeapObject {
    fn trace_refs(&self, gray: &mut Vec<GcRef>) {
        match self {
            HeapObject::Array(elements) => {
                gray.extend(elements.iter().filter_map(Value::heap_ref));
            }
            HeapObject::Map(entries) => {
                gray.extend(entries.values().filter_map(Value::heap_ref));
            }
        }
    }
}

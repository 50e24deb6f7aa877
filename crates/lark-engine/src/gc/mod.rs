//! Garbage-collected heap for arrays and maps.
//!
//! Collection is a stop-the-world mark-sweep:
//! - Mark walks a gray worklist seeded from the roots, so cyclic structures
//!   terminate and deep nesting never recurses.
//! - Sweep is one pass over the arena that frees unmarked objects and clears
//!   the marks of survivors.
//!
//! The VM decides when to collect (once per function return) and what the
//! roots are. The heap only knows how to trace and reclaim.

mod arena;
mod object;

pub use arena::Arena;
pub use object::{GcRef, GcTrace, HeapObject};

use std::collections::BTreeMap;

use tracing::debug;

use crate::runtime::value::Value;

/// Counters describing heap activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeapStats {
    /// Objects currently allocated
    pub live_objects: usize,
    /// Objects allocated since the heap was created
    pub total_allocations: usize,
    /// Completed collection cycles
    pub collections: usize,
    /// Objects reclaimed across all cycles
    pub reclaimed: usize,
}

/// The garbage-collected heap.
#[derive(Debug, Default)]
pub struct Heap {
    arena: Arena,
    stats: HeapStats,
    gray: Vec<GcRef>,
}

impl Heap {
    /// Creates an empty heap.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates an object and returns its handle.
    pub fn allocate(&mut self, object: HeapObject) -> GcRef {
        self.stats.total_allocations += 1;
        self.arena.allocate(object)
    }

    /// Allocates an array and returns it as a value.
    pub fn alloc_array(&mut self, elements: Vec<Value>) -> Value {
        Value::Array(self.allocate(HeapObject::Array(elements)))
    }

    /// Allocates a map and returns it as a value.
    pub fn alloc_map(&mut self, entries: BTreeMap<String, Value>) -> Value {
        Value::Map(self.allocate(HeapObject::Map(entries)))
    }

    /// Resolves a handle.
    pub fn get(&self, handle: GcRef) -> Option<&HeapObject> {
        self.arena.get(handle)
    }

    /// Returns the elements of an array.
    pub fn array(&self, handle: GcRef) -> Option<&Vec<Value>> {
        match self.arena.get(handle)? {
            HeapObject::Array(elements) => Some(elements),
            HeapObject::Map(_) => None,
        }
    }

    /// Returns the elements of an array, mutably.
    pub fn array_mut(&mut self, handle: GcRef) -> Option<&mut Vec<Value>> {
        match self.arena.get_mut(handle)? {
            HeapObject::Array(elements) => Some(elements),
            HeapObject::Map(_) => None,
        }
    }

    /// Returns the entries of a map.
    pub fn map(&self, handle: GcRef) -> Option<&BTreeMap<String, Value>> {
        match self.arena.get(handle)? {
            HeapObject::Map(entries) => Some(entries),
            HeapObject::Array(_) => None,
        }
    }

    /// Returns the entries of a map, mutably.
    pub fn map_mut(&mut self, handle: GcRef) -> Option<&mut BTreeMap<String, Value>> {
        match self.arena.get_mut(handle)? {
            HeapObject::Map(entries) => Some(entries),
            HeapObject::Array(_) => None,
        }
    }

    /// Returns whether a handle still refers to a live object.
    pub fn contains(&self, handle: GcRef) -> bool {
        self.arena.get(handle).is_some()
    }

    /// Returns whether the object is marked. Outside a collection this is
    /// always false.
    pub fn is_marked(&self, handle: GcRef) -> bool {
        self.arena.is_marked(handle)
    }

    /// Runs a full mark-sweep cycle over the given roots.
    ///
    /// Returns the number of objects reclaimed.
    pub fn collect<'a, I>(&mut self, roots: I) -> usize
    where
        I: IntoIterator<Item = &'a Value>,
    {
        let mut gray = std::mem::take(&mut self.gray);
        gray.extend(roots.into_iter().filter_map(Value::heap_ref));

        while let Some(handle) = gray.pop() {
            if self.arena.mark(handle) {
                if let Some(object) = self.arena.get(handle) {
                    object.trace_refs(&mut gray);
                }
            }
        }
        self.gray = gray;

        let reclaimed = self.arena.sweep();
        self.stats.collections += 1;
        self.stats.reclaimed += reclaimed;

        debug!(
            reclaimed,
            live = self.arena.len(),
            cycle = self.stats.collections,
            "gc cycle finished"
        );

        reclaimed
    }

    /// Returns the number of live objects.
    pub fn live_objects(&self) -> usize {
        self.arena.len()
    }

    /// Returns a snapshot of the heap counters.
    pub fn stats(&self) -> HeapStats {
        HeapStats {
            live_objects: self.arena.len(),
            ..self.stats
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unreachable_objects_are_reclaimed() {
        let mut heap = Heap::new();
        let kept = heap.alloc_array(vec![Value::Number(1.0)]);
        heap.alloc_array(Vec::new());
        heap.alloc_map(BTreeMap::new());

        let reclaimed = heap.collect([&kept]);

        assert_eq!(reclaimed, 2);
        assert_eq!(heap.live_objects(), 1);
    }

    #[test]
    fn test_nested_objects_survive() {
        let mut heap = Heap::new();
        let inner = heap.alloc_array(vec![Value::Number(2.0)]);
        let mut entries = BTreeMap::new();
        entries.insert("inner".to_string(), inner.clone());
        let outer = heap.alloc_map(entries);

        assert_eq!(heap.collect([&outer]), 0);

        let handle = inner.heap_ref().unwrap();
        assert_eq!(heap.array(handle), Some(&vec![Value::Number(2.0)]));
    }

    #[test]
    fn test_cycles_terminate_and_are_reclaimed() {
        let mut heap = Heap::new();
        let a = heap.alloc_array(Vec::new());
        let b = heap.alloc_array(vec![a.clone()]);
        let a_ref = a.heap_ref().unwrap();
        heap.array_mut(a_ref).unwrap().push(b.clone());

        // Reachable cycle: marking must terminate and keep both.
        assert_eq!(heap.collect([&a]), 0);
        assert_eq!(heap.live_objects(), 2);

        // Unreachable cycle: both go.
        assert_eq!(heap.collect(std::iter::empty::<&Value>()), 2);
        assert_eq!(heap.live_objects(), 0);
    }

    #[test]
    fn test_marks_cleared_after_collection() {
        let mut heap = Heap::new();
        let value = heap.alloc_array(Vec::new());

        heap.collect([&value]);

        assert!(!heap.is_marked(value.heap_ref().unwrap()));
    }

    #[test]
    fn test_scalars_are_not_roots_of_anything() {
        let mut heap = Heap::new();
        heap.alloc_array(Vec::new());

        let roots = [Value::Number(1.0), Value::String("a".into()), Value::Null];
        assert_eq!(heap.collect(roots.iter()), 1);
    }

    #[test]
    fn test_stats() {
        let mut heap = Heap::new();
        let kept = heap.alloc_array(Vec::new());
        heap.alloc_array(Vec::new());
        heap.collect([&kept]);

        let stats = heap.stats();
        assert_eq!(stats.live_objects, 1);
        assert_eq!(stats.total_allocations, 2);
        assert_eq!(stats.collections, 1);
        assert_eq!(stats.reclaimed, 1);
    }

    #[test]
    fn test_typed_accessors() {
        let mut heap = Heap::new();
        let array = heap.alloc_array(Vec::new()).heap_ref().unwrap();
        let map = heap.alloc_map(BTreeMap::new()).heap_ref().unwrap();

        assert!(heap.array(array).is_some());
        assert!(heap.map(array).is_none());
        assert!(heap.map(map).is_some());
        assert!(heap.array_mut(map).is_none());
    }
}

//! Slot arena backing the garbage-collected heap.
//!
//! Objects are addressed by [`GcRef`] handles. Freed slots go on a free list
//! and have their generation bumped, so handles to a reclaimed object stop
//! resolving even after the slot is reused.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ slot 0  gen 0  [Array]        marked=false   │
//! │ slot 1  gen 3  <free>  ──┐                   │
//! │ slot 2  gen 0  [Map]          marked=false   │
//! │ slot 3  gen 1  <free>  ◄─┘  free list        │
//! └──────────────────────────────────────────────┘
//! ```

use super::object::{GcRef, HeapObject};

/// One arena slot: the object (if occupied) plus its GC metadata.
#[derive(Debug)]
struct Slot {
    generation: u32,
    marked: bool,
    object: Option<HeapObject>,
}

/// Handle-indexed storage for heap objects.
#[derive(Debug, Default)]
pub struct Arena {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
}

impl Arena {
    /// Creates an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores an object and returns its handle.
    pub fn allocate(&mut self, object: HeapObject) -> GcRef {
        self.live += 1;

        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.object = Some(object);
            slot.marked = false;
            return GcRef::new(index, slot.generation);
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            marked: false,
            object: Some(object),
        });
        GcRef::new(index, 0)
    }

    fn slot(&self, handle: GcRef) -> Option<&Slot> {
        self.slots
            .get(handle.index())
            .filter(|slot| slot.generation == handle.generation() && slot.object.is_some())
    }

    fn slot_mut(&mut self, handle: GcRef) -> Option<&mut Slot> {
        self.slots
            .get_mut(handle.index())
            .filter(|slot| slot.generation == handle.generation() && slot.object.is_some())
    }

    /// Resolves a handle.
    #[inline]
    pub fn get(&self, handle: GcRef) -> Option<&HeapObject> {
        self.slot(handle).and_then(|slot| slot.object.as_ref())
    }

    /// Resolves a handle mutably.
    #[inline]
    pub fn get_mut(&mut self, handle: GcRef) -> Option<&mut HeapObject> {
        self.slot_mut(handle).and_then(|slot| slot.object.as_mut())
    }

    /// Sets the mark bit. Returns `true` only on the first mark of this cycle,
    /// so callers trace each object once.
    pub fn mark(&mut self, handle: GcRef) -> bool {
        match self.slot_mut(handle) {
            Some(slot) if !slot.marked => {
                slot.marked = true;
                true
            }
            _ => false,
        }
    }

    /// Returns whether the object is currently marked.
    pub fn is_marked(&self, handle: GcRef) -> bool {
        self.slot(handle).is_some_and(|slot| slot.marked)
    }

    /// Frees every unmarked object and clears the marks of survivors.
    ///
    /// Returns the number of objects reclaimed.
    pub fn sweep(&mut self) -> usize {
        let mut reclaimed = 0;

        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.object.is_none() {
                continue;
            }
            if slot.marked {
                slot.marked = false;
            } else {
                slot.object = None;
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(index as u32);
                reclaimed += 1;
            }
        }

        self.live -= reclaimed;
        reclaimed
    }

    /// Returns the number of live objects.
    #[inline]
    pub fn len(&self) -> usize {
        self.live
    }

    /// Returns true if no objects are live.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Returns the number of slots, occupied or free.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
}

//! Scope management for variable resolution during compilation.
//!
//! Each function gets a stack of blocks. A block maps names to frame slots
//! and remembers the next free slot; leaving a block frees its slots for
//! reuse by sibling blocks, but the function's slot count only ever grows.

use rustc_hash::FxHashMap;

/// One lexical block.
#[derive(Debug, Default)]
struct Block {
    names: FxHashMap<String, usize>,
    next_slot: usize,
}

/// Slot allocator and name resolver for one function at a time.
#[derive(Debug, Default)]
pub struct Scope {
    blocks: Vec<Block>,
    local_size: usize,
}

impl Scope {
    /// Creates a new scope.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resets for a new function body with a single empty block.
    pub fn begin_function(&mut self) {
        self.blocks.clear();
        self.blocks.push(Block::default());
        self.local_size = 0;
    }

    /// Begin a nested block.
    pub fn begin_scope(&mut self) {
        let next_slot = self.blocks.last().map_or(0, |block| block.next_slot);
        self.blocks.push(Block {
            names: FxHashMap::default(),
            next_slot,
        });
    }

    /// End the innermost block, releasing its names and slots.
    pub fn end_scope(&mut self) {
        self.blocks.pop();
    }

    /// Declare a local in the innermost block and return its slot.
    ///
    /// Redeclaring a name in the same block shadows it with a fresh slot.
    pub fn declare(&mut self, name: &str) -> usize {
        if self.blocks.is_empty() {
            self.blocks.push(Block::default());
        }
        let innermost = self.blocks.len() - 1;
        let block = &mut self.blocks[innermost];

        let slot = block.next_slot;
        block.next_slot += 1;
        block.names.insert(name.to_string(), slot);
        self.local_size = self.local_size.max(block.next_slot);
        slot
    }

    /// Resolve a name, innermost block first.
    pub fn resolve(&self, name: &str) -> Option<usize> {
        self.blocks
            .iter()
            .rev()
            .find_map(|block| block.names.get(name).copied())
    }

    /// Peak number of simultaneously live locals in the current function.
    pub fn local_size(&self) -> usize {
        self.local_size
    }

    /// Current nesting depth (1 inside a function body).
    pub fn depth(&self) -> usize {
        self.blocks.len()
    }
}

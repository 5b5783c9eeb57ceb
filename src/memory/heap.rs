//! Heap implementation for the checked memory model
//!
//! This module provides heap memory management with:
//! - Explicit allocation/release (`new`/`delete`)
//! - Tombstone tracking for released blocks
//! - Per-cell initialization tracking
//! - Use-after-free, double-free and invalid-free detection
//! - A reachability scan that reports leaked blocks
//!
//! Blocks are measured in cells rather than bytes: a list node is a two-cell
//! block (`[value, next]`), a heap `int` a one-cell block. Every cell holds a
//! [`Value`], so pointers stored on the heap stay visible to the leak scan.

use super::value::{Address, Value};
use crate::machine::constants::{CELL_SIZE, HEAP_ADDRESS_START};
use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;

/// Failures reported by the heap itself. The machine lifts these into
/// `RuntimeError` together with the statement that caused them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HeapError {
    #[error("out of memory: requested {requested} cells, {in_use} in use, limit is {limit}")]
    OutOfMemory {
        requested: usize,
        in_use: usize,
        limit: usize,
    },

    #[error("double free detected at address 0x{0:x}")]
    DoubleFree(Address),

    #[error("invalid free: address 0x{0:x} was never allocated")]
    InvalidFree(Address),

    #[error("use-after-free: address 0x{0:x} has been freed")]
    UseAfterFree(Address),

    #[error("invalid pointer: address 0x{0:x} not allocated")]
    NotAllocated(Address),

    #[error("buffer overrun: cell {index} out of bounds for block of {size} cells")]
    OutOfBounds { index: usize, size: usize },

    #[error("uninitialized read at address 0x{0:x}")]
    Uninitialized(Address),
}

/// State of a heap block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockState {
    Allocated,
    Tombstone, // Released but kept so later uses can be recognized
}

/// What a block was allocated as
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Int,
    Node,
}

impl BlockKind {
    /// Number of cells a block of this kind occupies
    pub fn cells(self) -> usize {
        match self {
            BlockKind::Int => 1,
            BlockKind::Node => 2,
        }
    }
}

/// A block of heap memory
#[derive(Debug, Clone)]
pub struct HeapBlock {
    pub cells: Vec<Value>,
    pub kind: BlockKind,
    pub state: BlockState,
}

impl HeapBlock {
    pub fn new(kind: BlockKind) -> Self {
        HeapBlock {
            cells: vec![Value::Uninitialized; kind.cells()],
            kind,
            state: BlockState::Allocated,
        }
    }

    pub fn size(&self) -> usize {
        self.cells.len()
    }

    pub fn is_live(&self) -> bool {
        self.state == BlockState::Allocated
    }

    fn cell(&self, index: usize) -> Result<&Value, HeapError> {
        self.cells.get(index).ok_or(HeapError::OutOfBounds {
            index,
            size: self.size(),
        })
    }

    fn cell_mut(&mut self, index: usize) -> Result<&mut Value, HeapError> {
        let size = self.size();
        self.cells
            .get_mut(index)
            .ok_or(HeapError::OutOfBounds { index, size })
    }
}

/// The heap
#[derive(Debug, Clone)]
pub struct Heap {
    allocations: FxHashMap<Address, HeapBlock>,
    next_address: Address,
    cells_in_use: usize,
    max_cells: usize,
}

impl Heap {
    /// Create a new heap with a maximum number of live cells
    pub fn new(max_cells: usize) -> Self {
        Heap {
            allocations: FxHashMap::default(),
            next_address: HEAP_ADDRESS_START,
            cells_in_use: 0,
            max_cells,
        }
    }

    /// Allocate a block; every cell starts uninitialized
    pub fn allocate(&mut self, kind: BlockKind) -> Result<Address, HeapError> {
        let size = kind.cells();
        if self.cells_in_use + size > self.max_cells {
            return Err(HeapError::OutOfMemory {
                requested: size,
                in_use: self.cells_in_use,
                limit: self.max_cells,
            });
        }

        // Addresses are never reused, so a tombstone keeps its identity forever.
        let addr = self.next_address;
        self.next_address += size as u64 * CELL_SIZE;
        self.allocations.insert(addr, HeapBlock::new(kind));
        self.cells_in_use += size;

        Ok(addr)
    }

    /// Release a block (mark as tombstone)
    pub fn free(&mut self, addr: Address) -> Result<(), HeapError> {
        match self.allocations.get_mut(&addr) {
            Some(block) if block.is_live() => {
                block.state = BlockState::Tombstone;
                self.cells_in_use -= block.size();
                Ok(())
            }
            Some(_) => Err(HeapError::DoubleFree(addr)),
            None => Err(HeapError::InvalidFree(addr)),
        }
    }

    /// Get a live heap block (error if tombstone or never allocated)
    pub fn get_block(&self, addr: Address) -> Result<&HeapBlock, HeapError> {
        match self.allocations.get(&addr) {
            Some(block) if block.is_live() => Ok(block),
            Some(_) => Err(HeapError::UseAfterFree(addr)),
            None => Err(HeapError::NotAllocated(addr)),
        }
    }

    pub fn get_block_mut(&mut self, addr: Address) -> Result<&mut HeapBlock, HeapError> {
        match self.allocations.get_mut(&addr) {
            Some(block) if block.is_live() => Ok(block),
            Some(_) => Err(HeapError::UseAfterFree(addr)),
            None => Err(HeapError::NotAllocated(addr)),
        }
    }

    /// Read one cell of a live block; unwritten cells are reported
    pub fn read_cell(&self, addr: Address, index: usize) -> Result<Value, HeapError> {
        let cell = self.get_block(addr)?.cell(index)?;
        if !cell.is_initialized() {
            return Err(HeapError::Uninitialized(addr + index as u64 * CELL_SIZE));
        }
        Ok(cell.clone())
    }

    pub fn write_cell(&mut self, addr: Address, index: usize, value: Value) -> Result<(), HeapError> {
        *self.get_block_mut(addr)?.cell_mut(index)? = value;
        Ok(())
    }

    /// All blocks, tombstones included
    pub fn allocations(&self) -> &FxHashMap<Address, HeapBlock> {
        &self.allocations
    }

    /// Addresses of blocks that are still allocated, in allocation order
    pub fn live_blocks(&self) -> Vec<Address> {
        let mut live: Vec<Address> = self
            .allocations
            .iter()
            .filter(|(_, block)| block.is_live())
            .map(|(&addr, _)| addr)
            .collect();
        live.sort_unstable();
        live
    }

    /// Live blocks that cannot be reached from `roots` by following pointers
    /// stored in live blocks. With no roots this is every live block, which is
    /// what a leak checker reports once the program has returned.
    pub fn unreachable(&self, roots: &[Address]) -> Vec<Address> {
        let mut seen: FxHashSet<Address> = FxHashSet::default();
        let mut pending: Vec<Address> = roots.to_vec();

        while let Some(addr) = pending.pop() {
            let Some(block) = self.allocations.get(&addr) else {
                continue;
            };
            if !block.is_live() || !seen.insert(addr) {
                continue;
            }
            pending.extend(block.cells.iter().filter_map(|cell| match cell {
                Value::Pointer(target) => Some(*target),
                _ => None,
            }));
        }

        self.live_blocks()
            .into_iter()
            .filter(|addr| !seen.contains(addr))
            .collect()
    }

    /// Number of cells currently allocated
    pub fn cells_in_use(&self) -> usize {
        self.cells_in_use
    }
}

impl Default for Heap {
    fn default() -> Self {
        // 1 Mi cells
        Self::new(1024 * 1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_starts_uninitialized() {
        let mut heap = Heap::default();
        let addr = heap.allocate(BlockKind::Node).unwrap();

        assert_eq!(addr, HEAP_ADDRESS_START);
        assert_eq!(heap.cells_in_use(), 2);
        assert_eq!(heap.read_cell(addr, 0), Err(HeapError::Uninitialized(addr)));
    }

    #[test]
    fn test_addresses_are_not_reused() {
        let mut heap = Heap::default();
        let first = heap.allocate(BlockKind::Int).unwrap();
        heap.free(first).unwrap();
        let second = heap.allocate(BlockKind::Int).unwrap();

        assert_ne!(first, second);
    }

    #[test]
    fn test_second_free_is_double_free() {
        let mut heap = Heap::default();
        let addr = heap.allocate(BlockKind::Node).unwrap();

        assert_eq!(heap.free(addr), Ok(()));
        assert_eq!(heap.free(addr), Err(HeapError::DoubleFree(addr)));
        assert_eq!(heap.cells_in_use(), 0);
    }

    #[test]
    fn test_free_of_unknown_address() {
        let mut heap = Heap::default();
        assert_eq!(heap.free(0x40), Err(HeapError::InvalidFree(0x40)));
    }

    #[test]
    fn test_access_after_free() {
        let mut heap = Heap::default();
        let addr = heap.allocate(BlockKind::Int).unwrap();
        heap.write_cell(addr, 0, Value::Int(7)).unwrap();
        heap.free(addr).unwrap();

        assert_eq!(heap.read_cell(addr, 0), Err(HeapError::UseAfterFree(addr)));
        assert_eq!(
            heap.write_cell(addr, 0, Value::Int(8)),
            Err(HeapError::UseAfterFree(addr))
        );
    }

    #[test]
    fn test_cell_out_of_bounds() {
        let mut heap = Heap::default();
        let addr = heap.allocate(BlockKind::Int).unwrap();

        assert_eq!(
            heap.write_cell(addr, 1, Value::Int(0)),
            Err(HeapError::OutOfBounds { index: 1, size: 1 })
        );
    }

    #[test]
    fn test_out_of_memory() {
        let mut heap = Heap::new(3);
        heap.allocate(BlockKind::Node).unwrap();

        assert_eq!(
            heap.allocate(BlockKind::Node),
            Err(HeapError::OutOfMemory {
                requested: 2,
                in_use: 2,
                limit: 3
            })
        );
    }

    #[test]
    fn test_unreachable_follows_next_pointers() {
        let mut heap = Heap::default();
        let head = heap.allocate(BlockKind::Node).unwrap();
        let tail = heap.allocate(BlockKind::Node).unwrap();
        heap.write_cell(head, 0, Value::Int(0)).unwrap();
        heap.write_cell(head, 1, Value::Pointer(tail)).unwrap();
        heap.write_cell(tail, 0, Value::Int(1)).unwrap();
        heap.write_cell(tail, 1, Value::Null).unwrap();

        assert!(heap.unreachable(&[head]).is_empty());

        heap.free(head).unwrap();
        assert_eq!(heap.unreachable(&[head]), vec![tail]);
        assert_eq!(heap.unreachable(&[]), vec![tail]);
    }
}

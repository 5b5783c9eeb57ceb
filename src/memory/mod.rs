//! Checked memory model
//!
//! This module provides the core memory abstractions the checked rendition of
//! every routine runs on:
//! - [`value`]: Runtime value representation (Int, Pointer, Null, Array)
//! - [`stack`]: Call stack with frames and local variables
//! - [`heap`]: Heap blocks with tombstone tracking and a leak scan
//!
//! # Address Space
//!
//! Stack and heap addresses come from disjoint ranges:
//! ```text
//! 0x0000_0000           NULL
//! 0x0000_0004 ..        stack locals (one cell per scalar, N cells per array)
//! 0x1000_0000 ..        heap blocks
//! ```
//! so a pointer can always be classified by [`region_of`] without consulting
//! either structure.

pub mod heap;
pub mod stack;
pub mod value;

use crate::machine::constants::HEAP_ADDRESS_START;
use value::Address;

/// Where an address points
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    Null,
    Stack,
    Heap,
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Region::Null => write!(f, "null"),
            Region::Stack => write!(f, "stack"),
            Region::Heap => write!(f, "heap"),
        }
    }
}

/// Classify an address by range
pub fn region_of(addr: Address) -> Region {
    if addr == 0 {
        Region::Null
    } else if addr < HEAP_ADDRESS_START {
        Region::Stack
    } else {
        Region::Heap
    }
}

// Constants for the checked machine

/// Starting address for heap allocations
/// Heap addresses start at 0x10000000 to clearly distinguish them from stack addresses
pub const HEAP_ADDRESS_START: u64 = 0x1000_0000;

/// Starting address for stack variable addresses
/// Stack addresses start at 0x00000004 so that no local ever sits at NULL
pub const STACK_ADDRESS_START: u64 = 0x0000_0004;

/// Width of one memory cell in the virtual address space
pub const CELL_SIZE: u64 = 8;

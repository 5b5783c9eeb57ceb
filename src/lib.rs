//! # Introduction
//!
//! pointer-pitfalls is a catalog of ten classic pointer mistakes: running off
//! the end of an array, dereferencing null or uninitialized pointers, freeing
//! twice, losing the tail of a list, freeing stack memory, using freed memory
//! directly or through a copy, and comparing pointers when the values were
//! meant.
//!
//! ## Renditions
//!
//! ```text
//!                ┌── raw      unsafe fn, really faults
//! catalog::Bug ──┼── checked  replayed on machine::Machine → catalog::Trace
//!                └── fixed    ownership makes the mistake impossible
//! ```
//!
//! 1. [`list`]: the list node, owning ([`list::Node`]) and raw ([`list::RawNode`]).
//! 2. [`memory`]: the checked memory model: tagged [`memory::value::Value`]s
//!    in a virtual [`memory::stack::Stack`] and [`memory::heap::Heap`].
//! 3. [`machine`]: executes one modeled statement at a time and stops at the
//!    first violation with a [`machine::errors::RuntimeError`].
//! 4. [`snapshot`]: per-statement snapshots and the captured console.
//! 5. [`catalog`]: the routines themselves and [`catalog::trace`].
//! 6. [`report`]: terminal rendering of a trace.

pub mod catalog;
pub mod config;
pub mod list;
pub mod machine;
pub mod memory;
pub mod report;
pub mod snapshot;

//! Runtime error types for the checked machine
//!
//! This module defines [`RuntimeError`], which represents every violation the
//! checked machine can detect, plus the resource limits of the model itself.
//!
//! All runtime errors are fatal: the machine stops at the first one, the same
//! way an instrumented binary aborts at its first report.

use crate::memory::value::Address;
use crate::memory::Region;
use std::fmt;
use thiserror::Error;

/// The statement a step models, numbered from 1 within one routine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub step: usize,
    pub statement: &'static str,
}

impl Location {
    pub fn new(step: usize, statement: &'static str) -> Self {
        Location { step, statement }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "step {} (`{}`)", self.step, self.statement)
    }
}

/// Runtime errors that can occur during execution
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    /// Read of a variable or heap cell that was never written
    #[error("Read from uninitialized variable '{var}' at {location}")]
    UninitializedRead {
        var: String,
        address: Option<Address>,
        location: Location,
    },

    #[error("Null pointer dereference at {location}")]
    NullDereference { location: Location },

    /// Index past the end of an array or heap block
    #[error("Buffer overrun at {location}: index {index} out of bounds for size {size}")]
    BufferOverrun {
        index: usize,
        size: usize,
        location: Location,
    },

    /// Accessing released memory
    #[error("Use-after-free: address 0x{address:x} at {location}")]
    UseAfterFree { address: Address, location: Location },

    #[error("Double free at address 0x{address:x} at {location}")]
    DoubleFree { address: Address, location: Location },

    /// Releasing memory that did not come from the heap allocator
    #[error("Invalid free: {region} address 0x{address:x} at {location}")]
    InvalidFree {
        address: Address,
        region: Region,
        location: Location,
    },

    /// Pointer that names no variable and no heap block
    #[error("Invalid pointer at 0x{address:x}: {message} at {location}")]
    InvalidPointer {
        message: String,
        address: Address,
        location: Location,
    },

    #[error("Undefined variable '{name}' at {location}")]
    UndefinedVariable { name: String, location: Location },

    #[error("Type error at {location}: expected {expected}, got {got}")]
    TypeError {
        expected: &'static str,
        got: &'static str,
        location: Location,
    },

    #[error("No stack frame available at {location}")]
    NoStackFrame { location: Location },

    #[error("Out of memory: requested {requested} cells, limit is {limit}")]
    OutOfMemory { requested: usize, limit: usize },

    #[error("Snapshot memory limit exceeded: {current} bytes used, limit is {limit}")]
    SnapshotLimitExceeded { current: usize, limit: usize },
}

impl RuntimeError {
    pub fn location(&self) -> Option<&Location> {
        match self {
            RuntimeError::UninitializedRead { location, .. } => Some(location),
            RuntimeError::NullDereference { location } => Some(location),
            RuntimeError::BufferOverrun { location, .. } => Some(location),
            RuntimeError::UseAfterFree { location, .. } => Some(location),
            RuntimeError::DoubleFree { location, .. } => Some(location),
            RuntimeError::InvalidFree { location, .. } => Some(location),
            RuntimeError::InvalidPointer { location, .. } => Some(location),
            RuntimeError::UndefinedVariable { location, .. } => Some(location),
            RuntimeError::TypeError { location, .. } => Some(location),
            RuntimeError::NoStackFrame { location } => Some(location),
            RuntimeError::OutOfMemory { .. } => None,
            RuntimeError::SnapshotLimitExceeded { .. } => None,
        }
    }

    /// Whether this error is a memory-safety violation committed by the routine,
    /// as opposed to a limit or misuse of the machine itself
    pub fn is_violation(&self) -> bool {
        matches!(
            self,
            RuntimeError::UninitializedRead { .. }
                | RuntimeError::NullDereference { .. }
                | RuntimeError::BufferOverrun { .. }
                | RuntimeError::UseAfterFree { .. }
                | RuntimeError::DoubleFree { .. }
                | RuntimeError::InvalidFree { .. }
                | RuntimeError::InvalidPointer { .. }
        )
    }
}

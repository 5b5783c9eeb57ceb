//! Runtime value representation
//!
//! This module defines the [`Value`] enum, the contents of every stack local and
//! every heap cell in the checked memory model.
//!
//! # Value Types
//!
//! - [`Value::Int`]: 32-bit signed integer
//! - [`Value::Pointer`]: 64-bit address, either a heap block or a stack local
//! - [`Value::Null`]: Null pointer (address 0)
//! - [`Value::Array`]: Fixed-size array of values (stack locals only)
//! - [`Value::Uninitialized`]: Marker for memory that was never written
//!
//! # Initialization Tracking
//!
//! The `Uninitialized` variant is what lets the machine tell "declared" apart
//! from "assigned", so a read before the first write is reported instead of
//! returning whatever happened to be there.

/// Runtime values in the checked memory model
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Value {
    Int(i32),
    Pointer(Address),
    Null,
    Array(Vec<Value>),
    #[default]
    Uninitialized,
}

/// Memory address type (64-bit)
pub type Address = u64;

impl Value {
    /// Check if this value is initialized
    pub fn is_initialized(&self) -> bool {
        !matches!(self, Value::Uninitialized)
    }

    /// Get the pointer value, returns None if not a Pointer or Null
    pub fn as_pointer(&self) -> Option<Address> {
        match self {
            Value::Pointer(addr) => Some(*addr),
            Value::Null => Some(0),
            _ => None,
        }
    }

    /// Check if this value is a pointer (including null)
    pub fn is_pointer(&self) -> bool {
        matches!(self, Value::Pointer(_) | Value::Null)
    }

    /// Short type name used in diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Pointer(_) => "pointer",
            Value::Null => "null",
            Value::Array(_) => "array",
            Value::Uninitialized => "uninitialized",
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{}", n),
            Value::Pointer(addr) => write!(f, "0x{:08x}", addr),
            Value::Null => write!(f, "NULL"),
            Value::Array(items) => {
                write!(f, "{{")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "}}")
            }
            Value::Uninitialized => write!(f, "?"),
        }
    }
}

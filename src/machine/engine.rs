// Execution engine for the checked machine

use crate::config::Config;
use crate::machine::constants::{CELL_SIZE, STACK_ADDRESS_START};
use crate::machine::errors::{Location, RuntimeError};
use crate::memory::heap::{BlockKind, Heap, HeapError};
use crate::memory::stack::{LocalVar, Stack};
use crate::memory::value::{Address, Value};
use crate::memory::{region_of, Region};
use crate::snapshot::{Console, Snapshot, SnapshotError, SnapshotManager};
use rustc_hash::FxHashMap;

/// A field of a heap list node; the node block is laid out `[value, next]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Value,
    Next,
}

impl Field {
    fn index(self) -> usize {
        match self {
            Field::Value => 0,
            Field::Next => 1,
        }
    }
}

/// Executes demonstration routines one statement at a time against a
/// checked stack and heap
pub struct Machine {
    /// Call stack
    stack: Stack,

    /// Heap memory
    heap: Heap,

    /// Captured program output
    console: Console,

    /// Statement currently executing; `None` before the first one
    current_location: Option<Location>,

    /// Number of statements started so far
    step: usize,

    /// Snapshot after every successful statement
    snapshot_manager: SnapshotManager,

    /// Mapping from stack addresses to (frame_depth, variable_name)
    /// This is what lets `&x` produce a pointer that can be read back
    stack_address_map: FxHashMap<Address, (usize, String)>,

    /// Next available stack address
    next_stack_address: Address,
}

impl Machine {
    pub fn new(config: &Config) -> Self {
        Machine {
            stack: Stack::new(),
            heap: Heap::new(config.heap_limit),
            console: Console::new(),
            current_location: None,
            step: 0,
            snapshot_manager: SnapshotManager::new(config.snapshot_limit),
            stack_address_map: FxHashMap::default(),
            next_stack_address: STACK_ADDRESS_START,
        }
    }

    /// Push a frame for `function` and record the initial state
    pub fn enter(&mut self, function: &str) -> Result<(), RuntimeError> {
        log::trace!("enter {}", function);
        self.stack.push_frame(function.to_string());
        self.take_snapshot()
    }

    /// Pop the current frame; its locals and their stack addresses go away
    pub fn leave(&mut self) -> Result<(), RuntimeError> {
        let depth = self.stack.depth();
        let frame = self
            .stack
            .pop_frame()
            .ok_or(RuntimeError::NoStackFrame {
                location: self.here(),
            })?;
        self.stack_address_map
            .retain(|_, (frame_depth, _)| *frame_depth + 1 != depth);
        log::trace!("leave {}", frame.function_name);
        Ok(())
    }

    /// Run one statement. Operations called from `body` report errors at this
    /// statement; a snapshot is taken only if the whole statement succeeds.
    pub fn exec<T>(
        &mut self,
        statement: &'static str,
        body: impl FnOnce(&mut Self) -> Result<T, RuntimeError>,
    ) -> Result<T, RuntimeError> {
        self.step += 1;
        let location = Location::new(self.step, statement);
        self.current_location = Some(location);
        log::trace!("{}", location);

        let value = body(self)?;
        self.take_snapshot()?;
        Ok(value)
    }

    fn here(&self) -> Location {
        self.current_location
            .unwrap_or_else(|| Location::new(0, "<entry>"))
    }

    fn take_snapshot(&mut self) -> Result<(), RuntimeError> {
        let snapshot = Snapshot::new(
            self.stack.clone(),
            self.heap.clone(),
            self.console.clone(),
            self.current_location,
        );

        self.snapshot_manager
            .push(snapshot)
            .map_err(|SnapshotError::LimitExceeded { current, size, limit }| {
                log::warn!("snapshot of {} bytes refused ({} of {} in use)", size, current, limit);
                RuntimeError::SnapshotLimitExceeded { current, limit }
            })
    }

    /// Attach the current statement to a heap failure
    fn lift(&self, err: HeapError) -> RuntimeError {
        let location = self.here();
        match err {
            HeapError::OutOfMemory {
                requested, limit, ..
            } => RuntimeError::OutOfMemory { requested, limit },
            HeapError::DoubleFree(address) => RuntimeError::DoubleFree { address, location },
            HeapError::InvalidFree(address) => RuntimeError::InvalidFree {
                address,
                region: region_of(address),
                location,
            },
            HeapError::UseAfterFree(address) => RuntimeError::UseAfterFree { address, location },
            HeapError::NotAllocated(address) => RuntimeError::InvalidPointer {
                message: "not the start of any heap block".to_string(),
                address,
                location,
            },
            HeapError::OutOfBounds { index, size } => RuntimeError::BufferOverrun {
                index,
                size,
                location,
            },
            HeapError::Uninitialized(address) => RuntimeError::UninitializedRead {
                var: format!("heap cell 0x{:x}", address),
                address: Some(address),
                location,
            },
        }
    }

    // ========== Stack operations ==========

    fn reserve_stack(&mut self, name: &str, cells: usize) -> Result<Address, RuntimeError> {
        let depth = self.stack.depth();
        if depth == 0 {
            return Err(RuntimeError::NoStackFrame {
                location: self.here(),
            });
        }
        let addr = self.next_stack_address;
        self.next_stack_address += cells.max(1) as u64 * CELL_SIZE;
        self.stack_address_map
            .insert(addr, (depth - 1, name.to_string()));
        Ok(addr)
    }

    /// Declare a local initialized to `value`
    pub fn bind(&mut self, name: &str, value: Value) -> Result<(), RuntimeError> {
        let cells = match &value {
            Value::Array(items) => items.len(),
            _ => 1,
        };
        let addr = self.reserve_stack(name, cells)?;
        let location = self.here();
        self.stack
            .current_frame_mut()
            .ok_or(RuntimeError::NoStackFrame { location })?
            .declare_var(name.to_string(), value, addr);
        Ok(())
    }

    /// Declare a local without assigning it
    pub fn declare(&mut self, name: &str) -> Result<(), RuntimeError> {
        self.bind(name, Value::Uninitialized)
    }

    /// Declare a fixed-size array whose elements are all unassigned
    pub fn declare_array(&mut self, name: &str, len: usize) -> Result<(), RuntimeError> {
        self.bind(name, Value::Array(vec![Value::Uninitialized; len]))
    }

    fn var(&self, name: &str) -> Result<&LocalVar, RuntimeError> {
        let location = self.here();
        self.stack
            .current_frame()
            .ok_or(RuntimeError::NoStackFrame { location })?
            .get_var(name)
            .ok_or_else(|| RuntimeError::UndefinedVariable {
                name: name.to_string(),
                location,
            })
    }

    fn var_mut(&mut self, name: &str) -> Result<&mut LocalVar, RuntimeError> {
        let location = self.here();
        self.stack
            .current_frame_mut()
            .ok_or(RuntimeError::NoStackFrame { location })?
            .get_var_mut(name)
            .ok_or_else(|| RuntimeError::UndefinedVariable {
                name: name.to_string(),
                location,
            })
    }

    pub fn assign(&mut self, name: &str, value: Value) -> Result<(), RuntimeError> {
        self.var_mut(name)?.value = value;
        Ok(())
    }

    /// Read a local; reading one that was never assigned is a violation
    pub fn load(&self, name: &str) -> Result<Value, RuntimeError> {
        let var = self.var(name)?;
        if !var.value.is_initialized() {
            return Err(RuntimeError::UninitializedRead {
                var: name.to_string(),
                address: Some(var.address),
                location: self.here(),
            });
        }
        Ok(var.value.clone())
    }

    /// `&name`: always legal, whether or not the local is initialized
    pub fn address_of(&self, name: &str) -> Result<Value, RuntimeError> {
        Ok(Value::Pointer(self.var(name)?.address))
    }

    pub fn store_index(&mut self, name: &str, index: usize, value: Value) -> Result<(), RuntimeError> {
        let location = self.here();
        match &mut self.var_mut(name)?.value {
            Value::Array(items) => {
                let size = items.len();
                let slot = items.get_mut(index).ok_or(RuntimeError::BufferOverrun {
                    index,
                    size,
                    location,
                })?;
                *slot = value;
                Ok(())
            }
            other => Err(RuntimeError::TypeError {
                expected: "array",
                got: other.type_name(),
                location,
            }),
        }
    }

    pub fn load_index(&self, name: &str, index: usize) -> Result<Value, RuntimeError> {
        let location = self.here();
        match &self.var(name)?.value {
            Value::Array(items) => match items.get(index) {
                Some(Value::Uninitialized) => Err(RuntimeError::UninitializedRead {
                    var: format!("{}[{}]", name, index),
                    address: None,
                    location,
                }),
                Some(value) => Ok(value.clone()),
                None => Err(RuntimeError::BufferOverrun {
                    index,
                    size: items.len(),
                    location,
                }),
            },
            other => Err(RuntimeError::TypeError {
                expected: "array",
                got: other.type_name(),
                location,
            }),
        }
    }

    // ========== Heap operations ==========

    /// `new IntNode(value, next)`
    pub fn new_node(&mut self, value: i32, next: Value) -> Result<Value, RuntimeError> {
        if !next.is_pointer() {
            return Err(RuntimeError::TypeError {
                expected: "pointer",
                got: next.type_name(),
                location: self.here(),
            });
        }
        let addr = self
            .heap
            .allocate(BlockKind::Node)
            .map_err(|e| self.lift(e))?;
        self.heap
            .write_cell(addr, Field::Value.index(), Value::Int(value))
            .map_err(|e| self.lift(e))?;
        self.heap
            .write_cell(addr, Field::Next.index(), next)
            .map_err(|e| self.lift(e))?;
        log::debug!("new IntNode({}) at 0x{:x}", value, addr);
        Ok(Value::Pointer(addr))
    }

    /// `new int(value)`
    pub fn new_int(&mut self, value: i32) -> Result<Value, RuntimeError> {
        let addr = self
            .heap
            .allocate(BlockKind::Int)
            .map_err(|e| self.lift(e))?;
        self.heap
            .write_cell(addr, 0, Value::Int(value))
            .map_err(|e| self.lift(e))?;
        log::debug!("new int({}) at 0x{:x}", value, addr);
        Ok(Value::Pointer(addr))
    }

    /// Resolve a pointer that is about to be dereferenced
    fn target(&self, ptr: &Value) -> Result<Address, RuntimeError> {
        let location = self.here();
        match ptr {
            Value::Pointer(addr) => Ok(*addr),
            Value::Null => Err(RuntimeError::NullDereference { location }),
            Value::Uninitialized => Err(RuntimeError::UninitializedRead {
                var: "<pointer>".to_string(),
                address: None,
                location,
            }),
            other => Err(RuntimeError::TypeError {
                expected: "pointer",
                got: other.type_name(),
                location,
            }),
        }
    }

    /// Resolve a pointer to a live heap node
    fn node_target(&self, ptr: &Value) -> Result<Address, RuntimeError> {
        let addr = self.target(ptr)?;
        if region_of(addr) != Region::Heap {
            return Err(RuntimeError::TypeError {
                expected: "IntNode*",
                got: "stack pointer",
                location: self.here(),
            });
        }
        let block = self.heap.get_block(addr).map_err(|e| self.lift(e))?;
        if block.kind != BlockKind::Node {
            return Err(RuntimeError::TypeError {
                expected: "IntNode*",
                got: "int*",
                location: self.here(),
            });
        }
        Ok(addr)
    }

    /// `ptr->field`
    pub fn read_field(&self, ptr: &Value, field: Field) -> Result<Value, RuntimeError> {
        let addr = self.node_target(ptr)?;
        self.heap
            .read_cell(addr, field.index())
            .map_err(|e| self.lift(e))
    }

    /// `ptr->field = value`
    pub fn write_field(&mut self, ptr: &Value, field: Field, value: Value) -> Result<(), RuntimeError> {
        let addr = self.node_target(ptr)?;
        self.heap
            .write_cell(addr, field.index(), value)
            .map_err(|e| self.lift(e))
    }

    /// `*ptr` for an `int*`, which may point at the heap or at a stack local
    pub fn read_through(&self, ptr: &Value) -> Result<Value, RuntimeError> {
        let addr = self.target(ptr)?;
        let location = self.here();
        match region_of(addr) {
            Region::Heap => {
                let block = self.heap.get_block(addr).map_err(|e| self.lift(e))?;
                if block.kind != BlockKind::Int {
                    return Err(RuntimeError::TypeError {
                        expected: "int*",
                        got: "IntNode*",
                        location,
                    });
                }
                self.heap.read_cell(addr, 0).map_err(|e| self.lift(e))
            }
            Region::Stack => {
                let var = self
                    .stack_address_map
                    .get(&addr)
                    .and_then(|(depth, name)| {
                        self.stack.frames().get(*depth)?.get_var(name).map(|var| (name, var))
                    });
                match var {
                    Some((name, var)) if !var.value.is_initialized() => {
                        Err(RuntimeError::UninitializedRead {
                            var: name.clone(),
                            address: Some(addr),
                            location,
                        })
                    }
                    Some((_, var)) => Ok(var.value.clone()),
                    None => Err(RuntimeError::InvalidPointer {
                        message: "no live local at this stack address".to_string(),
                        address: addr,
                        location,
                    }),
                }
            }
            Region::Null => Err(RuntimeError::NullDereference { location }),
        }
    }

    /// `delete ptr`. Deleting NULL is a no-op, which is what makes nulling a
    /// pointer right after its release a working guard against a second one.
    pub fn delete(&mut self, ptr: &Value) -> Result<(), RuntimeError> {
        let location = self.here();
        match ptr {
            Value::Null => {
                log::debug!("delete NULL ignored at {}", location);
                Ok(())
            }
            Value::Pointer(addr) if region_of(*addr) == Region::Stack => {
                Err(RuntimeError::InvalidFree {
                    address: *addr,
                    region: Region::Stack,
                    location,
                })
            }
            Value::Pointer(addr) => {
                self.heap.free(*addr).map_err(|e| self.lift(e))?;
                log::debug!("delete 0x{:x}", addr);
                Ok(())
            }
            other => self.target(other).map(|_| ()),
        }
    }

    /// `a == b` on two pointers: compares addresses, never the pointees
    pub fn same_address(&self, a: &Value, b: &Value) -> Result<bool, RuntimeError> {
        let location = self.here();
        let addr = |v: &Value| {
            v.as_pointer().ok_or(RuntimeError::TypeError {
                expected: "pointer",
                got: v.type_name(),
                location,
            })
        };
        Ok(addr(a)? == addr(b)?)
    }

    /// `cout << text`
    pub fn print(&mut self, text: impl Into<String>) {
        let location = self.here();
        self.console.print(text.into(), location);
    }

    // ========== Inspection ==========

    /// Live heap blocks no local can currently reach
    pub fn unreachable(&self) -> Vec<Address> {
        self.heap.unreachable(&self.stack.pointer_roots())
    }

    pub fn console(&self) -> &Console {
        &self.console
    }

    /// Number of statements started, including a failing one
    pub fn step(&self) -> usize {
        self.step
    }

    pub fn history(&self) -> &SnapshotManager {
        &self.snapshot_manager
    }

    pub fn into_history(self) -> SnapshotManager {
        self.snapshot_manager
    }
}

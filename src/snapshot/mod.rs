// Snapshot history and captured console output for the checked machine

use crate::machine::errors::Location;
use crate::memory::{heap::Heap, stack::Stack};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    #[error("Snapshot memory limit exceeded: {current} + {size} > {limit}")]
    LimitExceeded {
        current: usize,
        size: usize,
        limit: usize,
    },
}

/// Console that captures what a routine prints
#[derive(Debug, Clone, Default)]
pub struct Console {
    pub lines: Vec<ConsoleLine>,
}

impl Console {
    pub fn new() -> Self {
        Console { lines: Vec::new() }
    }

    /// Print without newline; consecutive prints from the same statement text
    /// land on the same line, like `cout << arr[i] << ' '` in a loop
    pub fn print(&mut self, text: String, location: Location) {
        if let Some(last) = self.lines.last_mut() {
            if last.location.statement == location.statement && !last.text.ends_with('\n') {
                last.text.push_str(&text);
                return;
            }
        }
        self.lines.push(ConsoleLine { text, location });
    }

    /// Get all lines as a vector of strings
    pub fn get_output(&self) -> Vec<String> {
        self.lines
            .iter()
            .flat_map(|line| {
                let mut result: Vec<String> = line.text.split('\n').map(str::to_string).collect();
                // Remove trailing empty string if text ended with newline
                if result.last().is_some_and(|s| s.is_empty()) {
                    result.pop();
                }
                result
            })
            .collect()
    }
}

/// A line of console output with the statement that printed it
#[derive(Debug, Clone)]
pub struct ConsoleLine {
    pub text: String,
    pub location: Location,
}

/// Machine state after one successful step
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub stack: Stack,
    pub heap: Heap,
    pub console: Console,
    /// `None` for the state before the first statement
    pub location: Option<Location>,
}

impl Snapshot {
    pub fn new(stack: Stack, heap: Heap, console: Console, location: Option<Location>) -> Self {
        Snapshot {
            stack,
            heap,
            console,
            location,
        }
    }

    /// Estimate the memory usage of this snapshot in bytes
    pub fn estimated_size(&self) -> usize {
        // Rough: 100 bytes per frame, 64 per heap block, 50 per console line
        let stack_size = self.stack.depth() * 100;
        let heap_size = self.heap.allocations().len() * 64;
        let console_size = self.console.lines.len() * 50;

        stack_size + heap_size + console_size
    }

    /// Live heap blocks no local can reach at this point
    pub fn unreachable(&self) -> Vec<u64> {
        self.heap.unreachable(&self.stack.pointer_roots())
    }
}

/// Execution history of one routine
#[derive(Debug, Default)]
pub struct SnapshotManager {
    snapshots: Vec<Snapshot>,
    max_memory: usize,
    current_memory: usize,
}

impl SnapshotManager {
    pub fn new(max_memory: usize) -> Self {
        SnapshotManager {
            snapshots: Vec::new(),
            max_memory,
            current_memory: 0,
        }
    }

    /// Add a snapshot to history
    pub fn push(&mut self, snapshot: Snapshot) -> Result<(), SnapshotError> {
        let snapshot_size = snapshot.estimated_size();

        if self.current_memory + snapshot_size > self.max_memory {
            return Err(SnapshotError::LimitExceeded {
                current: self.current_memory,
                size: snapshot_size,
                limit: self.max_memory,
            });
        }

        self.current_memory += snapshot_size;
        self.snapshots.push(snapshot);
        Ok(())
    }

    pub fn get(&self, index: usize) -> Option<&Snapshot> {
        self.snapshots.get(index)
    }

    /// Find the snapshot taken right after the given step
    pub fn after_step(&self, step: usize) -> Option<&Snapshot> {
        self.snapshots
            .iter()
            .find(|s| s.location.is_some_and(|loc| loc.step == step))
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn memory_usage(&self) -> usize {
        self.current_memory
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_joins_prints_from_one_statement() {
        let mut console = Console::new();
        let loop_body = Location::new(3, "cout << arr[i] << ' '");
        console.print("0 ".to_string(), loop_body);
        console.print("1 ".to_string(), Location::new(5, loop_body.statement));
        console.print("done\n".to_string(), Location::new(6, "cout << endl"));
        console.print("again\n".to_string(), Location::new(7, "cout << endl"));

        assert_eq!(console.get_output(), vec!["0 1 ", "done", "again"]);
    }

    #[test]
    fn test_snapshot_limit() {
        let mut manager = SnapshotManager::new(150);
        let mut stack = Stack::new();
        stack.push_frame("main".to_string());
        let snapshot = Snapshot::new(stack, Heap::default(), Console::new(), None);

        assert!(manager.push(snapshot.clone()).is_ok());
        assert_eq!(
            manager.push(snapshot),
            Err(SnapshotError::LimitExceeded {
                current: 100,
                size: 100,
                limit: 150,
            })
        );
        assert_eq!(manager.len(), 1);
        assert_eq!(manager.memory_usage(), 100);
    }
}

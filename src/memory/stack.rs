//! Call stack implementation
//!
//! This module provides the call stack the demonstration routines run on:
//! - [`Stack`]: The call stack containing frames
//! - [`StackFrame`]: A single routine's activation record
//! - [`LocalVar`]: A local variable with its value and virtual address
//!
//! Every local gets a virtual address below the heap range, so taking `&x`
//! produces a pointer that the heap does not recognize. That is what makes
//! releasing a stack-resident value detectable.

use super::value::{Address, Value};
use std::collections::HashMap;

/// Local variable on the stack
#[derive(Debug, Clone)]
pub struct LocalVar {
    pub value: Value,
    pub address: Address, // Virtual address for this variable
}

impl LocalVar {
    pub fn new(value: Value, address: Address) -> Self {
        LocalVar { value, address }
    }
}

/// Stack frame for a routine
#[derive(Debug, Clone)]
pub struct StackFrame {
    pub function_name: String,
    pub locals: HashMap<String, LocalVar>,
    pub insertion_order: Vec<String>, // Track order of variable declarations
}

impl StackFrame {
    pub fn new(function_name: String) -> Self {
        StackFrame {
            function_name,
            locals: HashMap::new(),
            insertion_order: Vec::new(),
        }
    }

    /// Declare a new local variable, replacing any earlier one with that name
    pub fn declare_var(&mut self, name: String, value: Value, address: Address) {
        if !self.locals.contains_key(&name) {
            self.insertion_order.push(name.clone());
        }
        self.locals.insert(name, LocalVar::new(value, address));
    }

    pub fn get_var(&self, name: &str) -> Option<&LocalVar> {
        self.locals.get(name)
    }

    pub fn get_var_mut(&mut self, name: &str) -> Option<&mut LocalVar> {
        self.locals.get_mut(name)
    }

    /// Locals in declaration order
    pub fn vars(&self) -> impl Iterator<Item = (&str, &LocalVar)> {
        self.insertion_order
            .iter()
            .filter_map(|name| self.locals.get(name).map(|var| (name.as_str(), var)))
    }
}

/// The call stack
#[derive(Debug, Clone, Default)]
pub struct Stack {
    frames: Vec<StackFrame>,
}

impl Stack {
    pub fn new() -> Self {
        Stack { frames: Vec::new() }
    }

    pub fn push_frame(&mut self, function_name: String) {
        self.frames.push(StackFrame::new(function_name));
    }

    pub fn pop_frame(&mut self) -> Option<StackFrame> {
        self.frames.pop()
    }

    /// Get the current (top) frame
    pub fn current_frame(&self) -> Option<&StackFrame> {
        self.frames.last()
    }

    pub fn current_frame_mut(&mut self) -> Option<&mut StackFrame> {
        self.frames.last_mut()
    }

    pub fn frames(&self) -> &[StackFrame] {
        &self.frames
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Every pointer held by a local in any frame, array elements included.
    /// These are the roots of the heap reachability scan.
    pub fn pointer_roots(&self) -> Vec<Address> {
        fn collect(value: &Value, roots: &mut Vec<Address>) {
            match value {
                Value::Pointer(addr) => roots.push(*addr),
                Value::Array(items) => items.iter().for_each(|item| collect(item, roots)),
                _ => {}
            }
        }

        let mut roots = Vec::new();
        for frame in &self.frames {
            for var in frame.locals.values() {
                collect(&var.value, &mut roots);
            }
        }
        roots
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declaration_order_is_kept() {
        let mut frame = StackFrame::new("lostMemory".to_string());
        frame.declare_var("head".to_string(), Value::Null, 4);
        frame.declare_var("tail".to_string(), Value::Null, 12);
        frame.declare_var("head".to_string(), Value::Int(1), 20);

        let names: Vec<&str> = frame.vars().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["head", "tail"]);
        assert_eq!(frame.get_var("head").map(|v| v.address), Some(20));
    }

    #[test]
    fn test_pointer_roots_cover_all_frames() {
        let mut stack = Stack::new();
        stack.push_frame("outer".to_string());
        stack
            .current_frame_mut()
            .unwrap()
            .declare_var("p".to_string(), Value::Pointer(0x1000_0000), 4);
        stack.push_frame("inner".to_string());
        stack.current_frame_mut().unwrap().declare_var(
            "arr".to_string(),
            Value::Array(vec![Value::Int(1), Value::Pointer(0x1000_0010)]),
            12,
        );

        let mut roots = stack.pointer_roots();
        roots.sort_unstable();
        assert_eq!(roots, vec![0x1000_0000, 0x1000_0010]);

        stack.pop_frame();
        stack.pop_frame();
        assert!(stack.pointer_roots().is_empty());
        assert!(stack.is_empty());
    }
}

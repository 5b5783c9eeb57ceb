//! Fixed rendition of every routine
//!
//! The same setups, written so the mistake cannot be made: indices are
//! checked, "maybe absent" is an `Option`, every node has one owner, and a
//! value shared by two handles is reference counted.

use super::{Bug, ARRAY_LEN};
use crate::list::{release, Node};
use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

/// Fill the array with its own indices. Returns the array and what a lookup
/// one past the end gives back.
pub fn bounded_fill() -> ([i32; ARRAY_LEN], Option<i32>) {
    let mut arr = [0i32; ARRAY_LEN];
    for (i, slot) in arr.iter_mut().enumerate() {
        *slot = i as i32;
    }
    let past_end = arr.get(ARRAY_LEN).copied();
    (arr, past_end)
}

/// `node->next->value` when there may be no next
pub fn checked_next() -> Option<i32> {
    let node = Node::with_value(1);
    node.next_value()
}

/// A reference is bound to its target where it is declared. `Option` is the
/// only way to spell "not pointing anywhere yet", and then the read has to
/// handle `None`.
pub fn initialized_pointer() -> Option<i32> {
    let x = 0;
    let pointer: Option<&i32> = Some(&x);
    pointer.copied()
}

/// A value that is assigned where it is declared. Reading `x` before any
/// assignment would not compile.
pub fn initialized_value() -> i32 {
    let x = 0;
    let pointer = &x;
    *pointer
}

/// Release through a slot twice. Returns whether each release freed anything.
pub fn single_release() -> (bool, bool) {
    let mut node = Some(Box::new(Node::new()));
    let first = release(&mut node);
    let second = release(&mut node);
    (first, second)
}

/// Take the tail out of the head before the head goes
pub fn detach_before_release() -> Option<Box<Node>> {
    let mut head = Box::new(Node::with_next(0, Box::new(Node::with_value(1))));
    let tail = head.next.take();
    drop(head);
    tail
}

/// `x` lives in its block and is gone at the closing brace. Only the box it was
/// moved into is heap memory, and only the box is dropped.
pub fn stack_value() -> i32 {
    let pointer = {
        let x = 0;
        Box::new(x)
    };
    let value = *pointer;
    drop(pointer);
    value
}

/// Use a node, then release it. Returns what was written.
pub fn use_then_release() -> i32 {
    let mut node = Box::new(Node::with_value(1));
    node.value = 2;
    let value = node.value;
    drop(node);
    value
}

/// Two handles to one node. Dropping the first leaves the node alive for the
/// second. Returns the value written through the second and how many handles
/// remain.
pub fn shared_alias() -> (i32, usize) {
    let node = Rc::new(RefCell::new(Node::with_value(1)));
    let node_copy = Rc::clone(&node);
    drop(node);
    node_copy.borrow_mut().value = 2;
    let value = node_copy.borrow().value;
    (value, Rc::strong_count(&node_copy))
}

/// Two boxes holding equal ints. Returns `(same address, same value)`.
pub fn compare_values() -> (bool, bool) {
    let first = Box::new(1);
    let second = Box::new(1);
    (std::ptr::eq(&*first, &*second), *first == *second)
}

/// Run the fixed rendition of `bug` and describe the result
pub fn run(bug: Bug, out: &mut impl Write) -> io::Result<()> {
    match bug {
        Bug::BoundsViolation => {
            let (arr, past_end) = bounded_fill();
            for value in arr {
                write!(out, "{} ", value)?;
            }
            writeln!(out)?;
            writeln!(out, "arr.get({}) = {:?}", ARRAY_LEN, past_end)
        }
        Bug::NullDereference => writeln!(out, "node.next_value() = {:?}", checked_next()),
        Bug::UninitializedPointer => writeln!(out, "pointer.copied() = {:?}", initialized_pointer()),
        Bug::UninitializedValue => writeln!(out, "*pointer = {}", initialized_value()),
        Bug::DoubleRelease => {
            let (first, second) = single_release();
            writeln!(out, "first release freed: {}, second release freed: {}", first, second)
        }
        Bug::LeakAfterRelease => match detach_before_release() {
            Some(tail) => {
                writeln!(out, "tail kept: value {}", tail.value)?;
                writeln!(out, "released {} node(s)", Node::release_list(Some(tail)))
            }
            None => writeln!(out, "tail lost"),
        },
        Bug::MismatchedRelease => writeln!(out, "*pointer = {} (x released at scope exit, box dropped)", stack_value()),
        Bug::UseAfterRelease => writeln!(out, "node->value = {}", use_then_release()),
        Bug::AliasedRelease => {
            let (value, handles) = shared_alias();
            writeln!(out, "nodeCopy->value = {} with {} handle(s) left", value, handles)
        }
        Bug::IdentityComparison => {
            let (same_address, same_value) = compare_values();
            if same_value {
                writeln!(out, "The two values are equal.")?;
            } else {
                writeln!(out, "The two values are not equal.")?;
            }
            writeln!(out, "(same address: {})", same_address)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_writes_one_report_per_routine() {
        for bug in Bug::ALL {
            let mut out = Vec::new();
            run(bug, &mut out).unwrap();
            let text = String::from_utf8(out).unwrap();
            assert!(!text.is_empty(), "{}", bug);
        }
    }

    #[test]
    fn test_leak_fix_releases_the_tail() {
        let mut out = Vec::new();
        run(Bug::LeakAfterRelease, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("tail kept: value 1"));
        assert!(text.contains("released 1 node(s)"));
    }

    #[test]
    fn test_pointer_is_bound_at_declaration() {
        assert_eq!(initialized_pointer(), Some(0));

        let mut out = Vec::new();
        run(Bug::UninitializedPointer, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "pointer.copied() = Some(0)\n");
    }

    #[test]
    fn test_stack_value_is_moved_into_a_box_before_release() {
        assert_eq!(stack_value(), 0);

        let mut out = Vec::new();
        run(Bug::MismatchedRelease, &mut out).unwrap();
        assert!(String::from_utf8(out).unwrap().contains("box dropped"));
    }
}

//! List node types
//!
//! - [`node`]: [`Node`], which owns its tail through `Option<Box<Node>>`
//! - [`raw`]: [`RawNode`], linked with raw pointers and released by hand
//!
//! Both carry an `i32` payload and come in the same three shapes: default
//! (payload 0, no next), payload only, and payload plus next.

pub mod node;
pub mod raw;

pub use node::{release, Node};
pub use raw::RawNode;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors() {
        let empty = Node::new();
        assert_eq!(empty.value, 0);
        assert!(empty.next.is_none());

        let list = Node::with_next(0, Box::new(Node::with_value(1)));
        assert_eq!(list.next_value(), Some(1));
        assert_eq!(list.iter().collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(list.count(), 2);
    }

    #[test]
    fn test_release_is_idempotent_once_nulled() {
        let mut slot = Some(Box::new(Node::new()));
        assert!(release(&mut slot));
        assert!(slot.is_none());
        assert!(!release(&mut slot));
    }

    #[test]
    fn test_release_list_frees_every_node() {
        let mut head = Box::new(Node::with_value(0));
        for value in 1..5 {
            head = Box::new(Node::with_next(value, head));
        }
        assert_eq!(Node::release_list(Some(head)), 5);
        assert_eq!(Node::release_list(None), 0);
    }

    #[test]
    fn test_dropping_long_list_does_not_recurse() {
        let mut head = Box::new(Node::new());
        for value in 0..200_000 {
            head = Box::new(Node::with_next(value, head));
        }
        drop(head);
    }

    #[test]
    fn test_raw_release_and_null_is_idempotent() {
        let mut node = raw::alloc(RawNode::with_value(1));
        unsafe {
            assert_eq!((*node).value, 1);
            assert!(raw::release_and_null(&mut node));
            assert!(node.is_null());
            assert!(!raw::release_and_null(&mut node));
        }
    }

    #[test]
    fn test_raw_list_released_tail_first() {
        let tail = raw::alloc(RawNode::with_value(1));
        let mut head = raw::alloc(RawNode::with_next(0, tail));
        unsafe {
            let mut next = (*head).next;
            assert!(raw::release_and_null(&mut next));
            (*head).next = std::ptr::null_mut();
            assert!(raw::release_and_null(&mut head));
        }
    }
}

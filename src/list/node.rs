//! Owning list node
//!
//! `next` is an `Option<Box<Node>>`, so every node has exactly one owner. A
//! tail cannot be orphaned by releasing its head and no node can be released
//! twice: both mistakes stop compiling.

/// One element of a singly linked list that owns its tail
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Node {
    pub value: i32,
    pub next: Option<Box<Node>>,
}

impl Node {
    /// Payload 0, no next
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(value: i32) -> Self {
        Node { value, next: None }
    }

    pub fn with_next(value: i32, next: Box<Node>) -> Self {
        Node {
            value,
            next: Some(next),
        }
    }

    /// Payload of the next node, if there is one
    pub fn next_value(&self) -> Option<i32> {
        self.next.as_deref().map(|next| next.value)
    }

    /// Number of nodes from this one to the end of the list
    pub fn count(&self) -> usize {
        self.iter().count()
    }

    /// Payloads from this node to the end of the list
    pub fn iter(&self) -> impl Iterator<Item = i32> + '_ {
        std::iter::successors(Some(self), |node| node.next.as_deref()).map(|node| node.value)
    }

    /// Release a whole list given only its head, detaching each tail before
    /// its node goes. Returns how many nodes were released.
    pub fn release_list(head: Option<Box<Node>>) -> usize {
        let mut released = 0;
        let mut cur = head;
        while let Some(mut node) = cur {
            cur = node.next.take();
            drop(node);
            released += 1;
        }
        released
    }
}

impl Drop for Node {
    // Iterative so that dropping a long list cannot overflow the stack
    fn drop(&mut self) {
        let mut cur = self.next.take();
        while let Some(mut node) = cur {
            cur = node.next.take();
        }
    }
}

/// Release the node in `slot` and leave `None` behind. Returns whether
/// anything was released; a second call on the same slot is a no-op.
pub fn release(slot: &mut Option<Box<Node>>) -> bool {
    match slot.take() {
        Some(node) => {
            drop(node);
            true
        }
        None => false,
    }
}

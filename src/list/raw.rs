//! Ownership-free list node
//!
//! [`RawNode`] links with a raw `*mut RawNode`, so nothing tracks who is
//! responsible for releasing what. Allocation and release go through `Box`,
//! the same allocator the owning [`super::Node`] uses.

use std::ptr;

/// One element of a singly linked list that does not own its tail
#[repr(C)]
#[derive(Debug)]
pub struct RawNode {
    pub value: i32,
    pub next: *mut RawNode,
}

impl RawNode {
    /// Payload 0, null next
    pub fn new() -> Self {
        Self::with_value(0)
    }

    pub fn with_value(value: i32) -> Self {
        RawNode {
            value,
            next: ptr::null_mut(),
        }
    }

    pub fn with_next(value: i32, next: *mut RawNode) -> Self {
        RawNode { value, next }
    }
}

impl Default for RawNode {
    fn default() -> Self {
        Self::new()
    }
}

/// Move `node` to the heap and hand back the only pointer to it
pub fn alloc(node: RawNode) -> *mut RawNode {
    Box::into_raw(Box::new(node))
}

/// Release a node. Its `next` is not followed.
///
/// # Safety
///
/// `node` must come from [`alloc`] and must not have been released already.
pub unsafe fn release(node: *mut RawNode) {
    drop(Box::from_raw(node));
}

/// Release the node in `slot` and null the slot. A second call on the same
/// slot sees null and does nothing. Returns whether anything was released.
///
/// # Safety
///
/// `*slot` must be null or a live pointer from [`alloc`] that no other slot
/// will release.
pub unsafe fn release_and_null(slot: &mut *mut RawNode) -> bool {
    if slot.is_null() {
        return false;
    }
    release(*slot);
    *slot = ptr::null_mut();
    true
}

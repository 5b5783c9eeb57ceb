//! Raw rendition of every routine
//!
//! These are the mistakes for real. Apart from [`leak_after_release`] (which
//! only loses memory) and [`identity_comparison`] (which is only wrong), every
//! function here is undefined behavior when called. Volatile accesses keep
//! the optimizer from deleting the offending load or store.

use super::{Bug, ARRAY_LEN};
use crate::list::raw::{alloc, release};
use crate::list::RawNode;
use std::mem::MaybeUninit;
use std::ptr;

/// Run the raw rendition of `bug`.
///
/// # Safety
///
/// Never sound for most routines: the caller accepts whatever the platform
/// does with the violation, from a crash to silently corrupted memory.
pub unsafe fn run(bug: Bug) {
    log::warn!("running {} with no checks", bug);
    match bug {
        Bug::BoundsViolation => bounds_violation(),
        Bug::NullDereference => null_dereference(),
        Bug::UninitializedPointer => uninitialized_pointer(),
        Bug::UninitializedValue => uninitialized_value(),
        Bug::DoubleRelease => double_release(),
        Bug::LeakAfterRelease => leak_after_release(),
        Bug::MismatchedRelease => mismatched_release(),
        Bug::UseAfterRelease => use_after_release(),
        Bug::AliasedRelease => aliased_release(),
        Bug::IdentityComparison => identity_comparison(),
    }
}

/// # Safety
/// Writes one element past the end of a stack array.
pub unsafe fn bounds_violation() {
    let mut arr = [0i32; ARRAY_LEN];
    let base = arr.as_mut_ptr();
    for i in 0..=ARRAY_LEN {
        let slot = base.add(i);
        ptr::write_volatile(slot, i as i32);
        print!("{} ", ptr::read_volatile(slot));
    }
    println!();
}

/// # Safety
/// Reads through a null pointer.
pub unsafe fn null_dereference() {
    let node = alloc(RawNode::with_next(1, ptr::null_mut()));
    let next = (*node).next;
    let x = ptr::read_volatile(ptr::addr_of!((*next).value));
    println!("{}", x);
    release(node);
}

/// # Safety
/// Reads through a pointer that was never assigned.
#[allow(invalid_value)]
pub unsafe fn uninitialized_pointer() {
    let pointer: *const i32 = MaybeUninit::uninit().assume_init();
    let x = ptr::read_volatile(pointer);
    println!("{}", x);
}

/// # Safety
/// Reads an `i32` that was never written.
pub unsafe fn uninitialized_value() {
    let x = MaybeUninit::<i32>::uninit();
    // Taking the address is fine; the read below is not.
    let pointer: *const i32 = x.as_ptr();
    let y = ptr::read_volatile(pointer);
    println!("{}", y);
}

/// # Safety
/// Releases the same node twice.
pub unsafe fn double_release() {
    let node = alloc(RawNode::new());
    release(node);
    release(node);
}

/// Sound, but the tail is never released.
pub fn leak_after_release() {
    let head = alloc(RawNode::new());
    unsafe {
        (*head).next = alloc(RawNode::with_value(1));
        release(head);
    }
}

/// # Safety
/// Hands the address of a stack variable to the heap allocator.
pub unsafe fn mismatched_release() {
    let mut x = 0i32;
    let pointer1: *mut i32 = &mut x;
    drop(Box::from_raw(pointer1));
}

/// # Safety
/// Writes through a pointer after its node was released.
pub unsafe fn use_after_release() {
    let node = alloc(RawNode::with_value(1));
    release(node);
    ptr::write_volatile(ptr::addr_of_mut!((*node).value), 2);
}

/// # Safety
/// Writes through a copy of a pointer after the original was released.
pub unsafe fn aliased_release() {
    let node = alloc(RawNode::with_value(1));
    let node_copy = node;
    release(node);
    ptr::write_volatile(ptr::addr_of_mut!((*node_copy).value), 2);
}

/// Sound: comparing raw pointers only compares addresses.
pub fn identity_comparison() {
    let first = Box::into_raw(Box::new(1i32));
    let second = Box::into_raw(Box::new(1i32));
    if first == second {
        println!("The two values are equal.");
    } else {
        println!("The two values are not equal.");
    }
    unsafe {
        drop(Box::from_raw(first));
        drop(Box::from_raw(second));
    }
}

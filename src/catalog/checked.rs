//! Checked rendition of every routine
//!
//! Each script replays the routine statement by statement on a [`Machine`].
//! The string passed to [`Machine::exec`] is the statement being modeled; it
//! is what a violation is reported against.

use super::{Bug, ARRAY_LEN};
use crate::config::Config;
use crate::machine::engine::{Field, Machine};
use crate::machine::errors::RuntimeError;
use crate::memory::value::Value;

/// A routine replayed on the checked machine
pub type Script = fn(&mut Machine) -> Result<(), RuntimeError>;

/// The script that reproduces `bug`
pub fn script(bug: Bug) -> Script {
    match bug {
        Bug::BoundsViolation => bounds_violation,
        Bug::NullDereference => null_dereference,
        Bug::UninitializedPointer => uninitialized_pointer,
        Bug::UninitializedValue => uninitialized_value,
        Bug::DoubleRelease => double_release,
        Bug::LeakAfterRelease => leak_after_release,
        Bug::MismatchedRelease => mismatched_release,
        Bug::UseAfterRelease => use_after_release,
        Bug::AliasedRelease => aliased_release,
        Bug::IdentityComparison => identity_comparison,
    }
}

/// The same routine with the pointer nulled right after its release
pub fn mitigated_script(bug: Bug) -> Option<Script> {
    match bug {
        Bug::DoubleRelease => Some(double_release_nulled as Script),
        Bug::UseAfterRelease => Some(use_after_release_nulled as Script),
        _ => None,
    }
}

fn new_node(m: &mut Machine, name: &str, value: i32) -> Result<(), RuntimeError> {
    let node = m.new_node(value, Value::Null)?;
    m.bind(name, node)
}

fn delete_var(m: &mut Machine, name: &str) -> Result<(), RuntimeError> {
    let ptr = m.load(name)?;
    m.delete(&ptr)
}

fn bounds_violation(m: &mut Machine) -> Result<(), RuntimeError> {
    m.exec("int arr[size]", |m| m.declare_array("arr", ARRAY_LEN))?;
    // i <= size: one iteration too many
    for i in 0..=ARRAY_LEN {
        m.exec("arr[i] = i", |m| m.store_index("arr", i, Value::Int(i as i32)))?;
        m.exec("cout << arr[i] << ' '", |m| {
            let value = m.load_index("arr", i)?;
            m.print(format!("{} ", value));
            Ok(())
        })?;
    }
    Ok(())
}

fn null_dereference(m: &mut Machine) -> Result<(), RuntimeError> {
    m.exec("IntNode* node = new IntNode(1, nullptr)", |m| {
        new_node(m, "node", 1)
    })?;
    m.exec("int x = node->next->value", |m| {
        let node = m.load("node")?;
        let next = m.read_field(&node, Field::Next)?;
        let x = m.read_field(&next, Field::Value)?;
        m.bind("x", x)
    })
}

fn uninitialized_pointer(m: &mut Machine) -> Result<(), RuntimeError> {
    m.exec("int* pointer", |m| m.declare("pointer"))?;
    m.exec("int x = *pointer", |m| {
        let pointer = m.load("pointer")?;
        let x = m.read_through(&pointer)?;
        m.bind("x", x)
    })
}

fn uninitialized_value(m: &mut Machine) -> Result<(), RuntimeError> {
    m.exec("int x", |m| m.declare("x"))?;
    m.exec("int* pointer = &x", |m| {
        let pointer = m.address_of("x")?;
        m.bind("pointer", pointer)
    })?;
    m.exec("int y = *pointer", |m| {
        let pointer = m.load("pointer")?;
        let y = m.read_through(&pointer)?;
        m.bind("y", y)
    })
}

fn double_release(m: &mut Machine) -> Result<(), RuntimeError> {
    m.exec("IntNode* node = new IntNode(0)", |m| new_node(m, "node", 0))?;
    m.exec("delete node", |m| delete_var(m, "node"))?;
    m.exec("delete node", |m| delete_var(m, "node"))
}

fn double_release_nulled(m: &mut Machine) -> Result<(), RuntimeError> {
    m.exec("IntNode* node = new IntNode(0)", |m| new_node(m, "node", 0))?;
    m.exec("delete node", |m| delete_var(m, "node"))?;
    m.exec("node = nullptr", |m| m.assign("node", Value::Null))?;
    m.exec("delete node", |m| delete_var(m, "node"))
}

fn leak_after_release(m: &mut Machine) -> Result<(), RuntimeError> {
    m.exec("IntNode* head = new IntNode(0)", |m| new_node(m, "head", 0))?;
    // The tail is never bound to a local: head->next is its only reference.
    m.exec("head->next = new IntNode(1, nullptr)", |m| {
        let head = m.load("head")?;
        let tail = m.new_node(1, Value::Null)?;
        m.write_field(&head, Field::Next, tail)
    })?;
    m.exec("delete head", |m| delete_var(m, "head"))
}

fn mismatched_release(m: &mut Machine) -> Result<(), RuntimeError> {
    m.exec("int* pointer1", |m| m.declare("pointer1"))?;
    m.exec("int x = 0", |m| m.bind("x", Value::Int(0)))?;
    m.exec("pointer1 = &x", |m| {
        let address = m.address_of("x")?;
        m.assign("pointer1", address)
    })?;
    m.exec("delete pointer1", |m| delete_var(m, "pointer1"))
}

fn use_after_release(m: &mut Machine) -> Result<(), RuntimeError> {
    m.exec("IntNode* node = new IntNode(1)", |m| new_node(m, "node", 1))?;
    m.exec("delete node", |m| delete_var(m, "node"))?;
    m.exec("node->value = 2", |m| {
        let node = m.load("node")?;
        m.write_field(&node, Field::Value, Value::Int(2))
    })
}

fn use_after_release_nulled(m: &mut Machine) -> Result<(), RuntimeError> {
    m.exec("IntNode* node = new IntNode(1)", |m| new_node(m, "node", 1))?;
    m.exec("delete node", |m| delete_var(m, "node"))?;
    m.exec("node = nullptr", |m| m.assign("node", Value::Null))?;
    m.exec("node->value = 2", |m| {
        let node = m.load("node")?;
        m.write_field(&node, Field::Value, Value::Int(2))
    })
}

fn aliased_release(m: &mut Machine) -> Result<(), RuntimeError> {
    m.exec("IntNode* node = new IntNode(1)", |m| new_node(m, "node", 1))?;
    m.exec("IntNode* nodeCopy = node", |m| {
        let node = m.load("node")?;
        m.bind("nodeCopy", node)
    })?;
    m.exec("delete node", |m| delete_var(m, "node"))?;
    m.exec("nodeCopy->value = 2", |m| {
        let node_copy = m.load("nodeCopy")?;
        m.write_field(&node_copy, Field::Value, Value::Int(2))
    })
}

fn identity_comparison(m: &mut Machine) -> Result<(), RuntimeError> {
    m.exec("int* first = new int(1)", |m| {
        let first = m.new_int(1)?;
        m.bind("first", first)
    })?;
    m.exec("int* second = new int(1)", |m| {
        let second = m.new_int(1)?;
        m.bind("second", second)
    })?;
    m.exec("if (first == second)", |m| {
        let first = m.load("first")?;
        let second = m.load("second")?;
        if m.same_address(&first, &second)? {
            m.print("The two values are equal.\n");
        } else {
            m.print("The two values are not equal.\n");
        }
        Ok(())
    })?;
    m.exec("delete first", |m| delete_var(m, "first"))?;
    m.exec("delete second", |m| delete_var(m, "second"))
}

/// Allocate two ints holding the same value and compare them both ways.
/// Returns `(first == second, *first == *second)`.
pub fn compare_identity_and_value(config: &Config) -> Result<(bool, bool), RuntimeError> {
    let mut m = Machine::new(config);
    m.enter("compare")?;
    let first = m.exec("int* first = new int(1)", |m| m.new_int(1))?;
    let second = m.exec("int* second = new int(1)", |m| m.new_int(1))?;
    let same_address = m.exec("first == second", |m| m.same_address(&first, &second))?;
    let same_value = m.exec("*first == *second", |m| {
        Ok(m.read_through(&first)? == m.read_through(&second)?)
    })?;
    m.exec("delete first", |m| m.delete(&first))?;
    m.exec("delete second", |m| m.delete(&second))?;
    m.leave()?;
    Ok((same_address, same_value))
}

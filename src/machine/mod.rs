//! Checked execution engine
//!
//! This module provides the instrumented runtime the checked routines run on:
//! - [`engine`]: [`engine::Machine`], which executes statements one at a time
//! - [`errors`]: Runtime error types and statement locations
//!
//! # Execution Model
//!
//! A routine is a sequence of [`engine::Machine::exec`] calls, one per modeled
//! source statement. Each call is numbered, and after it succeeds a snapshot of
//! the stack, heap and console is taken. The first violation ends the routine
//! with a [`errors::RuntimeError`] that names the statement that committed it.

pub mod constants;
pub mod engine;
pub mod errors;

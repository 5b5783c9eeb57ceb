//! The bug catalog
//!
//! Ten independent routines, each committing one classic pointer mistake.
//! Every routine comes in three renditions:
//!
//! - [`checked`]: replayed on the instrumented [`Machine`], which stops at the
//!   statement that commits the violation and names it ([`trace`])
//! - [`raw`]: the real thing, raw pointers inside `unsafe fn`s
//! - [`fixed`]: the correct counterpart, written with ownership
//!
//! No routine calls another, and none of them recovers from its own fault.

pub mod checked;
pub mod fixed;
pub mod raw;

use crate::config::Config;
use crate::machine::engine::Machine;
use crate::machine::errors::RuntimeError;
use crate::memory::value::Address;
use crate::snapshot::SnapshotManager;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Length of the array the bounds routine walks past
pub const ARRAY_LEN: usize = 10;

/// The routines in the catalog. The default is the one the program runs
/// when none is named.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Bug {
    BoundsViolation,
    NullDereference,
    UninitializedPointer,
    UninitializedValue,
    DoubleRelease,
    LeakAfterRelease,
    MismatchedRelease,
    UseAfterRelease,
    #[default]
    AliasedRelease,
    IdentityComparison,
}

/// How a violation shows up when the program really runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultClass {
    /// Deterministic abnormal termination
    Termination,
    /// Undefined behavior: may terminate, may corrupt silently
    Undefined,
    /// Memory is lost; nothing crashes and nothing is reported
    SilentLeak,
    /// No memory error at all, just a wrong but plausible answer
    SilentLogicError,
}

impl fmt::Display for FaultClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaultClass::Termination => write!(f, "abnormal termination"),
            FaultClass::Undefined => write!(f, "undefined behavior"),
            FaultClass::SilentLeak => write!(f, "silent leak"),
            FaultClass::SilentLogicError => write!(f, "silent logic error"),
        }
    }
}

impl Bug {
    /// Every routine, in catalog order
    pub const ALL: [Bug; 10] = [
        Bug::BoundsViolation,
        Bug::NullDereference,
        Bug::UninitializedPointer,
        Bug::UninitializedValue,
        Bug::DoubleRelease,
        Bug::LeakAfterRelease,
        Bug::MismatchedRelease,
        Bug::UseAfterRelease,
        Bug::AliasedRelease,
        Bug::IdentityComparison,
    ];

    /// Name accepted on the command line
    pub fn name(self) -> &'static str {
        match self {
            Bug::BoundsViolation => "bounds-violation",
            Bug::NullDereference => "null-dereference",
            Bug::UninitializedPointer => "uninitialized-pointer",
            Bug::UninitializedValue => "uninitialized-value",
            Bug::DoubleRelease => "double-release",
            Bug::LeakAfterRelease => "leak-after-release",
            Bug::MismatchedRelease => "mismatched-release",
            Bug::UseAfterRelease => "use-after-release",
            Bug::AliasedRelease => "aliased-release",
            Bug::IdentityComparison => "identity-comparison",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Bug::BoundsViolation => "Array index out of bounds",
            Bug::NullDereference => "Null pointer dereference",
            Bug::UninitializedPointer => "Dereferencing an uninitialized pointer",
            Bug::UninitializedValue => "Reading an uninitialized variable",
            Bug::DoubleRelease => "Double free",
            Bug::LeakAfterRelease => "Losing the tail of a list",
            Bug::MismatchedRelease => "Freeing stack memory",
            Bug::UseAfterRelease => "Use after free",
            Bug::AliasedRelease => "Use after free through a copy",
            Bug::IdentityComparison => "Comparing pointers instead of values",
        }
    }

    /// What the routine does wrong
    pub fn violation(self) -> &'static str {
        match self {
            Bug::BoundsViolation => "the loop runs while i <= size, so it touches arr[size]",
            Bug::NullDereference => "node->next is null and is dereferenced anyway",
            Bug::UninitializedPointer => "a pointer is read through before it is ever assigned",
            Bug::UninitializedValue => "&x is fine, but x is read before it is ever assigned",
            Bug::DoubleRelease => "the same node is deleted twice",
            Bug::LeakAfterRelease => "the head is deleted while it holds the only pointer to the tail",
            Bug::MismatchedRelease => "delete is called on the address of a stack variable",
            Bug::UseAfterRelease => "a node is written through after it was deleted",
            Bug::AliasedRelease => "a node is deleted through one pointer and written through a copy",
            Bug::IdentityComparison => "two pointers to equal ints are compared with ==",
        }
    }

    /// How to avoid it
    pub fn lesson(self) -> &'static str {
        match self {
            Bug::BoundsViolation => "loop while i < size; the last valid index is size - 1",
            Bug::NullDereference => "check a pointer against null before every dereference",
            Bug::UninitializedPointer => "initialize pointers where they are declared",
            Bug::UninitializedValue => "initialize variables where they are declared",
            Bug::DoubleRelease => "delete exactly once, then set the pointer to null",
            Bug::LeakAfterRelease => "save node->next before deleting node",
            Bug::MismatchedRelease => "only delete what was allocated with new",
            Bug::UseAfterRelease => "delete only when done, then set the pointer to null",
            Bug::AliasedRelease => "every copy of a pointer dangles once any copy is deleted",
            Bug::IdentityComparison => "compare *first == *second to compare the values",
        }
    }

    pub fn class(self) -> FaultClass {
        match self {
            Bug::NullDereference | Bug::DoubleRelease | Bug::MismatchedRelease => {
                FaultClass::Termination
            }
            Bug::BoundsViolation
            | Bug::UninitializedPointer
            | Bug::UninitializedValue
            | Bug::UseAfterRelease
            | Bug::AliasedRelease => FaultClass::Undefined,
            Bug::LeakAfterRelease => FaultClass::SilentLeak,
            Bug::IdentityComparison => FaultClass::SilentLogicError,
        }
    }
}

impl fmt::Display for Bug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown routine '{0}' (try --list)")]
pub struct ParseBugError(pub String);

impl FromStr for Bug {
    type Err = ParseBugError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Bug::ALL
            .into_iter()
            .find(|bug| bug.name() == s)
            .ok_or_else(|| ParseBugError(s.to_string()))
    }
}

/// Result of one checked run
#[derive(Debug)]
pub struct Trace {
    pub bug: Bug,
    /// The first violation, if the routine committed one
    pub fault: Option<RuntimeError>,
    /// Blocks still allocated once the routine returned. Only collected when
    /// the routine ran to completion.
    pub leaks: Vec<Address>,
    /// Console output, one entry per line
    pub output: Vec<String>,
    /// Statements that completed
    pub steps: usize,
    pub history: SnapshotManager,
}

impl Trace {
    /// Completed with no violation and no leak
    pub fn is_clean(&self) -> bool {
        self.fault.is_none() && self.leaks.is_empty()
    }

    /// Statement number of the violation
    pub fn fault_step(&self) -> Option<usize> {
        self.fault
            .as_ref()
            .and_then(|fault| fault.location())
            .map(|location| location.step)
    }
}

/// Replay `bug` on a fresh checked machine
pub fn trace(bug: Bug, config: &Config) -> Trace {
    run_script(bug, checked::script(bug), config)
}

/// Replay the mitigated version of `bug`: the pointer is set to null right
/// after it is released. Only the routines where that helps have one.
pub fn trace_mitigated(bug: Bug, config: &Config) -> Option<Trace> {
    checked::mitigated_script(bug).map(|script| run_script(bug, script, config))
}

fn run_script(bug: Bug, script: checked::Script, config: &Config) -> Trace {
    log::info!("tracing {}", bug);
    let mut machine = Machine::new(config);

    let result = machine
        .enter(bug.name())
        .and_then(|()| script(&mut machine))
        .and_then(|()| machine.leave());

    let (fault, leaks) = match result {
        Ok(()) => (None, machine.unreachable()),
        Err(fault) => {
            log::warn!("{}: {}", bug, fault);
            (Some(fault), Vec::new())
        }
    };
    for leak in &leaks {
        log::warn!("{}: block 0x{:x} was never released", bug, leak);
    }

    let output = machine.console().get_output();
    let history = machine.into_history();
    Trace {
        bug,
        fault,
        leaks,
        output,
        // The first snapshot is the state before any statement
        steps: history.len().saturating_sub(1),
        history,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for bug in Bug::ALL {
            assert_eq!(bug.name().parse::<Bug>(), Ok(bug));
        }
        assert_eq!(
            "segfault".parse::<Bug>(),
            Err(ParseBugError("segfault".to_string()))
        );
    }

    #[test]
    fn test_default_is_aliased_release() {
        assert_eq!(Bug::default(), Bug::AliasedRelease);
    }

    #[test]
    fn test_fault_classes() {
        let count = |class| Bug::ALL.iter().filter(|bug| bug.class() == class).count();
        assert_eq!(count(FaultClass::Termination), 3);
        assert_eq!(count(FaultClass::Undefined), 5);
        assert_eq!(count(FaultClass::SilentLeak), 1);
        assert_eq!(count(FaultClass::SilentLogicError), 1);
    }

    #[test]
    fn test_every_checked_run_starts_from_an_initial_snapshot() {
        for bug in Bug::ALL {
            let trace = trace(bug, &Config::default());
            let first = trace.history.get(0).expect("initial snapshot");
            assert!(first.location.is_none(), "{}", bug);
            assert_eq!(first.stack.depth(), 1, "{}", bug);
        }
    }
}

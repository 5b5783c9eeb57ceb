// Tests that drive the built binary

use std::process::{Command, Output};

fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_pointer-pitfalls"))
        .args(args)
        .output()
        .expect("failed to launch binary")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_default_run_is_checked_aliased_release() {
    let output = run(&[]);
    let text = stdout(&output);

    assert!(output.status.success());
    assert!(text.starts_with("Use after free through a copy (undefined behavior)"));
    assert!(text.contains("violation: Use-after-free"));
    assert!(text.contains("`nodeCopy->value = 2`"));
}

#[test]
fn test_list() {
    let output = run(&["--list"]);
    let text = stdout(&output);

    assert!(output.status.success());
    assert_eq!(text.lines().count(), 10);
    assert!(text.contains("bounds-violation"));
    assert!(text.contains("identity-comparison"));
}

#[test]
fn test_checked_bounds_prints_array_then_overrun() {
    let output = run(&["bounds-violation"]);
    let text = stdout(&output);

    assert!(text.contains("  | 0 1 2 3 4 5 6 7 8 9 \n"));
    assert!(text.contains("index 10 out of bounds for size 10"));
}

#[test]
fn test_unknown_routine_is_rejected() {
    let output = run(&["segfault"]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown routine 'segfault'"));
}

#[test]
fn test_fixed_mode() {
    let output = run(&["double-release", "--mode", "fixed"]);
    let text = stdout(&output);

    assert!(output.status.success());
    assert!(text.contains("first release freed: true, second release freed: false"));
}

#[test]
fn test_raw_identity_comparison_is_wrong_but_runs() {
    let output = run(&["identity-comparison", "--mode", "raw"]);

    assert!(output.status.success());
    assert!(stdout(&output).contains("The two values are not equal."));
}

#[test]
fn test_raw_leak_runs_to_completion() {
    let output = run(&["leak-after-release", "--mode", "raw"]);

    assert!(output.status.success());
}

// The deterministic-termination routines, run for real in a child process
#[cfg(all(target_os = "linux", target_env = "gnu"))]
mod raw_termination {
    use super::*;

    #[test]
    fn test_raw_null_dereference_terminates() {
        let output = run(&["null-dereference", "--mode", "raw"]);
        assert!(!output.status.success());
    }

    #[test]
    fn test_raw_double_release_terminates() {
        let output = run(&["double-release", "--mode", "raw"]);
        assert!(!output.status.success());
    }

    #[test]
    fn test_raw_mismatched_release_terminates() {
        let output = run(&["mismatched-release", "--mode", "raw"]);
        assert!(!output.status.success());
    }
}

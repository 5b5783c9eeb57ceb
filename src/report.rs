//! Terminal rendering of a checked run

use crate::catalog::{Bug, Trace};
use crossterm::queue;
use crossterm::style::{Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor};
use std::io::{self, Write};

fn styled(out: &mut impl Write, color: Option<Color>, text: &str) -> io::Result<()> {
    match color {
        Some(color) => queue!(out, SetForegroundColor(color), Print(text), ResetColor),
        None => queue!(out, Print(text)),
    }
}

/// Header line: title and how the bug shows up outside the checker
pub fn render_header(bug: Bug, out: &mut impl Write, color: bool) -> io::Result<()> {
    if color {
        queue!(out, SetAttribute(Attribute::Bold))?;
    }
    queue!(out, Print(format!("{} ({})\n", bug.title(), bug.class())))?;
    if color {
        queue!(out, SetAttribute(Attribute::Reset))?;
    }
    queue!(out, Print(format!("  {}\n", bug.violation())))
}

/// Write the program output, the verdict and the lesson of a checked run
pub fn render(trace: &Trace, out: &mut impl Write, color: bool) -> io::Result<()> {
    let paint = |c: Color| color.then_some(c);

    render_header(trace.bug, out, color)?;
    for line in &trace.output {
        queue!(out, Print(format!("  | {}\n", line)))?;
    }

    match &trace.fault {
        Some(fault) => styled(out, paint(Color::Red), &format!("  violation: {}\n", fault))?,
        None if !trace.leaks.is_empty() => {
            for leak in &trace.leaks {
                styled(
                    out,
                    paint(Color::Yellow),
                    &format!("  leak: block 0x{:x} was never released\n", leak),
                )?;
            }
        }
        None => styled(out, paint(Color::Green), "  completed with no memory error\n")?,
    }

    queue!(
        out,
        Print(format!("  {} statement(s) completed\n", trace.steps)),
        Print(format!("  fix: {}\n", trace.bug.lesson()))
    )?;
    out.flush()
}

/// One line per routine: name, class, title
pub fn render_catalog(out: &mut impl Write) -> io::Result<()> {
    for bug in Bug::ALL {
        let marker = if bug == Bug::default() { "*" } else { " " };
        queue!(
            out,
            Print(format!(
                "{}{:<22} {:<21} {}\n",
                marker,
                bug.name(),
                bug.class().to_string(),
                bug.title()
            ))
        )?;
    }
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::trace;
    use crate::config::Config;

    fn rendered(bug: Bug) -> String {
        let trace = trace(bug, &Config::default());
        let mut out = Vec::new();
        render(&trace, &mut out, false).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_render_fault() {
        let text = rendered(Bug::DoubleRelease);
        assert!(text.starts_with("Double free (abnormal termination)\n"));
        assert!(text.contains("violation: Double free at address 0x10000000 at step 3 (`delete node`)"));
        assert!(!text.contains('\u{1b}'));
    }

    #[test]
    fn test_render_leak() {
        let text = rendered(Bug::LeakAfterRelease);
        assert!(text.contains("leak: block 0x10000010 was never released"));
        assert!(text.contains("fix: save node->next before deleting node"));
    }

    #[test]
    fn test_render_clean_run_with_output() {
        let text = rendered(Bug::IdentityComparison);
        assert!(text.contains("  | The two values are not equal.\n"));
        assert!(text.contains("completed with no memory error"));
    }

    #[test]
    fn test_catalog_marks_the_default() {
        let mut out = Vec::new();
        render_catalog(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), Bug::ALL.len());
        assert!(text.lines().any(|line| line.starts_with("*aliased-release")));
    }
}

// pointer-pitfalls: run one routine from the catalog

use std::io::{self, IsTerminal, Write};

use anyhow::Result;
use clap::{Parser, ValueEnum};

use pointer_pitfalls::catalog::{self, fixed, raw, Bug};
use pointer_pitfalls::config::Config;
use pointer_pitfalls::report;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Replay on the checked machine and report the violation
    Checked,
    /// Run the unchecked code for real (undefined behavior)
    Raw,
    /// Run the corrected version
    Fixed,
}

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    /// Routine to run (see --list)
    #[clap(default_value_t = Bug::default())]
    routine: Bug,

    /// Which version of the routine to run
    #[clap(long, short, value_enum, default_value = "checked")]
    mode: Mode,

    /// List the routines and exit
    #[clap(long, short)]
    list: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let mut stdout = io::stdout();

    if cli.list {
        report::render_catalog(&mut stdout)?;
        return Ok(());
    }

    log::info!("{} in {:?} mode", cli.routine, cli.mode);
    match cli.mode {
        Mode::Checked => {
            let trace = catalog::trace(cli.routine, &Config::default());
            let color = stdout.is_terminal();
            report::render(&trace, &mut stdout, color)?;
        }
        Mode::Raw => {
            report::render_header(cli.routine, &mut stdout, false)?;
            stdout.flush()?;
            // SAFETY: none. Raw mode exists to show what the mistake does.
            unsafe { raw::run(cli.routine) };
        }
        Mode::Fixed => {
            report::render_header(cli.routine, &mut stdout, false)?;
            fixed::run(cli.routine, &mut stdout)?;
        }
    }

    Ok(())
}

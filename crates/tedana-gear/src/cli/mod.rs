//! Command-line interface for tedana-gear.
//!
//! The platform launches the gear with no arguments (`run` against the
//! default base directory); the remaining commands exist for debugging a
//! gear build locally.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{ConfigCommand, RunCommand};

/// tedana-gear - run multi-echo fMRI denoising as a platform analysis
///
/// Discovers multi-echo inputs, runs the tedana workflow once per
/// acquisition, and publishes portable HTML reports and a zipped analysis
/// tree back to the platform.
#[derive(Debug, Parser)]
#[command(name = "tedana-gear")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Gear base directory (invocation file, input/output/work trees)
    #[arg(short, long, global = true, value_name = "DIR")]
    pub base_dir: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the denoising workflow (the platform entry point)
    Run(RunCommand),

    /// Inspect or validate the gear configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }
}

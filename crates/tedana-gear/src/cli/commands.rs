//! CLI command definitions.

use std::path::PathBuf;

use clap::{Args, Subcommand};

/// Run command arguments.
#[derive(Debug, Args)]
pub struct RunCommand {
    /// Log the tedana command lines without executing anything
    #[arg(long)]
    pub dry_run: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show the effective gear settings
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the invocation file path
    Path,

    /// Validate an invocation file
    Validate {
        /// Invocation file to validate (defaults to the base directory's)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_command_debug() {
        let cmd = RunCommand { dry_run: true };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("dry_run"));
    }

    #[test]
    fn test_config_command_debug() {
        let cmd = ConfigCommand::Show { json: false };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("Show"));
    }
}

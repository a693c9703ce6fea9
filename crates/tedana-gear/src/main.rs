//! `tedana-gear` - gear entry point
//!
//! This binary is what the platform launches inside the gear container. It
//! also doubles as a local debugging tool for inspecting a gear build.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use tracing::info;

use tedana_gear::cli::{Cli, Command, ConfigCommand, RunCommand};
use tedana_gear::context::{CONFIG_FILE_NAME, DEFAULT_BASE_DIR};
use tedana_gear::{init_logging, pipeline, AppConfig, GearContext};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Command::Run(run_cmd) => handle_run(&cli, run_cmd),
        Command::Config(config_cmd) => handle_config(&cli, config_cmd),
    }
}

fn base_dir(cli: &Cli) -> PathBuf {
    cli.base_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_BASE_DIR))
}

fn handle_run(cli: &Cli, cmd: &RunCommand) -> anyhow::Result<()> {
    let base = base_dir(cli);
    let config_path = base.join(CONFIG_FILE_NAME);

    let mut config = AppConfig::load(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    init_logging(cli.verbosity().with_debug_flag(config.debug));

    if cmd.dry_run {
        config.gear_dry_run = true;
    }

    let ctx = GearContext::load(&base)?;
    pipeline::run(&ctx, &config)?;
    info!("Workflow finished");
    Ok(())
}

fn handle_config(cli: &Cli, cmd: &ConfigCommand) -> anyhow::Result<()> {
    init_logging(cli.verbosity());
    let base = base_dir(cli);
    let config_path = base.join(CONFIG_FILE_NAME);

    match cmd {
        ConfigCommand::Show { json } => {
            let config = AppConfig::load(&config_path)?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                println!("Effective Gear Settings");
                println!("=======================");
                println!();
                println!("Debug:             {}", config.debug);
                println!("Dry run:           {}", config.gear_dry_run);
                println!("Output layout:     {}", config.output_layout);
                println!("Explicit mask:     {}", config.explicit_mask);
                println!(
                    "Echo times:        {}",
                    config.echo_times.as_deref().unwrap_or("(from sidecars)")
                );
                println!(
                    "Extra arguments:   {}",
                    config.command_line_args.as_deref().unwrap_or("(none)")
                );
            }
        }
        ConfigCommand::Path => {
            println!("{}", config_path.display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.clone().unwrap_or(config_path);
            println!("Validating invocation: {}", path.display());
            match AppConfig::load(&path) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}

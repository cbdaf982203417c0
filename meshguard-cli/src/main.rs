//! meshguard CLI - command-line interface
//!
//! Runs the bed mesh freshness daemon and a few one-shot helpers around it.

mod commands;
mod error;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::error::CliError;

#[derive(Debug, Parser)]
#[command(name = "meshguard")]
#[command(author, version, about = "Keeps Klipper bed mesh calibration from going stale", long_about = None)]
struct Cli {
    /// Settings file (defaults to ~/.config/meshguard/config.ini)
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Watch printer.cfg and demote stale meshes until interrupted (default)
    Run,

    /// Run a single staleness check and exit
    Check,

    /// Show the mesh timestamp and the bed mesh profiles in printer.cfg
    Status,

    /// Write a settings file populated with the defaults
    Init {
        /// Overwrite an existing settings file
        #[arg(long)]
        force: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    let settings = commands::common::settings_file(cli.config);

    let result: Result<(), CliError> = match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => commands::run::run(&settings),
        Commands::Check => commands::check::run(&settings),
        Commands::Status => commands::status::run(&settings),
        Commands::Init { force } => commands::init::run(&settings, force),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

//! S4Pack CLI - Command-line interface for Sims 4 package tools

pub mod commands;

use std::path::PathBuf;

use clap::Parser;
use commands::Commands;

use crate::config::Settings;

#[derive(Parser)]
#[command(name = "s4pack")]
#[command(about = "S4Pack: Sims 4 package tools for translators", long_about = None)]
struct Cli {
    /// Settings file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Run the S4Pack CLI
pub fn run_cli() -> anyhow::Result<()> {
    // Setup logging
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let settings = match &cli.config {
        Some(path) => Settings::load(path)?,
        None => Settings::load_or_default()?,
    };
    cli.command.execute(settings)?;

    Ok(())
}

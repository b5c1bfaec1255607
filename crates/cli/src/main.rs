mod commands;
mod config_file;
mod error_presentation;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::{
    commands::{AutopartitionArgs, MakemigrationsArgs, PartitionArgs},
    error_presentation::{CliResult, render_runtime_error},
};

const DEFAULT_LOG_FILTER: &str = "warn";

#[derive(Debug, Parser)]
#[command(name = "pgextra", version, about = "PostgreSQL partitioning and migration helpers")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create new partitions and delete old ones using the configured strategies
    Partition(PartitionArgs),
    /// Create range partitions ahead of time for one model
    Autopartition(AutopartitionArgs),
    /// Print the migration operations between two model sets as JSON
    Makemigrations(MakemigrationsArgs),
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Err(error) = run(&cli.command) {
        eprintln!("{}", render_runtime_error(error));
        std::process::exit(1);
    }
}

fn run(command: &Command) -> CliResult<()> {
    match command {
        Command::Partition(args) => commands::partition(args),
        Command::Autopartition(args) => commands::autopartition(args),
        Command::Makemigrations(args) => commands::makemigrations(args),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_LOG_FILTER))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

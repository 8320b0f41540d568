mod commands;
mod config;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{check, menu, normalize, state, CheckArgs, MenuArgs, NormalizeArgs, StateArgs};
use tracing_subscriber::EnvFilter;

/// Folio CLI - inspect and repair structured rich-text documents
#[derive(Parser, Debug)]
#[command(name = "folio")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Report structural and component problems in a document
    Check(CheckArgs),

    /// Write the normalized form of a document
    Normalize(NormalizeArgs),

    /// Print the feature state for a selection as JSON
    State(StateArgs),

    /// Show the insert menu for a `/` trigger
    Menu(MenuArgs),
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = std::env::current_dir()
        .map_err(anyhow::Error::from)
        .and_then(|cwd| match cli.command {
            Command::Check(args) => check(args, &cwd),
            Command::Normalize(args) => normalize(args, &cwd),
            Command::State(args) => state(args, &cwd),
            Command::Menu(args) => menu(args, &cwd),
        });

    if let Err(err) = result {
        eprintln!();
        eprintln!("{} {:#}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}

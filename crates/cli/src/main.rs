//! miniledger CLI entry point.

use clap::Parser;
use std::path::PathBuf;
use tracing::Level;

mod commands;
mod config;

#[derive(Parser)]
#[command(name = "miniledger")]
#[command(about = "A minimal ledger with proof-of-work and proof-of-stake sealing", long_about = None)]
struct Cli {
    /// JSON file with driver defaults (difficulty, workers, validators, ...)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<commands::Commands>,
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Some(cmd) => {
            if let Err(e) = commands::run(cmd, cli.config.as_deref()) {
                eprintln!("Error: {:#}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("miniledger - A minimal append-only ledger");
            println!("Run 'miniledger --help' for usage information.");
        }
    }
}

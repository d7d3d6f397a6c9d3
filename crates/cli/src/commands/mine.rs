//! Proof of work command.

use super::{parse_transaction, print_block, transactions_or_demo};
use crate::config::DriverConfig;
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use miniledger_chain::Chain;
use miniledger_consensus::ProofOfWork;
use miniledger_core::Transaction;
use std::time::Instant;

#[derive(Args)]
pub struct MineArgs {
    /// Required number of leading hex zeros
    #[arg(short, long)]
    difficulty: Option<usize>,

    /// Give up after this many hash evaluations
    #[arg(long)]
    max_attempts: Option<u64>,

    /// Number of mining workers
    #[arg(short, long)]
    workers: Option<usize>,

    /// Transaction as sender,receiver,amount[,id] (repeatable)
    #[arg(long = "tx", value_parser = parse_transaction)]
    transactions: Vec<Transaction>,

    /// Print the resulting chain as JSON
    #[arg(long)]
    json: bool,
}

pub fn run(args: MineArgs, config: &DriverConfig) -> Result<()> {
    let mut pow_config = config.pow_config();
    if let Some(difficulty) = args.difficulty {
        pow_config.difficulty = difficulty;
    }
    if let Some(max_attempts) = args.max_attempts {
        pow_config.max_attempts = Some(max_attempts);
    }
    if let Some(workers) = args.workers {
        pow_config.workers = workers.max(1);
    }
    let difficulty = pow_config.difficulty;
    let pow = ProofOfWork::new(pow_config);

    let mut chain = Chain::new();
    let mut block = chain.next_block(transactions_or_demo(args.transactions));

    if !args.json {
        println!(
            "{}",
            format!("Mining block with difficulty {}...", difficulty)
                .bold()
                .cyan()
        );
    }

    let start = Instant::now();
    let attempts = pow.seal(&mut block).context("Mining failed")?;
    let elapsed = start.elapsed();

    chain.append(block);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&chain)?);
        return Ok(());
    }

    println!();
    println!("{}  Block mined", "✓".green().bold());
    print_block(chain.last_block());
    println!("  Attempts:     {}", attempts.to_string().bright_cyan());
    println!("  Time:         {} ms", elapsed.as_millis().to_string().bright_cyan());
    println!();

    let valid = chain.is_valid();
    println!(
        "  Chain valid:  {}",
        if valid { "yes".green() } else { "no".red() }
    );
    println!();
    Ok(())
}

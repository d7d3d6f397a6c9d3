//! Proof of stake command.

use super::{parse_stake, parse_transaction, print_block, transactions_or_demo};
use crate::config::DriverConfig;
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use miniledger_chain::Chain;
use miniledger_consensus::{ProofOfStake, Stake};
use miniledger_core::Transaction;
use std::time::Instant;

#[derive(Args)]
pub struct StakeArgs {
    /// Validator as NAME=WEIGHT (repeatable; config registry when omitted)
    #[arg(long = "validator", value_parser = parse_stake)]
    validators: Vec<Stake>,

    /// Seed for a reproducible draw
    #[arg(short, long)]
    seed: Option<u64>,

    /// Transaction as sender,receiver,amount[,id] (repeatable)
    #[arg(long = "tx", value_parser = parse_transaction)]
    transactions: Vec<Transaction>,

    /// Print the resulting chain as JSON
    #[arg(long)]
    json: bool,
}

pub fn run(args: StakeArgs, config: &DriverConfig) -> Result<()> {
    let stakes = if args.validators.is_empty() {
        config.validators.clone()
    } else {
        args.validators
    };
    let mut pos_config = config.pos_config();
    if args.seed.is_some() {
        pos_config.seed = args.seed;
    }

    let mut pos = ProofOfStake::new(stakes, &pos_config).context("Invalid stake registry")?;

    let mut chain = Chain::new();
    let mut block = chain.next_block(transactions_or_demo(args.transactions));

    let start = Instant::now();
    let validator = pos.validate(&mut block).context("Validator selection failed")?;
    let elapsed = start.elapsed();

    chain.append(block);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&chain)?);
        return Ok(());
    }

    println!();
    println!("{}", "Validators:".bold().cyan());
    for stake in pos.stakes() {
        println!("  {:<16} {}", stake.name, stake.weight.to_string().bright_black());
    }
    println!();
    println!(
        "{}  Block validated by {}",
        "✓".green().bold(),
        validator.bright_green()
    );
    print_block(chain.last_block());
    println!("  Time:         {} µs", elapsed.as_micros().to_string().bright_cyan());
    println!();
    Ok(())
}

//! CLI commands module.

use crate::config::DriverConfig;
use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Subcommand;
use colored::Colorize;
use miniledger_consensus::Stake;
use miniledger_core::{Block, Transaction};
use std::path::Path;

mod compare;
mod hash;
mod merkle;
mod mine;
mod stake;
mod tamper;

#[derive(Subcommand)]
pub enum Commands {
    /// Hash text with SHA-256
    Hash(hash::HashArgs),
    /// Compute the merkle root of a transaction list
    Merkle(merkle::MerkleArgs),
    /// Seal a block by proof of work
    Mine(mine::MineArgs),
    /// Seal a block by proof of stake
    Stake(stake::StakeArgs),
    /// Time proof of work against proof of stake
    Compare(compare::CompareArgs),
    /// Build a chain, tamper with it, and audit it
    Tamper(tamper::TamperArgs),
}

pub fn run(cmd: Commands, config_path: Option<&Path>) -> Result<()> {
    let config = DriverConfig::load(config_path)?;

    match cmd {
        Commands::Hash(args) => hash::run(args),
        Commands::Merkle(args) => merkle::run(args),
        Commands::Mine(args) => mine::run(args, &config),
        Commands::Stake(args) => stake::run(args, &config),
        Commands::Compare(args) => compare::run(args, &config),
        Commands::Tamper(args) => tamper::run(args, &config),
    }
}

/// Parse `sender,receiver,amount[,id]`.
pub(crate) fn parse_transaction(s: &str) -> std::result::Result<Transaction, String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    let (sender, receiver, amount, id) = match parts.as_slice() {
        [sender, receiver, amount] => (*sender, *receiver, *amount, None),
        [sender, receiver, amount, id] => (*sender, *receiver, *amount, Some(*id)),
        _ => return Err(format!("expected sender,receiver,amount[,id], got '{}'", s)),
    };
    let amount: f64 = amount
        .parse()
        .map_err(|_| format!("invalid amount '{}'", amount))?;
    if !amount.is_finite() {
        return Err(format!("amount must be finite, got '{}'", amount));
    }

    Ok(match id {
        Some(id) => Transaction::with_id(id, sender, receiver, amount),
        None => Transaction::new(sender, receiver, amount),
    })
}

/// Parse `NAME=WEIGHT`.
pub(crate) fn parse_stake(s: &str) -> std::result::Result<Stake, String> {
    let (name, weight) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=WEIGHT, got '{}'", s))?;
    let weight: f64 = weight
        .trim()
        .parse()
        .map_err(|_| format!("invalid stake weight '{}'", weight))?;
    Ok(Stake::new(name.trim(), weight))
}

/// The transfers used when none are given on the command line.
pub(crate) fn demo_transactions() -> Vec<Transaction> {
    vec![
        Transaction::with_id("T1", "Diae", "Aymane", 5.0),
        Transaction::with_id("T2", "Aymane", "Mouad", 3.5),
        Transaction::with_id("T3", "Imad", "Smail", 2.0),
    ]
}

pub(crate) fn transactions_or_demo(transactions: Vec<Transaction>) -> Vec<Transaction> {
    if transactions.is_empty() {
        demo_transactions()
    } else {
        transactions
    }
}

fn format_timestamp(millis: u64) -> String {
    i64::try_from(millis)
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| millis.to_string())
}

pub(crate) fn print_block(block: &Block) {
    println!("  Index:        {}", block.index.to_string().bright_cyan());
    println!("  Hash:         {}", block.hash().to_hex().bright_yellow());
    println!("  Prev Hash:    {}", block.prev_hash.to_hex().bright_black());
    println!("  Merkle Root:  {}", block.merkle_root().to_hex().bright_black());
    println!(
        "  Timestamp:    {}",
        format_timestamp(block.timestamp).bright_black()
    );
    println!("  Nonce:        {}", block.nonce().to_string().bright_cyan());
    if block.is_pos_validated() {
        println!("  Validator:    {}", block.validator().bright_green());
    }
    println!(
        "  Transactions: {}",
        block.tx_count().to_string().bright_cyan()
    );
    for (i, tx) in block.transactions.iter().enumerate() {
        println!("    {} {}", format!("{}.", i + 1).bright_black(), tx);
    }
}

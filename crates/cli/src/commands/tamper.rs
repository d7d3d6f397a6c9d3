//! Tamper detection demonstration command.
//!
//! The chain is exported to JSON, one amount is edited in the export, and
//! the re-imported chain is audited.

use super::demo_transactions;
use crate::config::DriverConfig;
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use miniledger_chain::Chain;
use miniledger_consensus::ProofOfWork;

#[derive(Args)]
pub struct TamperArgs {
    /// Required number of leading hex zeros per block
    #[arg(short, long)]
    difficulty: Option<usize>,

    /// Number of blocks to mine before tampering
    #[arg(short, long, default_value = "3")]
    blocks: usize,

    /// Block to edit
    #[arg(short, long, default_value = "1")]
    target: usize,

    /// New amount for the block's first transaction
    #[arg(short, long, default_value = "50.0")]
    amount: f64,
}

pub fn run(args: TamperArgs, config: &DriverConfig) -> Result<()> {
    let mut pow_config = config.pow_config();
    if let Some(difficulty) = args.difficulty {
        pow_config.difficulty = difficulty;
    }
    let pow = ProofOfWork::new(pow_config);

    let mut chain = Chain::new();
    for _ in 0..args.blocks {
        let mut block = chain.next_block(demo_transactions());
        pow.seal(&mut block).context("Mining failed")?;
        chain.try_append(block)?;
    }

    println!();
    println!(
        "{}  Mined {} blocks, chain {}",
        "✓".green().bold(),
        args.blocks,
        if chain.is_valid() { "valid".green() } else { "INVALID".red() }
    );

    let mut exported = serde_json::to_value(&chain)?;
    let amount = exported
        .get_mut(args.target)
        .and_then(|block| block.get_mut("transactions"))
        .and_then(|txs| txs.get_mut(0))
        .and_then(|tx| tx.get_mut("amount"))
        .with_context(|| format!("Block {} has no transaction to edit", args.target))?;
    println!(
        "  Editing block {} amount {} -> {}",
        args.target,
        amount.to_string().bright_black(),
        args.amount.to_string().bright_yellow()
    );
    *amount = serde_json::json!(args.amount);

    let tampered: Chain = serde_json::from_value(exported).context("Failed to re-import chain")?;
    match tampered.verify() {
        Ok(()) => println!("{}  Audit passed (edit left the block unchanged)", "!".yellow().bold()),
        Err(invalid) => println!("{}  Audit failed: {}", "✗".red().bold(), invalid),
    }
    println!();
    Ok(())
}

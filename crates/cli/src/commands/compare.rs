//! Proof of work versus proof of stake timing command.

use super::demo_transactions;
use crate::config::DriverConfig;
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use miniledger_chain::Chain;
use miniledger_consensus::{Finality, Finalizer, ProofOfStake, ProofOfWork};
use std::time::{Duration, Instant};

#[derive(Args)]
pub struct CompareArgs {
    /// Required number of leading hex zeros for the mined block
    #[arg(short, long)]
    difficulty: Option<usize>,

    /// Seed for a reproducible validator draw
    #[arg(short, long)]
    seed: Option<u64>,
}

/// Seal one block on a fresh chain and time the finalizer alone.
fn timed_round(finalizer: &mut dyn Finalizer) -> Result<(Chain, Finality, Duration)> {
    let mut chain = Chain::new();
    let mut block = chain.next_block(demo_transactions());

    let start = Instant::now();
    let finality = finalizer.finalize(&mut block)?;
    let elapsed = start.elapsed();

    chain.append(block);
    Ok((chain, finality, elapsed))
}

fn validity(chain: &Chain) -> colored::ColoredString {
    if chain.is_valid() {
        "valid".green()
    } else {
        "INVALID".red()
    }
}

pub fn run(args: CompareArgs, config: &DriverConfig) -> Result<()> {
    let mut pow_config = config.pow_config();
    if let Some(difficulty) = args.difficulty {
        pow_config.difficulty = difficulty;
    }
    let mut pos_config = config.pos_config();
    if args.seed.is_some() {
        pos_config.seed = args.seed;
    }

    println!();
    println!(
        "{}",
        format!("Mining (proof of work, difficulty {})...", pow_config.difficulty)
            .bold()
            .cyan()
    );
    let mut pow = ProofOfWork::new(pow_config);
    let (pow_chain, pow_finality, pow_time) = timed_round(&mut pow).context("Mining failed")?;
    if let Finality::Work { nonce, attempts } = pow_finality {
        println!("  Nonce:    {}", nonce.to_string().bright_cyan());
        println!("  Attempts: {}", attempts.to_string().bright_cyan());
    }
    println!("  Hash:     {}", pow_chain.last_block().hash().to_hex().bright_yellow());
    println!("  Time:     {:?}", pow_time);

    println!();
    println!("{}", "Selecting validator (proof of stake)...".bold().cyan());
    let mut pos = ProofOfStake::new(config.validators.clone(), &pos_config)
        .context("Invalid stake registry")?;
    let (pos_chain, pos_finality, pos_time) =
        timed_round(&mut pos).context("Validator selection failed")?;
    if let Finality::Stake { validator } = pos_finality {
        println!("  Validator: {}", validator.bright_green());
    }
    println!("  Hash:      {}", pos_chain.last_block().hash().to_hex().bright_yellow());
    println!("  Time:      {:?}", pos_time);

    println!();
    println!("{}", "Summary:".bold());
    println!("  Proof of work:  {:?}", pow_time);
    println!("  Proof of stake: {:?}", pos_time);
    let faster = if pow_time > pos_time {
        "proof of stake"
    } else {
        "proof of work"
    };
    println!("  Faster:         {}", faster.bright_green());
    println!();
    println!("  PoW chain: {}", validity(&pow_chain));
    println!("  PoS chain: {}", validity(&pos_chain));
    println!();
    Ok(())
}

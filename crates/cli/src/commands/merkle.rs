//! Merkle root command.

use super::{parse_transaction, transactions_or_demo};
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use miniledger_core::{MerkleTree, Transaction};

#[derive(Args)]
pub struct MerkleArgs {
    /// Transactions as sender,receiver,amount[,id] (demo set when omitted)
    #[arg(value_parser = parse_transaction)]
    transactions: Vec<Transaction>,

    /// Print and check an inclusion proof for this leaf index
    #[arg(short, long)]
    prove: Option<usize>,
}

pub fn run(args: MerkleArgs) -> Result<()> {
    let transactions = transactions_or_demo(args.transactions);
    let tree = MerkleTree::from_transactions(&transactions);

    println!();
    println!("{}", "Transactions:".bold().cyan());
    for (i, tx) in transactions.iter().enumerate() {
        println!(
            "  {} {} {}",
            format!("{}.", i).bright_black(),
            tx.hash().to_hex()[..16].bright_yellow(),
            tx
        );
    }
    println!();
    println!("  Merkle Root: {}", tree.root().to_hex().bright_yellow());

    if let Some(index) = args.prove {
        let proof = tree
            .proof(index)
            .with_context(|| format!("No leaf at index {}", index))?;

        println!();
        println!("{}", format!("Proof for leaf {}:", index).bold());
        for (level, (sibling, on_right)) in proof
            .siblings
            .iter()
            .zip(&proof.sibling_on_right)
            .enumerate()
        {
            let side = if *on_right { "right" } else { "left" };
            println!(
                "  {} {} ({})",
                format!("L{}", level).bright_black(),
                sibling.to_hex().bright_black(),
                side
            );
        }
        if tree.verify_proof(&proof) {
            println!("{}  Proof verifies against root", "✓".green().bold());
        } else {
            println!("{}  Proof does not verify", "✗".red().bold());
        }
    }

    println!();
    Ok(())
}

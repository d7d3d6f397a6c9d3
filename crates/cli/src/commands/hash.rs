//! Hash command.

use anyhow::Result;
use clap::Args;
use miniledger_core::digest_hex;

#[derive(Args)]
pub struct HashArgs {
    /// Text to hash
    text: String,
}

pub fn run(args: HashArgs) -> Result<()> {
    println!("{}", digest_hex(args.text.as_bytes()));
    Ok(())
}

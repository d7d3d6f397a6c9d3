//! Chain management for miniledger.
//!
//! This crate holds the ordered block list and its integrity audit:
//! - **Genesis**: every chain starts from a fixed placeholder block
//! - **Append**: blocks are pushed at the tip, never edited or removed
//! - **Verify**: links, hashes and merkle roots are recomputed to find tampering
//!
//! # Example
//!
//! ```rust,no_run
//! use miniledger_chain::Chain;
//! use miniledger_core::Transaction;
//!
//! let mut chain = Chain::new();
//!
//! let mut block = chain.next_block(vec![Transaction::new("Diae", "Aymane", 5.0)]);
//! block.mine(4).unwrap();
//! chain.append(block);
//!
//! assert!(chain.is_valid());
//! ```

pub mod blockchain;

// Re-export commonly used types
pub use blockchain::{Chain, ChainError, ChainStats, IntegrityFault, InvalidBlock};

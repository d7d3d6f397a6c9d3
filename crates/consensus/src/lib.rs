//! Block sealing protocols for miniledger.
//!
//! This crate provides the two ways a block can be finalized:
//! - **Proof of Work**: nonce search against a leading-zero difficulty,
//!   single-threaded or striped across a worker pool
//! - **Proof of Stake**: stake-weighted random choice of one validator
//!
//! # Example
//!
//! ```rust,no_run
//! use miniledger_consensus::{Finalizer, PosConfig, PowConfig, ProofOfStake, ProofOfWork, Stake};
//! use miniledger_core::{Block, Hash, Transaction};
//!
//! let txs = vec![Transaction::new("Diae", "Aymane", 5.0)];
//!
//! // Mine one block
//! let mut mined = Block::new(1, Hash::ZERO, txs.clone());
//! ProofOfWork::new(PowConfig::new(4)).finalize(&mut mined).unwrap();
//!
//! // Validate another by stake
//! let stakes = vec![Stake::new("Validator_A", 50.0), Stake::new("Validator_B", 30.0)];
//! let mut pos = ProofOfStake::new(stakes, &PosConfig::default()).unwrap();
//! let mut staked = Block::new(1, Hash::ZERO, txs);
//! pos.finalize(&mut staked).unwrap();
//! ```

pub mod finality;
pub mod pos;
pub mod pow;

// Re-export commonly used types
pub use finality::{ConsensusError, Finality, Finalizer};
pub use pos::{select_validator, total_stake, PosConfig, ProofOfStake, SelectionError, Stake};
pub use pow::{PowConfig, ProofOfWork};

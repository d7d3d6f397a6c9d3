//! The common seam between the two sealing protocols.

use crate::pos::SelectionError;
use miniledger_core::{Block, BlockError};
use thiserror::Error;

/// Errors that can occur during consensus operations.
#[derive(Debug, Error)]
pub enum ConsensusError {
    #[error("block error: {0}")]
    Block(#[from] BlockError),

    #[error("validator selection error: {0}")]
    Selection(#[from] SelectionError),

    #[error("failed to start mining workers: {0}")]
    WorkerPool(String),
}

pub type Result<T> = std::result::Result<T, ConsensusError>;

/// How a block was sealed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finality {
    /// Sealed by proof of work.
    Work { nonce: u64, attempts: u64 },
    /// Sealed by a proof-of-stake validator.
    Stake { validator: String },
}

/// A protocol that turns a freshly built block into a sealed one.
///
/// A block must be passed to exactly one finalizer.
pub trait Finalizer {
    fn finalize(&mut self, block: &mut Block) -> Result<Finality>;
}

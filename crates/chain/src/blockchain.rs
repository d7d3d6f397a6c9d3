//! The append-only chain of sealed blocks.

use miniledger_core::{Block, Hash, Transaction};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

/// A structural defect found while auditing a block.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntegrityFault {
    #[error("index {found} does not match position {expected}")]
    IndexMismatch { expected: u64, found: u64 },

    #[error("prev_hash does not match the previous block's hash")]
    BrokenLink,

    #[error("stored hash does not match the recomputed hash")]
    HashMismatch,

    #[error("merkle root does not match the transactions")]
    MerkleMismatch,
}

/// The first block that failed an audit, and why.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("block {index} is invalid: {fault}")]
pub struct InvalidBlock {
    pub index: usize,
    pub fault: IntegrityFault,
}

/// Errors that can occur during chain operations.
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("a chain must contain at least the genesis block")]
    Empty,

    #[error("rejected block: {0}")]
    Rejected(#[from] InvalidBlock),
}

pub type Result<T> = std::result::Result<T, ChainError>;

/// An ordered, non-empty sequence of blocks starting at genesis.
///
/// Blocks are only ever appended. Auditing is passive: [`Chain::append`]
/// accepts anything and [`Chain::verify`] reports the first defect.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "Vec<Block>", into = "Vec<Block>")]
pub struct Chain {
    blocks: Vec<Block>,
}

impl Chain {
    /// Create a chain holding a fresh genesis block.
    pub fn new() -> Self {
        let genesis = Block::genesis();
        info!(hash = %genesis.hash(), "created genesis block");
        Self {
            blocks: vec![genesis],
        }
    }

    /// Get the most recent block.
    pub fn last_block(&self) -> &Block {
        // Non-empty by construction
        &self.blocks[self.blocks.len() - 1]
    }

    /// Get the genesis block.
    pub fn genesis(&self) -> &Block {
        &self.blocks[0]
    }

    /// Get a block by index.
    pub fn get(&self, index: usize) -> Option<&Block> {
        self.blocks.get(index)
    }

    /// All blocks, genesis first.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Number of blocks, genesis included.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Index of the last block.
    pub fn height(&self) -> u64 {
        self.last_block().index
    }

    /// Build an unsealed block that extends the current tip.
    pub fn next_block(&self, transactions: Vec<Transaction>) -> Block {
        let parent = self.last_block();
        Block::new(parent.index + 1, parent.hash(), transactions)
    }

    /// Append a block as-is.
    ///
    /// The caller is responsible for the block's `index` and `prev_hash`;
    /// neither is rewritten here. A block that does not link to the tip is
    /// still appended and will be reported by [`Chain::verify`].
    pub fn append(&mut self, block: Block) {
        let tip = self.last_block().hash();
        if block.prev_hash != tip {
            warn!(
                index = block.index,
                prev_hash = %block.prev_hash,
                tip = %tip,
                "appending block that does not link to the tip"
            );
        }
        info!(index = block.index, hash = %block.hash(), txs = block.tx_count(), "appended block");
        self.blocks.push(block);
    }

    /// Append a block only if the chain stays valid and the block's
    /// `index` equals its position.
    pub fn try_append(&mut self, block: Block) -> Result<()> {
        let position = self.blocks.len();
        check_index(&block, position)
            .and_then(|()| check_block(&block, Some(self.last_block())))
            .map_err(|fault| InvalidBlock {
                index: position,
                fault,
            })?;
        self.append(block);
        Ok(())
    }

    /// Audit the chain, returning the first invalid block.
    ///
    /// Every block's own hash and merkle root are recomputed; links are
    /// checked from index 1 onward. A block's `index` field is caller-owned
    /// and not audited here; see [`Chain::verify_strict`].
    pub fn verify(&self) -> std::result::Result<(), InvalidBlock> {
        for (position, block) in self.blocks.iter().enumerate() {
            let parent = position.checked_sub(1).map(|i| &self.blocks[i]);
            check_block(block, parent).map_err(|fault| InvalidBlock {
                index: position,
                fault,
            })?;
        }
        Ok(())
    }

    /// [`Chain::verify`], additionally requiring every block's `index` to
    /// equal its position.
    pub fn verify_strict(&self) -> std::result::Result<(), InvalidBlock> {
        for (position, block) in self.blocks.iter().enumerate() {
            let parent = position.checked_sub(1).map(|i| &self.blocks[i]);
            check_index(block, position)
                .and_then(|()| check_block(block, parent))
                .map_err(|fault| InvalidBlock {
                index: position,
                fault,
            })?;
        }
        Ok(())
    }

    /// Whether [`Chain::verify`] finds no defect.
    pub fn is_valid(&self) -> bool {
        self.verify().is_ok()
    }

    /// Get chain statistics.
    pub fn stats(&self) -> ChainStats {
        let mined = self
            .blocks
            .iter()
            .skip(1)
            .filter(|b| !b.is_pos_validated())
            .count();
        ChainStats {
            height: self.height(),
            last_hash: self.last_block().hash(),
            total_transactions: self.blocks.iter().map(Block::tx_count).sum(),
            pow_blocks: mined,
            pos_blocks: self.blocks.len() - 1 - mined,
        }
    }
}

impl Default for Chain {
    fn default() -> Self {
        Self::new()
    }
}

impl TryFrom<Vec<Block>> for Chain {
    type Error = ChainError;

    /// Rebuild a chain from stored blocks. This does not audit them.
    fn try_from(blocks: Vec<Block>) -> Result<Self> {
        if blocks.is_empty() {
            return Err(ChainError::Empty);
        }
        Ok(Self { blocks })
    }
}

impl From<Chain> for Vec<Block> {
    fn from(chain: Chain) -> Self {
        chain.blocks
    }
}

fn check_index(block: &Block, position: usize) -> std::result::Result<(), IntegrityFault> {
    let expected = position as u64;
    if block.index != expected {
        return Err(IntegrityFault::IndexMismatch {
            expected,
            found: block.index,
        });
    }
    Ok(())
}

fn check_block(block: &Block, parent: Option<&Block>) -> std::result::Result<(), IntegrityFault> {
    if let Some(parent) = parent {
        if block.prev_hash != parent.hash() {
            return Err(IntegrityFault::BrokenLink);
        }
    }
    if !block.verify_hash() {
        return Err(IntegrityFault::HashMismatch);
    }
    if !block.verify_merkle_root() {
        return Err(IntegrityFault::MerkleMismatch);
    }
    Ok(())
}

/// Chain statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainStats {
    /// Index of the last block.
    pub height: u64,
    /// Hash of the last block.
    pub last_hash: Hash,
    /// Transactions across all blocks, genesis included.
    pub total_transactions: usize,
    /// Non-genesis blocks without a validator.
    pub pow_blocks: usize,
    /// Non-genesis blocks sealed by a validator.
    pub pos_blocks: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demo_transactions() -> Vec<Transaction> {
        vec![
            Transaction::with_id("T1", "Diae", "Aymane", 5.0),
            Transaction::with_id("T2", "Aymane", "Mouad", 3.5),
            Transaction::with_id("T3", "Imad", "Smail", 2.0),
        ]
    }

    fn mined_chain(blocks: usize) -> Chain {
        let mut chain = Chain::new();
        for _ in 0..blocks {
            let mut block = chain.next_block(demo_transactions());
            block.mine(1).unwrap();
            chain.append(block);
        }
        chain
    }

    #[test]
    fn test_genesis_invariant() {
        let chain = Chain::new();

        assert_eq!(chain.block_count(), 1);
        assert_eq!(chain.height(), 0);
        assert_eq!(chain.genesis().index, 0);
        assert_eq!(chain.genesis().prev_hash, Hash::ZERO);
        assert_eq!(chain.genesis().transactions, vec![Transaction::genesis()]);
        assert!(chain.is_valid());
    }

    #[test]
    fn test_next_block_links_to_tip() {
        let chain = mined_chain(2);
        let block = chain.next_block(vec![]);

        assert_eq!(block.index, 3);
        assert_eq!(block.prev_hash, chain.last_block().hash());
    }

    #[test]
    fn test_end_to_end_pow_then_tamper() {
        let mut chain = Chain::new();
        let mut block = Block::new(1, chain.last_block().hash(), demo_transactions());

        block.mine(4).unwrap();
        assert!(block.hash().to_hex().starts_with("0000"));

        chain.append(block);
        assert!(chain.is_valid());

        chain.blocks[1].transactions[0] = Transaction::with_id("T1", "Diae", "Aymane", 50.0);

        assert!(!chain.is_valid());
        assert_eq!(
            chain.verify(),
            Err(InvalidBlock {
                index: 1,
                fault: IntegrityFault::HashMismatch
            })
        );
    }

    #[test]
    fn test_tamper_reports_earliest_block() {
        let mut chain = mined_chain(4);
        assert!(chain.is_valid());

        chain.blocks[2].transactions[1] = Transaction::with_id("T2", "Aymane", "Mouad", 0.0);

        assert_eq!(chain.verify().unwrap_err().index, 2);
    }

    #[test]
    fn test_tampered_genesis_detected() {
        let mut chain = mined_chain(1);
        chain.blocks[0].transactions[0] = Transaction::new("genesis", "attacker", 1000.0);

        assert_eq!(
            chain.verify(),
            Err(InvalidBlock {
                index: 0,
                fault: IntegrityFault::HashMismatch
            })
        );
    }

    #[test]
    fn test_broken_link_detected() {
        let mut chain = Chain::new();
        let mut orphan = Block::new(1, Hash::from_bytes([0xAA; 32]), demo_transactions());
        orphan.mine(1).unwrap();

        chain.append(orphan);

        assert_eq!(
            chain.verify(),
            Err(InvalidBlock {
                index: 1,
                fault: IntegrityFault::BrokenLink
            })
        );
    }

    #[test]
    fn test_rehashed_tamper_breaks_next_link() {
        let mut chain = mined_chain(2);

        // Rewrite block 1 consistently; block 2 still points at the old hash
        let forged = Block::new(1, chain.genesis().hash(), vec![Transaction::new("x", "y", 9.0)]);
        chain.blocks[1] = forged;

        assert_eq!(
            chain.verify(),
            Err(InvalidBlock {
                index: 2,
                fault: IntegrityFault::BrokenLink
            })
        );
    }

    #[test]
    fn test_caller_owned_index_passes_audit() {
        let mut chain = mined_chain(1);
        let mut block = Block::new(7, chain.last_block().hash(), demo_transactions());
        block.mine(1).unwrap();
        chain.append(block);

        assert_eq!(chain.verify(), Ok(()));
        assert!(chain.is_valid());
    }

    #[test]
    fn test_strict_audit_reports_index_mismatch() {
        let mut chain = Chain::new();
        let block = Block::new(5, chain.last_block().hash(), demo_transactions());
        chain.append(block);

        assert!(chain.is_valid());
        assert!(matches!(
            chain.verify_strict(),
            Err(InvalidBlock {
                index: 1,
                fault: IntegrityFault::IndexMismatch { expected: 1, found: 5 }
            })
        ));
    }

    #[test]
    fn test_try_append_rejects_wrong_index() {
        let mut chain = Chain::new();
        let block = Block::new(3, chain.last_block().hash(), demo_transactions());

        let err = chain.try_append(block).unwrap_err();

        assert!(matches!(
            err,
            ChainError::Rejected(InvalidBlock {
                index: 1,
                fault: IntegrityFault::IndexMismatch { expected: 1, found: 3 }
            })
        ));
        assert_eq!(chain.block_count(), 1);
    }

    #[test]
    fn test_append_does_not_rewrite_link() {
        let mut chain = Chain::new();
        let stale = Hash::from_bytes([1u8; 32]);
        chain.append(Block::new(1, stale, vec![]));

        assert_eq!(chain.last_block().prev_hash, stale);
    }

    #[test]
    fn test_try_append_rejects_bad_block() {
        let mut chain = Chain::new();
        let bad = Block::new(1, Hash::ZERO, demo_transactions());

        let err = chain.try_append(bad).unwrap_err();

        assert!(matches!(
            err,
            ChainError::Rejected(InvalidBlock {
                index: 1,
                fault: IntegrityFault::BrokenLink
            })
        ));
        assert_eq!(chain.block_count(), 1);
    }

    #[test]
    fn test_try_append_accepts_linked_block() {
        let mut chain = Chain::new();
        let mut block = chain.next_block(demo_transactions());
        block.validate_pos("Validator_A");

        chain.try_append(block).unwrap();

        assert_eq!(chain.height(), 1);
        assert!(chain.is_valid());
    }

    #[test]
    fn test_stats() {
        let mut chain = mined_chain(2);
        let mut staked = chain.next_block(demo_transactions());
        staked.validate_pos("Validator_C");
        chain.append(staked);

        let stats = chain.stats();
        assert_eq!(stats.height, 3);
        assert_eq!(stats.last_hash, chain.last_block().hash());
        assert_eq!(stats.total_transactions, 1 + 3 * 3);
        assert_eq!(stats.pow_blocks, 2);
        assert_eq!(stats.pos_blocks, 1);
    }

    #[test]
    fn test_empty_block_list_rejected() {
        assert!(matches!(Chain::try_from(Vec::new()), Err(ChainError::Empty)));
    }
}

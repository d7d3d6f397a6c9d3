//! Blocks, their hash preimage, and the two sealing paths.
//!
//! A block is sealed either by proof of work ([`Block::mine`]) or by a
//! proof-of-stake validator ([`Block::validate_pos`]). Using both on the same
//! block is a caller error; it is not detected here.

use crate::hash::{hash_concat, Hash, HEX_LEN};
use crate::merkle::transaction_root;
use crate::transaction::Transaction;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::{debug, info};

/// How often the mining loop emits a progress event.
const PROGRESS_INTERVAL: u64 = 1 << 20;

/// Errors that can occur while sealing a block.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlockError {
    #[error("difficulty {difficulty} exceeds the {max} hex digits of a digest")]
    DifficultyTooHigh { difficulty: usize, max: usize },

    #[error("no satisfying nonce found within {attempts} attempts")]
    MiningExhausted { attempts: u64 },

    #[error("mining cancelled after {attempts} attempts")]
    MiningCancelled { attempts: u64 },

    #[error("nonce {nonce} does not satisfy difficulty {difficulty}")]
    InvalidProofOfWork { nonce: u64, difficulty: usize },
}

pub type Result<T> = std::result::Result<T, BlockError>;

/// Bounds on a proof-of-work search. The default is unbounded.
#[derive(Debug, Clone, Copy, Default)]
pub struct MiningLimits<'a> {
    /// Give up after this many hash evaluations.
    pub max_attempts: Option<u64>,
    /// Stop as soon as this flag is raised.
    pub cancel: Option<&'a AtomicBool>,
}

impl<'a> MiningLimits<'a> {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn with_max_attempts(mut self, max_attempts: u64) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    pub fn with_cancel(mut self, cancel: &'a AtomicBool) -> Self {
        self.cancel = Some(cancel);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

/// Reject difficulties no 64-digit hex digest can satisfy.
pub fn check_difficulty(difficulty: usize) -> Result<()> {
    if difficulty > HEX_LEN {
        return Err(BlockError::DifficultyTooHigh {
            difficulty,
            max: HEX_LEN,
        });
    }
    Ok(())
}

/// Get the current Unix timestamp in milliseconds.
pub fn current_timestamp_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// Hashes a fixed block preimage for varying nonces.
///
/// The nonce sits between the header fields and the validator/transaction
/// text, so both halves are rendered once and reused for every candidate.
#[derive(Debug, Clone)]
pub struct NonceHasher {
    head: String,
    tail: String,
}

impl NonceHasher {
    pub fn hash(&self, nonce: u64) -> Hash {
        hash_concat(&[
            self.head.as_bytes(),
            nonce.to_string().as_bytes(),
            self.tail.as_bytes(),
        ])
    }
}

/// A block of transactions linked to its predecessor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Position in the chain (0 for genesis).
    pub index: u64,
    /// Hash of the previous block.
    pub prev_hash: Hash,
    /// Unix timestamp in milliseconds, captured at construction.
    pub timestamp: u64,
    /// Transactions in this block.
    ///
    /// These feed the merkle root and the block hash; editing them after
    /// construction is reported by [`Block::verify_hash`].
    pub transactions: Vec<Transaction>,
    merkle_root: Hash,
    nonce: u64,
    validator: String,
    hash: Hash,
}

impl Block {
    /// Create a new unsealed block stamped with the current time.
    pub fn new(index: u64, prev_hash: Hash, transactions: Vec<Transaction>) -> Self {
        Self::with_timestamp(index, prev_hash, transactions, current_timestamp_millis())
    }

    /// Create a new unsealed block with an explicit timestamp.
    pub fn with_timestamp(
        index: u64,
        prev_hash: Hash,
        transactions: Vec<Transaction>,
        timestamp: u64,
    ) -> Self {
        let merkle_root = transaction_root(&transactions);
        let mut block = Self {
            index,
            prev_hash,
            timestamp,
            transactions,
            merkle_root,
            nonce: 0,
            validator: String::new(),
            hash: Hash::ZERO,
        };
        block.hash = block.calculate_hash();
        block
    }

    /// Create the genesis block: index 0, zero back-link, one placeholder
    /// transaction.
    pub fn genesis() -> Self {
        Self::new(0, Hash::ZERO, vec![Transaction::genesis()])
    }

    /// The stored block hash.
    pub fn hash(&self) -> Hash {
        self.hash
    }

    pub fn merkle_root(&self) -> Hash {
        self.merkle_root
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    /// Name of the proof-of-stake validator, empty for unsealed or mined blocks.
    pub fn validator(&self) -> &str {
        &self.validator
    }

    /// Check if this block was sealed by a proof-of-stake validator.
    pub fn is_pos_validated(&self) -> bool {
        !self.validator.is_empty()
    }

    /// Check if this is the genesis block.
    pub fn is_genesis(&self) -> bool {
        self.index == 0 && self.prev_hash == Hash::ZERO
    }

    /// Get the number of transactions in this block.
    pub fn tx_count(&self) -> usize {
        self.transactions.len()
    }

    /// A hasher over this block's current fields with the nonce left open.
    pub fn nonce_hasher(&self) -> NonceHasher {
        let head = format!(
            "{}{}{}{}",
            self.index,
            self.prev_hash.to_hex(),
            self.merkle_root.to_hex(),
            self.timestamp
        );
        let mut tail = self.validator.clone();
        for tx in &self.transactions {
            tail.push_str(&tx.canonical());
        }
        NonceHasher { head, tail }
    }

    /// The hash this block would have with the given nonce.
    pub fn hash_for_nonce(&self, nonce: u64) -> Hash {
        self.nonce_hasher().hash(nonce)
    }

    /// Recompute the block hash from the current fields.
    pub fn calculate_hash(&self) -> Hash {
        self.hash_for_nonce(self.nonce)
    }

    /// Verify the stored hash matches the current fields.
    pub fn verify_hash(&self) -> bool {
        self.calculate_hash() == self.hash
    }

    /// Verify the stored merkle root matches the transactions.
    pub fn verify_merkle_root(&self) -> bool {
        transaction_root(&self.transactions) == self.merkle_root
    }

    /// Search for a nonce whose hash starts with `difficulty` hex zeros.
    ///
    /// Runs until a solution is found. Returns the number of hashes tried.
    pub fn mine(&mut self, difficulty: usize) -> Result<u64> {
        self.mine_with(difficulty, &MiningLimits::unbounded())
    }

    /// Bounded variant of [`Block::mine`].
    ///
    /// The search starts at the current nonce, so a fresh block with
    /// `difficulty == 0` keeps nonce 0. On error the block is left unchanged.
    pub fn mine_with(&mut self, difficulty: usize, limits: &MiningLimits<'_>) -> Result<u64> {
        check_difficulty(difficulty)?;

        let hasher = self.nonce_hasher();
        let mut nonce = self.nonce;
        let mut candidate = hasher.hash(nonce);
        let mut attempts: u64 = 1;

        while !candidate.meets_difficulty(difficulty) {
            if limits.max_attempts.is_some_and(|max| attempts >= max) {
                return Err(BlockError::MiningExhausted { attempts });
            }
            if limits.is_cancelled() {
                return Err(BlockError::MiningCancelled { attempts });
            }
            nonce = nonce
                .checked_add(1)
                .ok_or(BlockError::MiningExhausted { attempts })?;
            candidate = hasher.hash(nonce);
            attempts += 1;

            if attempts % PROGRESS_INTERVAL == 0 {
                debug!(index = self.index, attempts, difficulty, "still mining");
            }
        }

        self.nonce = nonce;
        self.hash = candidate;
        info!(
            index = self.index,
            nonce,
            attempts,
            difficulty,
            hash = %candidate,
            "block mined"
        );
        Ok(attempts)
    }

    /// Install a nonce found elsewhere, re-checking it against `difficulty`.
    pub fn apply_proof_of_work(&mut self, nonce: u64, difficulty: usize) -> Result<()> {
        check_difficulty(difficulty)?;

        let candidate = self.hash_for_nonce(nonce);
        if !candidate.meets_difficulty(difficulty) {
            return Err(BlockError::InvalidProofOfWork { nonce, difficulty });
        }

        self.nonce = nonce;
        self.hash = candidate;
        Ok(())
    }

    /// Seal the block on behalf of a proof-of-stake validator.
    pub fn validate_pos(&mut self, validator: impl Into<String>) {
        self.validator = validator.into();
        self.hash = self.calculate_hash();
        info!(
            index = self.index,
            validator = %self.validator,
            hash = %self.hash,
            "block validated"
        );
    }
}

//! Core ledger primitives for miniledger.
//!
//! This crate provides the fundamental types used throughout the ledger:
//! - SHA-256 digests
//! - Transactions and their canonical encoding
//! - Merkle roots and inclusion proofs
//! - Blocks, proof-of-work mining and proof-of-stake sealing

pub mod block;
pub mod hash;
pub mod merkle;
pub mod transaction;

// Re-export commonly used types at the crate root
pub use block::{
    check_difficulty, current_timestamp_millis, Block, BlockError, MiningLimits, NonceHasher,
};
pub use hash::{digest_hex, hash, hash_concat, hash_pair, Hash, H256, HEX_LEN};
pub use merkle::{merkle_root, transaction_root, verify_proof, MerkleProof, MerkleTree};
pub use transaction::Transaction;

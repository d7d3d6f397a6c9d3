//! Proof of Work sealing.
//!
//! A block is sealed by finding a nonce whose block hash starts with
//! `difficulty` hex zeros. Expected work grows as `16^difficulty`.
//!
//! With more than one worker the nonce space is striped across a dedicated
//! rayon pool: worker `w` of `k` tries `start + w`, `start + w + k`, ...
//! The lowest satisfying nonce seen so far is shared, and a worker stops as
//! soon as its next candidate is not below it. Without an attempt ceiling
//! the result is therefore the lowest satisfying nonce, the same one a
//! single worker would find. With `max_attempts` set, the shared counter can
//! stop a worker before it reaches a lower nonce, so a bounded parallel
//! search may return a higher nonce or give up where a single worker would
//! not.

use crate::finality::{ConsensusError, Finality, Finalizer, Result};
use miniledger_core::{check_difficulty, Block, BlockError, MiningLimits};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Proof of Work configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowConfig {
    /// Required number of leading hex zeros.
    pub difficulty: usize,
    /// Give up after this many hash evaluations (across all workers).
    /// A bounded multi-worker search is not guaranteed to find the lowest
    /// nonce.
    pub max_attempts: Option<u64>,
    /// Number of search workers.
    pub workers: usize,
}

impl Default for PowConfig {
    fn default() -> Self {
        Self {
            difficulty: 4,
            max_attempts: None,
            workers: 1,
        }
    }
}

impl PowConfig {
    /// Create a single-worker, unbounded configuration.
    pub fn new(difficulty: usize) -> Self {
        Self {
            difficulty,
            ..Self::default()
        }
    }
}

/// Outcome of a multi-worker search.
struct SearchOutcome {
    nonce: Option<u64>,
    attempts: u64,
}

/// Proof of Work sealer.
#[derive(Debug, Clone)]
pub struct ProofOfWork {
    config: PowConfig,
    cancel: Option<Arc<AtomicBool>>,
}

impl ProofOfWork {
    /// Create a new sealer with the given configuration.
    pub fn new(config: PowConfig) -> Self {
        Self {
            config,
            cancel: None,
        }
    }

    /// Stop any running search once `cancel` is raised.
    pub fn with_cancel(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Get the configuration.
    pub fn config(&self) -> &PowConfig {
        &self.config
    }

    /// Mine `block` in place. Returns the number of hashes evaluated.
    pub fn seal(&self, block: &mut Block) -> Result<u64> {
        let difficulty = self.config.difficulty;
        check_difficulty(difficulty)?;

        info!(
            index = block.index,
            difficulty,
            workers = self.config.workers,
            "mining block"
        );

        if self.config.workers <= 1 {
            let mut limits = MiningLimits::unbounded();
            limits.max_attempts = self.config.max_attempts;
            limits.cancel = self.cancel.as_deref();
            return Ok(block.mine_with(difficulty, &limits)?);
        }

        let outcome = self.search_parallel(block)?;
        match outcome.nonce {
            Some(nonce) => {
                block.apply_proof_of_work(nonce, difficulty)?;
                info!(
                    index = block.index,
                    nonce,
                    attempts = outcome.attempts,
                    hash = %block.hash(),
                    "block mined"
                );
                Ok(outcome.attempts)
            }
            None if self.is_cancelled() => Err(BlockError::MiningCancelled {
                attempts: outcome.attempts,
            }
            .into()),
            None => Err(BlockError::MiningExhausted {
                attempts: outcome.attempts,
            }
            .into()),
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    fn search_parallel(&self, block: &Block) -> Result<SearchOutcome> {
        let workers = self.config.workers;
        let stride = workers as u64;
        let difficulty = self.config.difficulty;
        let max_attempts = self.config.max_attempts;
        let start = block.nonce();
        let hasher = block.nonce_hasher();

        let found = AtomicBool::new(false);
        let best = AtomicU64::new(u64::MAX);
        let attempts = AtomicU64::new(0);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .map_err(|e| ConsensusError::WorkerPool(e.to_string()))?;

        pool.install(|| {
            (0..stride).into_par_iter().for_each(|worker| {
                let Some(mut nonce) = start.checked_add(worker) else {
                    return;
                };
                loop {
                    if found.load(Ordering::Acquire) && nonce >= best.load(Ordering::Acquire) {
                        break;
                    }
                    if self.is_cancelled() {
                        break;
                    }
                    let tried = attempts.fetch_add(1, Ordering::Relaxed);
                    if max_attempts.is_some_and(|max| tried >= max) {
                        break;
                    }
                    if hasher.hash(nonce).meets_difficulty(difficulty) {
                        best.fetch_min(nonce, Ordering::AcqRel);
                        found.store(true, Ordering::Release);
                        debug!(worker, nonce, "worker found a solution");
                        break;
                    }
                    match nonce.checked_add(stride) {
                        Some(next) => nonce = next,
                        None => break,
                    }
                }
            });
        });

        // Over-counted by one for every worker that stopped on the ceiling
        let attempts = match max_attempts {
            Some(max) => attempts.load(Ordering::Relaxed).min(max),
            None => attempts.load(Ordering::Relaxed),
        };
        let nonce = found
            .load(Ordering::Acquire)
            .then(|| best.load(Ordering::Acquire));

        Ok(SearchOutcome { nonce, attempts })
    }
}

impl Finalizer for ProofOfWork {
    fn finalize(&mut self, block: &mut Block) -> Result<Finality> {
        let attempts = self.seal(block)?;
        Ok(Finality::Work {
            nonce: block.nonce(),
            attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use miniledger_core::{Hash, Transaction};

    fn candidate(timestamp: u64) -> Block {
        Block::with_timestamp(
            1,
            Hash::ZERO,
            vec![
                Transaction::with_id("T1", "Diae", "Aymane", 5.0),
                Transaction::with_id("T2", "Aymane", "Mouad", 3.5),
                Transaction::with_id("T3", "Imad", "Smail", 2.0),
            ],
            timestamp,
        )
    }

    #[test]
    fn test_default_config() {
        let config = PowConfig::default();
        assert_eq!(config.difficulty, 4);
        assert_eq!(config.workers, 1);
        assert!(config.max_attempts.is_none());
    }

    #[test]
    fn test_single_worker_seal() {
        let pow = ProofOfWork::new(PowConfig::new(2));
        let mut block = candidate(1);

        let attempts = pow.seal(&mut block).unwrap();

        assert!(attempts >= 1);
        assert!(block.hash().to_hex().starts_with("00"));
        assert!(block.verify_hash());
    }

    #[test]
    fn test_parallel_matches_sequential_nonce() {
        let mut sequential = candidate(99);
        sequential.mine(3).unwrap();

        let pow = ProofOfWork::new(PowConfig {
            difficulty: 3,
            max_attempts: None,
            workers: 4,
        });
        let mut parallel = candidate(99);
        pow.seal(&mut parallel).unwrap();

        assert_eq!(parallel.nonce(), sequential.nonce());
        assert_eq!(parallel.hash(), sequential.hash());
    }

    #[test]
    fn test_parallel_attempt_ceiling() {
        let pow = ProofOfWork::new(PowConfig {
            difficulty: 40,
            max_attempts: Some(64),
            workers: 2,
        });
        let mut block = candidate(5);

        let err = pow.seal(&mut block).unwrap_err();

        assert!(matches!(
            err,
            ConsensusError::Block(BlockError::MiningExhausted { attempts: 64 })
        ));
        assert_eq!(block.nonce(), 0);
    }

    #[test]
    fn test_bounded_parallel_seal_is_valid_not_necessarily_lowest() {
        let mut sequential = candidate(99);
        sequential.mine(1).unwrap();

        let pow = ProofOfWork::new(PowConfig {
            difficulty: 1,
            max_attempts: Some(10_000),
            workers: 4,
        });
        let mut bounded = candidate(99);
        pow.seal(&mut bounded).unwrap();

        assert!(bounded.hash().meets_difficulty(1));
        assert!(bounded.verify_hash());
        assert!(bounded.nonce() >= sequential.nonce());
    }

    #[test]
    fn test_cancelled_before_start() {
        let cancel = Arc::new(AtomicBool::new(true));
        for workers in [1, 3] {
            let pow = ProofOfWork::new(PowConfig {
                difficulty: 40,
                max_attempts: None,
                workers,
            })
            .with_cancel(cancel.clone());
            let mut block = candidate(5);

            let err = pow.seal(&mut block).unwrap_err();
            assert!(matches!(
                err,
                ConsensusError::Block(BlockError::MiningCancelled { .. })
            ));
        }
    }

    #[test]
    fn test_impossible_difficulty_rejected() {
        let pow = ProofOfWork::new(PowConfig::new(70));
        let mut block = candidate(5);
        assert!(matches!(
            pow.seal(&mut block),
            Err(ConsensusError::Block(BlockError::DifficultyTooHigh { .. }))
        ));
    }

    #[test]
    fn test_finalizer_reports_work() {
        let mut pow = ProofOfWork::new(PowConfig::new(1));
        let mut block = candidate(3);

        let finality = pow.finalize(&mut block).unwrap();

        match finality {
            Finality::Work { nonce, attempts } => {
                assert_eq!(nonce, block.nonce());
                assert_eq!(attempts, nonce + 1);
            }
            other => panic!("unexpected finality: {:?}", other),
        }
        assert!(block.validator().is_empty());
    }
}

//! Proof of Stake validator selection.
//!
//! One validator is drawn per block with probability proportional to its
//! stake. Draws are independent: nothing is remembered between rounds.

use crate::finality::{Finality, Finalizer, Result};
use miniledger_core::Block;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Errors that can occur while selecting a validator.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SelectionError {
    #[error("no validators to select from")]
    EmptyStakes,

    #[error("validator at position {position} has an empty name")]
    EmptyName { position: usize },

    #[error("validator {name} has invalid stake {weight} (must be finite and positive)")]
    InvalidWeight { name: String, weight: f64 },

    #[error("total stake {total} is not a finite positive number")]
    InvalidTotal { total: f64 },
}

/// A validator and its declared stake.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stake {
    pub name: String,
    pub weight: f64,
}

impl Stake {
    pub fn new(name: impl Into<String>, weight: f64) -> Self {
        Self {
            name: name.into(),
            weight,
        }
    }
}

/// Validate a stake list and return its total weight.
pub fn total_stake(stakes: &[Stake]) -> std::result::Result<f64, SelectionError> {
    if stakes.is_empty() {
        return Err(SelectionError::EmptyStakes);
    }

    let mut total = 0.0;
    for (position, stake) in stakes.iter().enumerate() {
        // An empty name would seal a block that reads as unvalidated
        if stake.name.is_empty() {
            return Err(SelectionError::EmptyName { position });
        }
        if !stake.weight.is_finite() || stake.weight <= 0.0 {
            return Err(SelectionError::InvalidWeight {
                name: stake.name.clone(),
                weight: stake.weight,
            });
        }
        total += stake.weight;
    }

    if !total.is_finite() {
        return Err(SelectionError::InvalidTotal { total });
    }
    Ok(total)
}

/// Walk the cumulative weights and return the first entry covering `r`.
///
/// Falls back to the last entry if rounding leaves `r` above every
/// cumulative sum. `stakes` must be non-empty.
fn pick(stakes: &[Stake], r: f64) -> &str {
    let mut cumulative = 0.0;
    for stake in stakes {
        cumulative += stake.weight;
        if r <= cumulative {
            return &stake.name;
        }
    }
    stakes.last().map(|s| s.name.as_str()).unwrap_or_default()
}

/// Select a validator with probability `weight / total`.
pub fn select_validator<'a, R: Rng + ?Sized>(
    stakes: &'a [Stake],
    rng: &mut R,
) -> std::result::Result<&'a str, SelectionError> {
    let total = total_stake(stakes)?;
    let r = rng.gen_range(0.0..=total);
    let chosen = pick(stakes, r);
    debug!(draw = r, total, validator = chosen, "selected validator");
    Ok(chosen)
}

/// Proof of Stake configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PosConfig {
    /// Seed for reproducible draws. `None` seeds from OS entropy.
    pub seed: Option<u64>,
}

/// Proof of Stake sealer: a stake registry plus its random source.
#[derive(Debug, Clone)]
pub struct ProofOfStake {
    stakes: Vec<Stake>,
    rng: StdRng,
}

impl ProofOfStake {
    /// Create a sealer over `stakes`, rejecting an unusable registry up front.
    pub fn new(stakes: Vec<Stake>, config: &PosConfig) -> std::result::Result<Self, SelectionError> {
        total_stake(&stakes)?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self { stakes, rng })
    }

    /// Get the stake registry.
    pub fn stakes(&self) -> &[Stake] {
        &self.stakes
    }

    /// Draw the next validator.
    pub fn select(&mut self) -> std::result::Result<&str, SelectionError> {
        select_validator(&self.stakes, &mut self.rng)
    }

    /// Draw a validator and seal `block` with it. Returns the chosen name.
    pub fn validate(&mut self, block: &mut Block) -> std::result::Result<String, SelectionError> {
        let chosen = self.select()?.to_owned();
        block.validate_pos(chosen.clone());
        Ok(chosen)
    }
}

impl Finalizer for ProofOfStake {
    fn finalize(&mut self, block: &mut Block) -> Result<Finality> {
        let validator = self.validate(block)?;
        Ok(Finality::Stake { validator })
    }
}

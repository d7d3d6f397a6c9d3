//! Driver configuration loaded from an optional JSON file.

use anyhow::{Context, Result};
use miniledger_consensus::{PosConfig, PowConfig, Stake};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Defaults for every command. Command-line flags take precedence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Leading hex zeros required of a mined block.
    pub difficulty: usize,
    /// Optional ceiling on hash evaluations per block.
    pub max_attempts: Option<u64>,
    /// Number of mining workers.
    pub workers: usize,
    /// Seed for validator selection; entropy when absent.
    pub seed: Option<u64>,
    /// Stake registry for proof of stake.
    pub validators: Vec<Stake>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        let pow = PowConfig::default();
        Self {
            difficulty: pow.difficulty,
            max_attempts: pow.max_attempts,
            workers: pow.workers,
            seed: None,
            validators: vec![
                Stake::new("Validator_A", 50.0),
                Stake::new("Validator_B", 30.0),
                Stake::new("Validator_C", 20.0),
            ],
        }
    }
}

impl DriverConfig {
    /// Load from `path`, or fall back to defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    pub fn pow_config(&self) -> PowConfig {
        PowConfig {
            difficulty: self.difficulty,
            max_attempts: self.max_attempts,
            workers: self.workers.max(1),
        }
    }

    pub fn pos_config(&self) -> PosConfig {
        PosConfig { seed: self.seed }
    }
}

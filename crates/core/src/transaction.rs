//! Transfer transactions and their canonical encoding.

use crate::hash::{hash, Hash};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A value transfer between two named parties.
///
/// Fields are read-only once constructed. The canonical string form feeds
/// both the merkle leaves and the block hash, so two transactions that
/// compare equal always encode identically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    id: Option<String>,
    sender: String,
    receiver: String,
    amount: f64,
}

impl Transaction {
    /// Create a transaction without an identifier.
    pub fn new(sender: impl Into<String>, receiver: impl Into<String>, amount: f64) -> Self {
        Self {
            id: None,
            sender: sender.into(),
            receiver: receiver.into(),
            amount: normalize_amount(amount),
        }
    }

    /// Create a transaction carrying an identifier.
    pub fn with_id(
        id: impl Into<String>,
        sender: impl Into<String>,
        receiver: impl Into<String>,
        amount: f64,
    ) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::new(sender, receiver, amount)
        }
    }

    /// The placeholder transaction carried by every genesis block.
    pub fn genesis() -> Self {
        Self::with_id("0", "genesis", "network", 0.0)
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn sender(&self) -> &str {
        &self.sender
    }

    pub fn receiver(&self) -> &str {
        &self.receiver
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }

    /// Canonical encoding: `id|sender->receiver:amount`, or
    /// `sender->receiver:amount` without an id. The amount always carries
    /// exactly two fractional digits.
    pub fn canonical(&self) -> String {
        match &self.id {
            Some(id) => format!(
                "{}|{}->{}:{:.2}",
                id,
                self.sender,
                self.receiver,
                normalize_amount(self.amount)
            ),
            None => format!(
                "{}->{}:{:.2}",
                self.sender,
                self.receiver,
                normalize_amount(self.amount)
            ),
        }
    }

    /// Digest of the canonical encoding (the merkle leaf for this transaction).
    pub fn hash(&self) -> Hash {
        hash(self.canonical().as_bytes())
    }
}

/// Fold `-0.0` into `0.0`. The two compare equal, so they must encode alike.
fn normalize_amount(amount: f64) -> f64 {
    if amount == 0.0 {
        0.0
    } else {
        amount
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

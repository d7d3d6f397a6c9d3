//! Merkle aggregation of transaction digests.
//!
//! Layers are folded pairwise, left then right. When a layer has an odd
//! number of nodes the last node is paired with a copy of itself. Interior
//! nodes hash the hex text of their children (see [`hash_pair`]).

use crate::hash::{hash_pair, Hash};
use crate::transaction::Transaction;

/// Fold one layer into the next, duplicating the last node on odd counts.
fn fold_layer(layer: &[Hash]) -> Vec<Hash> {
    layer
        .chunks(2)
        .map(|chunk| match chunk {
            [left, right] => hash_pair(left, right),
            [last] => hash_pair(last, last),
            _ => unreachable!("chunks(2) yields one or two elements"),
        })
        .collect()
}

/// Compute the merkle root of a list of leaf hashes.
///
/// Returns the zero hash if the list is empty. A single leaf is its own root.
pub fn merkle_root(leaves: &[Hash]) -> Hash {
    if leaves.is_empty() {
        return Hash::ZERO;
    }

    let mut current_level: Vec<Hash> = leaves.to_vec();
    while current_level.len() > 1 {
        current_level = fold_layer(&current_level);
    }
    current_level[0]
}

/// Compute the merkle root over the canonical digests of `transactions`.
pub fn transaction_root(transactions: &[Transaction]) -> Hash {
    let leaves: Vec<Hash> = transactions.iter().map(Transaction::hash).collect();
    merkle_root(&leaves)
}

/// A merkle tree retaining every level, for inclusion proofs.
#[derive(Debug, Clone)]
pub struct MerkleTree {
    /// All nodes in the tree, level by level (leaves first).
    levels: Vec<Vec<Hash>>,
}

/// A merkle proof for a single leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleProof {
    /// The leaf being proven.
    pub leaf: Hash,
    /// Sibling hashes from leaf to root.
    pub siblings: Vec<Hash>,
    /// Whether the sibling at each level sits to the right of the path.
    pub sibling_on_right: Vec<bool>,
}

impl MerkleTree {
    /// Build a merkle tree from a list of leaf hashes.
    pub fn new(leaves: &[Hash]) -> Self {
        let mut levels = vec![leaves.to_vec()];
        loop {
            let current = &levels[levels.len() - 1];
            if current.len() <= 1 {
                break;
            }
            let next = fold_layer(current);
            levels.push(next);
        }
        Self { levels }
    }

    /// Build a merkle tree over transaction digests.
    pub fn from_transactions(transactions: &[Transaction]) -> Self {
        let leaves: Vec<Hash> = transactions.iter().map(Transaction::hash).collect();
        Self::new(&leaves)
    }

    /// Get the root of the merkle tree (zero hash for an empty tree).
    pub fn root(&self) -> Hash {
        self.levels
            .last()
            .and_then(|level| level.first())
            .copied()
            .unwrap_or(Hash::ZERO)
    }

    /// Get the number of leaves in the tree.
    pub fn leaf_count(&self) -> usize {
        self.levels.first().map(|l| l.len()).unwrap_or(0)
    }

    /// Generate a proof for the leaf at the given index.
    pub fn proof(&self, index: usize) -> Option<MerkleProof> {
        if index >= self.leaf_count() {
            return None;
        }

        let leaf = self.levels[0][index];
        let mut siblings = Vec::new();
        let mut sibling_on_right = Vec::new();
        let mut idx = index;

        for level in &self.levels[..self.levels.len() - 1] {
            let is_left = idx % 2 == 0;
            let sibling_idx = if is_left { idx + 1 } else { idx - 1 };

            // Odd tail pairs with itself
            let sibling = level.get(sibling_idx).copied().unwrap_or(level[idx]);

            siblings.push(sibling);
            sibling_on_right.push(is_left);
            idx /= 2;
        }

        Some(MerkleProof {
            leaf,
            siblings,
            sibling_on_right,
        })
    }

    /// Verify a merkle proof against this tree's root.
    pub fn verify_proof(&self, proof: &MerkleProof) -> bool {
        verify_proof(&self.root(), proof)
    }
}

/// Verify a merkle proof against a given root.
pub fn verify_proof(root: &Hash, proof: &MerkleProof) -> bool {
    if proof.siblings.len() != proof.sibling_on_right.len() {
        return false;
    }

    let mut current = proof.leaf;
    for (sibling, on_right) in proof.siblings.iter().zip(&proof.sibling_on_right) {
        current = if *on_right {
            hash_pair(&current, sibling)
        } else {
            hash_pair(sibling, &current)
        };
    }

    current == *root
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::hash;

    fn make_hashes(n: usize) -> Vec<Hash> {
        (0..n).map(|i| hash(&[i as u8])).collect()
    }

    fn sample_transactions() -> Vec<Transaction> {
        vec![
            Transaction::with_id("T1", "Diae", "Aymane", 5.0),
            Transaction::with_id("T2", "Aymane", "Mouad", 3.5),
            Transaction::with_id("T3", "Imad", "Smail", 2.0),
        ]
    }

    #[test]
    fn test_merkle_root_empty() {
        assert_eq!(merkle_root(&[]), Hash::ZERO);
        assert_eq!(transaction_root(&[]), Hash::ZERO);
    }

    #[test]
    fn test_merkle_root_single() {
        let hashes = make_hashes(1);
        assert_eq!(merkle_root(&hashes), hashes[0]);
    }

    #[test]
    fn test_merkle_root_two() {
        let hashes = make_hashes(2);
        let expected = hash_pair(&hashes[0], &hashes[1]);
        assert_eq!(merkle_root(&hashes), expected);
    }

    #[test]
    fn test_merkle_root_odd_duplicates_last() {
        let txs = sample_transactions();
        let [a, b, c] = [txs[0].hash(), txs[1].hash(), txs[2].hash()];

        let expected = hash_pair(&hash_pair(&a, &b), &hash_pair(&c, &c));
        assert_eq!(transaction_root(&txs), expected);
    }

    #[test]
    fn test_merkle_root_matches_hex_string_fold() {
        // Fold spelled out over hex strings, as an external tool would do it
        let txs = sample_transactions();
        let leaves: Vec<String> = txs
            .iter()
            .map(|tx| hash(tx.canonical().as_bytes()).to_hex())
            .collect();
        let left = hash(format!("{}{}", leaves[0], leaves[1]).as_bytes()).to_hex();
        let right = hash(format!("{}{}", leaves[2], leaves[2]).as_bytes()).to_hex();
        let root = hash(format!("{}{}", left, right).as_bytes());

        assert_eq!(transaction_root(&txs), root);
    }

    #[test]
    fn test_merkle_root_deterministic() {
        let hashes = make_hashes(10);
        assert_eq!(merkle_root(&hashes), merkle_root(&hashes));
    }

    #[test]
    fn test_merkle_root_order_matters() {
        let txs = sample_transactions();
        let mut swapped = txs.clone();
        swapped.swap(0, 1);

        assert_ne!(transaction_root(&txs), transaction_root(&swapped));
    }

    #[test]
    fn test_merkle_tree_root_matches() {
        for n in [1, 2, 5, 7, 8] {
            let hashes = make_hashes(n);
            let tree = MerkleTree::new(&hashes);
            assert_eq!(tree.root(), merkle_root(&hashes), "leaf count {}", n);
        }
    }

    #[test]
    fn test_empty_tree_root_is_zero() {
        let tree = MerkleTree::new(&[]);
        assert_eq!(tree.root(), Hash::ZERO);
        assert_eq!(tree.leaf_count(), 0);
        assert!(tree.proof(0).is_none());
    }

    #[test]
    fn test_merkle_proof_valid() {
        let hashes = make_hashes(8);
        let tree = MerkleTree::new(&hashes);

        for i in 0..hashes.len() {
            let proof = tree.proof(i).unwrap();
            assert!(tree.verify_proof(&proof));
            assert!(verify_proof(&tree.root(), &proof));
        }
    }

    #[test]
    fn test_merkle_proof_odd_leaves() {
        let tree = MerkleTree::from_transactions(&sample_transactions());

        for i in 0..tree.leaf_count() {
            let proof = tree.proof(i).unwrap();
            assert!(tree.verify_proof(&proof));
        }
    }

    #[test]
    fn test_merkle_proof_invalid_index() {
        let tree = MerkleTree::new(&make_hashes(4));
        assert!(tree.proof(10).is_none());
    }

    #[test]
    fn test_merkle_proof_wrong_root() {
        let tree = MerkleTree::new(&make_hashes(4));
        let proof = tree.proof(0).unwrap();

        let wrong_root = hash(b"wrong");
        assert!(!verify_proof(&wrong_root, &proof));
    }

    #[test]
    fn test_merkle_proof_tampered_leaf() {
        let tree = MerkleTree::new(&make_hashes(5));
        let mut proof = tree.proof(2).unwrap();
        proof.leaf = hash(b"forged");
        assert!(!tree.verify_proof(&proof));
    }
}

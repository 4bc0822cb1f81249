//! Inclusion proofs and their verification.

use serde::{Deserialize, Serialize};

use crate::common::{hex_encode, Hash};
use crate::tree::{hash_pair, PairOrdering};

/// Position of a sibling relative to the node being folded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

/// Sibling hashes from the leaf level up to, but excluding, the root.
///
/// `sides[i]` records where `siblings[i]` sat in its pair. Sorted-pair
/// verification ignores it; positional verification needs it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Proof {
    pub siblings: Vec<Hash>,
    pub sides: Vec<Side>,
}

impl Proof {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, sibling: Hash, side: Side) {
        self.siblings.push(sibling);
        self.sides.push(side);
    }

    pub fn len(&self) -> usize {
        self.siblings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.siblings.is_empty()
    }

    /// Proof elements as `0x`-prefixed hex, the form a `bytes32[]` argument takes.
    pub fn to_hex(&self) -> Vec<String> {
        self.siblings.iter().map(hex_encode).collect()
    }

    /// Folds `leaf` through the proof and returns the implied root.
    pub fn compute_root(&self, leaf: &Hash, pairing: PairOrdering) -> Hash {
        let mut current = *leaf;
        for (i, sibling) in self.siblings.iter().enumerate() {
            current = match (pairing, self.sides.get(i)) {
                (PairOrdering::Positional, Some(Side::Left)) => hash_pair(sibling, &current, pairing),
                _ => hash_pair(&current, sibling, pairing),
            };
        }
        current
    }
}

/// Returns true iff `proof` folds `leaf` into `root` under `pairing`.
pub fn verify(leaf: &Hash, proof: &Proof, root: &Hash, pairing: PairOrdering) -> bool {
    proof.compute_root(leaf, pairing) == *root
}

/// Sorted-pair verification over a bare sibling list, the same check as
/// OpenZeppelin's `MerkleProof.verify`.
pub fn verify_sorted(leaf: &Hash, siblings: &[Hash], root: &Hash) -> bool {
    let folded = siblings
        .iter()
        .fold(*leaf, |current, sibling| hash_pair(&current, sibling, PairOrdering::Sorted));
    folded == *root
}

//! Binary Keccak256 Merkle tree.
//!
//! Two policies decide the root and must agree with whatever verifier
//! consumes it:
//!
//! * [`PairOrdering`]: whether a pair is sorted before hashing (OpenZeppelin
//!   `MerkleProof`) or hashed in tree position order.
//! * [`OddNodePolicy`]: what happens to the last node of a level with an odd
//!   node count.
//!
//! Levels are stored bottom-up; `levels[0]` holds the leaves and the last
//! level holds only the root.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::common::{keccak256_pair, Hash};
use crate::error::{AirdropError, Result};
use crate::proof::{Proof, Side};

/// How two children are combined into their parent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PairOrdering {
    /// `keccak256(min(a, b) ‖ max(a, b))`. Proofs need no direction bits.
    #[default]
    Sorted,
    /// `keccak256(left ‖ right)`. Proofs carry a side per element.
    Positional,
}

/// Treatment of the unpaired last node of a level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OddNodePolicy {
    /// Pair the node with itself.
    #[default]
    Duplicate,
    /// Carry the node to the next level unchanged.
    Promote,
}

macro_rules! str_enum {
    ($ty:ident { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $name,)+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                match s {
                    $($name => Ok($ty::$variant),)+
                    other => Err(format!(
                        "unknown {} '{}' (expected one of: {})",
                        stringify!($ty),
                        other,
                        [$($name),+].join(", ")
                    )),
                }
            }
        }
    };
}

str_enum!(PairOrdering { Sorted => "sorted", Positional => "positional" });
str_enum!(OddNodePolicy { Duplicate => "duplicate", Promote => "promote" });

/// Policies for one tree build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeOptions {
    pub pairing: PairOrdering,
    pub odd_nodes: OddNodePolicy,
    /// Sort leaves bytewise before building so the root does not depend on
    /// input order.
    pub sort_leaves: bool,
}

impl Default for TreeOptions {
    fn default() -> Self {
        Self {
            pairing: PairOrdering::Sorted,
            odd_nodes: OddNodePolicy::Duplicate,
            sort_leaves: true,
        }
    }
}

impl TreeOptions {
    /// Reproduces `new MerkleTree(leaves, keccak256, { sortPairs: true })`
    /// from merkletreejs: sorted pairs, promoted odd nodes, leaves in input
    /// order.
    pub fn merkletreejs() -> Self {
        Self {
            pairing: PairOrdering::Sorted,
            odd_nodes: OddNodePolicy::Promote,
            sort_leaves: false,
        }
    }
}

/// Hashes two children into their parent according to `pairing`.
pub fn hash_pair(left: &Hash, right: &Hash, pairing: PairOrdering) -> Hash {
    match pairing {
        PairOrdering::Sorted if right < left => keccak256_pair(right, left),
        _ => keccak256_pair(left, right),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleTree {
    levels: Vec<Vec<Hash>>,
    /// `positions[i]` is where input leaf `i` landed in `levels[0]`.
    positions: Vec<usize>,
    options: TreeOptions,
}

impl MerkleTree {
    /// Builds a tree over `leaves`.
    ///
    /// # Errors
    /// Returns [`AirdropError::EmptyTree`] when `leaves` is empty.
    pub fn build(leaves: &[Hash], options: TreeOptions) -> Result<Self> {
        if leaves.is_empty() {
            return Err(AirdropError::EmptyTree);
        }

        let mut positions: Vec<usize> = (0..leaves.len()).collect();
        let base: Vec<Hash> = if options.sort_leaves {
            let mut order: Vec<usize> = (0..leaves.len()).collect();
            order.sort_by(|&a, &b| leaves[a].cmp(&leaves[b]));
            for (position, &input) in order.iter().enumerate() {
                positions[input] = position;
            }
            order.iter().map(|&i| leaves[i]).collect()
        } else {
            leaves.to_vec()
        };

        let mut levels = vec![base];
        while let Some(level) = levels.last().filter(|level| level.len() > 1) {
            let next = Self::next_level(level, options);
            levels.push(next);
        }

        Ok(Self {
            levels,
            positions,
            options,
        })
    }

    fn next_level(level: &[Hash], options: TreeOptions) -> Vec<Hash> {
        let mut next = Vec::with_capacity(level.len().div_ceil(2));
        for chunk in level.chunks(2) {
            match chunk {
                [left, right] => next.push(hash_pair(left, right, options.pairing)),
                [lone] => match options.odd_nodes {
                    OddNodePolicy::Duplicate => next.push(hash_pair(lone, lone, options.pairing)),
                    OddNodePolicy::Promote => next.push(*lone),
                },
                _ => unreachable!("chunks(2) yields one or two nodes"),
            }
        }
        next
    }

    pub fn root(&self) -> Hash {
        self.levels[self.levels.len() - 1][0]
    }

    /// Number of hashing rounds between the leaves and the root.
    pub fn depth(&self) -> usize {
        self.levels.len() - 1
    }

    pub fn leaf_count(&self) -> usize {
        self.levels[0].len()
    }

    pub fn levels(&self) -> &[Vec<Hash>] {
        &self.levels
    }

    pub fn options(&self) -> TreeOptions {
        self.options
    }

    /// Leaf supplied at input `index`.
    pub fn leaf(&self, index: usize) -> Result<Hash> {
        let position = self.position(index)?;
        Ok(self.levels[0][position])
    }

    /// Position of input leaf `index` inside `levels()[0]`.
    pub fn position(&self, index: usize) -> Result<usize> {
        self.positions
            .get(index)
            .copied()
            .ok_or(AirdropError::IndexOutOfRange {
                index,
                leaf_count: self.leaf_count(),
            })
    }

    /// Generates the inclusion proof for the leaf supplied at input `index`.
    pub fn prove(&self, index: usize) -> Result<Proof> {
        let mut current = self.position(index)?;
        let mut proof = Proof::new();

        for level in &self.levels[..self.levels.len() - 1] {
            let is_right = current % 2 == 1;
            let sibling = if is_right { current - 1 } else { current + 1 };
            let side = if is_right { Side::Left } else { Side::Right };

            if sibling < level.len() {
                proof.push(level[sibling], side);
            } else if self.options.odd_nodes == OddNodePolicy::Duplicate {
                proof.push(level[current], Side::Right);
            }

            current /= 2;
        }

        Ok(proof)
    }
}

/// Builds a tree over `leaves`. See [`MerkleTree::build`].
pub fn build_tree(leaves: &[Hash], options: TreeOptions) -> Result<MerkleTree> {
    MerkleTree::build(leaves, options)
}

/// Proof for the leaf supplied at input `index`. See [`MerkleTree::prove`].
pub fn prove_leaf(tree: &MerkleTree, index: usize) -> Result<Proof> {
    tree.prove(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::keccak256;
    use crate::proof::verify;

    fn leaves(n: u8) -> Vec<Hash> {
        (0..n).map(|i| keccak256([i])).collect()
    }

    fn unsorted(pairing: PairOrdering, odd_nodes: OddNodePolicy) -> TreeOptions {
        TreeOptions {
            pairing,
            odd_nodes,
            sort_leaves: false,
        }
    }

    #[test]
    fn test_empty_input_rejected() {
        let result = MerkleTree::build(&[], TreeOptions::default());
        assert!(matches!(result, Err(AirdropError::EmptyTree)));
    }

    #[test]
    fn test_single_leaf_is_root() {
        let leaf = [5u8; 32];
        let tree = MerkleTree::build(&[leaf], TreeOptions::default()).unwrap();
        assert_eq!(tree.root(), leaf);
        assert_eq!(tree.depth(), 0);
        assert!(tree.prove(0).unwrap().is_empty());
    }

    #[test]
    fn test_level_sizes_halve_rounding_up() {
        for policy in [OddNodePolicy::Duplicate, OddNodePolicy::Promote] {
            let tree = MerkleTree::build(&leaves(5), unsorted(PairOrdering::Sorted, policy)).unwrap();
            let sizes: Vec<usize> = tree.levels().iter().map(Vec::len).collect();
            assert_eq!(sizes, vec![5, 3, 2, 1]);
        }
    }

    #[test]
    fn test_sorted_hash_pair_is_symmetric() {
        let a = [1u8; 32];
        let b = [2u8; 32];
        assert_eq!(
            hash_pair(&a, &b, PairOrdering::Sorted),
            hash_pair(&b, &a, PairOrdering::Sorted)
        );
        assert_ne!(
            hash_pair(&a, &b, PairOrdering::Positional),
            hash_pair(&b, &a, PairOrdering::Positional)
        );
    }

    #[test]
    fn test_duplicate_policy_pairs_lone_node_with_itself() {
        let l = leaves(3);
        let tree = MerkleTree::build(&l, unsorted(PairOrdering::Sorted, OddNodePolicy::Duplicate)).unwrap();
        let p1 = hash_pair(&l[0], &l[1], PairOrdering::Sorted);
        let p2 = hash_pair(&l[2], &l[2], PairOrdering::Sorted);
        assert_eq!(tree.levels()[1], vec![p1, p2]);
        assert_eq!(tree.root(), hash_pair(&p1, &p2, PairOrdering::Sorted));
        assert_eq!(tree.prove(2).unwrap().siblings, vec![l[2], p1]);
    }

    #[test]
    fn test_promote_policy_carries_lone_node() {
        let l = leaves(3);
        let tree = MerkleTree::build(&l, unsorted(PairOrdering::Sorted, OddNodePolicy::Promote)).unwrap();
        let p1 = hash_pair(&l[0], &l[1], PairOrdering::Sorted);
        assert_eq!(tree.levels()[1], vec![p1, l[2]]);
        assert_eq!(tree.root(), hash_pair(&p1, &l[2], PairOrdering::Sorted));
        assert_eq!(tree.prove(2).unwrap().siblings, vec![p1]);
    }

    #[test]
    fn test_every_policy_combination_round_trips() {
        for pairing in [PairOrdering::Sorted, PairOrdering::Positional] {
            for odd_nodes in [OddNodePolicy::Duplicate, OddNodePolicy::Promote] {
                for sort_leaves in [false, true] {
                    let options = TreeOptions {
                        pairing,
                        odd_nodes,
                        sort_leaves,
                    };
                    for n in 1..=9 {
                        let l = leaves(n);
                        let tree = MerkleTree::build(&l, options).unwrap();
                        for (i, leaf) in l.iter().enumerate() {
                            let proof = tree.prove(i).unwrap();
                            assert!(
                                verify(leaf, &proof, &tree.root(), pairing),
                                "{options:?} n={n} i={i}"
                            );
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_sorted_leaves_keep_input_indexing() {
        let l = leaves(6);
        let tree = MerkleTree::build(&l, TreeOptions::default()).unwrap();
        for (i, leaf) in l.iter().enumerate() {
            assert_eq!(tree.leaf(i).unwrap(), *leaf);
        }
        let mut sorted = l.clone();
        sorted.sort();
        assert_eq!(tree.levels()[0], sorted);
    }

    #[test]
    fn test_prove_out_of_range() {
        let tree = MerkleTree::build(&leaves(4), TreeOptions::default()).unwrap();
        let err = tree.prove(4).unwrap_err();
        assert!(matches!(
            err,
            AirdropError::IndexOutOfRange {
                index: 4,
                leaf_count: 4
            }
        ));
    }

    #[test]
    fn test_positional_proof_sides() {
        let l = leaves(4);
        let tree = MerkleTree::build(&l, unsorted(PairOrdering::Positional, OddNodePolicy::Duplicate)).unwrap();
        let proof = tree.prove(1).unwrap();
        assert_eq!(proof.sides, vec![Side::Left, Side::Right]);
        assert_eq!(proof.siblings[0], l[0]);
    }

    #[test]
    fn test_parse_policies() {
        assert_eq!("promote".parse::<OddNodePolicy>().unwrap(), OddNodePolicy::Promote);
        assert_eq!("positional".parse::<PairOrdering>().unwrap(), PairOrdering::Positional);
        assert!("random".parse::<PairOrdering>().is_err());
    }
}

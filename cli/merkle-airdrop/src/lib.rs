pub mod claims;
pub mod common;
pub mod config;
pub mod error;
pub mod leaf;
pub mod proof;
pub mod settlement;
pub mod tree;

pub use claims::{load_claims, Airdrop, ClaimSet, ProofsFile};
pub use common::{
    hex_encode, keccak256, parse_address, parse_hash, to_checksum_address, write_file_atomic,
    Address, Hash,
};
pub use error::{AirdropError, Result};
pub use leaf::{encode_leaf, ClaimRecord, ClaimScheme};
pub use proof::{verify, verify_sorted, Proof, Side};
pub use settlement::{ClaimError, Claimed, Distributor};
pub use tree::{build_tree, prove_leaf, MerkleTree, OddNodePolicy, PairOrdering, TreeOptions};

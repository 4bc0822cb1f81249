//! Error types for claim parsing, tree construction and proof lookup

use thiserror::Error;

/// Errors produced while building or querying an airdrop tree
#[derive(Debug, Error)]
pub enum AirdropError {
    /// Address is not 20 bytes of hex
    #[error("Invalid address '{input}': {reason}")]
    InvalidAddress { input: String, reason: String },

    /// The zero address cannot claim
    #[error("Zero address not allowed")]
    ZeroAddress,

    /// Entitlement is negative, fractional or does not fit in a uint128
    #[error("Invalid amount '{input}': {reason}")]
    InvalidAmount { input: String, reason: String },

    /// Hash is not 32 bytes of hex
    #[error("Invalid hash '{input}': {reason}")]
    InvalidHash { input: String, reason: String },

    /// No claimant records were supplied
    #[error("Claim set cannot be empty")]
    EmptyClaimSet,

    /// The same address appears twice in one claim set
    #[error("Duplicate address {address} at records {first} and {second}")]
    DuplicateAddress {
        address: String,
        first: usize,
        second: usize,
    },

    /// Address+amount scheme selected but a record carries no amount
    #[error("Record {index} ({address}) has no amount but the claim scheme requires one")]
    MissingAmount { index: usize, address: String },

    /// A tree needs at least one leaf
    #[error("Cannot build a Merkle tree from zero leaves")]
    EmptyTree,

    /// Proof requested for a leaf the tree does not have
    #[error("Leaf index {index} is out of bounds for tree with {leaf_count} leaves")]
    IndexOutOfRange { index: usize, leaf_count: usize },

    /// Address lookup failed
    #[error("Address {0} is not in the claim set")]
    AddressNotFound(String),

    /// Input file could not be interpreted
    #[error("Malformed input at line {line}: {reason}")]
    MalformedInput { line: usize, reason: String },

    /// A freshly generated proof did not fold back to the root
    #[error("Self-check failed: proof for {0} does not verify against the root")]
    SelfCheckFailed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for airdrop operations
pub type Result<T> = std::result::Result<T, AirdropError>;

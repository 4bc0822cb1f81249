//! Leaf encoding.
//!
//! A leaf is `keccak256(abi.encodePacked(address))` or
//! `keccak256(abi.encodePacked(address, uint256 amount))`, depending on the
//! [`ClaimScheme`] fixed for the whole tree. The settlement contract replays
//! the same packing at claim time, so any change here breaks every deployed
//! root.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::common::{keccak256, to_checksum_address, Address, Hash};
use crate::error::{AirdropError, Result};

/// Which fields of a claimant record go into its leaf.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClaimScheme {
    /// `keccak256(address)`; every claimant receives the same payout.
    #[default]
    Address,
    /// `keccak256(address ‖ uint256(amount))`; per-claimant entitlement.
    AddressAmount,
}

impl ClaimScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimScheme::Address => "address",
            ClaimScheme::AddressAmount => "address-amount",
        }
    }
}

impl fmt::Display for ClaimScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClaimScheme {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "address" => Ok(ClaimScheme::Address),
            "address-amount" => Ok(ClaimScheme::AddressAmount),
            other => Err(format!(
                "unknown claim scheme '{other}' (expected 'address' or 'address-amount')"
            )),
        }
    }
}

/// One eligible claimant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClaimRecord {
    pub address: Address,
    pub amount: Option<u128>,
}

impl ClaimRecord {
    pub fn new(address: Address, amount: Option<u128>) -> Self {
        Self { address, amount }
    }

    /// Parses an address string and an optional decimal amount string.
    pub fn parse(address: &str, amount: Option<&str>) -> Result<Self> {
        let address = crate::common::parse_address(address)?;
        let amount = amount.map(parse_amount).transpose()?;
        Ok(Self { address, amount })
    }

    pub fn checksum_address(&self) -> String {
        to_checksum_address(&self.address)
    }
}

/// Parses a non-negative integer amount that fits in a uint128.
pub fn parse_amount(input: &str) -> Result<u128> {
    let trimmed = input.trim();
    let invalid = |reason: &str| AirdropError::InvalidAmount {
        input: trimmed.to_string(),
        reason: reason.to_string(),
    };
    if trimmed.is_empty() {
        return Err(invalid("empty"));
    }
    if trimmed.starts_with('-') {
        return Err(invalid("amount cannot be negative"));
    }
    if !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid("expected a decimal integer"));
    }
    trimmed
        .parse::<u128>()
        .map_err(|_| invalid("amount exceeds uint128 range"))
}

/// Encodes `amount` as a 32-byte big-endian uint256.
pub fn amount_to_uint256(amount: u128) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[16..].copy_from_slice(&amount.to_be_bytes());
    word
}

/// Packs the record the way `abi.encodePacked` does for the given scheme.
///
/// # Errors
/// Returns [`AirdropError::MissingAmount`] when the scheme needs an amount and
/// the record has none. `index` is only used for the error message.
pub fn packed_leaf_preimage(record: &ClaimRecord, scheme: ClaimScheme, index: usize) -> Result<Vec<u8>> {
    match scheme {
        ClaimScheme::Address => Ok(record.address.to_vec()),
        ClaimScheme::AddressAmount => {
            let amount = record.amount.ok_or_else(|| AirdropError::MissingAmount {
                index,
                address: record.checksum_address(),
            })?;
            let mut packed = Vec::with_capacity(52);
            packed.extend_from_slice(&record.address);
            packed.extend_from_slice(&amount_to_uint256(amount));
            Ok(packed)
        }
    }
}

/// Hashes one claimant record into its tree leaf.
pub fn encode_leaf(record: &ClaimRecord, scheme: ClaimScheme) -> Result<Hash> {
    packed_leaf_preimage(record, scheme, 0).map(keccak256)
}

use sha3::{Digest, Keccak256};
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::error::{AirdropError, Result};

/// 20-byte account identifier.
pub type Address = [u8; 20];

/// 32-byte Keccak256 digest. Used for leaves, inner nodes and roots.
pub type Hash = [u8; 32];

/// Parses an Ethereum address from a hex string.
///
/// # Arguments
/// * `addr_str` - The address string, with or without "0x" prefix, any case
///
/// # Returns
/// A 20-byte array representing the address
///
/// # Errors
/// Returns an error if the address is not 40 hex characters, contains invalid
/// hex, or is the zero address
pub fn parse_address(addr_str: &str) -> Result<Address> {
    let trimmed = addr_str.trim();
    let cleaned = strip_hex_prefix(trimmed);
    if cleaned.len() != 40 {
        return Err(AirdropError::InvalidAddress {
            input: trimmed.to_string(),
            reason: format!("expected 40 hex chars, got {}", cleaned.len()),
        });
    }
    let mut address = [0u8; 20];
    hex::decode_to_slice(cleaned, &mut address).map_err(|e| AirdropError::InvalidAddress {
        input: trimmed.to_string(),
        reason: e.to_string(),
    })?;
    if address == [0u8; 20] {
        return Err(AirdropError::ZeroAddress);
    }
    Ok(address)
}

/// Parses a 32-byte hash (root, leaf or proof element) from a hex string.
///
/// # Errors
/// Returns an error if the value is not 64 hex characters
pub fn parse_hash(hash_str: &str) -> Result<Hash> {
    let trimmed = hash_str.trim();
    let cleaned = strip_hex_prefix(trimmed);
    if cleaned.len() != 64 {
        return Err(AirdropError::InvalidHash {
            input: trimmed.to_string(),
            reason: format!("expected 64 hex chars, got {}", cleaned.len()),
        });
    }
    let mut hash = [0u8; 32];
    hex::decode_to_slice(cleaned, &mut hash).map_err(|e| AirdropError::InvalidHash {
        input: trimmed.to_string(),
        reason: e.to_string(),
    })?;
    Ok(hash)
}

fn strip_hex_prefix(s: &str) -> &str {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}

/// Computes the Keccak256 hash of `data`.
pub fn keccak256(data: impl AsRef<[u8]>) -> Hash {
    Keccak256::digest(data.as_ref()).into()
}

/// Computes a Keccak256 hash of two 32-byte values concatenated.
///
/// # Arguments
/// * `left` - First 32-byte value
/// * `right` - Second 32-byte value
///
/// # Returns
/// 32-byte hash result
pub fn keccak256_pair(left: &Hash, right: &Hash) -> Hash {
    Keccak256::new()
        .chain_update(left)
        .chain_update(right)
        .finalize()
        .into()
}

/// Lowercase `0x`-prefixed hex.
pub fn hex_encode(bytes: impl AsRef<[u8]>) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Formats an address with the EIP-55 mixed-case checksum.
pub fn to_checksum_address(address: &Address) -> String {
    let lower = hex::encode(address);
    let digest = keccak256(lower.as_bytes());
    let mut out = String::with_capacity(42);
    out.push_str("0x");
    for (i, c) in lower.chars().enumerate() {
        let nibble = (digest[i / 2] >> if i % 2 == 0 { 4 } else { 0 }) & 0x0f;
        if c.is_ascii_alphabetic() && nibble >= 8 {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Writes `contents` to `path` through a sibling temp file and a rename so
/// readers never observe a half-written artifact.
pub fn write_file_atomic(path: &Path, contents: &str) -> Result<()> {
    let temp_path = path.with_extension("tmp");
    let mut file = File::create(&temp_path)?;
    file.write_all(contents.as_bytes())?;
    file.flush()?;
    file.sync_all()?;
    drop(file);
    std::fs::rename(&temp_path, path)?;
    Ok(())
}

use anyhow::{Context, Result};
use clap::Args;
use k256::ecdsa::SigningKey;
use serde::Serialize;
use sha3::{Digest, Keccak256};
use std::path::PathBuf;
use tracing::info;
use zeroize::Zeroize;

use merkle_airdrop::{
    encode_leaf, parse_address, to_checksum_address, verify, write_file_atomic, Address,
    ClaimScheme, ProofsFile,
};

#[derive(Args, Debug)]
pub struct Cli {
    /// Proofs artifact written by build-tree
    #[arg(short, long)]
    proofs: PathBuf,

    /// Claimer private key (hex format, with or without 0x prefix)
    /// Alternatively, use "-" to read from stdin (more secure)
    #[arg(short = 'k', long, conflicts_with = "address", required_unless_present = "address")]
    private_key: Option<String>,

    /// Claimer address, when no key is at hand
    #[arg(short, long)]
    address: Option<String>,

    /// Output JSON file
    #[arg(short, long)]
    output: PathBuf,
}

/// Arguments of the distributor's `claim` call.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ClaimOutput {
    merkle_root: String,
    claimer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    amount: Option<String>,
    proof: Vec<String>,
}

fn private_key_to_address(signing_key: &SigningKey) -> Address {
    let public_key = signing_key.verifying_key();
    let encoded = public_key.to_encoded_point(false);
    let pub_bytes = encoded.as_bytes();
    let hash = Keccak256::digest(&pub_bytes[1..]);
    let mut address = [0u8; 20];
    address.copy_from_slice(&hash[12..32]);
    address
}

fn read_private_key(arg: &str) -> Result<SigningKey> {
    let mut key_str = if arg == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_line(&mut buffer)
            .context("Failed to read private key from stdin")?;
        let trimmed = buffer.trim().to_string();
        buffer.zeroize();
        trimmed
    } else {
        arg.trim().to_string()
    };

    let stripped = key_str.strip_prefix("0x").unwrap_or(&key_str);
    if stripped.is_empty() {
        key_str.zeroize();
        anyhow::bail!("Private key is empty");
    }
    let decoded = hex::decode(stripped);
    key_str.zeroize();
    let mut key_bytes = decoded.context("Invalid private key format")?;
    if key_bytes.len() != 32 {
        let len = key_bytes.len();
        key_bytes.zeroize();
        anyhow::bail!("Invalid private key length: expected 32 bytes, got {len}");
    }

    let signing_key = SigningKey::from_slice(&key_bytes).context("Invalid private key");
    key_bytes.zeroize();
    signing_key
}

pub fn run(cli: Cli) -> Result<()> {
    let claimer = match (&cli.private_key, &cli.address) {
        (Some(key), _) => {
            info!("deriving claimer address from private key");
            let signing_key = read_private_key(key)?;
            private_key_to_address(&signing_key)
        }
        (None, Some(address)) => parse_address(address).context("Invalid claimer address")?,
        (None, None) => anyhow::bail!("Either --private-key or --address is required"),
    };
    info!(claimer = %to_checksum_address(&claimer), "looking up claimer");

    let proofs = ProofsFile::load(&cli.proofs).context("Failed to load proofs artifact")?;
    let root = proofs.root().context("Invalid root in proofs artifact")?;
    let resolved = proofs
        .resolve(&claimer)
        .context("Address not found in qualified list")?;

    // Same check the distributor runs; a failure here would revert on chain.
    let leaf = encode_leaf(&resolved.record, proofs.scheme).context("Failed to encode leaf")?;
    if !verify(&leaf, &resolved.proof, &root, proofs.tree.pairing) {
        anyhow::bail!("Proof for {} does not verify against the root", to_checksum_address(&claimer));
    }

    let claim = ClaimOutput {
        merkle_root: proofs.merkle_root.clone(),
        claimer: to_checksum_address(&claimer),
        amount: match proofs.scheme {
            ClaimScheme::AddressAmount => resolved.record.amount.map(|a| a.to_string()),
            ClaimScheme::Address => None,
        },
        proof: resolved.proof.to_hex(),
    };

    info!(path = %cli.output.display(), "writing claim");
    let json_output = serde_json::to_string_pretty(&claim).context("Failed to serialize JSON")?;
    write_file_atomic(&cli.output, &json_output).context("Failed to write claim file")?;

    println!("Claimer: {}", claim.claimer);
    println!("Proof length: {} nodes", claim.proof.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_private_key_to_address() {
        // Hardhat account #0
        let key = hex::decode("ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80").unwrap();
        let signing_key = SigningKey::from_slice(&key).unwrap();
        let address = private_key_to_address(&signing_key);
        assert_eq!(
            to_checksum_address(&address),
            "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
        );
    }

    #[test]
    fn test_private_key_to_address_deterministic() {
        let key_bytes = [42u8; 32];
        let address1 = private_key_to_address(&SigningKey::from_slice(&key_bytes).unwrap());
        let address2 = private_key_to_address(&SigningKey::from_slice(&key_bytes).unwrap());
        assert_eq!(address1, address2);
    }

    #[test]
    fn test_read_private_key_rejects_bad_input() {
        assert!(read_private_key("0x").is_err());
        assert!(read_private_key("0x1234").is_err());
        assert!(read_private_key("zz").is_err());
        assert!(read_private_key(&"00".repeat(32)).is_err());
    }

    #[test]
    fn test_read_private_key_with_prefix() {
        let key = read_private_key("0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80").unwrap();
        let address = private_key_to_address(&key);
        assert_eq!(address, parse_address("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266").unwrap());
    }
}

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

use merkle_airdrop::{
    hex_encode, parse_address, to_checksum_address, PairOrdering, ProofsFile, Side,
};

#[derive(Args, Debug)]
pub struct Cli {
    /// Proofs artifact written by build-tree
    #[arg(short, long)]
    proofs: PathBuf,

    /// Claimant address
    #[arg(short, long)]
    address: String,

    /// Print a JSON object instead of one hash per line
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProofOutput {
    merkle_root: String,
    address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    amount: Option<String>,
    leaf: String,
    proof: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    proof_sides: Option<Vec<Side>>,
}

pub fn run(cli: &Cli) -> Result<()> {
    let address = parse_address(&cli.address).context("Invalid claimant address")?;

    info!(path = %cli.proofs.display(), "loading proofs");
    let proofs = ProofsFile::load(&cli.proofs).context("Failed to load proofs artifact")?;
    let resolved = proofs
        .resolve(&address)
        .with_context(|| format!("No proof for {}", to_checksum_address(&address)))?;
    info!(elements = resolved.proof.len(), "found proof");

    if cli.json {
        let output = ProofOutput {
            merkle_root: proofs.merkle_root.clone(),
            address: to_checksum_address(&address),
            amount: resolved.record.amount.map(|a| a.to_string()),
            leaf: hex_encode(resolved.leaf),
            proof: resolved.proof.to_hex(),
            proof_sides: (proofs.tree.pairing == PairOrdering::Positional)
                .then(|| resolved.proof.sides.clone()),
        };
        println!(
            "{}",
            serde_json::to_string_pretty(&output).context("Failed to serialize proof")?
        );
    } else {
        for element in resolved.proof.to_hex() {
            println!("{element}");
        }
    }

    Ok(())
}

use anyhow::{bail, Context, Result};
use clap::Args;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use merkle_airdrop::{
    encode_leaf, hex_encode, parse_address, parse_hash, to_checksum_address, verify, Hash,
    PairOrdering, Proof, ProofsFile, Side,
};

/// Either `--proofs` with `--address`, or `--root`, `--leaf` and `--proof`.
#[derive(Args, Debug)]
pub struct Cli {
    /// Proofs artifact written by build-tree
    #[arg(short, long, requires = "address", conflicts_with_all = ["root", "leaf", "proof"])]
    proofs: Option<PathBuf>,

    /// Claimant address to look up in the proofs artifact
    #[arg(short, long)]
    address: Option<String>,

    /// Merkle root
    #[arg(short, long, requires_all = ["leaf"])]
    root: Option<String>,

    /// Leaf hash
    #[arg(short, long)]
    leaf: Option<String>,

    /// Proof elements, leaf level first
    #[arg(long, num_args = 0.., value_delimiter = ',')]
    proof: Vec<String>,

    /// Sides of the proof elements ("left"/"right"), for positional pairing
    #[arg(long, num_args = 0.., value_delimiter = ',')]
    sides: Vec<String>,

    /// Pair hashing rule of the verifier
    #[arg(long, default_value = "sorted")]
    pairing: PairOrdering,
}

fn parse_side(s: &str) -> Result<Side> {
    match s.trim().to_ascii_lowercase().as_str() {
        "left" | "l" => Ok(Side::Left),
        "right" | "r" => Ok(Side::Right),
        other => bail!("Invalid side '{other}': expected 'left' or 'right'"),
    }
}

/// Verdict from explicit root, leaf and proof arguments.
fn verify_explicit(cli: &Cli) -> Result<bool> {
    let (Some(root), Some(leaf)) = (&cli.root, &cli.leaf) else {
        bail!("Either --proofs with --address, or --root with --leaf, is required");
    };
    let root = parse_hash(root).context("Invalid root")?;
    let leaf = parse_hash(leaf).context("Invalid leaf")?;
    let siblings = cli
        .proof
        .iter()
        .map(|h| parse_hash(h))
        .collect::<merkle_airdrop::Result<Vec<Hash>>>()
        .context("Invalid proof element")?;

    let sides = if cli.sides.is_empty() {
        if cli.pairing == PairOrdering::Positional && !siblings.is_empty() {
            bail!("Positional pairing needs --sides for every proof element");
        }
        vec![Side::Right; siblings.len()]
    } else {
        cli.sides.iter().map(|s| parse_side(s)).collect::<Result<Vec<_>>>()?
    };
    if sides.len() != siblings.len() {
        bail!(
            "Got {} proof elements but {} sides",
            siblings.len(),
            sides.len()
        );
    }

    Ok(verify(&leaf, &Proof { siblings, sides }, &root, cli.pairing))
}

/// Verdict for a claimant listed in a proofs artifact. The leaf is re-encoded
/// from the address rather than trusted from the file.
fn verify_listed(path: &Path, address: &str) -> Result<bool> {
    let address = parse_address(address).context("Invalid claimant address")?;
    let proofs = ProofsFile::load(path).context("Failed to load proofs artifact")?;
    let root = proofs.root().context("Invalid root in proofs artifact")?;
    let resolved = proofs
        .resolve(&address)
        .with_context(|| format!("No proof for {}", to_checksum_address(&address)))?;

    let leaf = encode_leaf(&resolved.record, proofs.scheme).context("Failed to encode leaf")?;
    if leaf != resolved.leaf {
        warn!(
            stored = %hex_encode(resolved.leaf),
            computed = %hex_encode(leaf),
            "stored leaf does not match the encoded claim"
        );
        return Ok(false);
    }
    Ok(verify(&leaf, &resolved.proof, &root, proofs.tree.pairing))
}

pub fn run(cli: &Cli) -> Result<()> {
    let valid = match (&cli.proofs, &cli.address) {
        (Some(path), Some(address)) => verify_listed(path, address)?,
        _ => verify_explicit(cli)?,
    };

    if valid {
        info!("proof folds to the root");
        println!("valid");
        Ok(())
    } else {
        println!("invalid");
        bail!("Proof does not verify against the root")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use merkle_airdrop::{build_tree, keccak256, prove_leaf, TreeOptions};

    #[derive(Parser)]
    struct Wrapper {
        #[command(flatten)]
        cli: Cli,
    }

    fn parse(args: &[&str]) -> std::result::Result<Cli, clap::Error> {
        let mut argv = vec!["verify"];
        argv.extend_from_slice(args);
        Wrapper::try_parse_from(argv).map(|w| w.cli)
    }

    #[test]
    fn test_explicit_proof_flags() {
        let leaves: Vec<Hash> = (0u8..3).map(|i| keccak256([i])).collect();
        let tree = build_tree(&leaves, TreeOptions::default()).unwrap();
        let proof = prove_leaf(&tree, 1).unwrap().to_hex().join(",");
        let root = hex_encode(tree.root());
        let leaf = hex_encode(leaves[1]);

        let cli = parse(&["-r", &root, "-l", &leaf, "--proof", &proof]).unwrap();
        assert!(verify_explicit(&cli).unwrap());

        let other = hex_encode(leaves[0]);
        let cli = parse(&["-r", &root, "-l", &other, "--proof", &proof]).unwrap();
        assert!(!verify_explicit(&cli).unwrap());
    }

    #[test]
    fn test_proofs_artifact_conflicts_with_explicit_root() {
        let root = hex_encode([0u8; 32]);
        assert!(parse(&["-p", "merkle-proofs.json", "-a", "0x70997970C51812dc3A010C7d01b50e0d17dc79C8", "-r", &root]).is_err());
    }

    #[test]
    fn test_positional_needs_sides() {
        let h = hex_encode([1u8; 32]);
        let cli = parse(&["-r", &h, "-l", &h, "--proof", &h, "--pairing", "positional"]).unwrap();
        assert!(verify_explicit(&cli).is_err());

        let cli = parse(&["-r", &h, "-l", &h, "--proof", &h, "--sides", "left,right"]).unwrap();
        assert!(verify_explicit(&cli).is_err());
    }
}

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use clap::Args;
use std::path::PathBuf;
use tracing::{info, warn};

use merkle_airdrop::config::AirdropConfig;
use merkle_airdrop::{
    hex_encode, load_claims, write_file_atomic, Airdrop, ClaimScheme, OddNodePolicy, PairOrdering,
    TreeOptions,
};

#[derive(Args, Debug)]
pub struct Cli {
    /// Claimant list: .json, .csv, or one address per line
    #[arg(short, long)]
    input: PathBuf,

    /// TOML config with tree policies and output paths
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Leaf encoding: "address" or "address-amount"
    #[arg(long)]
    scheme: Option<ClaimScheme>,

    /// Odd node handling: "duplicate" or "promote"
    #[arg(long)]
    odd_nodes: Option<OddNodePolicy>,

    /// Pair hashing: "sorted" or "positional"
    #[arg(long)]
    pairing: Option<PairOrdering>,

    /// Keep leaves in input order instead of sorting them
    #[arg(long)]
    no_sort_leaves: bool,

    /// Use the policies of merkletreejs with `sortPairs: true`
    #[arg(long, conflicts_with_all = ["odd_nodes", "pairing", "no_sort_leaves"])]
    merkletreejs: bool,

    /// Output file for the full proofs artifact
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output file for the front-end claims artifact
    #[arg(short, long)]
    frontend: Option<PathBuf>,

    /// Output file for the bare Merkle root
    #[arg(short, long)]
    root_output: Option<PathBuf>,
}

impl Cli {
    /// Merges CLI flags over the config file; flags win.
    fn resolve(&self, config: &AirdropConfig) -> (ClaimScheme, TreeOptions) {
        let scheme = self.scheme.unwrap_or(config.tree.scheme);
        if self.merkletreejs {
            return (scheme, TreeOptions::merkletreejs());
        }
        let mut options = config.tree.options();
        if let Some(odd_nodes) = self.odd_nodes {
            options.odd_nodes = odd_nodes;
        }
        if let Some(pairing) = self.pairing {
            options.pairing = pairing;
        }
        if self.no_sort_leaves {
            options.sort_leaves = false;
        }
        (scheme, options)
    }
}

pub fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => AirdropConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => AirdropConfig::default(),
    };
    let (scheme, options) = cli.resolve(&config);

    info!(input = %cli.input.display(), "reading claimants");
    let claims = load_claims(&cli.input).context("Failed to load claim records")?;

    if scheme == ClaimScheme::Address && claims.records().iter().any(|r| r.amount.is_some()) {
        warn!("input carries amounts but the address scheme does not commit to them");
    }

    info!(
        claimants = claims.len(),
        scheme = %scheme,
        pairing = %options.pairing,
        odd_nodes = %options.odd_nodes,
        sort_leaves = options.sort_leaves,
        "building Merkle tree"
    );
    let airdrop = Airdrop::build(claims, scheme, options).context("Failed to build Merkle tree")?;
    airdrop.self_check().context("Generated proofs do not verify")?;

    let root = hex_encode(airdrop.root());
    info!(root = %root, depth = airdrop.tree().depth(), "Merkle tree built");

    let generated_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    let mut proofs = airdrop
        .proofs_file(generated_at)
        .context("Failed to assemble proofs artifact")?;
    if let Some(payout) = config.payout() {
        match scheme {
            ClaimScheme::Address => proofs = proofs.with_payout(payout),
            ClaimScheme::AddressAmount => {
                warn!("settlement.payout is ignored: address-amount leaves carry their own amounts")
            }
        }
    }

    let proofs_path = cli.output.unwrap_or_else(|| config.output.proofs.clone());
    proofs
        .write(&proofs_path)
        .with_context(|| format!("Failed to write {}", proofs_path.display()))?;
    info!(path = %proofs_path.display(), total_amount = %proofs.total_amount, "wrote proofs");

    if let Some(frontend_path) = cli.frontend.or_else(|| config.output.frontend.clone()) {
        airdrop
            .frontend_file()
            .context("Failed to assemble front-end artifact")?
            .write(&frontend_path)
            .with_context(|| format!("Failed to write {}", frontend_path.display()))?;
        info!(path = %frontend_path.display(), "wrote front-end claims");
    }

    if let Some(root_path) = cli.root_output.or_else(|| config.output.root.clone()) {
        write_file_atomic(&root_path, &format!("{root}\n"))
            .with_context(|| format!("Failed to write {}", root_path.display()))?;
        info!(path = %root_path.display(), "wrote Merkle root");
    }

    println!("{root}");
    Ok(())
}

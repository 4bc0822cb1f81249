#![forbid(unsafe_code)]
#![allow(unreachable_pub)]

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod build_tree;
mod claim;
mod prove;
mod verify;

#[derive(Parser, Debug)]
#[command(name = "merkle-airdrop")]
#[command(about = "Merkle airdrop tree, proof and claim tools", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build the tree and write root and proof artifacts
    BuildTree(build_tree::Cli),
    /// Print one claimant's proof
    Prove(prove::Cli),
    /// Check a leaf and proof against a root
    Verify(verify::Cli),
    /// Prepare claim calldata for a claimant
    Claim(claim::Cli),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match cli.command {
        Commands::BuildTree(args) => build_tree::run(args)?,
        Commands::Prove(args) => prove::run(&args)?,
        Commands::Verify(args) => verify::run(&args)?,
        Commands::Claim(args) => claim::run(args)?,
    }

    Ok(())
}

//! Key Generation CLI for the withdrawal circuit
//!
//! Generates the Groth16 proving and verifying keys for a tree depth.
//!
//! Usage:
//!   cargo run --package mixer-prover --bin keygen -- --depth 20 --pk-out ./proving.key --vk-out ./verifying.key
//!
//! Note: Keys must be regenerated whenever the circuit or the depth changes.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::Parser;
use rand::rngs::OsRng;

use mixer_privacy::MAX_TREE_DEPTH;
use mixer_prover::{Groth16ProofSystem, NUM_PUBLIC_INPUTS, WithdrawCircuit, WithdrawVerifier};

/// Command-line arguments
#[derive(Parser, Debug, Clone)]
#[command(name = "keygen")]
#[command(about = "Mixer withdrawal key generation tool", long_about = None)]
struct Args {
    /// Merkle tree depth
    #[arg(long, default_value_t = 20, value_parser = parse_depth)]
    depth: usize,

    /// Path for proving key output
    #[arg(long, default_value = "./proving.key")]
    pk_out: PathBuf,

    /// Path for verifying key output
    #[arg(long, default_value = "./verifying.key")]
    vk_out: PathBuf,

    /// Deterministic setup (development only)
    #[arg(long)]
    seed: Option<u64>,

    /// Overwrite existing keys
    #[arg(short, long)]
    force: bool,
}

fn parse_depth(value: &str) -> Result<usize, String> {
    let depth: usize = value
        .parse()
        .map_err(|_| format!("`{value}` is not a number"))?;
    if depth == 0 || depth > MAX_TREE_DEPTH {
        return Err(format!("must be between 1 and {MAX_TREE_DEPTH}"));
    }
    Ok(depth)
}

/// Refuse to clobber either key file unless `force` is set
fn check_outputs(pk_out: &Path, vk_out: &Path, force: bool) -> Result<()> {
    if force {
        return Ok(());
    }
    for path in [pk_out, vk_out] {
        if path.exists() {
            bail!(
                "{} already exists, use --force to regenerate keys",
                path.display()
            );
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    check_outputs(&args.pk_out, &args.vk_out, args.force)?;

    println!("Mixer Withdrawal Key Generation");
    println!("===============================");
    println!();
    println!("  Tree depth:    {}", args.depth);
    println!("  Public inputs: {} (root, nullifier_hash)", NUM_PUBLIC_INPUTS);
    println!(
        "  Constraints:   {}",
        WithdrawCircuit::constraint_count(args.depth)?
    );
    println!();

    println!("Performing Groth16 circuit-specific setup...");
    let start = std::time::Instant::now();
    let system = match args.seed {
        Some(seed) => {
            println!("WARNING: seeded setup is reproducible and insecure outside development");
            Groth16ProofSystem::setup_with_seed(args.depth, seed)?
        }
        None => Groth16ProofSystem::setup(args.depth, &mut OsRng)?,
    };
    println!("Setup complete in {:?}", start.elapsed());
    println!();

    let (pk_bytes, vk_bytes) = system.to_bytes()?;

    println!("Saving proving key to {}...", args.pk_out.display());
    write_key(&args.pk_out, &pk_bytes).context("Failed to write proving key")?;
    println!(
        "  Size: {} bytes ({:.2} MB)",
        pk_bytes.len(),
        pk_bytes.len() as f64 / 1024.0 / 1024.0
    );

    println!("Saving verifying key to {}...", args.vk_out.display());
    write_key(&args.vk_out, &vk_bytes).context("Failed to write verifying key")?;
    println!("  Size: {} bytes", vk_bytes.len());

    println!();
    println!("Verification key hash (blake3):");
    println!("  {}", hex::encode(system.verification_key_hash()));

    println!();
    println!("To use with the mixer ledger, set environment variables:");
    println!("  export MIXER_PROVER_MODE=groth16");
    println!("  export MIXER_TREE_DEPTH={}", args.depth);
    println!("  export MIXER_PROVING_KEY={}", args.pk_out.display());
    println!("  export MIXER_VERIFYING_KEY={}", args.vk_out.display());

    Ok(())
}

fn write_key(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, bytes)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["keygen"]).unwrap();
        assert_eq!(args.depth, 20);
        assert_eq!(args.pk_out, PathBuf::from("./proving.key"));
        assert!(args.seed.is_none());
        assert!(!args.force);
    }

    #[test]
    fn test_missing_values_rejected() {
        assert!(Args::try_parse_from(["keygen", "--pk-out"]).is_err());
        assert!(Args::try_parse_from(["keygen", "--depth"]).is_err());
        assert!(Args::try_parse_from(["keygen", "--seed", "abc"]).is_err());
        assert!(Args::try_parse_from(["keygen", "--bogus"]).is_err());
    }

    #[test]
    fn test_depth_bounds() {
        assert!(Args::try_parse_from(["keygen", "--depth", "0"]).is_err());
        assert!(Args::try_parse_from(["keygen", "--depth", "33"]).is_err());
        let args = Args::try_parse_from(["keygen", "--depth", "32", "-f"]).unwrap();
        assert_eq!(args.depth, 32);
        assert!(args.force);
    }

    #[test]
    fn test_either_existing_key_blocks_overwrite() {
        let dir = TempDir::new().unwrap();
        let pk = dir.path().join("proving.key");
        let vk = dir.path().join("verifying.key");
        assert!(check_outputs(&pk, &vk, false).is_ok());

        fs::write(&vk, b"old").unwrap();
        assert!(check_outputs(&pk, &vk, false).is_err());
        assert!(check_outputs(&vk, &pk, false).is_err());
        assert!(check_outputs(&pk, &vk, true).is_ok());
    }

    #[test]
    fn test_write_key_creates_parent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("keys/nested/verifying.key");
        write_key(&path, b"vk").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"vk");
    }
}

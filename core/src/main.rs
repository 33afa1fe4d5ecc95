//! Mixer Node
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │                  Mixer Node                   │
//! │                                               │
//! │  ┌──────────────┐        ┌─────────────────┐  │
//! │  │ MixerLedger  │◄───────│  Proof System   │  │
//! │  │ tree, roots, │ verify │  (mock/groth16) │  │
//! │  │ spent, pool  │        └────────┬────────┘  │
//! │  └──────┬───────┘                 │ prove     │
//! │         │                ┌────────▼────────┐  │
//! │  ┌──────▼───────┐        │  ProverService  │  │
//! │  │   RocksDB    │        │ (worker thread) │  │
//! │  └──────────────┘        └─────────────────┘  │
//! └───────────────────────────────────────────────┘
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use log::{info, warn};
use tokio::signal;
use tokio_util::sync::CancellationToken;

use mixer_config::MixerConfig;
use mixer_core::MixerLedger;
use mixer_prover::{ProverService, WithdrawVerifier, build_proof_system};

const STATUS_INTERVAL_SECS: u64 = 60;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let config = MixerConfig::load().context("Failed to load configuration")?;

    info!("============================================");
    info!("          MIXER NODE v{}", env!("CARGO_PKG_VERSION"));
    info!("============================================");
    info!("Tree depth        : {}", config.tree.depth);
    info!("Root history      : {}", config.tree.root_history_size);
    info!("Denomination      : {}", config.pool.denomination);
    info!(
        "Database          : {}",
        config.database.path.as_deref().unwrap_or("<in-memory>")
    );
    info!("Prover mode       : {:?}", config.prover.mode);
    info!("Proof timeout     : {}s", config.prover.proof_timeout_secs);
    info!("============================================");

    let proof_system = build_proof_system(&config.prover, config.tree.depth)
        .context("Failed to build proof system")?;
    info!(
        "Verification key hash: {}",
        hex::encode(proof_system.verification_key_hash())
    );

    let verifier: Arc<dyn WithdrawVerifier> = proof_system.clone();
    let ledger = Arc::new(MixerLedger::from_config(&config, verifier)?);

    let _prover = ProverService::with_timeout(
        proof_system,
        Duration::from_secs(config.prover.proof_timeout_secs),
    );
    info!("Prover service started");

    let shutdown = CancellationToken::new();

    // Periodic status report
    let status_ledger = ledger.clone();
    let status_shutdown = shutdown.clone();
    let status_handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(STATUS_INTERVAL_SECS));
        loop {
            tokio::select! {
                _ = status_shutdown.cancelled() => break,
                _ = interval.tick() => match status_ledger.status() {
                    Ok(status) => info!(
                        "Status: {}/{} deposits, {} spent, balance {}, root {}",
                        status.leaves,
                        status.capacity,
                        status.spent,
                        status.balance,
                        status.root
                    ),
                    Err(e) => warn!("Status unavailable: {}", e),
                },
            }
        }
    });

    info!("Mixer node is ready");

    signal::ctrl_c().await?;
    info!("Shutdown signal received");
    shutdown.cancel();
    let _ = status_handle.await;

    info!("Mixer node stopped");
    Ok(())
}

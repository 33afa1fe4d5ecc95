//! Async Prover Service
//!
//! Proof generation is CPU-bound, so it runs on a dedicated thread outside
//! the tokio runtime. Callers submit witnesses over a channel and await the
//! reply, with cancellation and a deadline.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::error::ProverError;
use crate::proof_system::{WithdrawProof, WithdrawProver};
use crate::witness::WithdrawWitness;

const REQUEST_QUEUE_DEPTH: usize = 32;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Request to prove a withdrawal
pub struct ProveRequest {
    pub witness: WithdrawWitness,
    /// Cancelled when the caller stops waiting
    pub cancel: CancellationToken,
    pub reply: oneshot::Sender<Result<WithdrawProof, ProverError>>,
}

/// Async prover service for background proving
pub struct ProverService {
    request_tx: mpsc::Sender<ProveRequest>,
    timeout: Duration,
}

impl ProverService {
    /// Start the prover service with the given prover implementation
    pub fn start<P: WithdrawProver + 'static>(prover: P) -> Self {
        Self::with_timeout(prover, DEFAULT_TIMEOUT)
    }

    /// Start with a per-request deadline
    pub fn with_timeout<P: WithdrawProver + 'static>(prover: P, timeout: Duration) -> Self {
        let (request_tx, mut request_rx) = mpsc::channel::<ProveRequest>(REQUEST_QUEUE_DEPTH);

        // Spawn proving thread (separate from tokio runtime for CPU-intensive work)
        std::thread::spawn(move || {
            while let Some(request) = request_rx.blocking_recv() {
                if request.cancel.is_cancelled() {
                    log::debug!("skipping cancelled proof request");
                    continue;
                }
                let result = prover.prove(&request.witness);
                let _ = request.reply.send(result);
            }
            log::debug!("prover service stopped");
        });

        Self {
            request_tx,
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Submit a witness for proving
    pub async fn prove(
        &self,
        witness: WithdrawWitness,
        cancel: &CancellationToken,
    ) -> Result<WithdrawProof, ProverError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let request_cancel = cancel.child_token();
        // Queued work is skipped once we stop waiting for it
        let _guard = request_cancel.clone().drop_guard();

        self.request_tx
            .send(ProveRequest {
                witness,
                cancel: request_cancel,
                reply: reply_tx,
            })
            .await
            .map_err(|_| ProverError::ServiceUnavailable)?;

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                log::warn!("proof request cancelled by caller");
                Err(ProverError::Cancelled)
            }
            reply = tokio::time::timeout(self.timeout, reply_rx) => match reply {
                Err(_) => {
                    log::warn!("proof request timed out after {:?}", self.timeout);
                    Err(ProverError::TimedOut)
                }
                Ok(Err(_)) => Err(ProverError::ServiceUnavailable),
                Ok(Ok(result)) => result,
            },
        }
    }
}

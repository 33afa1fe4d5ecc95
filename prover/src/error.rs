use ark_relations::r1cs::SynthesisError;
use mixer_privacy::MerkleError;
use thiserror::Error;

/// Errors raised while building witnesses, proving or verifying
#[derive(Debug, Error)]
pub enum ProverError {
    #[error("merkle path error: {0}")]
    Merkle(#[from] MerkleError),

    #[error("note {index} does not match its secret")]
    InvalidNote { index: u64 },

    #[error("path bits do not encode leaf index {index}")]
    PathBitsMismatch { index: u64 },

    #[error("witness depth {got} does not match proof system depth {expected}")]
    DepthMismatch { expected: usize, got: usize },

    #[error("witness does not satisfy the withdrawal relation")]
    Unsatisfied,

    #[error("constraint synthesis failed: {0}")]
    Synthesis(String),

    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error("malformed proof bytes")]
    MalformedProof,

    #[error("proof generation cancelled")]
    Cancelled,

    #[error("proof generation timed out")]
    TimedOut,

    #[error("prover service unavailable")]
    ServiceUnavailable,
}

impl From<SynthesisError> for ProverError {
    fn from(e: SynthesisError) -> Self {
        Self::Synthesis(e.to_string())
    }
}

impl ProverError {
    /// Whether rebuilding the witness against a fresh snapshot can help
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::Merkle(MerkleError::StaleRootMismatch { .. }))
    }
}

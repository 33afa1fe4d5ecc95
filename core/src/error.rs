use std::fmt;

use mixer_privacy::{FieldError, MerkleError, NullifierHash};
use thiserror::Error;

/// Why a withdrawal proof was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// The public root is not the current root or a recent one
    UnknownRoot,
    /// The verifier rejected the proof for the public inputs
    VerificationFailed,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownRoot => f.write_str("unknown root"),
            Self::VerificationFailed => f.write_str("verification failed"),
        }
    }
}

/// Ledger transition errors. Every variant leaves the ledger unchanged.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("pool is full ({capacity} deposits)")]
    CapacityExceeded { capacity: u64 },

    #[error("leaf index {index} out of range ({len} deposits)")]
    IndexOutOfRange { index: u64, len: u64 },

    #[error("nullifier hash {nullifier_hash} already spent")]
    DoubleSpend { nullifier_hash: NullifierHash },

    #[error("invalid withdrawal proof: {reason}")]
    InvalidProof { reason: RejectReason },

    #[error("deposit value {got} does not match denomination {expected}")]
    WrongDenomination { expected: u64, got: u64 },

    #[error("deposit would land at index {actual}, expected {expected}")]
    IndexMismatch { expected: u64, actual: u64 },

    #[error("pool balance {balance} cannot cover withdrawal of {amount}")]
    InsufficientBalance { balance: u64, amount: u64 },

    #[error("pool balance overflow")]
    BalanceOverflow,

    #[error("verifier built for depth {verifier}, ledger configured for depth {ledger}")]
    VerifierDepthMismatch { ledger: usize, verifier: usize },

    #[error("invalid field encoding: {0}")]
    Field(#[from] FieldError),

    #[error("storage error: {0:#}")]
    Storage(#[from] anyhow::Error),

    #[error("ledger state lock poisoned")]
    StatePoisoned,
}

impl From<MerkleError> for LedgerError {
    fn from(e: MerkleError) -> Self {
        match e {
            MerkleError::CapacityExceeded { capacity } => Self::CapacityExceeded { capacity },
            MerkleError::IndexOutOfRange { index, len } => Self::IndexOutOfRange { index, len },
            other => Self::Storage(anyhow::Error::new(other)),
        }
    }
}

impl LedgerError {
    /// Whether resubmitting the same request can never succeed
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::CapacityExceeded { .. }
                | Self::DoubleSpend { .. }
                | Self::InvalidProof { .. }
                | Self::WrongDenomination { .. }
                | Self::VerifierDepthMismatch { .. }
                | Self::Field(_)
        )
    }

    /// What the caller should do next
    pub fn remediation(&self) -> &'static str {
        match self {
            Self::CapacityExceeded { .. } => "the pool is full; deposit into another pool",
            Self::IndexOutOfRange { .. } => "wait for the deposit to be included, then retry",
            Self::DoubleSpend { .. } => "this deposit has already been withdrawn",
            Self::InvalidProof {
                reason: RejectReason::UnknownRoot,
            } => "fetch a fresh root and path, rebuild the witness and prove again",
            Self::InvalidProof {
                reason: RejectReason::VerificationFailed,
            } => "the proof does not match the public inputs; rebuild it from the note",
            Self::WrongDenomination { .. } => "deposit exactly the pool denomination",
            Self::IndexMismatch { .. } => {
                "derive a new note for the next free index and deposit again"
            }
            Self::InsufficientBalance { .. } | Self::BalanceOverflow => {
                "pool accounting is inconsistent; contact the operator"
            }
            Self::VerifierDepthMismatch { .. } => {
                "regenerate the keys for the configured tree depth"
            }
            Self::Field(_) => "encode values as canonical 32-byte big-endian field elements",
            Self::Storage(_) | Self::StatePoisoned => "retry later",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mixer_privacy::{Fr, Root};

    #[test]
    fn test_error_messages() {
        let err = LedgerError::InvalidProof {
            reason: RejectReason::UnknownRoot,
        };
        assert_eq!(err.to_string(), "invalid withdrawal proof: unknown root");

        let err = LedgerError::WrongDenomination {
            expected: 100,
            got: 5,
        };
        assert_eq!(
            err.to_string(),
            "deposit value 5 does not match denomination 100"
        );
    }

    #[test]
    fn test_terminal_classification() {
        let double_spend = LedgerError::DoubleSpend {
            nullifier_hash: NullifierHash::from_field(Fr::from(1u64)),
        };
        let bad_proof = LedgerError::InvalidProof {
            reason: RejectReason::VerificationFailed,
        };
        assert!(double_spend.is_terminal());
        assert!(bad_proof.is_terminal());
        assert_ne!(double_spend.remediation(), bad_proof.remediation());

        assert!(!LedgerError::StatePoisoned.is_terminal());
        assert!(
            !LedgerError::IndexMismatch {
                expected: 1,
                actual: 2
            }
            .is_terminal()
        );
    }

    #[test]
    fn test_merkle_error_mapping() {
        let err = LedgerError::from(MerkleError::CapacityExceeded { capacity: 8 });
        assert!(matches!(err, LedgerError::CapacityExceeded { capacity: 8 }));

        let err = LedgerError::from(MerkleError::StaleRootMismatch {
            expected: Root::from_field(Fr::from(1u64)),
            computed: Root::from_field(Fr::from(2u64)),
        });
        assert!(matches!(err, LedgerError::Storage(_)));
    }
}

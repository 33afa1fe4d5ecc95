//! Withdrawal Guard
//!
//! Checks a withdrawal request against the ledger state in a fixed order:
//!
//! ```text
//! Received ─► RootChecked ─► NullifierChecked ─► ProofVerified ─► Settled
//!     │            │                │
//!     └────────────┴────────────────┴──────────► Rejected
//! ```
//!
//! The guard only reads state. The ledger runs it under its lock and
//! performs the settlement itself, so no other transition can interleave
//! between the checks and the spend.

use log::{debug, warn};
use mixer_privacy::{NullifierHash, RootHistory};
use mixer_prover::WithdrawVerifier;

use crate::error::{LedgerError, RejectReason};
use crate::ledger::WithdrawalRequest;
use crate::spent::SpentSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WithdrawalStage {
    Received,
    RootChecked,
    NullifierChecked,
    ProofVerified,
    Settled,
    Rejected,
}

pub struct WithdrawalGuard<'a> {
    request: &'a WithdrawalRequest,
    stage: WithdrawalStage,
}

impl<'a> WithdrawalGuard<'a> {
    pub fn new(request: &'a WithdrawalRequest) -> Self {
        Self {
            request,
            stage: WithdrawalStage::Received,
        }
    }

    pub fn stage(&self) -> WithdrawalStage {
        self.stage
    }

    /// Run every check; returns the nullifier hash cleared for spending
    pub fn check(
        &mut self,
        roots: &RootHistory,
        spent: &SpentSet,
        verifier: &dyn WithdrawVerifier,
    ) -> Result<NullifierHash, LedgerError> {
        self.check_root(roots)?;
        self.check_nullifier(spent)?;
        self.check_proof(verifier)?;
        Ok(self.request.public_inputs.nullifier_hash)
    }

    fn check_root(&mut self, roots: &RootHistory) -> Result<(), LedgerError> {
        let root = &self.request.public_inputs.root;
        if !roots.is_valid(root) {
            return self.reject(LedgerError::InvalidProof {
                reason: RejectReason::UnknownRoot,
            });
        }
        self.advance(WithdrawalStage::RootChecked);
        Ok(())
    }

    fn check_nullifier(&mut self, spent: &SpentSet) -> Result<(), LedgerError> {
        let nullifier_hash = self.request.public_inputs.nullifier_hash;
        if spent.contains(&nullifier_hash) {
            return self.reject(LedgerError::DoubleSpend { nullifier_hash });
        }
        self.advance(WithdrawalStage::NullifierChecked);
        Ok(())
    }

    fn check_proof(&mut self, verifier: &dyn WithdrawVerifier) -> Result<(), LedgerError> {
        match verifier.verify(&self.request.proof, &self.request.public_inputs) {
            Ok(true) => {
                self.advance(WithdrawalStage::ProofVerified);
                Ok(())
            }
            Ok(false) => self.reject(LedgerError::InvalidProof {
                reason: RejectReason::VerificationFailed,
            }),
            Err(e) => {
                warn!("verifier error: {}", e);
                self.reject(LedgerError::InvalidProof {
                    reason: RejectReason::VerificationFailed,
                })
            }
        }
    }

    /// Record that the ledger applied the spend
    pub fn mark_settled(&mut self) {
        debug_assert_eq!(self.stage, WithdrawalStage::ProofVerified);
        self.advance(WithdrawalStage::Settled);
    }

    fn advance(&mut self, next: WithdrawalStage) {
        debug!(
            "withdrawal {}: {:?} -> {:?}",
            self.request.public_inputs.nullifier_hash, self.stage, next
        );
        self.stage = next;
    }

    fn reject(&mut self, err: LedgerError) -> Result<(), LedgerError> {
        warn!(
            "withdrawal {} rejected at {:?}: {}",
            self.request.public_inputs.nullifier_hash, self.stage, err
        );
        self.stage = WithdrawalStage::Rejected;
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_std::test_rng;
    use mixer_privacy::{DepositNote, Fr, MerkleTree, Root};
    use mixer_prover::{MockProofSystem, WithdrawProof, WithdrawProver, WithdrawWitness};

    const DEPTH: usize = 3;

    struct Fixture {
        roots: RootHistory,
        spent: SpentSet,
        verifier: MockProofSystem,
        request: WithdrawalRequest,
    }

    fn fixture() -> Fixture {
        let note = DepositNote::random(&mut test_rng(), 0);
        let mut tree = MerkleTree::new(DEPTH).unwrap();
        tree.insert(note.leaf).unwrap();

        let mut roots = RootHistory::new(4);
        roots.push(tree.root());

        let verifier = MockProofSystem::new(DEPTH);
        let witness =
            WithdrawWitness::from_note(&note, tree.path(0).unwrap(), tree.root()).unwrap();
        let proof = verifier.prove(&witness).unwrap();

        Fixture {
            roots,
            spent: SpentSet::new(),
            verifier,
            request: WithdrawalRequest {
                proof,
                public_inputs: witness.public_inputs(),
                recipient: "recipient-1".into(),
            },
        }
    }

    #[test]
    fn test_all_stages_pass() {
        let f = fixture();
        let mut guard = WithdrawalGuard::new(&f.request);
        assert_eq!(guard.stage(), WithdrawalStage::Received);

        let nf = guard.check(&f.roots, &f.spent, &f.verifier).unwrap();
        assert_eq!(nf, f.request.public_inputs.nullifier_hash);
        assert_eq!(guard.stage(), WithdrawalStage::ProofVerified);

        guard.mark_settled();
        assert_eq!(guard.stage(), WithdrawalStage::Settled);
    }

    #[test]
    fn test_unknown_root_rejected_first() {
        let mut f = fixture();
        f.request.public_inputs.root = Root::from_field(Fr::from(1u64));
        // Also spent: root check must run first
        f.spent.insert(f.request.public_inputs.nullifier_hash);

        let mut guard = WithdrawalGuard::new(&f.request);
        let err = guard.check(&f.roots, &f.spent, &f.verifier).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InvalidProof {
                reason: RejectReason::UnknownRoot
            }
        ));
        assert_eq!(guard.stage(), WithdrawalStage::Rejected);
    }

    #[test]
    fn test_spent_nullifier_rejected() {
        let mut f = fixture();
        f.spent.insert(f.request.public_inputs.nullifier_hash);

        let mut guard = WithdrawalGuard::new(&f.request);
        let err = guard.check(&f.roots, &f.spent, &f.verifier).unwrap_err();
        assert!(matches!(err, LedgerError::DoubleSpend { .. }));
        assert_eq!(guard.stage(), WithdrawalStage::Rejected);
    }

    #[test]
    fn test_bad_proof_rejected() {
        let mut f = fixture();
        f.request.proof = WithdrawProof {
            proof_bytes: vec![0u8; 4],
            proving_time_ms: 0,
        };

        let mut guard = WithdrawalGuard::new(&f.request);
        let err = guard.check(&f.roots, &f.spent, &f.verifier).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InvalidProof {
                reason: RejectReason::VerificationFailed
            }
        ));
    }
}

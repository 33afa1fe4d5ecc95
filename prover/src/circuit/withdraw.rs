//! Withdrawal Circuit
//!
//! ZK proof that the prover owns an unspent deposit in the accumulator:
//! 1. The nullifier hash is derived from the leaf index and the secret
//! 2. The leaf is derived from that nullifier hash and the secret
//! 3. The leaf folds through the authentication path to the public root
//!
//! ```text
//! Public Inputs (in order):
//!   - root: accumulator root the path was taken against
//!   - nullifier_hash: one-time tag published by the withdrawal
//!
//! Private Witness:
//!   - secret: depositor secret
//!   - siblings[D]: authentication path, leaf level first
//!   - path_bits[D]: leaf index, least significant bit first
//! ```

use ark_bn254::Fr;
use ark_r1cs_std::{
    alloc::AllocVar,
    boolean::Boolean,
    eq::EqGadget,
    fields::{FieldVar, fp::FpVar},
};
use ark_relations::r1cs::{
    ConstraintSynthesizer, ConstraintSystem, ConstraintSystemRef, SynthesisError, SynthesisMode,
};

use crate::circuit::merkle::{bits_to_num, fold_path};
use crate::circuit::mimc::MiMCGadget;
use crate::error::ProverError;
use crate::witness::{PublicInputs, WithdrawWitness};

/// Number of public inputs the relation exposes
pub const NUM_PUBLIC_INPUTS: usize = 2;

/// Withdrawal relation for a tree of fixed depth
#[derive(Clone, Debug)]
pub struct WithdrawCircuit {
    depth: usize,

    // --- Public Inputs ---
    pub root: Option<Fr>,
    pub nullifier_hash: Option<Fr>,

    // --- Private Witness ---
    pub secret: Option<Fr>,
    pub siblings: Option<Vec<Fr>>,
    pub path_bits: Option<Vec<bool>>,
}

impl WithdrawCircuit {
    /// Unassigned circuit, used for key generation
    pub fn blank(depth: usize) -> Self {
        Self {
            depth,
            root: None,
            nullifier_hash: None,
            secret: None,
            siblings: None,
            path_bits: None,
        }
    }

    /// Fully assigned circuit for a checked witness
    pub fn from_witness(witness: &WithdrawWitness) -> Self {
        Self {
            depth: witness.depth(),
            root: Some(witness.root.to_field()),
            nullifier_hash: Some(witness.nullifier_hash.to_field()),
            secret: Some(witness.secret.to_field()),
            siblings: Some(witness.path.siblings.clone()),
            path_bits: Some(witness.path.path_bits.clone()),
        }
    }

    /// Replace the public inputs, keeping the private witness
    pub fn with_public_inputs(mut self, inputs: &PublicInputs) -> Self {
        self.root = Some(inputs.root.to_field());
        self.nullifier_hash = Some(inputs.nullifier_hash.to_field());
        self
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Synthesize into a fresh constraint system and check every constraint
    pub fn is_satisfied(&self) -> Result<bool, ProverError> {
        let cs = ConstraintSystem::<Fr>::new_ref();
        self.clone().generate_constraints(cs.clone())?;
        Ok(cs.is_satisfied()?)
    }

    /// Size of the relation for a tree of `depth`
    pub fn constraint_count(depth: usize) -> Result<usize, ProverError> {
        let cs = ConstraintSystem::<Fr>::new_ref();
        cs.set_mode(SynthesisMode::Setup);
        Self::blank(depth).generate_constraints(cs.clone())?;
        Ok(cs.num_constraints())
    }
}

impl ConstraintSynthesizer<Fr> for WithdrawCircuit {
    fn generate_constraints(self, cs: ConstraintSystemRef<Fr>) -> Result<(), SynthesisError> {
        // Public inputs, in verifier order
        let root = FpVar::new_input(cs.clone(), || {
            self.root.ok_or(SynthesisError::AssignmentMissing)
        })?;
        let nullifier_hash = FpVar::new_input(cs.clone(), || {
            self.nullifier_hash.ok_or(SynthesisError::AssignmentMissing)
        })?;

        // Private witness
        let secret = FpVar::new_witness(cs.clone(), || {
            self.secret.ok_or(SynthesisError::AssignmentMissing)
        })?;

        // Boolean allocation constrains every bit to {0, 1}
        let path_bits = (0..self.depth)
            .map(|i| {
                Boolean::new_witness(cs.clone(), || {
                    self.path_bits
                        .as_ref()
                        .and_then(|bits| bits.get(i).copied())
                        .ok_or(SynthesisError::AssignmentMissing)
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let siblings = (0..self.depth)
            .map(|i| {
                FpVar::new_witness(cs.clone(), || {
                    self.siblings
                        .as_ref()
                        .and_then(|s| s.get(i).copied())
                        .ok_or(SynthesisError::AssignmentMissing)
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        // NullifierHash = H(index, secret)
        let index = bits_to_num(&path_bits);
        let computed_nullifier = MiMCGadget::hash(&index, &secret)?;
        computed_nullifier.enforce_equal(&nullifier_hash)?;

        // Leaf = H(H(NullifierHash, secret), 0)
        let commitment = MiMCGadget::hash(&computed_nullifier, &secret)?;
        let leaf = MiMCGadget::hash(&commitment, &FpVar::zero())?;

        // Leaf is a member of the tree under `root`
        let computed_root = fold_path(&leaf, &siblings, &path_bits)?;
        computed_root.enforce_equal(&root)?;

        Ok(())
    }
}

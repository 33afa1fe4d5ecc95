//! Withdrawal witness construction
//!
//! Checks a note and its authentication path against a root snapshot before
//! any proving work starts:
//! - path bits must spell out the leaf index
//! - the path must reproduce the snapshot root (stale paths are rejected)

use ark_bn254::Fr;
use mixer_privacy::{
    DepositNote, Leaf, MerkleHasher, MerklePath, NullifierHash, Root, Secret,
};
use serde::{Deserialize, Serialize};

use crate::error::ProverError;

/// Public inputs of the withdrawal relation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublicInputs {
    pub root: Root,
    pub nullifier_hash: NullifierHash,
}

impl PublicInputs {
    /// Field elements in the order the circuit allocates them
    pub fn to_field_elements(&self) -> Vec<Fr> {
        vec![self.root.to_field(), self.nullifier_hash.to_field()]
    }
}

/// Private and public values for one withdrawal
#[derive(Debug, Clone)]
pub struct WithdrawWitness {
    pub secret: Secret,
    pub index: u64,
    pub leaf: Leaf,
    pub nullifier_hash: NullifierHash,
    pub path: MerklePath,
    pub root: Root,
}

impl WithdrawWitness {
    /// Build a witness for `secret` at the path's position
    pub fn build(secret: Secret, path: MerklePath, root: Root) -> Result<Self, ProverError> {
        let note = DepositNote::new(secret, path.position);
        Self::from_note(&note, path, root)
    }

    /// Build a witness from a stored note
    pub fn from_note(
        note: &DepositNote,
        path: MerklePath,
        root: Root,
    ) -> Result<Self, ProverError> {
        let hasher = MerkleHasher::new(path.depth())?;

        if !note.verify() {
            return Err(ProverError::InvalidNote { index: note.index });
        }
        if note.index != path.position {
            return Err(ProverError::PathBitsMismatch { index: note.index });
        }
        if path.path_bits.len() != path.siblings.len() || !path.bits_match_position() {
            return Err(ProverError::PathBitsMismatch {
                index: path.position,
            });
        }

        hasher.ensure_root_matches(&note.leaf, note.index, &path.siblings, &root)?;

        log::debug!(
            "withdraw witness built: depth {}, root {}",
            path.depth(),
            root
        );

        Ok(Self {
            secret: note.secret,
            index: note.index,
            leaf: note.leaf,
            nullifier_hash: note.nullifier_hash,
            path,
            root,
        })
    }

    pub fn depth(&self) -> usize {
        self.path.depth()
    }

    pub fn public_inputs(&self) -> PublicInputs {
        PublicInputs {
            root: self.root,
            nullifier_hash: self.nullifier_hash,
        }
    }
}

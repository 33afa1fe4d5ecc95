//! Deposit Commitments
//!
//! ```text
//! Commitment = H(NullifierHash, secret)
//! Leaf       = H(Commitment, 0)
//! ```
//!
//! The leaf is what the accumulator stores. The trailing zero key separates
//! leaf hashing from internal-node hashing, which always keys by a sibling.

use ark_ff::Zero;

use crate::field::{Fr, field_newtype};
use crate::mimc::mimc;
use crate::note::Secret;
use crate::nullifier::NullifierHash;

field_newtype!(
    /// Hiding, binding commitment to a secret and its nullifier hash
    Commitment
);

field_newtype!(
    /// Value inserted into the Merkle accumulator
    Leaf
);

/// Commit to a secret under its nullifier hash
pub fn derive_commitment(nullifier_hash: &NullifierHash, secret: &Secret) -> Commitment {
    Commitment(mimc().hash_2(nullifier_hash.to_field(), secret.to_field()))
}

/// Turn a commitment into the accumulator leaf
pub fn derive_leaf(commitment: &Commitment) -> Leaf {
    Leaf(mimc().hash_2(commitment.to_field(), Fr::zero()))
}

//! Deposit Notes
//!
//! A note is everything a depositor keeps locally to withdraw later: the
//! secret, the leaf index it was deposited at, and the values derived from
//! them. Only the leaf leaves the client at deposit time.

use std::fmt;

use ark_std::UniformRand;
use ark_std::rand::Rng;

use crate::commitment::{Commitment, Leaf, derive_commitment, derive_leaf};
use crate::field::{FIELD_BYTES, FieldError, Fr, field_from_bytes, field_to_bytes};
use crate::nullifier::{NullifierHash, derive_nullifier_hash};

/// Depositor secret. Never transmitted, never logged.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Secret(Fr);

impl Secret {
    pub fn from_field(f: Fr) -> Self {
        Self(f)
    }

    /// Sample a uniformly random secret
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self(Fr::rand(rng))
    }

    pub fn to_field(&self) -> Fr {
        self.0
    }

    pub fn to_bytes(&self) -> [u8; FIELD_BYTES] {
        field_to_bytes(&self.0)
    }

    pub fn from_bytes(bytes: &[u8; FIELD_BYTES]) -> Result<Self, FieldError> {
        field_from_bytes(bytes).map(Self)
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(<redacted>)")
    }
}

/// Secret plus every value derived from it for a given tree position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepositNote {
    /// Private: depositor secret
    pub secret: Secret,
    /// Private: position the leaf is deposited at
    pub index: u64,
    /// Public at withdrawal: nullifier hash
    pub nullifier_hash: NullifierHash,
    /// Commitment to (nullifier hash, secret)
    pub commitment: Commitment,
    /// Public at deposit: accumulator leaf
    pub leaf: Leaf,
}

impl DepositNote {
    /// Derive all note values for `secret` at `index`
    pub fn new(secret: Secret, index: u64) -> Self {
        let nullifier_hash = derive_nullifier_hash(index, &secret);
        let commitment = derive_commitment(&nullifier_hash, &secret);
        let leaf = derive_leaf(&commitment);

        Self {
            secret,
            index,
            nullifier_hash,
            commitment,
            leaf,
        }
    }

    /// Fresh note with a random secret
    pub fn random<R: Rng + ?Sized>(rng: &mut R, index: u64) -> Self {
        Self::new(Secret::random(rng), index)
    }

    /// Check the derived values against the secret and index
    pub fn verify(&self) -> bool {
        *self == Self::new(self.secret, self.index)
    }
}

//! Nullifier Hashes
//!
//! Implements nullifier derivation for double-spend prevention.
//!
//! ```text
//! NullifierHash = H(leaf_index, secret)
//! ```
//!
//! The index binds the tag to one tree position, so each deposit has exactly
//! one nullifier hash. Once it is published by a withdrawal, the deposit
//! cannot be withdrawn again.

use crate::field::{Fr, field_newtype};
use crate::mimc::mimc;
use crate::note::Secret;

field_newtype!(
    /// One-time spending tag revealed at withdrawal
    NullifierHash
);

/// Derive the nullifier hash for the deposit at `index`
pub fn derive_nullifier_hash(index: u64, secret: &Secret) -> NullifierHash {
    NullifierHash(mimc().hash_2(Fr::from(index), secret.to_field()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nullifier_deterministic() {
        let secret = Secret::from_field(Fr::from(7u64));

        let n1 = derive_nullifier_hash(100, &secret);
        let n2 = derive_nullifier_hash(100, &secret);

        assert_eq!(n1, n2, "same inputs should produce same nullifier");
    }

    #[test]
    fn test_position_affects_nullifier() {
        let secret = Secret::from_field(Fr::from(7u64));

        let n1 = derive_nullifier_hash(0, &secret);
        let n2 = derive_nullifier_hash(1, &secret);

        assert_ne!(
            n1, n2,
            "different positions should produce different nullifiers"
        );
    }

    #[test]
    fn test_nullifier_requires_secret() {
        let n1 = derive_nullifier_hash(3, &Secret::from_field(Fr::from(1u64)));
        let n2 = derive_nullifier_hash(3, &Secret::from_field(Fr::from(2u64)));

        assert_ne!(n1, n2, "different secrets should produce different nullifiers");
    }

    #[test]
    fn test_nullifier_matches_raw_hash() {
        let secret = Secret::from_field(Fr::from(0u64));
        let expected = mimc().hash_2(Fr::from(223u64), Fr::from(0u64));

        assert_eq!(derive_nullifier_hash(223, &secret).to_field(), expected);
    }
}

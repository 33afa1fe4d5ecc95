//! MiMC Hash Implementation
//!
//! Two-input compression function used for nullifier hashes, commitments,
//! leaves and every Merkle node. The withdrawal circuit evaluates exactly the
//! same rounds over constraint variables, so the round constants exposed here
//! are the single source of truth for both sides.
//!
//! The implementation uses:
//! - BN254 scalar field (Fr)
//! - x^7 permutation (standard MiMC)
//! - 91 rounds
//! - Keyed construction: `H(x, k) = E_k(x) + k`
//! - Round constants from a keccak256 chain seeded with `"mimc"`, first
//!   constant zero (the circomlib MiMC7 parameters, so hashes match its
//!   circuits and the `MiMCpe7` contract)

use std::sync::OnceLock;

use ark_ff::{Field, PrimeField};
use tiny_keccak::{Hasher, Keccak};

use crate::field::Fr;

/// Number of MiMC rounds
pub const MIMC_ROUNDS: usize = 91;

/// Seed of the round-constant chain
pub const MIMC_SEED: &str = "mimc";

static MIMC: OnceLock<MiMC> = OnceLock::new();

/// Process-wide hasher with precomputed round constants
pub fn mimc() -> &'static MiMC {
    MIMC.get_or_init(MiMC::new)
}

/// MiMC-7 hasher
#[derive(Debug, Clone)]
pub struct MiMC {
    round_constants: Vec<Fr>,
}

impl Default for MiMC {
    fn default() -> Self {
        Self::new()
    }
}

impl MiMC {
    /// Create a new MiMC hasher with precomputed round constants
    pub fn new() -> Self {
        Self {
            round_constants: Self::compute_round_constants(MIMC_SEED, MIMC_ROUNDS),
        }
    }

    /// RC[0] = 0; h = keccak256(seed), then RC[i] = (h = keccak256(h)) mod p
    fn compute_round_constants(seed: &str, rounds: usize) -> Vec<Fr> {
        let mut constants = Vec::with_capacity(rounds);
        constants.push(Fr::from(0u64));

        let mut digest = keccak256(seed.as_bytes());
        for _ in 1..rounds {
            digest = keccak256(&digest);
            constants.push(Fr::from_be_bytes_mod_order(&digest));
        }
        constants
    }

    /// Round constants, in round order
    pub fn round_constants(&self) -> &[Fr] {
        &self.round_constants
    }

    /// MiMC round function: (x + k + c)^7
    fn round(&self, x: Fr, k: Fr, c: Fr) -> Fr {
        let t = x + k + c;
        let t2 = t.square();
        let t4 = t2.square();
        let t6 = t4 * t2;
        t6 * t
    }

    /// MiMC permutation of `x` keyed by `k`, with the final key addition
    fn permute(&self, x: Fr, k: Fr) -> Fr {
        let mut state = x;
        for c in &self.round_constants {
            state = self.round(state, k, *c);
        }
        state + k
    }

    /// Hash two field elements: the left input is permuted under the right.
    pub fn hash_2(&self, left: Fr, right: Fr) -> Fr {
        self.permute(left, right)
    }
}

fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    let mut output = [0u8; 32];
    hasher.update(data);
    hasher.finalize(&mut output);
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_mimc_deterministic() {
        let a = Fr::from(123u64);
        let b = Fr::from(456u64);

        assert_eq!(mimc().hash_2(a, b), mimc().hash_2(a, b));
        assert_eq!(mimc().hash_2(a, b), MiMC::new().hash_2(a, b));
    }

    #[test]
    fn test_mimc_order_matters() {
        let h1 = mimc().hash_2(Fr::from(1u64), Fr::from(2u64));
        let h2 = mimc().hash_2(Fr::from(2u64), Fr::from(1u64));

        assert_ne!(h1, h2, "hash should be order-sensitive");
    }

    #[test]
    fn test_round_constants() {
        let rc = mimc().round_constants();
        assert_eq!(rc.len(), MIMC_ROUNDS);
        assert_eq!(rc[0], Fr::from(0u64));

        // Chain: RC[1] = keccak256(keccak256("mimc")) mod p
        let first = keccak256(&keccak256(b"mimc"));
        assert_eq!(rc[1], Fr::from_be_bytes_mod_order(&first));
        let second = keccak256(&first);
        assert_eq!(rc[2], Fr::from_be_bytes_mod_order(&second));
    }

    #[test]
    fn test_keccak_empty_input() {
        assert_eq!(
            hex::encode(keccak256(b"")),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn test_matches_circomlib_mimc7() {
        // circomlib mimc7.hash(1, 2)
        let expected = Fr::from_str(
            "10594780656576967754230020536574539122676596303354946869887184401991294982664",
        )
        .unwrap();
        assert_eq!(mimc().hash_2(Fr::from(1u64), Fr::from(2u64)), expected);
    }

    #[test]
    fn test_mimc_round() {
        let result = mimc().round(Fr::from(1u64), Fr::from(2u64), Fr::from(3u64));

        // (1 + 2 + 3)^7 = 6^7 = 279936
        assert_eq!(result, Fr::from(279936u64));
    }

    #[test]
    fn test_zero_inputs_do_not_hash_to_zero() {
        assert_ne!(mimc().hash_2(Fr::from(0u64), Fr::from(0u64)), Fr::from(0u64));
    }
}

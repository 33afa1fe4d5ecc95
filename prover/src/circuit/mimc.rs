//! MiMC-7 gadget
//!
//! In-circuit counterpart of `mixer_privacy::mimc`. Round constants are read
//! from the same process-wide hasher, so native and circuit hashes agree by
//! construction.

use ark_bn254::Fr;
use ark_r1cs_std::fields::{FieldVar, fp::FpVar};
use ark_relations::r1cs::SynthesisError;
use mixer_privacy::mimc;

/// Constraints spent per round on a non-constant state
pub const CONSTRAINTS_PER_ROUND: usize = 4;

pub struct MiMCGadget;

impl MiMCGadget {
    /// `H(x, k) = E_k(x) + k` over constraint variables
    pub fn hash(x: &FpVar<Fr>, k: &FpVar<Fr>) -> Result<FpVar<Fr>, SynthesisError> {
        let mut state = x.clone();

        for c in mimc().round_constants() {
            // (state + k + c)^7 as t, t^2, t^4, t^6, t^7
            let t = &state + k + *c;
            let t2 = t.square()?;
            let t4 = t2.square()?;
            let t6 = &t4 * &t2;
            state = &t6 * &t;
        }

        Ok(state + k)
    }
}

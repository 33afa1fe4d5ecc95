use ark_bn254::Fr;
use ark_ff::One;
use ark_r1cs_std::{
    boolean::Boolean,
    fields::{FieldVar, fp::FpVar},
    select::CondSelectGadget,
};
use ark_relations::r1cs::SynthesisError;

use crate::circuit::mimc::MiMCGadget;

/// Recompose little-endian bits into a field element (bit 0 least significant)
pub fn bits_to_num(bits: &[Boolean<Fr>]) -> FpVar<Fr> {
    let mut acc = FpVar::<Fr>::zero();
    let mut coeff = Fr::one();

    for bit in bits {
        acc += FpVar::from(bit.clone()) * coeff;
        coeff = coeff + coeff;
    }

    acc
}

/// Fold a leaf through its authentication path.
///
/// A set bit means the running node is the right child at that level.
pub fn fold_path(
    leaf: &FpVar<Fr>,
    siblings: &[FpVar<Fr>],
    path_bits: &[Boolean<Fr>],
) -> Result<FpVar<Fr>, SynthesisError> {
    if siblings.len() != path_bits.len() {
        return Err(SynthesisError::Unsatisfiable);
    }

    let mut current = leaf.clone();

    for (sibling, is_right) in siblings.iter().zip(path_bits) {
        let left = FpVar::conditionally_select(is_right, sibling, &current)?;
        let right = FpVar::conditionally_select(is_right, &current, sibling)?;

        current = MiMCGadget::hash(&left, &right)?;
    }

    Ok(current)
}

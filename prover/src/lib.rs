//! Mixer Withdrawal Prover
//!
//! The withdrawal relation as an R1CS circuit, the witness builder that
//! checks a note against a root snapshot, and the proof systems (Groth16 and
//! a transparent mock) that prove and verify it.

pub mod circuit;
pub mod error;
pub mod proof_system;
pub mod service;
pub mod witness;

// Re-export key types for external usage
pub use circuit::{NUM_PUBLIC_INPUTS, WithdrawCircuit};
pub use error::ProverError;
pub use proof_system::{
    Groth16ProofSystem, MockProofSystem, ProofSystem, WithdrawProof, WithdrawProver,
    WithdrawVerifier, build_proof_system,
};
pub use service::ProverService;
pub use witness::{PublicInputs, WithdrawWitness};

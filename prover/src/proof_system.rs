//! Proof Systems
//!
//! Proving and verification capabilities for the withdrawal relation.
//!
//! - [`Groth16ProofSystem`]: arkworks Groth16 over BN254
//! - [`MockProofSystem`]: transparent proofs carrying the private witness,
//!   verified by re-synthesizing the relation (tests and development only)

use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use ark_bn254::{Bn254, Fr};
use ark_groth16::{Groth16, Proof, ProvingKey, VerifyingKey};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_snark::SNARK;
use ark_std::rand::{CryptoRng, RngCore, SeedableRng, rngs::StdRng};
use rand::rngs::OsRng;
use mixer_config::{ProverConfig, ProverMode};
use serde::{Deserialize, Serialize};

use crate::circuit::WithdrawCircuit;
use crate::error::ProverError;
use crate::witness::{PublicInputs, WithdrawWitness};

// ============================================================================
// Proof Types
// ============================================================================

/// A generated withdrawal proof
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawProof {
    /// Serialized proof
    #[serde(with = "hex::serde")]
    pub proof_bytes: Vec<u8>,
    /// Proving time in milliseconds
    pub proving_time_ms: u64,
}

// ============================================================================
// Prover / Verifier Traits
// ============================================================================

/// Trait for withdrawal proof generation
pub trait WithdrawProver: Send + Sync {
    /// Generate a proof for a checked witness
    fn prove(&self, witness: &WithdrawWitness) -> Result<WithdrawProof, ProverError>;
}

/// Trait for withdrawal proof verification
pub trait WithdrawVerifier: Send + Sync {
    /// Check `proof` against the public inputs
    fn verify(&self, proof: &WithdrawProof, inputs: &PublicInputs) -> Result<bool, ProverError>;

    /// Hash identifying the verification key
    fn verification_key_hash(&self) -> [u8; 32];

    /// Tree depth the verification key was built for
    fn depth(&self) -> usize;
}

impl<T: WithdrawProver + ?Sized> WithdrawProver for Arc<T> {
    fn prove(&self, witness: &WithdrawWitness) -> Result<WithdrawProof, ProverError> {
        (**self).prove(witness)
    }
}

impl<T: WithdrawVerifier + ?Sized> WithdrawVerifier for Arc<T> {
    fn verify(&self, proof: &WithdrawProof, inputs: &PublicInputs) -> Result<bool, ProverError> {
        (**self).verify(proof, inputs)
    }

    fn verification_key_hash(&self) -> [u8; 32] {
        (**self).verification_key_hash()
    }

    fn depth(&self) -> usize {
        (**self).depth()
    }
}

fn serialization_error(e: impl std::fmt::Display) -> ProverError {
    ProverError::Serialization(e.to_string())
}

fn check_depth(expected: usize, witness: &WithdrawWitness) -> Result<(), ProverError> {
    if witness.depth() != expected {
        return Err(ProverError::DepthMismatch {
            expected,
            got: witness.depth(),
        });
    }
    Ok(())
}

// ============================================================================
// Mock Proof System
// ============================================================================

/// Transparent proof system for tests and development.
///
/// The "proof" is the serialized private witness; verification rebuilds the
/// circuit with the claimed public inputs and checks every constraint.
pub struct MockProofSystem {
    depth: usize,
    vk_hash: [u8; 32],
}

impl MockProofSystem {
    pub fn new(depth: usize) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"mixer-mock-vk-v1");
        hasher.update(&(depth as u64).to_be_bytes());

        Self {
            depth,
            vk_hash: *hasher.finalize().as_bytes(),
        }
    }

    fn encode(witness: &WithdrawWitness) -> Result<Vec<u8>, ProverError> {
        let mut bytes = Vec::new();
        witness
            .secret
            .to_field()
            .serialize_compressed(&mut bytes)
            .map_err(serialization_error)?;
        witness
            .path
            .siblings
            .serialize_compressed(&mut bytes)
            .map_err(serialization_error)?;
        witness
            .path
            .path_bits
            .serialize_compressed(&mut bytes)
            .map_err(serialization_error)?;
        Ok(bytes)
    }

    fn decode(&self, bytes: &[u8]) -> Result<WithdrawCircuit, ProverError> {
        let mut reader = bytes;
        let secret =
            Fr::deserialize_compressed(&mut reader).map_err(|_| ProverError::MalformedProof)?;
        let siblings = Vec::<Fr>::deserialize_compressed(&mut reader)
            .map_err(|_| ProverError::MalformedProof)?;
        let path_bits = Vec::<bool>::deserialize_compressed(&mut reader)
            .map_err(|_| ProverError::MalformedProof)?;

        if !reader.is_empty() || siblings.len() != self.depth || path_bits.len() != self.depth {
            return Err(ProverError::MalformedProof);
        }

        let mut circuit = WithdrawCircuit::blank(self.depth);
        circuit.secret = Some(secret);
        circuit.siblings = Some(siblings);
        circuit.path_bits = Some(path_bits);
        Ok(circuit)
    }
}

impl WithdrawProver for MockProofSystem {
    fn prove(&self, witness: &WithdrawWitness) -> Result<WithdrawProof, ProverError> {
        let start = Instant::now();
        check_depth(self.depth, witness)?;

        if !WithdrawCircuit::from_witness(witness).is_satisfied()? {
            return Err(ProverError::Unsatisfied);
        }

        Ok(WithdrawProof {
            proof_bytes: Self::encode(witness)?,
            proving_time_ms: start.elapsed().as_millis() as u64,
        })
    }
}

impl WithdrawVerifier for MockProofSystem {
    fn verify(&self, proof: &WithdrawProof, inputs: &PublicInputs) -> Result<bool, ProverError> {
        self.decode(&proof.proof_bytes)?
            .with_public_inputs(inputs)
            .is_satisfied()
    }

    fn verification_key_hash(&self) -> [u8; 32] {
        self.vk_hash
    }

    fn depth(&self) -> usize {
        self.depth
    }
}

// ============================================================================
// Groth16 Proof System
// ============================================================================

/// Groth16 prover and verifier using arkworks and the BN254 curve
pub struct Groth16ProofSystem {
    depth: usize,
    /// The proving key (loaded from bytes or generated)
    proving_key: ProvingKey<Bn254>,
    /// The verifying key
    verifying_key: VerifyingKey<Bn254>,
    /// Hash of the verification key
    vk_hash: [u8; 32],
}

impl Groth16ProofSystem {
    /// Circuit-specific setup for a tree of `depth`
    pub fn setup<R: RngCore + CryptoRng>(depth: usize, rng: &mut R) -> Result<Self, ProverError> {
        let start = Instant::now();
        let (proving_key, verifying_key) =
            Groth16::<Bn254>::circuit_specific_setup(WithdrawCircuit::blank(depth), rng)?;
        log::info!(
            "Groth16 setup for depth {} complete in {:?}",
            depth,
            start.elapsed()
        );

        Self::from_keys(depth, proving_key, verifying_key)
    }

    /// Deterministic setup. The seed reveals the toxic waste: development only.
    pub fn setup_with_seed(depth: usize, seed: u64) -> Result<Self, ProverError> {
        log::warn!("Groth16 setup from a fixed seed is insecure outside development");
        let mut rng = StdRng::seed_from_u64(seed);
        Self::setup(depth, &mut rng)
    }

    fn from_keys(
        depth: usize,
        proving_key: ProvingKey<Bn254>,
        verifying_key: VerifyingKey<Bn254>,
    ) -> Result<Self, ProverError> {
        let vk_hash = Self::compute_vk_hash(&verifying_key)?;
        Ok(Self {
            depth,
            proving_key,
            verifying_key,
            vk_hash,
        })
    }

    /// Create a proof system from serialized keys
    pub fn from_bytes(depth: usize, pk_bytes: &[u8], vk_bytes: &[u8]) -> Result<Self, ProverError> {
        let proving_key =
            ProvingKey::<Bn254>::deserialize_compressed(pk_bytes).map_err(serialization_error)?;
        let verifying_key =
            VerifyingKey::<Bn254>::deserialize_compressed(vk_bytes).map_err(serialization_error)?;

        Self::from_keys(depth, proving_key, verifying_key)
    }

    /// Serialized (proving key, verifying key)
    pub fn to_bytes(&self) -> Result<(Vec<u8>, Vec<u8>), ProverError> {
        let mut pk_bytes = Vec::new();
        self.proving_key
            .serialize_compressed(&mut pk_bytes)
            .map_err(serialization_error)?;

        let mut vk_bytes = Vec::new();
        self.verifying_key
            .serialize_compressed(&mut vk_bytes)
            .map_err(serialization_error)?;

        Ok((pk_bytes, vk_bytes))
    }

    /// Load keys from files
    pub fn from_files(depth: usize, pk_path: &str, vk_path: &str) -> anyhow::Result<Self> {
        let pk_bytes = std::fs::read(pk_path)
            .with_context(|| format!("Failed to read proving key from {}", pk_path))?;
        let vk_bytes = std::fs::read(vk_path)
            .with_context(|| format!("Failed to read verifying key from {}", vk_path))?;
        Self::from_bytes(depth, &pk_bytes, &vk_bytes).context("Failed to load Groth16 keys")
    }

    /// Compute hash of verifying key
    fn compute_vk_hash(vk: &VerifyingKey<Bn254>) -> Result<[u8; 32], ProverError> {
        let mut vk_bytes = Vec::new();
        vk.serialize_compressed(&mut vk_bytes)
            .map_err(serialization_error)?;
        Ok(*blake3::hash(&vk_bytes).as_bytes())
    }

    pub fn verifying_key(&self) -> &VerifyingKey<Bn254> {
        &self.verifying_key
    }
}

impl WithdrawProver for Groth16ProofSystem {
    fn prove(&self, witness: &WithdrawWitness) -> Result<WithdrawProof, ProverError> {
        let start = Instant::now();
        check_depth(self.depth, witness)?;

        let circuit = WithdrawCircuit::from_witness(witness);
        if !circuit.is_satisfied()? {
            return Err(ProverError::Unsatisfied);
        }

        let mut rng = OsRng;
        let proof = Groth16::<Bn254>::prove(&self.proving_key, circuit, &mut rng)?;

        let mut proof_bytes = Vec::new();
        proof
            .serialize_compressed(&mut proof_bytes)
            .map_err(serialization_error)?;

        let proving_time_ms = start.elapsed().as_millis() as u64;
        log::info!(
            "Generated Groth16 withdrawal proof: {} bytes in {}ms",
            proof_bytes.len(),
            proving_time_ms
        );

        Ok(WithdrawProof {
            proof_bytes,
            proving_time_ms,
        })
    }
}

impl WithdrawVerifier for Groth16ProofSystem {
    fn verify(&self, proof: &WithdrawProof, inputs: &PublicInputs) -> Result<bool, ProverError> {
        let proof = Proof::<Bn254>::deserialize_compressed(proof.proof_bytes.as_slice())
            .map_err(|_| ProverError::MalformedProof)?;

        Ok(Groth16::<Bn254>::verify(
            &self.verifying_key,
            &inputs.to_field_elements(),
            &proof,
        )?)
    }

    fn verification_key_hash(&self) -> [u8; 32] {
        self.vk_hash
    }

    fn depth(&self) -> usize {
        self.depth
    }
}

// ============================================================================
// Configured Backend
// ============================================================================

/// Proof system selected by configuration
pub enum ProofSystem {
    Mock(MockProofSystem),
    Groth16(Box<Groth16ProofSystem>),
}

impl ProofSystem {
    pub fn mode(&self) -> ProverMode {
        match self {
            Self::Mock(_) => ProverMode::Mock,
            Self::Groth16(_) => ProverMode::Groth16,
        }
    }
}

impl WithdrawProver for ProofSystem {
    fn prove(&self, witness: &WithdrawWitness) -> Result<WithdrawProof, ProverError> {
        match self {
            Self::Mock(p) => p.prove(witness),
            Self::Groth16(p) => p.prove(witness),
        }
    }
}

impl WithdrawVerifier for ProofSystem {
    fn verify(&self, proof: &WithdrawProof, inputs: &PublicInputs) -> Result<bool, ProverError> {
        match self {
            Self::Mock(p) => p.verify(proof, inputs),
            Self::Groth16(p) => p.verify(proof, inputs),
        }
    }

    fn verification_key_hash(&self) -> [u8; 32] {
        match self {
            Self::Mock(p) => p.verification_key_hash(),
            Self::Groth16(p) => p.verification_key_hash(),
        }
    }

    fn depth(&self) -> usize {
        match self {
            Self::Mock(p) => p.depth(),
            Self::Groth16(p) => p.depth(),
        }
    }
}

/// Build the proof system named by `config` for a tree of `depth`
pub fn build_proof_system(config: &ProverConfig, depth: usize) -> anyhow::Result<Arc<ProofSystem>> {
    let system = match config.mode {
        ProverMode::Mock => {
            log::warn!("Using mock proof system: withdrawals are NOT zero-knowledge");
            ProofSystem::Mock(MockProofSystem::new(depth))
        }
        ProverMode::Groth16 => {
            let groth16 = match (&config.proving_key_path, &config.verifying_key_path) {
                (Some(pk), Some(vk)) => {
                    log::info!("Loading Groth16 keys from {} and {}", pk, vk);
                    Groth16ProofSystem::from_files(depth, pk, vk)?
                }
                _ => match config.setup_seed {
                    Some(seed) => Groth16ProofSystem::setup_with_seed(depth, seed)?,
                    None => Groth16ProofSystem::setup(depth, &mut OsRng)?,
                },
            };
            ProofSystem::Groth16(Box::new(groth16))
        }
    };

    log::info!(
        "Proof system ready: {:?}, vk hash {}",
        system.mode(),
        hex::encode(system.verification_key_hash())
    );
    Ok(Arc::new(system))
}

//! Mixer Privacy SDK
//!
//! Fixed-denomination mixer primitives: deposit notes, nullifier hashes,
//! commitments and the Merkle accumulator they are inserted into.
//!
//! # Architecture
//!
//! ```text
//!   secret, index ──► NullifierHash = H(index, secret)
//!                          │
//!                          ▼
//!                     Commitment = H(NullifierHash, secret)
//!                          │
//!                          ▼
//!                     Leaf = H(Commitment, 0) ──► MerkleTree ──► Root
//!
//!   Withdrawal reveals (Root, NullifierHash) and proves knowledge of the
//!   secret and a path from its leaf to Root, without revealing the index.
//! ```
//!
//! `H` is MiMC-7 over the BN254 scalar field ([`mimc`]).

pub mod commitment;
pub mod field;
pub mod merkle;
pub mod mimc;
pub mod note;
pub mod nullifier;

pub use commitment::{Commitment, Leaf, derive_commitment, derive_leaf};
pub use field::{
    FIELD_BYTES, FieldError, Fr, field_from_bytes, field_from_hex, field_from_slice, field_to_bytes,
    field_to_hex,
};
pub use merkle::{
    MAX_TREE_DEPTH, MerkleError, MerkleHasher, MerklePath, MerkleTree, Root, RootHistory,
    fold_path, path_bits_for_index,
};
pub use mimc::{MIMC_ROUNDS, MiMC, mimc};
pub use note::{DepositNote, Secret};
pub use nullifier::{NullifierHash, derive_nullifier_hash};

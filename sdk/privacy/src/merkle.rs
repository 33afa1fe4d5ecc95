//! Incremental Merkle Accumulator
//!
//! Fixed-depth, append-only binary tree of deposit leaves. Used for proving
//! deposit membership without revealing which deposit.
//!
//! ```text
//!                    Root
//!                   /    \
//!                 H01    H23
//!                /  \   /   \
//!               L0  L1 L2   0   (unfilled positions hash as zero subtrees)
//! ```
//!
//! Insertion recomputes only the path from the new leaf to the root. Every
//! filled node is cached per level, so sibling paths for any index are read
//! in O(depth) without rehashing.

use std::collections::VecDeque;

use ark_ff::Zero;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::commitment::Leaf;
use crate::field::{Fr, field_newtype};
use crate::mimc::mimc;

/// Deepest supported tree (2^32 leaves)
pub const MAX_TREE_DEPTH: usize = 32;

field_newtype!(
    /// Merkle root, the accumulator's published state
    Root
);

/// Accumulator and path errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MerkleError {
    #[error("accumulator is full ({capacity} leaves)")]
    CapacityExceeded { capacity: u64 },

    #[error("leaf index {index} out of range ({len} leaves available)")]
    IndexOutOfRange { index: u64, len: u64 },

    #[error("sibling path has {got} entries, expected {expected}")]
    PathLengthMismatch { expected: usize, got: usize },

    #[error("tree depth must be between 1 and {max}, got {0}", max = MAX_TREE_DEPTH)]
    InvalidDepth(usize),

    #[error("path reconstructs root {computed}, expected {expected}")]
    StaleRootMismatch { expected: Root, computed: Root },
}

/// LSB-first binary expansion of `index`, one bit per level
pub fn path_bits_for_index(index: u64, depth: usize) -> Vec<bool> {
    (0..depth)
        .map(|level| level < u64::BITS as usize && (index >> level) & 1 == 1)
        .collect()
}

/// Fold a node up through its siblings.
///
/// Bit 0 means the running node is the left child at that level.
pub fn fold_path(leaf: Fr, siblings: &[Fr], path_bits: &[bool]) -> Fr {
    let mut current = leaf;

    for (sibling, is_right) in siblings.iter().zip(path_bits.iter()) {
        current = if *is_right {
            mimc().hash_2(*sibling, current)
        } else {
            mimc().hash_2(current, *sibling)
        };
    }

    current
}

/// A Merkle path proving inclusion of a leaf
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerklePath {
    /// Sibling hashes from leaf to root
    #[serde(with = "crate::field::serde_hex_vec")]
    pub siblings: Vec<Fr>,
    /// Position bits (false = left, true = right)
    pub path_bits: Vec<bool>,
    /// The leaf position
    pub position: u64,
}

impl MerklePath {
    pub fn depth(&self) -> usize {
        self.siblings.len()
    }

    /// Whether the depth is supported, `position` fits in it and the
    /// direction bits spell it out
    pub fn bits_match_position(&self) -> bool {
        let depth = self.depth();
        (1..=MAX_TREE_DEPTH).contains(&depth)
            && self.position < (1u64 << depth)
            && self.path_bits == path_bits_for_index(self.position, depth)
    }

    /// Verify that this path proves inclusion of `leaf` in `root`
    pub fn verify(&self, leaf: &Leaf, root: &Root) -> bool {
        self.path_bits.len() == self.siblings.len()
            && self.bits_match_position()
            && fold_path(leaf.to_field(), &self.siblings, &self.path_bits) == root.to_field()
    }
}

/// MiMC-based Merkle hashing with cached empty subtrees
#[derive(Debug, Clone)]
pub struct MerkleHasher {
    depth: usize,
    /// Root of an all-zero subtree at each height (index 0 = empty leaf)
    empty_roots: Vec<Fr>,
}

impl MerkleHasher {
    pub fn new(depth: usize) -> Result<Self, MerkleError> {
        if depth == 0 || depth > MAX_TREE_DEPTH {
            return Err(MerkleError::InvalidDepth(depth));
        }

        let mut empty_roots = Vec::with_capacity(depth + 1);
        let mut current = Fr::zero();
        empty_roots.push(current);
        for _ in 0..depth {
            current = mimc().hash_2(current, current);
            empty_roots.push(current);
        }

        Ok(Self { depth, empty_roots })
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Number of leaves a tree of this depth holds
    pub fn capacity(&self) -> u64 {
        1u64 << self.depth
    }

    /// Hash two children to get parent
    pub fn hash_pair(&self, left: &Fr, right: &Fr) -> Fr {
        mimc().hash_2(*left, *right)
    }

    /// Get the empty root at a given height (0 = leaf level)
    pub fn empty_root(&self, height: usize) -> Fr {
        self.empty_roots[height.min(self.depth)]
    }

    /// Recompute the root from a leaf, its index and a sibling path.
    ///
    /// Direction bits are derived from `index` rather than trusted from the
    /// caller.
    pub fn root_from_leaf_and_path(
        &self,
        leaf: &Leaf,
        index: u64,
        siblings: &[Fr],
    ) -> Result<Root, MerkleError> {
        if siblings.len() != self.depth {
            return Err(MerkleError::PathLengthMismatch {
                expected: self.depth,
                got: siblings.len(),
            });
        }
        if index >= self.capacity() {
            return Err(MerkleError::IndexOutOfRange {
                index,
                len: self.capacity(),
            });
        }

        let bits = path_bits_for_index(index, self.depth);
        Ok(Root(fold_path(leaf.to_field(), siblings, &bits)))
    }

    /// Like [`Self::root_from_leaf_and_path`], failing with
    /// `StaleRootMismatch` when the result differs from `expected`.
    pub fn ensure_root_matches(
        &self,
        leaf: &Leaf,
        index: u64,
        siblings: &[Fr],
        expected: &Root,
    ) -> Result<(), MerkleError> {
        let computed = self.root_from_leaf_and_path(leaf, index, siblings)?;
        if computed != *expected {
            return Err(MerkleError::StaleRootMismatch {
                expected: *expected,
                computed,
            });
        }
        Ok(())
    }
}

/// Append-only Merkle tree of deposit leaves
#[derive(Debug, Clone)]
pub struct MerkleTree {
    hasher: MerkleHasher,
    /// Filled nodes per height; `levels[0]` holds the leaves
    levels: Vec<Vec<Fr>>,
    /// Current root
    root: Fr,
}

impl MerkleTree {
    /// Create a new empty tree
    pub fn new(depth: usize) -> Result<Self, MerkleError> {
        let hasher = MerkleHasher::new(depth)?;
        let root = hasher.empty_root(depth);

        Ok(Self {
            levels: vec![Vec::new(); depth],
            hasher,
            root,
        })
    }

    /// Rebuild a tree by replaying leaves in deposit order
    pub fn from_leaves<I>(depth: usize, leaves: I) -> Result<Self, MerkleError>
    where
        I: IntoIterator<Item = Leaf>,
    {
        let mut tree = Self::new(depth)?;
        for leaf in leaves {
            tree.insert(leaf)?;
        }
        Ok(tree)
    }

    pub fn hasher(&self) -> &MerkleHasher {
        &self.hasher
    }

    pub fn depth(&self) -> usize {
        self.hasher.depth()
    }

    pub fn capacity(&self) -> u64 {
        self.hasher.capacity()
    }

    /// Number of inserted leaves (also the next index)
    pub fn len(&self) -> u64 {
        self.levels[0].len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.levels[0].is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.len() >= self.capacity()
    }

    /// Get current root
    pub fn root(&self) -> Root {
        Root(self.root)
    }

    /// Insert a leaf and return its position
    pub fn insert(&mut self, leaf: Leaf) -> Result<u64, MerkleError> {
        if self.is_full() {
            return Err(MerkleError::CapacityExceeded {
                capacity: self.capacity(),
            });
        }

        let index = self.len();
        let depth = self.depth();
        self.levels[0].push(leaf.to_field());

        let mut current_index = index as usize;
        let mut current_hash = leaf.to_field();

        for level in 0..depth {
            let is_right = current_index & 1 == 1;
            let sibling = self.node_or_empty(level, current_index ^ 1);

            current_hash = if is_right {
                self.hasher.hash_pair(&sibling, &current_hash)
            } else {
                self.hasher.hash_pair(&current_hash, &sibling)
            };
            current_index /= 2;

            if level + 1 < depth {
                let parents = &mut self.levels[level + 1];
                if current_index < parents.len() {
                    parents[current_index] = current_hash;
                } else {
                    parents.push(current_hash);
                }
            }
        }

        self.root = current_hash;
        log::trace!("leaf {} inserted, root {}", index, Root(current_hash));
        Ok(index)
    }

    /// Get Merkle path for a position
    pub fn path(&self, position: u64) -> Result<MerklePath, MerkleError> {
        if position >= self.len() {
            return Err(MerkleError::IndexOutOfRange {
                index: position,
                len: self.len(),
            });
        }

        let depth = self.depth();
        let mut siblings = Vec::with_capacity(depth);
        let mut path_bits = Vec::with_capacity(depth);
        let mut current_index = position as usize;

        for level in 0..depth {
            path_bits.push(current_index & 1 == 1);
            siblings.push(self.node_or_empty(level, current_index ^ 1));
            current_index /= 2;
        }

        Ok(MerklePath {
            siblings,
            path_bits,
            position,
        })
    }

    /// Get leaf at position
    pub fn leaf(&self, position: u64) -> Option<Leaf> {
        self.levels[0].get(position as usize).copied().map(Leaf)
    }

    /// Check if `leaf` sits at `position`
    pub fn contains(&self, position: u64, leaf: &Leaf) -> bool {
        self.leaf(position).as_ref() == Some(leaf)
    }

    /// Leaves in deposit order
    pub fn leaves(&self) -> impl Iterator<Item = Leaf> + '_ {
        self.levels[0].iter().copied().map(Leaf)
    }

    fn node_or_empty(&self, level: usize, index: usize) -> Fr {
        self.levels[level]
            .get(index)
            .copied()
            .unwrap_or_else(|| self.hasher.empty_root(level))
    }
}

/// Root history for the accumulator
///
/// Stores recent roots so a withdrawal proven against a root that has since
/// been superseded by new deposits is still accepted.
#[derive(Debug, Clone)]
pub struct RootHistory {
    /// Recent roots (most recent first)
    roots: VecDeque<Root>,
    /// Maximum history size (at least 1)
    max_size: usize,
}

impl RootHistory {
    pub fn new(max_size: usize) -> Self {
        let max_size = max_size.max(1);
        Self {
            roots: VecDeque::with_capacity(max_size),
            max_size,
        }
    }

    /// Add a new root
    pub fn push(&mut self, root: Root) {
        self.roots.push_front(root);
        self.roots.truncate(self.max_size);
    }

    /// Check if a root is valid (current or recent)
    pub fn is_valid(&self, root: &Root) -> bool {
        self.roots.contains(root)
    }

    /// Get the most recent root
    pub fn current(&self) -> Option<&Root> {
        self.roots.front()
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(n: u64) -> Leaf {
        Leaf::from_field(Fr::from(n + 1000))
    }

    #[test]
    fn test_empty_tree() {
        let tree = MerkleTree::new(4).unwrap();
        assert_eq!(tree.len(), 0);
        assert!(tree.is_empty());
        assert_eq!(tree.root().to_field(), tree.hasher().empty_root(4));
    }

    #[test]
    fn test_invalid_depth() {
        assert_eq!(MerkleTree::new(0).unwrap_err(), MerkleError::InvalidDepth(0));
        assert_eq!(
            MerkleTree::new(MAX_TREE_DEPTH + 1).unwrap_err(),
            MerkleError::InvalidDepth(MAX_TREE_DEPTH + 1)
        );
    }

    #[test]
    fn test_empty_roots_chain() {
        let hasher = MerkleHasher::new(3).unwrap();
        assert_eq!(hasher.empty_root(0), Fr::zero());
        for h in 0..3 {
            let below = hasher.empty_root(h);
            assert_eq!(hasher.empty_root(h + 1), hasher.hash_pair(&below, &below));
        }
    }

    #[test]
    fn test_insert_and_path() {
        let mut tree = MerkleTree::new(8).unwrap();

        assert_eq!(tree.insert(leaf(1)).unwrap(), 0);
        assert_eq!(tree.insert(leaf(2)).unwrap(), 1);

        let path1 = tree.path(0).unwrap();
        assert!(path1.verify(&leaf(1), &tree.root()));

        let path2 = tree.path(1).unwrap();
        assert!(path2.verify(&leaf(2), &tree.root()));
    }

    #[test]
    fn test_path_invalid_leaf() {
        let mut tree = MerkleTree::new(8).unwrap();
        tree.insert(leaf(1)).unwrap();

        let path = tree.path(0).unwrap();
        assert!(!path.verify(&leaf(99), &tree.root()));
    }

    #[test]
    fn test_path_out_of_range() {
        let mut tree = MerkleTree::new(3).unwrap();
        assert_eq!(
            tree.path(0).unwrap_err(),
            MerkleError::IndexOutOfRange { index: 0, len: 0 }
        );

        tree.insert(leaf(0)).unwrap();
        assert_eq!(
            tree.path(1).unwrap_err(),
            MerkleError::IndexOutOfRange { index: 1, len: 1 }
        );
    }

    #[test]
    fn test_root_changes() {
        let mut tree = MerkleTree::new(8).unwrap();
        let root0 = tree.root();

        tree.insert(leaf(1)).unwrap();
        let root1 = tree.root();
        assert_ne!(root0, root1, "root should change after insert");

        tree.insert(leaf(2)).unwrap();
        assert_ne!(root1, tree.root(), "root should change after each insert");
    }

    #[test]
    fn test_root_is_function_of_leaves() {
        let leaves: Vec<Leaf> = (0..5).map(leaf).collect();
        let a = MerkleTree::from_leaves(4, leaves.clone()).unwrap();
        let b = MerkleTree::from_leaves(4, leaves).unwrap();
        assert_eq!(a.root(), b.root());

        let reordered = MerkleTree::from_leaves(4, [leaf(1), leaf(0)]).unwrap();
        let ordered = MerkleTree::from_leaves(4, [leaf(0), leaf(1)]).unwrap();
        assert_ne!(reordered.root(), ordered.root());
    }

    #[test]
    fn test_root_matches_manual_computation() {
        // depth 2, two leaves: root = H(H(l0, l1), H(0, 0))
        let tree = MerkleTree::from_leaves(2, [leaf(0), leaf(1)]).unwrap();
        let h = tree.hasher();
        let left = h.hash_pair(&leaf(0).to_field(), &leaf(1).to_field());
        let right = h.empty_root(1);
        assert_eq!(tree.root().to_field(), h.hash_pair(&left, &right));
    }

    #[test]
    fn test_capacity_boundary() {
        let mut tree = MerkleTree::new(2).unwrap();
        for i in 0..4 {
            assert_eq!(tree.insert(leaf(i)).unwrap(), i);
        }
        assert!(tree.is_full());
        assert_eq!(
            tree.insert(leaf(4)).unwrap_err(),
            MerkleError::CapacityExceeded { capacity: 4 }
        );
        assert_eq!(tree.len(), 4);
    }

    #[test]
    fn test_path_bits_are_index_bits() {
        assert_eq!(path_bits_for_index(5, 3), vec![true, false, true]);
        assert_eq!(path_bits_for_index(6, 4), vec![false, true, true, false]);
        assert_eq!(path_bits_for_index(0, 2), vec![false, false]);
        // Levels past the width of the index are zero
        assert_eq!(path_bits_for_index(u64::MAX, 66)[64..], [false, false]);
    }

    #[test]
    fn test_aliased_position_rejected() {
        let mut tree = MerkleTree::new(3).unwrap();
        tree.insert(leaf(0)).unwrap();
        tree.insert(leaf(1)).unwrap();

        let mut path = tree.path(1).unwrap();
        assert!(path.verify(&leaf(1), &tree.root()));

        // 9 has the same low three bits as 1
        path.position = 9;
        assert!(!path.bits_match_position());
        assert!(!path.verify(&leaf(1), &tree.root()));
    }

    #[test]
    fn test_oversized_path_rejected() {
        let path = MerklePath {
            siblings: vec![Fr::zero(); 65],
            path_bits: vec![false; 65],
            position: 0,
        };
        assert!(!path.bits_match_position());
        assert!(!path.verify(&leaf(0), &Root::from_field(Fr::zero())));
    }

    #[test]
    fn test_reconstruction_errors() {
        let hasher = MerkleHasher::new(3).unwrap();
        assert_eq!(
            hasher
                .root_from_leaf_and_path(&leaf(0), 0, &[Fr::zero(); 2])
                .unwrap_err(),
            MerkleError::PathLengthMismatch {
                expected: 3,
                got: 2
            }
        );
        assert!(matches!(
            hasher.root_from_leaf_and_path(&leaf(0), 8, &[Fr::zero(); 3]),
            Err(MerkleError::IndexOutOfRange { index: 8, .. })
        ));
    }

    #[test]
    fn test_stale_root_detected() {
        let mut tree = MerkleTree::new(3).unwrap();
        tree.insert(leaf(0)).unwrap();
        let old_root = tree.root();
        let old_path = tree.path(0).unwrap();

        tree.insert(leaf(1)).unwrap();
        let err = tree
            .hasher()
            .ensure_root_matches(&leaf(0), 0, &old_path.siblings, &tree.root())
            .unwrap_err();
        assert_eq!(
            err,
            MerkleError::StaleRootMismatch {
                expected: tree.root(),
                computed: old_root,
            }
        );
    }

    #[test]
    fn test_contains_and_leaves() {
        let tree = MerkleTree::from_leaves(3, [leaf(0), leaf(1)]).unwrap();
        assert!(tree.contains(1, &leaf(1)));
        assert!(!tree.contains(1, &leaf(0)));
        assert!(!tree.contains(2, &leaf(2)));
        assert_eq!(tree.leaves().collect::<Vec<_>>(), vec![leaf(0), leaf(1)]);
    }

    #[test]
    fn test_path_serde() {
        let tree = MerkleTree::from_leaves(3, [leaf(0), leaf(1), leaf(2)]).unwrap();
        let path = tree.path(2).unwrap();

        let json = serde_json::to_string(&path).unwrap();
        let decoded: MerklePath = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, path);
    }

    #[test]
    fn test_root_history() {
        let mut history = RootHistory::new(2);

        let r1 = Root::from_field(Fr::from(1u64));
        let r2 = Root::from_field(Fr::from(2u64));
        let r3 = Root::from_field(Fr::from(3u64));

        history.push(r1);
        history.push(r2);
        assert!(history.is_valid(&r1));

        history.push(r3);
        assert!(!history.is_valid(&r1), "oldest root should be evicted");
        assert!(history.is_valid(&r2));
        assert!(history.is_valid(&r3));
        assert_eq!(history.current(), Some(&r3));
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_root_history_minimum_size() {
        let mut history = RootHistory::new(0);
        assert_eq!(history.max_size(), 1);

        let r1 = Root::from_field(Fr::from(1u64));
        let r2 = Root::from_field(Fr::from(2u64));
        history.push(r1);
        history.push(r2);
        assert!(!history.is_valid(&r1));
        assert!(history.is_valid(&r2));
    }
}

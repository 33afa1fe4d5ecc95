//! Spent nullifier set
//!
//! Append-only: a nullifier hash is never removed once a withdrawal publishes
//! it.

use std::collections::HashSet;

use mixer_privacy::NullifierHash;

#[derive(Debug, Clone, Default)]
pub struct SpentSet {
    nullifiers: HashSet<NullifierHash>,
}

impl SpentSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if a nullifier has been spent
    pub fn contains(&self, nullifier_hash: &NullifierHash) -> bool {
        self.nullifiers.contains(nullifier_hash)
    }

    /// Record a spend. Returns false if it was already recorded.
    pub fn insert(&mut self, nullifier_hash: NullifierHash) -> bool {
        self.nullifiers.insert(nullifier_hash)
    }

    pub fn len(&self) -> usize {
        self.nullifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nullifiers.is_empty()
    }
}

impl FromIterator<NullifierHash> for SpentSet {
    fn from_iter<I: IntoIterator<Item = NullifierHash>>(iter: I) -> Self {
        Self {
            nullifiers: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mixer_privacy::Fr;

    #[test]
    fn test_insert_once() {
        let mut spent = SpentSet::new();
        let nf = NullifierHash::from_field(Fr::from(3u64));

        assert!(!spent.contains(&nf));
        assert!(spent.insert(nf));
        assert!(spent.contains(&nf));
        assert!(!spent.insert(nf), "second insert must report duplicate");
        assert_eq!(spent.len(), 1);
    }

    #[test]
    fn test_collect() {
        let spent: SpentSet = (0..4u64)
            .map(|i| NullifierHash::from_field(Fr::from(i)))
            .collect();
        assert_eq!(spent.len(), 4);
        assert!(spent.contains(&NullifierHash::from_field(Fr::from(2u64))));
    }
}

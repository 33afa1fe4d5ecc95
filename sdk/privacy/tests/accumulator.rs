use mixer_privacy::{
    DepositNote, Fr, Leaf, MerkleError, MerkleHasher, MerkleTree, Secret, fold_path, mimc,
    path_bits_for_index,
};

/// Root of a full tree computed level by level from scratch
fn naive_root(depth: usize, leaves: &[Leaf]) -> Fr {
    let mut level: Vec<Fr> = leaves.iter().map(|l| l.to_field()).collect();
    level.resize(1 << depth, Fr::from(0u64));
    for _ in 0..depth {
        level = level
            .chunks(2)
            .map(|pair| mimc().hash_2(pair[0], pair[1]))
            .collect();
    }
    level[0]
}

fn leaves(n: u64) -> Vec<Leaf> {
    (0..n)
        .map(|i| DepositNote::new(Secret::from_field(Fr::from(7 * i + 3)), i).leaf)
        .collect()
}

#[test]
fn incremental_root_matches_naive_root() {
    for depth in 1..=4 {
        let all = leaves(1 << depth);
        let mut tree = MerkleTree::new(depth).unwrap();
        assert_eq!(tree.root().to_field(), naive_root(depth, &[]));

        for (n, leaf) in all.iter().enumerate() {
            tree.insert(*leaf).unwrap();
            assert_eq!(
                tree.root().to_field(),
                naive_root(depth, &all[..=n]),
                "depth {} after {} inserts",
                depth,
                n + 1
            );
        }
    }
}

#[test]
fn every_path_reproduces_every_later_root() {
    for depth in 1..=4 {
        let hasher = MerkleHasher::new(depth).unwrap();
        let all = leaves(1 << depth);
        let mut tree = MerkleTree::new(depth).unwrap();

        for leaf in &all {
            tree.insert(*leaf).unwrap();
            let root = tree.root();

            for index in 0..tree.len() {
                let path = tree.path(index).unwrap();
                let leaf = tree.leaf(index).unwrap();

                assert_eq!(path.path_bits, path_bits_for_index(index, depth));
                assert_eq!(
                    hasher
                        .root_from_leaf_and_path(&leaf, index, &path.siblings)
                        .unwrap(),
                    root
                );
                assert_eq!(
                    fold_path(leaf.to_field(), &path.siblings, &path.path_bits),
                    root.to_field()
                );
            }
        }
    }
}

#[test]
fn capacity_boundary() {
    let depth = 3;
    let mut tree = MerkleTree::new(depth).unwrap();
    let all = leaves(8);

    for leaf in &all[..7] {
        tree.insert(*leaf).unwrap();
    }
    assert_eq!(tree.insert(all[7]).unwrap(), 7);
    assert!(tree.is_full());

    let err = tree.insert(Leaf::from_field(Fr::from(1u64))).unwrap_err();
    assert_eq!(err, MerkleError::CapacityExceeded { capacity: 8 });
    assert_eq!(tree.root().to_field(), naive_root(depth, &all));
}

#[test]
fn stale_path_detected_after_insert() {
    let depth = 3;
    let hasher = MerkleHasher::new(depth).unwrap();
    let all = leaves(2);
    let mut tree = MerkleTree::new(depth).unwrap();

    tree.insert(all[0]).unwrap();
    let old_path = tree.path(0).unwrap();
    tree.insert(all[1]).unwrap();

    let err = hasher
        .ensure_root_matches(&all[0], 0, &old_path.siblings, &tree.root())
        .unwrap_err();
    assert!(matches!(err, MerkleError::StaleRootMismatch { .. }));

    let fresh = tree.path(0).unwrap();
    hasher
        .ensure_root_matches(&all[0], 0, &fresh.siblings, &tree.root())
        .unwrap();
}

use anyhow::{Result, anyhow, bail};
use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

use mixer_privacy::{Leaf, NullifierHash};

use super::{LedgerStore, PersistedLedger};

#[derive(Default)]
struct MemoryInner {
    leaves: BTreeMap<u64, Leaf>,
    nullifiers: HashSet<NullifierHash>,
    balance: u64,
}

/// A lightweight, non-durable store for tests and ephemeral ledgers.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LedgerStore for MemoryStore {
    fn record_deposit(&self, index: u64, leaf: &Leaf, balance: u64) -> Result<()> {
        let mut inner = self.inner.lock().map_err(|_| anyhow!("memory store poisoned"))?;
        if inner.leaves.contains_key(&index) {
            bail!("leaf {} already persisted", index);
        }
        inner.leaves.insert(index, *leaf);
        inner.balance = balance;
        Ok(())
    }

    fn record_withdrawal(&self, nullifier_hash: &NullifierHash, balance: u64) -> Result<()> {
        let mut inner = self.inner.lock().map_err(|_| anyhow!("memory store poisoned"))?;
        if !inner.nullifiers.insert(*nullifier_hash) {
            bail!("nullifier {} already persisted", nullifier_hash);
        }
        inner.balance = balance;
        Ok(())
    }

    fn load(&self) -> Result<PersistedLedger> {
        let inner = self.inner.lock().map_err(|_| anyhow!("memory store poisoned"))?;
        Ok(PersistedLedger {
            leaves: inner.leaves.iter().map(|(i, l)| (*i, *l)).collect(),
            nullifiers: inner.nullifiers.iter().copied().collect(),
            balance: inner.balance,
        })
    }
}

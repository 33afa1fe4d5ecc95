pub mod db;
pub mod memory;

use anyhow::Result;
use mixer_privacy::{Leaf, NullifierHash};

pub use db::RocksDbStore;
pub use memory::MemoryStore;

/// Everything needed to rebuild a ledger on startup
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistedLedger {
    /// Leaves keyed by index, in index order
    pub leaves: Vec<(u64, Leaf)>,
    pub nullifiers: Vec<NullifierHash>,
    pub balance: u64,
}

/// decoupling ledger logic from the db
///
/// Each write is atomic: either every key of the transition lands or none.
pub trait LedgerStore: Send + Sync {
    /// Persist a deposit at `index` together with the new pool balance
    fn record_deposit(&self, index: u64, leaf: &Leaf, balance: u64) -> Result<()>;

    /// Persist a spent nullifier together with the new pool balance
    fn record_withdrawal(&self, nullifier_hash: &NullifierHash, balance: u64) -> Result<()>;

    /// Read back the full persisted state
    fn load(&self) -> Result<PersistedLedger>;
}

use anyhow::{Context, Result, bail};
use rocksdb::{ColumnFamilyDescriptor, DB, IteratorMode, Options, WriteBatch};
use std::path::Path;
use std::sync::Arc;

use mixer_privacy::{FIELD_BYTES, Leaf, NullifierHash};

use super::{LedgerStore, PersistedLedger};

const CF_LEAVES: &str = "leaves";
const CF_NULLIFIERS: &str = "nullifiers";
const CF_POOL_META: &str = "pool_meta";

const KEY_BALANCE: &[u8] = b"balance";

/// A thread-safe wrapper around RocksDB.
#[derive(Clone)]
pub struct RocksDbStore {
    db: Arc<DB>,
}

impl RocksDbStore {
    /// Opens the database at the specified path, creating it if missing.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let families = vec![
            ColumnFamilyDescriptor::new(CF_LEAVES, Options::default()),
            ColumnFamilyDescriptor::new(CF_NULLIFIERS, Options::default()),
            ColumnFamilyDescriptor::new(CF_POOL_META, Options::default()),
        ];

        let db = DB::open_cf_descriptors(&opts, path, families)
            .map_err(|e| anyhow::anyhow!("Failed to open RocksDB: {}", e))?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Get leaf at index
    pub fn get_leaf(&self, index: u64) -> Result<Option<Leaf>> {
        let cf = self.db.cf_handle(CF_LEAVES).context("leaves CF missing")?;

        match self.db.get_cf(cf, index.to_be_bytes())? {
            Some(bytes) => Ok(Some(decode_leaf(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Get all leaves in index order (for tree reconstruction on startup)
    pub fn get_all_leaves(&self) -> Result<Vec<(u64, Leaf)>> {
        let cf = self.db.cf_handle(CF_LEAVES).context("leaves CF missing")?;

        let mut leaves = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (key, value) = item?;
            let key: [u8; 8] = key.as_ref().try_into().context("invalid leaf key length")?;
            leaves.push((u64::from_be_bytes(key), decode_leaf(&value)?));
        }

        Ok(leaves)
    }

    /// Check if nullifier has already been spent
    pub fn nullifier_exists(&self, nullifier_hash: &NullifierHash) -> Result<bool> {
        let cf = self
            .db
            .cf_handle(CF_NULLIFIERS)
            .context("nullifiers CF missing")?;

        Ok(self.db.get_cf(cf, nullifier_hash.to_bytes())?.is_some())
    }

    /// Get all spent nullifiers (for spent set reconstruction on startup)
    pub fn get_all_nullifiers(&self) -> Result<Vec<NullifierHash>> {
        let cf = self
            .db
            .cf_handle(CF_NULLIFIERS)
            .context("nullifiers CF missing")?;

        let mut nullifiers = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (key, _) = item?;
            let bytes: [u8; FIELD_BYTES] = key
                .as_ref()
                .try_into()
                .context("invalid nullifier length")?;
            nullifiers.push(NullifierHash::from_bytes(&bytes)?);
        }

        Ok(nullifiers)
    }

    /// Current pool balance (zero for a fresh store)
    pub fn get_balance(&self) -> Result<u64> {
        let cf = self
            .db
            .cf_handle(CF_POOL_META)
            .context("pool_meta CF missing")?;

        match self.db.get_cf(cf, KEY_BALANCE)? {
            Some(bytes) => {
                let arr: [u8; 8] = bytes
                    .as_slice()
                    .try_into()
                    .context("invalid balance length")?;
                Ok(u64::from_be_bytes(arr))
            }
            None => Ok(0),
        }
    }
}

fn decode_leaf(bytes: &[u8]) -> Result<Leaf> {
    let arr: [u8; FIELD_BYTES] = bytes.try_into().context("invalid leaf length")?;
    Ok(Leaf::from_bytes(&arr)?)
}

impl LedgerStore for RocksDbStore {
    fn record_deposit(&self, index: u64, leaf: &Leaf, balance: u64) -> Result<()> {
        let leaves = self.db.cf_handle(CF_LEAVES).context("leaves CF missing")?;
        let meta = self
            .db
            .cf_handle(CF_POOL_META)
            .context("pool_meta CF missing")?;

        if self.get_leaf(index)?.is_some() {
            bail!("leaf {} already persisted", index);
        }

        let mut batch = WriteBatch::default();
        batch.put_cf(leaves, index.to_be_bytes(), leaf.to_bytes());
        batch.put_cf(meta, KEY_BALANCE, balance.to_be_bytes());
        self.db.write(batch).context("Failed to write deposit")?;
        Ok(())
    }

    fn record_withdrawal(&self, nullifier_hash: &NullifierHash, balance: u64) -> Result<()> {
        let nullifiers = self
            .db
            .cf_handle(CF_NULLIFIERS)
            .context("nullifiers CF missing")?;
        let meta = self
            .db
            .cf_handle(CF_POOL_META)
            .context("pool_meta CF missing")?;

        if self.nullifier_exists(nullifier_hash)? {
            bail!("nullifier {} already persisted", nullifier_hash);
        }

        let mut batch = WriteBatch::default();
        batch.put_cf(nullifiers, nullifier_hash.to_bytes(), b"");
        batch.put_cf(meta, KEY_BALANCE, balance.to_be_bytes());
        self.db.write(batch).context("Failed to write withdrawal")?;
        Ok(())
    }

    fn load(&self) -> Result<PersistedLedger> {
        Ok(PersistedLedger {
            leaves: self.get_all_leaves()?,
            nullifiers: self.get_all_nullifiers()?,
            balance: self.get_balance()?,
        })
    }
}

//! Mixer Ledger
//!
//! The single authority over pool state: the deposit accumulator, recent
//! roots, the spent nullifier set and the pool balance all live in one
//! [`LedgerState`] behind one lock.
//!
//! ```text
//! deposit(leaf) ──► validate ──► persist ──► tree.insert ──► roots.push
//!
//! withdraw(proof, root, nf) ──► guard: root known? nf unspent? proof valid?
//!                                   │
//!                                   ▼
//!                               persist nf ──► spent.insert ──► Settlement
//! ```
//!
//! Persistence happens before in-memory state changes, so a failed write
//! leaves the ledger exactly as it was.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Context;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use mixer_config::MixerConfig;
use mixer_privacy::{
    Leaf, MerklePath, MerkleTree, NullifierHash, Root, RootHistory, field_from_slice,
};
use mixer_prover::{PublicInputs, WithdrawProof, WithdrawVerifier};

use crate::error::LedgerError;
use crate::guard::WithdrawalGuard;
use crate::spent::SpentSet;
use crate::storage::{LedgerStore, MemoryStore, RocksDbStore};

// ============================================================================
// Request / Response Types
// ============================================================================

/// Deposit a leaf worth exactly one denomination
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositRequest {
    pub leaf: Leaf,
    pub value: u64,
    /// Reject the deposit unless it lands at this index
    #[serde(default)]
    pub expected_index: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositReceipt {
    pub index: u64,
    /// Root after the insertion
    pub root: Root,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalRequest {
    pub proof: WithdrawProof,
    pub public_inputs: PublicInputs,
    /// Opaque payout address; not bound by the proof
    pub recipient: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub nullifier_hash: NullifierHash,
    pub recipient: String,
    pub amount: u64,
}

/// Consistent root and path taken under one lock
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub root: Root,
    pub path: MerklePath,
}

/// Point-in-time ledger summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerStatus {
    pub depth: usize,
    pub leaves: u64,
    pub capacity: u64,
    pub root: Root,
    pub known_roots: usize,
    pub spent: usize,
    pub balance: u64,
    pub denomination: u64,
}

// ============================================================================
// Configuration
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerConfig {
    pub depth: usize,
    pub root_history_size: usize,
    pub denomination: u64,
}

impl From<&MixerConfig> for LedgerConfig {
    fn from(config: &MixerConfig) -> Self {
        Self {
            depth: config.tree.depth,
            root_history_size: config.tree.root_history_size,
            denomination: config.pool.denomination,
        }
    }
}

// ============================================================================
// Ledger
// ============================================================================

/// State guarded by the ledger lock
struct LedgerState {
    tree: MerkleTree,
    roots: RootHistory,
    spent: SpentSet,
    balance: u64,
}

pub struct MixerLedger {
    state: Mutex<LedgerState>,
    store: Box<dyn LedgerStore>,
    verifier: Arc<dyn WithdrawVerifier>,
    denomination: u64,
}

impl MixerLedger {
    /// Non-durable ledger
    pub fn new(
        config: LedgerConfig,
        verifier: Arc<dyn WithdrawVerifier>,
    ) -> Result<Self, LedgerError> {
        Self::with_store(config, Box::new(MemoryStore::new()), verifier)
    }

    /// Ledger backed by RocksDB at `path`
    pub fn open<P: AsRef<Path>>(
        path: P,
        config: LedgerConfig,
        verifier: Arc<dyn WithdrawVerifier>,
    ) -> Result<Self, LedgerError> {
        let path = path.as_ref();
        let store = RocksDbStore::open(path)
            .with_context(|| format!("Failed to open ledger at {}", path.display()))?;
        Self::with_store(config, Box::new(store), verifier)
    }

    /// Ledger configured from `config` (RocksDB when `database.path` is set)
    pub fn from_config(
        config: &MixerConfig,
        verifier: Arc<dyn WithdrawVerifier>,
    ) -> Result<Self, LedgerError> {
        match &config.database.path {
            Some(path) => Self::open(path, config.into(), verifier),
            None => {
                warn!("No database path configured, ledger state will not survive restarts");
                Self::new(config.into(), verifier)
            }
        }
    }

    /// Rebuild the ledger from whatever `store` already holds
    pub fn with_store(
        config: LedgerConfig,
        store: Box<dyn LedgerStore>,
        verifier: Arc<dyn WithdrawVerifier>,
    ) -> Result<Self, LedgerError> {
        if verifier.depth() != config.depth {
            return Err(LedgerError::VerifierDepthMismatch {
                ledger: config.depth,
                verifier: verifier.depth(),
            });
        }

        let persisted = store.load()?;

        let mut tree = MerkleTree::new(config.depth)?;
        let mut roots = RootHistory::new(config.root_history_size);
        roots.push(tree.root());

        // Replay deposits in index order so recent roots are restored too
        for (expected, (index, leaf)) in persisted.leaves.into_iter().enumerate() {
            if index != expected as u64 {
                return Err(anyhow::anyhow!(
                    "persisted leaves have a gap: expected index {}, found {}",
                    expected,
                    index
                )
                .into());
            }
            tree.insert(leaf)?;
            roots.push(tree.root());
        }

        let spent: SpentSet = persisted.nullifiers.into_iter().collect();
        let balance = persisted.balance;

        let expected_balance = tree
            .len()
            .saturating_sub(spent.len() as u64)
            .saturating_mul(config.denomination);
        if balance != expected_balance {
            warn!(
                "pool balance {} differs from {} deposits minus {} withdrawals at denomination {}",
                balance,
                tree.len(),
                spent.len(),
                config.denomination
            );
        }

        info!(
            "Loaded ledger: depth {}, {} deposits, {} spent, balance {}, root {}",
            config.depth,
            tree.len(),
            spent.len(),
            balance,
            tree.root()
        );

        Ok(Self {
            state: Mutex::new(LedgerState {
                tree,
                roots,
                spent,
                balance,
            }),
            store,
            verifier,
            denomination: config.denomination,
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, LedgerState>, LedgerError> {
        self.state.lock().map_err(|_| LedgerError::StatePoisoned)
    }

    pub fn denomination(&self) -> u64 {
        self.denomination
    }

    // ------------------------------------------------------------------------
    // Deposits
    // ------------------------------------------------------------------------

    /// Insert a deposit leaf
    pub fn deposit(&self, request: DepositRequest) -> Result<DepositReceipt, LedgerError> {
        if request.value != self.denomination {
            return Err(LedgerError::WrongDenomination {
                expected: self.denomination,
                got: request.value,
            });
        }

        let mut state = self.lock()?;

        if state.tree.is_full() {
            return Err(LedgerError::CapacityExceeded {
                capacity: state.tree.capacity(),
            });
        }

        let index = state.tree.len();
        if let Some(expected) = request.expected_index {
            if expected != index {
                return Err(LedgerError::IndexMismatch {
                    expected,
                    actual: index,
                });
            }
        }

        let balance = state
            .balance
            .checked_add(self.denomination)
            .ok_or(LedgerError::BalanceOverflow)?;

        self.store.record_deposit(index, &request.leaf, balance)?;

        let inserted = state.tree.insert(request.leaf)?;
        debug_assert_eq!(inserted, index);
        let root = state.tree.root();
        state.roots.push(root);
        state.balance = balance;

        info!("Deposit {} accepted, root {}", index, root);
        Ok(DepositReceipt { index, root })
    }

    /// Insert a deposit given as 32 big-endian bytes
    pub fn deposit_bytes(
        &self,
        leaf: &[u8],
        value: u64,
        expected_index: Option<u64>,
    ) -> Result<DepositReceipt, LedgerError> {
        let leaf = Leaf::from_field(field_from_slice(leaf)?);
        self.deposit(DepositRequest {
            leaf,
            value,
            expected_index,
        })
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    pub fn root(&self) -> Result<Root, LedgerError> {
        Ok(self.lock()?.tree.root())
    }

    /// Whether `root` is accepted for withdrawals
    pub fn is_known_root(&self, root: &Root) -> Result<bool, LedgerError> {
        Ok(self.lock()?.roots.is_valid(root))
    }

    /// Authentication path for the deposit at `index`
    pub fn merkle_path(&self, index: u64) -> Result<MerklePath, LedgerError> {
        Ok(self.lock()?.tree.path(index)?)
    }

    /// Root and path for `index`, read together
    pub fn snapshot(&self, index: u64) -> Result<LedgerSnapshot, LedgerError> {
        let state = self.lock()?;
        Ok(LedgerSnapshot {
            root: state.tree.root(),
            path: state.tree.path(index)?,
        })
    }

    pub fn leaf(&self, index: u64) -> Result<Option<Leaf>, LedgerError> {
        Ok(self.lock()?.tree.leaf(index))
    }

    pub fn is_spent(&self, nullifier_hash: &NullifierHash) -> Result<bool, LedgerError> {
        Ok(self.lock()?.spent.contains(nullifier_hash))
    }

    pub fn balance(&self) -> Result<u64, LedgerError> {
        Ok(self.lock()?.balance)
    }

    pub fn status(&self) -> Result<LedgerStatus, LedgerError> {
        let state = self.lock()?;
        Ok(LedgerStatus {
            depth: state.tree.depth(),
            leaves: state.tree.len(),
            capacity: state.tree.capacity(),
            root: state.tree.root(),
            known_roots: state.roots.len(),
            spent: state.spent.len(),
            balance: state.balance,
            denomination: self.denomination,
        })
    }

    // ------------------------------------------------------------------------
    // Withdrawals
    // ------------------------------------------------------------------------

    /// Check and settle a withdrawal as one atomic transition
    pub fn withdraw(&self, request: WithdrawalRequest) -> Result<Settlement, LedgerError> {
        let mut state = self.lock()?;
        let mut guard = WithdrawalGuard::new(&request);

        let nullifier_hash = guard.check(&state.roots, &state.spent, self.verifier.as_ref())?;

        let balance = state.balance.checked_sub(self.denomination).ok_or(
            LedgerError::InsufficientBalance {
                balance: state.balance,
                amount: self.denomination,
            },
        )?;

        self.store.record_withdrawal(&nullifier_hash, balance)?;

        state.spent.insert(nullifier_hash);
        state.balance = balance;
        guard.mark_settled();

        info!(
            "Withdrawal settled: nullifier {}, {} to {}",
            nullifier_hash, self.denomination, request.recipient
        );

        Ok(Settlement {
            nullifier_hash,
            recipient: request.recipient.clone(),
            amount: self.denomination,
        })
    }
}

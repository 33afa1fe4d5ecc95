//! Mixer Core
//!
//! The ledger side of the mixer: accepts deposits into the accumulator,
//! answers root and path queries, and settles withdrawals behind the
//! withdrawal guard.

pub mod error;
pub mod guard;
pub mod ledger;
pub mod spent;
pub mod storage;

#[cfg(test)]
mod tests;

pub use error::{LedgerError, RejectReason};
pub use guard::{WithdrawalGuard, WithdrawalStage};
pub use ledger::{
    DepositReceipt, DepositRequest, LedgerConfig, LedgerSnapshot, LedgerStatus, MixerLedger,
    Settlement, WithdrawalRequest,
};
pub use spent::SpentSet;
pub use storage::{LedgerStore, MemoryStore, PersistedLedger, RocksDbStore};


use std::sync::Arc;

use ark_std::rand::{SeedableRng, rngs::StdRng};
use mixer_privacy::{DepositNote, Secret};
use mixer_prover::{MockProofSystem, WithdrawProver, WithdrawWitness};

use crate::ledger::{DepositRequest, LedgerConfig, MixerLedger, WithdrawalRequest};

pub(crate) const DEPTH: usize = 3;
pub(crate) const DENOMINATION: u64 = 100;

pub(crate) fn config(depth: usize, root_history_size: usize) -> LedgerConfig {
    LedgerConfig {
        depth,
        root_history_size,
        denomination: DENOMINATION,
    }
}

pub(crate) fn rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

pub(crate) fn memory_ledger(depth: usize, root_history_size: usize) -> (MixerLedger, Arc<MockProofSystem>) {
    let system = Arc::new(MockProofSystem::new(depth));
    let ledger = MixerLedger::new(config(depth, root_history_size), system.clone()).unwrap();
    (ledger, system)
}

/// Deposit a fresh note at the ledger's next index
pub(crate) fn deposit_note(ledger: &MixerLedger, rng: &mut StdRng) -> DepositNote {
    let index = ledger.status().unwrap().leaves;
    let note = DepositNote::new(Secret::random(rng), index);
    let receipt = ledger
        .deposit(DepositRequest {
            leaf: note.leaf,
            value: DENOMINATION,
            expected_index: Some(index),
        })
        .unwrap();
    assert_eq!(receipt.index, index);
    note
}

/// Withdrawal request for `note` against the ledger's current root
pub(crate) fn withdrawal_for(
    ledger: &MixerLedger,
    prover: &dyn WithdrawProver,
    note: &DepositNote,
) -> WithdrawalRequest {
    let snapshot = ledger.snapshot(note.index).unwrap();
    let witness = WithdrawWitness::from_note(note, snapshot.path, snapshot.root).unwrap();
    WithdrawalRequest {
        proof: prover.prove(&witness).unwrap(),
        public_inputs: witness.public_inputs(),
        recipient: format!("recipient-{}", note.index),
    }
}

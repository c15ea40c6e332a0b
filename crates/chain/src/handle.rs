//! Shared async handle over a [`Ledger`].
//!
//! Queries take a read lock and run concurrently. Sealing runs in its own
//! task: the candidate block is prepared under the write lock, the nonce
//! search runs on the blocking pool with no lock held, and the sealed block
//! is committed under the write lock again. Only one seal runs at a time.

use crate::ledger::{Ledger, LedgerError, LedgerStats, Result};
use crate::provenance::{self, Certificate, HistoryEntry, Provenance, RecordStatus, VerificationResult};
use herdledger_core::{AnimalRecord, Block, Transaction};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, warn};

/// Cloneable handle to one ledger instance.
#[derive(Clone)]
pub struct LedgerHandle {
    ledger: Arc<RwLock<Ledger>>,
    seal_lock: Arc<Mutex<()>>,
}

impl LedgerHandle {
    pub fn new(ledger: Ledger) -> Self {
        Self {
            ledger: Arc::new(RwLock::new(ledger)),
            seal_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Lock the ledger for reading.
    pub async fn read(&self) -> RwLockReadGuard<'_, Ledger> {
        self.ledger.read().await
    }

    /// Lock the ledger for writing.
    pub async fn write(&self) -> RwLockWriteGuard<'_, Ledger> {
        self.ledger.write().await
    }

    pub async fn submit_transaction(&self, tx: Transaction) -> bool {
        self.ledger.write().await.submit_transaction(tx)
    }

    pub async fn create_animal_record(&self, record: AnimalRecord, owner: &str) -> Transaction {
        self.ledger.write().await.create_animal_record(record, owner)
    }

    pub async fn update_animal_record(
        &self,
        animal_id: &str,
        updates: BTreeMap<String, String>,
        updater: &str,
    ) -> Transaction {
        self.ledger
            .write()
            .await
            .update_animal_record(animal_id, updates, updater)
    }

    pub async fn approve_animal_record(&self, animal_id: &str, approver: &str) -> Transaction {
        self.ledger
            .write()
            .await
            .approve_animal_record(animal_id, approver)
    }

    pub async fn reject_animal_record(
        &self,
        animal_id: &str,
        rejector: &str,
        reason: &str,
    ) -> Transaction {
        self.ledger
            .write()
            .await
            .reject_animal_record(animal_id, rejector, reason)
    }

    /// Seal every pending transaction into a new block.
    ///
    /// The work runs in a spawned task, so dropping the returned future does
    /// not abandon a seal halfway.
    pub async fn seal_pending_block(&self, beneficiary: impl Into<String>) -> Result<Block> {
        let handle = self.clone();
        let beneficiary = beneficiary.into();

        tokio::spawn(async move { handle.seal(&beneficiary).await })
            .await
            .map_err(|e| LedgerError::WorkerFailed(e.to_string()))?
    }

    async fn seal(&self, beneficiary: &str) -> Result<Block> {
        let _seal_guard = self.seal_lock.lock().await;

        let (candidate, pow) = {
            let mut ledger = self.ledger.write().await;
            (ledger.prepare_candidate(beneficiary), ledger.proof_of_work())
        };
        debug!(
            index = candidate.header.index,
            transactions = candidate.tx_count(),
            "sealing candidate block"
        );

        let drained = candidate.transactions.clone();
        let sealed = match tokio::task::spawn_blocking(move || pow.seal(candidate)).await {
            Ok(block) => block,
            Err(e) => {
                warn!(error = %e, "sealing worker failed");
                self.ledger.write().await.requeue(drained);
                return Err(LedgerError::WorkerFailed(e.to_string()));
            }
        };

        self.ledger.write().await.commit_block(sealed)
    }

    pub async fn latest_block(&self) -> Block {
        self.ledger.read().await.latest_block().clone()
    }

    pub async fn balance_of(&self, address: &str) -> i128 {
        self.ledger.read().await.balance_of(address)
    }

    pub async fn is_valid(&self) -> bool {
        self.ledger.read().await.is_valid()
    }

    pub async fn stats(&self) -> LedgerStats {
        self.ledger.read().await.stats()
    }

    pub async fn history(&self, animal_id: &str) -> Vec<HistoryEntry> {
        self.ledger.read().await.history(animal_id)
    }

    pub async fn verify(&self, animal_id: &str) -> VerificationResult {
        self.ledger.read().await.verify(animal_id)
    }

    pub async fn certificate(&self, animal_id: &str) -> provenance::Result<Certificate> {
        self.ledger.read().await.certificate(animal_id)
    }

    pub async fn current_status(&self, animal_id: &str) -> RecordStatus {
        self.ledger.read().await.current_status(animal_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::LedgerConfig;

    fn setup_handle() -> LedgerHandle {
        LedgerHandle::new(
            Ledger::new(LedgerConfig {
                difficulty: 1,
                ..LedgerConfig::default()
            })
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_seal_via_handle() {
        let handle = setup_handle();
        handle
            .create_animal_record(AnimalRecord::new("A1"), "owner1")
            .await;
        handle.approve_animal_record("A1", "sup1").await;

        let block = handle.seal_pending_block("miner1").await.unwrap();

        assert_eq!(block.header.index, 1);
        assert_eq!(block.tx_count(), 3);
        assert_eq!(handle.latest_block().await, block);
        assert!(handle.verify("A1").await.is_verified());
        assert_eq!(handle.current_status("A1").await, RecordStatus::Approved);
        assert!(handle.certificate("A1").await.is_ok());
        assert_eq!(handle.balance_of("miner1").await, 100);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_seals_stay_linked() {
        let handle = setup_handle();

        let mut tasks = Vec::new();
        for i in 0..6 {
            let handle = handle.clone();
            tasks.push(tokio::spawn(async move {
                handle
                    .create_animal_record(AnimalRecord::new(format!("A{}", i)), "owner1")
                    .await;
                handle.seal_pending_block(format!("miner{}", i)).await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let ledger = handle.read().await;
        assert_eq!(ledger.chain().len(), 7);
        assert!(ledger.is_valid());
        assert!(ledger.pending().is_empty());
        assert_eq!(ledger.total_transactions(), 12);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_reads_during_seal() {
        let handle = setup_handle();
        handle
            .create_animal_record(AnimalRecord::new("A1"), "owner1")
            .await;

        let sealer = {
            let handle = handle.clone();
            tokio::spawn(async move { handle.seal_pending_block("miner1").await })
        };

        // Readers never observe a broken chain.
        for _ in 0..10 {
            assert!(handle.is_valid().await);
            tokio::task::yield_now().await;
        }

        sealer.await.unwrap().unwrap();
        assert_eq!(handle.stats().await.total_blocks, 2);
    }
}

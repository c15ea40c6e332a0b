//! Ledger orchestration.
//!
//! The ledger owns the chain and the pending pool. It is the only thing that
//! appends to the chain, and it appends only sealed blocks that link to the
//! current tail.

use crate::mempool::{PendingPool, PendingPoolConfig};
use herdledger_consensus::{
    BlockValidator, ChainValidator, ConsensusError, ProofOfWork, TransactionValidator,
    ValidationError,
};
use herdledger_core::{Block, Hash, Payload, Transaction};
use herdledger_storage::{ChainStore, StorageError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("consensus error: {0}")]
    Consensus(#[from] ConsensusError),

    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("stored chain failed validation: {0}")]
    Corrupted(ValidationError),

    #[error("sealing task failed: {0}")]
    WorkerFailed(String),
}

pub type Result<T> = std::result::Result<T, LedgerError>;

/// Ledger configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LedgerConfig {
    /// Leading zero hex characters a sealed block hash must have.
    pub difficulty: u32,
    /// Amount paid to the beneficiary of each sealed block.
    pub mining_reward: u64,
    /// Pending pool configuration.
    pub pool: PendingPoolConfig,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            difficulty: 2,
            mining_reward: 100,
            pool: PendingPoolConfig::default(),
        }
    }
}

/// The ledger: sealed chain plus pending pool.
pub struct Ledger {
    /// Sealed blocks, genesis first.
    chain: Vec<Block>,
    /// Verified transactions waiting for the next block.
    pending: PendingPool,
    /// Sealer for new blocks.
    pow: ProofOfWork,
    /// Configuration.
    config: LedgerConfig,
    /// Durable backing store, if any.
    store: Option<ChainStore>,
    /// Ids of every sealed transaction.
    sealed_ids: HashSet<Uuid>,
}

impl Ledger {
    /// Create an in-memory ledger holding only a genesis block.
    pub fn new(config: LedgerConfig) -> Result<Self> {
        let pow = ProofOfWork::new(config.difficulty)?;
        Ok(Self::with_pow(config, pow))
    }

    fn with_pow(config: LedgerConfig, pow: ProofOfWork) -> Self {
        Self {
            chain: vec![Block::genesis()],
            pending: PendingPool::with_config(config.pool.clone()),
            pow,
            config,
            store: None,
            sealed_ids: HashSet::new(),
        }
    }

    /// Open a ledger backed by `store`.
    ///
    /// An empty store is initialised with a fresh genesis block. A stored
    /// chain is validated before use; a chain that fails validation is
    /// refused with [`LedgerError::Corrupted`]. Stored pending transactions
    /// are re-verified and requeued, except those already sealed.
    pub fn open(store: ChainStore, config: LedgerConfig) -> Result<Self> {
        let mut ledger = Self::new(config)?;

        let blocks = store.load_chain()?;
        if blocks.is_empty() {
            store.init_genesis(&ledger.chain[0])?;
        } else {
            if let Err(e) = ChainValidator::validate_chain(&blocks) {
                warn!(error = %e, "stored chain failed validation");
                return Err(LedgerError::Corrupted(e));
            }
            ledger.sealed_ids = blocks
                .iter()
                .flat_map(|block| block.transactions.iter())
                .map(|tx| tx.transaction_id)
                .collect();
            ledger.chain = blocks;
        }

        for tx in store.load_pending()? {
            if ledger.is_sealed(&tx.transaction_id) {
                debug!(transaction_id = %tx.transaction_id, "dropping stored pending transaction already sealed");
                continue;
            }
            if TransactionValidator::validate(&tx).is_err() {
                debug!(transaction_id = %tx.transaction_id, "dropping stored pending transaction");
                continue;
            }
            if let Err(e) = ledger.pending.add(tx) {
                debug!(error = %e, "dropping stored pending transaction");
            }
        }

        info!(
            blocks = ledger.chain.len(),
            pending = ledger.pending.len(),
            "ledger opened"
        );
        ledger.store = Some(store);
        Ok(ledger)
    }

    /// Get the configuration.
    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Get the configured difficulty.
    pub fn difficulty(&self) -> u32 {
        self.pow.difficulty()
    }

    /// Get the configured mining reward.
    pub fn mining_reward(&self) -> u64 {
        self.config.mining_reward
    }

    /// Get the sealer used for new blocks.
    pub fn proof_of_work(&self) -> ProofOfWork {
        self.pow
    }

    /// All sealed blocks, genesis first.
    pub fn chain(&self) -> &[Block] {
        &self.chain
    }

    /// Get a block by index.
    pub fn block(&self, index: u64) -> Option<&Block> {
        usize::try_from(index).ok().and_then(|i| self.chain.get(i))
    }

    /// Get the latest sealed block.
    pub fn latest_block(&self) -> &Block {
        // The chain always holds at least the genesis block.
        &self.chain[self.chain.len() - 1]
    }

    /// Get the pending pool.
    pub fn pending(&self) -> &PendingPool {
        &self.pending
    }

    /// Check whether a transaction id is already on the chain.
    pub fn is_sealed(&self, id: &Uuid) -> bool {
        self.sealed_ids.contains(id)
    }

    /// Find a sealed transaction and the block containing it.
    pub fn transaction(&self, id: &Uuid) -> Option<(&Block, &Transaction)> {
        if !self.is_sealed(id) {
            return None;
        }
        self.chain.iter().find_map(|block| {
            block
                .transactions
                .iter()
                .find(|tx| tx.transaction_id == *id)
                .map(|tx| (block, tx))
        })
    }

    /// Submit a transaction to the pending pool.
    ///
    /// Returns false, and drops the transaction, if its signature does not
    /// match its contents, it is already sealed, or the pool refuses it.
    pub fn submit_transaction(&mut self, tx: Transaction) -> bool {
        if let Err(e) = TransactionValidator::validate(&tx) {
            debug!(error = %e, "rejected transaction");
            return false;
        }
        if self.is_sealed(&tx.transaction_id) {
            debug!(transaction_id = %tx.transaction_id, "rejected transaction already sealed");
            return false;
        }

        let id = tx.transaction_id;
        if let Err(e) = self.pending.add(tx) {
            debug!(error = %e, "rejected transaction");
            return false;
        }

        if let Err(e) = self.persist_pending() {
            warn!(error = %e, transaction_id = %id, "failed to persist pending pool");
        }
        true
    }

    /// Drain the pending pool into an unsealed block that extends the tail.
    ///
    /// A reward transaction paying `beneficiary` is appended after the
    /// pending transactions.
    pub fn prepare_candidate(&mut self, beneficiary: &str) -> Block {
        let mut transactions = self.pending.drain();
        transactions.push(Transaction::reward(beneficiary, self.config.mining_reward));

        Block::new(
            self.chain.len() as u64,
            self.latest_block().hash,
            transactions,
            self.pow.difficulty(),
        )
    }

    /// Append a sealed block.
    ///
    /// The block must extend the current tail, carry valid work and hold no
    /// transaction that is already sealed. If it is refused, its unsealed
    /// transactions (minus the reward) go back to the pool.
    ///
    /// With a backing store, the block and the remaining pending queue are
    /// written together.
    pub fn commit_block(&mut self, block: Block) -> Result<Block> {
        if let Err(e) = BlockValidator::validate_full(&block, self.latest_block()) {
            self.requeue(block.transactions);
            return Err(e.into());
        }

        let resealed = block
            .transactions
            .iter()
            .map(|tx| tx.transaction_id)
            .find(|id| self.is_sealed(id));
        if let Some(transaction_id) = resealed {
            let e = ValidationError::DuplicateTransaction {
                index: block.header.index,
                transaction_id,
            };
            self.requeue(block.transactions);
            return Err(e.into());
        }

        let stored = match &self.store {
            Some(store) => store.append_block(&block, self.pending.as_slice()),
            None => Ok(()),
        };
        if let Err(e) = stored {
            self.requeue(block.transactions);
            return Err(e.into());
        }

        info!(
            index = block.header.index,
            hash = %block.hash,
            transactions = block.tx_count(),
            nonce = block.header.nonce,
            "block sealed"
        );
        self.sealed_ids
            .extend(block.transactions.iter().map(|tx| tx.transaction_id));
        self.chain.push(block.clone());
        Ok(block)
    }

    /// Seal every pending transaction into a new block and append it.
    ///
    /// Runs the proof-of-work search on the calling thread. Use
    /// [`crate::LedgerHandle::seal_pending_block`] to run it off-thread.
    pub fn seal_pending_block(&mut self, beneficiary: &str) -> Result<Block> {
        let candidate = self.prepare_candidate(beneficiary);
        let sealed = self.pow.seal(candidate);
        self.commit_block(sealed)
    }

    /// Return transactions from a block that was never appended to the pool.
    pub(crate) fn requeue(&mut self, transactions: Vec<Transaction>) {
        let transactions: Vec<Transaction> = transactions
            .into_iter()
            .filter(|tx| !(tx.is_system() && tx.data == Payload::MiningReward))
            .filter(|tx| !self.is_sealed(&tx.transaction_id))
            .collect();
        self.pending.restore(transactions);
    }

    fn persist_pending(&self) -> Result<()> {
        if let Some(store) = &self.store {
            store.put_pending(self.pending.as_slice())?;
        }
        Ok(())
    }

    /// Net balance of `address` across every sealed transaction.
    ///
    /// Sending subtracts, receiving adds. Scans the whole chain.
    pub fn balance_of(&self, address: &str) -> i128 {
        let mut balance: i128 = 0;
        for tx in self.chain.iter().flat_map(|block| block.transactions.iter()) {
            if tx.from.as_deref() == Some(address) {
                balance -= i128::from(tx.amount);
            }
            if tx.to == address {
                balance += i128::from(tx.amount);
            }
        }
        balance
    }

    /// Validate the whole chain, reporting the first failure.
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        ChainValidator::validate_chain(&self.chain)
    }

    /// Check every block's hash and link.
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Total number of sealed transactions.
    pub fn total_transactions(&self) -> usize {
        self.chain.iter().map(Block::tx_count).sum()
    }

    /// Get ledger statistics.
    pub fn stats(&self) -> LedgerStats {
        LedgerStats {
            total_blocks: self.chain.len(),
            total_transactions: self.total_transactions(),
            pending_transactions: self.pending.len(),
            difficulty: self.difficulty(),
            mining_reward: self.config.mining_reward,
            chain_valid: self.is_valid(),
            latest_block_hash: self.latest_block().hash,
        }
    }

    /// Mutable access to sealed blocks, for tamper tests.
    #[cfg(test)]
    pub(crate) fn chain_mut(&mut self) -> &mut Vec<Block> {
        &mut self.chain
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::with_pow(LedgerConfig::default(), ProofOfWork::default())
    }
}

/// Ledger statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerStats {
    /// Number of sealed blocks, genesis included.
    pub total_blocks: usize,
    /// Number of sealed transactions.
    pub total_transactions: usize,
    /// Number of transactions waiting to be sealed.
    pub pending_transactions: usize,
    /// Current difficulty.
    pub difficulty: u32,
    /// Current mining reward.
    pub mining_reward: u64,
    /// Whether the chain passes validation.
    pub chain_valid: bool,
    /// Hash of the latest block.
    pub latest_block_hash: Hash,
}

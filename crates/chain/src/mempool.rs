//! Pending transaction pool.
//!
//! Holds verified transactions waiting to be sealed into a block, in
//! submission order. The whole pool is drained into the next block.

use herdledger_core::Transaction;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur during pool operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PoolError {
    #[error("transaction {0} already pending")]
    DuplicateTransaction(Uuid),

    #[error("pending pool is full (capacity: {0})")]
    PoolFull(usize),
}

pub type Result<T> = std::result::Result<T, PoolError>;

/// Configuration for the pending pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PendingPoolConfig {
    /// Maximum number of transactions waiting to be sealed.
    pub max_transactions: usize,
}

impl Default for PendingPoolConfig {
    fn default() -> Self {
        Self {
            max_transactions: 10_000,
        }
    }
}

/// Ordered pool of verified, unsealed transactions.
#[derive(Debug, Clone)]
pub struct PendingPool {
    config: PendingPoolConfig,
    /// Transactions in submission order.
    transactions: Vec<Transaction>,
    /// Ids of pooled transactions for fast duplicate checks.
    ids: HashSet<Uuid>,
}

impl PendingPool {
    /// Create a new pool with default configuration.
    pub fn new() -> Self {
        Self::with_config(PendingPoolConfig::default())
    }

    /// Create a new pool with the given configuration.
    pub fn with_config(config: PendingPoolConfig) -> Self {
        Self {
            config,
            transactions: Vec::new(),
            ids: HashSet::new(),
        }
    }

    /// Get the number of pending transactions.
    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    /// Check if the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Check if a transaction is pending.
    pub fn contains(&self, id: &Uuid) -> bool {
        self.ids.contains(id)
    }

    /// Get a pending transaction by id.
    pub fn get(&self, id: &Uuid) -> Option<&Transaction> {
        if !self.contains(id) {
            return None;
        }
        self.transactions.iter().find(|tx| tx.transaction_id == *id)
    }

    /// Pending transactions in submission order.
    pub fn as_slice(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Iterate pending transactions in submission order.
    pub fn iter(&self) -> impl Iterator<Item = &Transaction> {
        self.transactions.iter()
    }

    /// Append a transaction. The caller is responsible for verifying it first.
    pub fn add(&mut self, tx: Transaction) -> Result<()> {
        if self.contains(&tx.transaction_id) {
            return Err(PoolError::DuplicateTransaction(tx.transaction_id));
        }

        if self.transactions.len() >= self.config.max_transactions {
            return Err(PoolError::PoolFull(self.config.max_transactions));
        }

        self.ids.insert(tx.transaction_id);
        self.transactions.push(tx);
        Ok(())
    }

    /// Take every pending transaction, leaving the pool empty.
    pub fn drain(&mut self) -> Vec<Transaction> {
        self.ids.clear();
        std::mem::take(&mut self.transactions)
    }

    /// Put previously drained transactions back in front of anything
    /// submitted since. Capacity is not enforced; these were already admitted.
    pub fn restore(&mut self, transactions: Vec<Transaction>) {
        let mut restored: Vec<Transaction> = transactions
            .into_iter()
            .filter(|tx| self.ids.insert(tx.transaction_id))
            .collect();
        restored.append(&mut self.transactions);
        self.transactions = restored;
    }

    /// Clear all pending transactions.
    pub fn clear(&mut self) {
        self.transactions.clear();
        self.ids.clear();
    }

    /// Get pool statistics.
    pub fn stats(&self) -> PoolStats {
        let senders: HashSet<Option<&str>> =
            self.transactions.iter().map(|tx| tx.from.as_deref()).collect();

        PoolStats {
            total_transactions: self.len(),
            unique_senders: senders.len(),
            capacity: self.config.max_transactions,
        }
    }
}

impl Default for PendingPool {
    fn default() -> Self {
        Self::new()
    }
}

/// Pool statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolStats {
    /// Total number of transactions.
    pub total_transactions: usize,
    /// Number of distinct senders.
    pub unique_senders: usize,
    /// Pool capacity.
    pub capacity: usize,
}

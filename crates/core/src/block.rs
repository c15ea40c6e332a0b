//! Block and block header structures.

use crate::hash::{hash_encoded, Hash};
use crate::merkle::merkle_root;
use crate::transaction::Transaction;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The header of a block. Its encoding is what the block hash commits to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockHeader {
    /// Position in the chain (0 for genesis).
    pub index: u64,
    /// Creation time.
    pub timestamp: DateTime<Utc>,
    /// Hash of the previous block.
    pub previous_hash: Hash,
    /// Merkle root of transaction digests.
    pub merkle_root: Hash,
    /// Leading zero hex characters the hash had to meet when sealed.
    pub difficulty: u32,
    /// Proof-of-work nonce.
    pub nonce: u64,
}

impl BlockHeader {
    /// Calculate the hash of this block header.
    pub fn hash(&self) -> Hash {
        hash_encoded(self)
    }
}

/// A block: header, ordered transactions and the stored hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    /// Block header.
    pub header: BlockHeader,
    /// Transactions in inclusion order.
    pub transactions: Vec<Transaction>,
    /// Stored hash. Equals `compute_hash()` for an untampered block.
    pub hash: Hash,
}

impl Block {
    /// Create a new unsealed block (nonce 0) stamped with the current time.
    pub fn new(
        index: u64,
        previous_hash: Hash,
        transactions: Vec<Transaction>,
        difficulty: u32,
    ) -> Self {
        Self::with_timestamp(index, previous_hash, transactions, difficulty, Utc::now())
    }

    /// Create a new unsealed block with an explicit timestamp.
    pub fn with_timestamp(
        index: u64,
        previous_hash: Hash,
        transactions: Vec<Transaction>,
        difficulty: u32,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let header = BlockHeader {
            index,
            timestamp,
            previous_hash,
            merkle_root: Self::transactions_root(&transactions),
            difficulty,
            nonce: 0,
        };
        let hash = header.hash();

        Self {
            header,
            transactions,
            hash,
        }
    }

    /// Create the genesis block.
    pub fn genesis() -> Self {
        Self::new(0, Hash::ZERO, Vec::new(), 0)
    }

    /// Merkle root of the given transactions.
    pub fn transactions_root(transactions: &[Transaction]) -> Hash {
        let tx_hashes: Vec<Hash> = transactions.iter().map(|tx| tx.hash()).collect();
        merkle_root(&tx_hashes)
    }

    /// Recompute the block hash from the block's own contents.
    ///
    /// The merkle root is rebuilt from `transactions`, so editing any
    /// transaction changes the result even if the header is left alone.
    pub fn compute_hash(&self) -> Hash {
        let header = BlockHeader {
            merkle_root: Self::transactions_root(&self.transactions),
            ..self.header.clone()
        };
        header.hash()
    }

    /// Check the stored hash against the recomputed one.
    pub fn verify_hash(&self) -> bool {
        self.hash == self.compute_hash()
    }

    /// Verify the merkle root matches the transactions.
    pub fn verify_merkle_root(&self) -> bool {
        Self::transactions_root(&self.transactions) == self.header.merkle_root
    }

    /// Get the block index.
    pub fn index(&self) -> u64 {
        self.header.index
    }

    /// Hash of the predecessor.
    pub fn previous_hash(&self) -> Hash {
        self.header.previous_hash
    }

    /// Check if this is the genesis block.
    pub fn is_genesis(&self) -> bool {
        self.header.index == 0 && self.header.previous_hash == Hash::ZERO
    }

    /// Get the number of transactions in this block.
    pub fn tx_count(&self) -> usize {
        self.transactions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::{AnimalRecord, Payload};
    use crate::transaction::SYSTEM_ADDRESS;

    fn record_tx(id: &str) -> Transaction {
        Transaction::transfer(
            "owner1",
            SYSTEM_ADDRESS,
            0,
            Payload::RecordCreated(AnimalRecord::new(id)),
        )
    }

    #[test]
    fn test_genesis_block() {
        let genesis = Block::genesis();

        assert!(genesis.is_genesis());
        assert_eq!(genesis.index(), 0);
        assert_eq!(genesis.previous_hash(), Hash::ZERO);
        assert_eq!(genesis.header.nonce, 0);
        assert!(genesis.transactions.is_empty());
        assert!(genesis.verify_hash());
    }

    #[test]
    fn test_block_hash_deterministic() {
        let txs = vec![record_tx("A1"), record_tx("A2")];
        let ts = Utc::now();
        let b1 = Block::with_timestamp(1, Hash::ZERO, txs.clone(), 2, ts);
        let b2 = Block::with_timestamp(1, Hash::ZERO, txs, 2, ts);

        assert_eq!(b1.hash, b2.hash);
        assert_eq!(b1.compute_hash(), b1.hash);
    }

    #[test]
    fn test_nonce_changes_hash() {
        let mut block = Block::new(1, Hash::ZERO, vec![record_tx("A1")], 2);
        let before = block.compute_hash();
        block.header.nonce += 1;
        assert_ne!(block.compute_hash(), before);
    }

    #[test]
    fn test_transaction_edit_changes_hash() {
        let mut block = Block::new(1, Hash::ZERO, vec![record_tx("A1")], 2);
        assert!(block.verify_hash());

        block.transactions[0].amount = 1_000;
        assert!(!block.verify_hash());
        assert!(!block.verify_merkle_root());
    }

    #[test]
    fn test_transaction_reorder_changes_hash() {
        let mut block = Block::new(1, Hash::ZERO, vec![record_tx("A1"), record_tx("A2")], 2);
        block.transactions.swap(0, 1);
        assert!(!block.verify_hash());
    }

    #[test]
    fn test_empty_block_merkle_root() {
        let block = Block::new(1, Hash::ZERO, vec![], 2);
        assert!(block.verify_merkle_root());
        assert_eq!(block.header.merkle_root, Hash::ZERO);
    }

    #[test]
    fn test_json_shape() {
        let block = Block::genesis();
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["header"]["index"], 0);
        assert_eq!(json["header"]["previousHash"], Hash::ZERO.to_hex());
        assert_eq!(json["hash"], block.hash.to_hex());
        assert!(json["transactions"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_bincode_roundtrip() {
        let block = Block::new(3, Hash::ZERO, vec![record_tx("A9")], 1);
        let encoded = bincode::serialize(&block).unwrap();
        let decoded: Block = bincode::deserialize(&encoded).unwrap();
        assert_eq!(decoded, block);
    }
}

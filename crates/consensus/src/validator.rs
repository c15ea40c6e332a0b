//! Transaction, block and chain validation rules.
//!
//! Validation reports the first rule a block breaks. Callers that only need
//! a yes/no answer use `is_ok()` on the result.

use crate::pow::ProofOfWork;
use herdledger_core::{Block, Hash, Transaction};
use std::collections::HashSet;
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur during validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("transaction {0} signature does not match its contents")]
    InvalidSignature(Uuid),

    #[error("block {index}: stored hash does not match contents")]
    HashMismatch { index: u64 },

    #[error("block {index}: previous hash does not match predecessor")]
    InvalidPrevHash { index: u64 },

    #[error("block index mismatch (expected {expected}, got {got})")]
    InvalidIndex { expected: u64, got: u64 },

    #[error("block {index}: merkle root verification failed")]
    InvalidMerkleRoot { index: u64 },

    #[error("block {index}: hash does not meet difficulty {difficulty}")]
    InsufficientWork { index: u64, difficulty: u32 },

    #[error("block {index}: duplicate transaction {transaction_id}")]
    DuplicateTransaction { index: u64, transaction_id: Uuid },

    #[error("invalid genesis block")]
    InvalidGenesis,
}

pub type Result<T> = std::result::Result<T, ValidationError>;

/// Transaction validator.
pub struct TransactionValidator;

impl TransactionValidator {
    /// Check the integrity signature.
    pub fn validate(tx: &Transaction) -> Result<()> {
        if !tx.verify() {
            return Err(ValidationError::InvalidSignature(tx.transaction_id));
        }
        Ok(())
    }
}

/// Block validator.
pub struct BlockValidator;

impl BlockValidator {
    /// Validate block contents: merkle root, stored hash, unique and
    /// untampered transactions.
    pub fn validate_block_structure(block: &Block) -> Result<()> {
        let index = block.header.index;

        if !block.verify_merkle_root() {
            return Err(ValidationError::InvalidMerkleRoot { index });
        }

        if !block.verify_hash() {
            return Err(ValidationError::HashMismatch { index });
        }

        let mut seen = HashSet::new();
        for tx in &block.transactions {
            if !seen.insert(tx.transaction_id) {
                return Err(ValidationError::DuplicateTransaction {
                    index,
                    transaction_id: tx.transaction_id,
                });
            }
            TransactionValidator::validate(tx)?;
        }

        Ok(())
    }

    /// Validate the block's hash meets the difficulty recorded in its header.
    pub fn validate_proof_of_work(block: &Block) -> Result<()> {
        if !ProofOfWork::verify(block) {
            return Err(ValidationError::InsufficientWork {
                index: block.header.index,
                difficulty: block.header.difficulty,
            });
        }
        Ok(())
    }

    /// Validate block extends the parent correctly.
    pub fn validate_block_extends_parent(
        block: &Block,
        parent_hash: Hash,
        parent_index: u64,
    ) -> Result<()> {
        if block.header.index != parent_index + 1 {
            return Err(ValidationError::InvalidIndex {
                expected: parent_index + 1,
                got: block.header.index,
            });
        }

        if block.header.previous_hash != parent_hash {
            return Err(ValidationError::InvalidPrevHash {
                index: block.header.index,
            });
        }

        Ok(())
    }

    /// Full block validation (structure + work + parent link).
    pub fn validate_full(block: &Block, parent: &Block) -> Result<()> {
        Self::validate_block_structure(block)?;
        Self::validate_proof_of_work(block)?;
        Self::validate_block_extends_parent(block, parent.hash, parent.header.index)?;
        Ok(())
    }
}

/// Whole-chain validator.
pub struct ChainValidator;

impl ChainValidator {
    /// Validate the genesis block.
    pub fn validate_genesis(genesis: &Block) -> Result<()> {
        if !genesis.is_genesis() || !genesis.transactions.is_empty() {
            return Err(ValidationError::InvalidGenesis);
        }
        if !genesis.verify_hash() {
            return Err(ValidationError::HashMismatch { index: 0 });
        }
        Ok(())
    }

    /// Validate every block and every link. Returns the first failure.
    ///
    /// A transaction id may appear at most once across the whole chain.
    pub fn validate_chain(blocks: &[Block]) -> Result<()> {
        let genesis = blocks.first().ok_or(ValidationError::InvalidGenesis)?;
        Self::validate_genesis(genesis)?;

        let mut sealed = HashSet::new();
        for pair in blocks.windows(2) {
            let block = &pair[1];
            BlockValidator::validate_full(block, &pair[0])?;
            for tx in &block.transactions {
                if !sealed.insert(tx.transaction_id) {
                    return Err(ValidationError::DuplicateTransaction {
                        index: block.header.index,
                        transaction_id: tx.transaction_id,
                    });
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use herdledger_core::{AnimalRecord, Payload, SYSTEM_ADDRESS};

    fn record_tx(id: &str) -> Transaction {
        Transaction::transfer(
            "owner1",
            SYSTEM_ADDRESS,
            0,
            Payload::RecordCreated(AnimalRecord::new(id)),
        )
    }

    fn sealed_chain(len: usize) -> Vec<Block> {
        let pow = ProofOfWork::new(1).unwrap();
        let mut chain = vec![Block::genesis()];
        for i in 1..len {
            let parent = chain.last().unwrap();
            let txs = vec![record_tx(&format!("A{}", i)), Transaction::reward("miner1", 100)];
            let block = pow.seal(Block::new(i as u64, parent.hash, txs, 0));
            chain.push(block);
        }
        chain
    }

    #[test]
    fn test_valid_transaction() {
        assert!(TransactionValidator::validate(&record_tx("A1")).is_ok());
    }

    #[test]
    fn test_tampered_transaction_rejected() {
        let mut tx = record_tx("A1");
        tx.amount = 10;
        assert_eq!(
            TransactionValidator::validate(&tx),
            Err(ValidationError::InvalidSignature(tx.transaction_id))
        );
    }

    #[test]
    fn test_block_merkle_root_validation() {
        let block = Block::new(1, Hash::ZERO, vec![record_tx("A1")], 0);
        assert!(BlockValidator::validate_block_structure(&block).is_ok());

        let mut bad_block = block.clone();
        bad_block.header.merkle_root = Hash::ZERO;

        assert_eq!(
            BlockValidator::validate_block_structure(&bad_block),
            Err(ValidationError::InvalidMerkleRoot { index: 1 })
        );
    }

    #[test]
    fn test_block_stored_hash_mismatch() {
        let mut block = Block::new(1, Hash::ZERO, vec![record_tx("A1")], 0);
        block.header.nonce = 99;

        assert_eq!(
            BlockValidator::validate_block_structure(&block),
            Err(ValidationError::HashMismatch { index: 1 })
        );
    }

    #[test]
    fn test_block_duplicate_transaction_rejected() {
        let tx = record_tx("A1");
        let block = Block::new(1, Hash::ZERO, vec![tx.clone(), tx.clone()], 0);

        assert_eq!(
            BlockValidator::validate_block_structure(&block),
            Err(ValidationError::DuplicateTransaction {
                index: 1,
                transaction_id: tx.transaction_id,
            })
        );
    }

    #[test]
    fn test_block_with_resealed_tampered_transaction() {
        // A forger who rebuilds the merkle root and hash still trips the
        // per-transaction signature check.
        let mut tx = record_tx("A1");
        tx.amount = 500;
        let block = Block::new(1, Hash::ZERO, vec![tx.clone()], 0);

        assert_eq!(
            BlockValidator::validate_block_structure(&block),
            Err(ValidationError::InvalidSignature(tx.transaction_id))
        );
    }

    #[test]
    fn test_block_extends_parent() {
        let parent_hash = Hash::from_bytes([0xAA; 32]);
        let block = Block::new(5, parent_hash, vec![], 0);

        assert!(BlockValidator::validate_block_extends_parent(&block, parent_hash, 4).is_ok());

        assert_eq!(
            BlockValidator::validate_block_extends_parent(&block, parent_hash, 5),
            Err(ValidationError::InvalidIndex { expected: 6, got: 5 })
        );

        assert_eq!(
            BlockValidator::validate_block_extends_parent(&block, Hash::ZERO, 4),
            Err(ValidationError::InvalidPrevHash { index: 5 })
        );
    }

    #[test]
    fn test_insufficient_work() {
        // Claims difficulty 64 without having done the work.
        let block = Block::new(1, Hash::ZERO, vec![], 64);
        assert_eq!(
            BlockValidator::validate_proof_of_work(&block),
            Err(ValidationError::InsufficientWork {
                index: 1,
                difficulty: 64,
            })
        );
    }

    #[test]
    fn test_valid_chain() {
        let chain = sealed_chain(4);
        assert!(ChainValidator::validate_chain(&chain).is_ok());
        for i in 1..chain.len() {
            assert_eq!(chain[i].header.previous_hash, chain[i - 1].hash);
        }
    }

    #[test]
    fn test_empty_chain_rejected() {
        assert_eq!(
            ChainValidator::validate_chain(&[]),
            Err(ValidationError::InvalidGenesis)
        );
    }

    #[test]
    fn test_tampered_amount_detected() {
        let mut chain = sealed_chain(3);
        chain[1].transactions[1].amount = 1_000_000;

        assert_eq!(
            ChainValidator::validate_chain(&chain),
            Err(ValidationError::InvalidMerkleRoot { index: 1 })
        );
    }

    #[test]
    fn test_broken_link_detected() {
        let mut chain = sealed_chain(3);
        let pow = ProofOfWork::new(1).unwrap();
        // Re-seal block 2 against a bogus parent so only the link is wrong.
        let orphan = Block::new(2, Hash([7u8; 32]), chain[2].transactions.clone(), 0);
        chain[2] = pow.seal(orphan);

        assert_eq!(
            ChainValidator::validate_chain(&chain),
            Err(ValidationError::InvalidPrevHash { index: 2 })
        );
    }

    #[test]
    fn test_swapped_blocks_detected() {
        let mut chain = sealed_chain(4);
        chain.swap(1, 2);
        assert!(ChainValidator::validate_chain(&chain).is_err());
    }

    #[test]
    fn test_chain_with_transaction_sealed_twice_rejected() {
        let pow = ProofOfWork::new(1).unwrap();
        let tx = record_tx("A1");
        let genesis = Block::genesis();
        let block1 = pow.seal(Block::new(1, genesis.hash, vec![tx.clone()], 0));
        let block2 = pow.seal(Block::new(
            2,
            block1.hash,
            vec![tx.clone(), Transaction::reward("miner1", 100)],
            0,
        ));

        // Each block is sound on its own.
        assert!(BlockValidator::validate_full(&block2, &block1).is_ok());
        assert_eq!(
            ChainValidator::validate_chain(&[genesis, block1, block2]),
            Err(ValidationError::DuplicateTransaction {
                index: 2,
                transaction_id: tx.transaction_id,
            })
        );
    }
}

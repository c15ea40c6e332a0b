//! Proof-of-work sealing.
//!
//! Sealing searches for a nonce whose block hash starts with `difficulty`
//! zero hex characters. There is a single writer, so the work only makes
//! appending a block cost something; it never arbitrates between chains.

use herdledger_core::{Block, Hash};
use thiserror::Error;
use tracing::debug;

/// A digest renders to 64 hex characters, so no nonce can satisfy more.
pub const MAX_DIFFICULTY: u32 = 64;

/// Errors that can occur when configuring consensus.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConsensusError {
    #[error("difficulty {0} exceeds the maximum of 64")]
    DifficultyTooHigh(u32),
}

pub type Result<T> = std::result::Result<T, ConsensusError>;

/// Proof-of-work sealer for a fixed difficulty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProofOfWork {
    difficulty: u32,
}

impl ProofOfWork {
    /// Create a sealer requiring `difficulty` leading zero hex characters.
    pub fn new(difficulty: u32) -> Result<Self> {
        if difficulty > MAX_DIFFICULTY {
            return Err(ConsensusError::DifficultyTooHigh(difficulty));
        }
        Ok(Self { difficulty })
    }

    /// Get the configured difficulty.
    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    /// Check a hash against this sealer's difficulty.
    pub fn meets_target(&self, hash: &Hash) -> bool {
        hash.leading_zero_nibbles() >= self.difficulty
    }

    /// Check that a block's stored hash satisfies the difficulty in its own header.
    pub fn verify(block: &Block) -> bool {
        block.hash.leading_zero_nibbles() >= block.header.difficulty
    }

    /// Seal a block: increment the nonce until the hash meets the target.
    ///
    /// Blocking and CPU-bound. The merkle root is recomputed once up front,
    /// after which only the header is rehashed per attempt. The nonce
    /// search starts from the block's current nonce.
    pub fn seal(&self, mut block: Block) -> Block {
        block.header.difficulty = self.difficulty;
        block.header.merkle_root = Block::transactions_root(&block.transactions);

        let mut attempts: u64 = 0;
        let mut hash = block.header.hash();
        while !self.meets_target(&hash) {
            block.header.nonce = block.header.nonce.wrapping_add(1);
            hash = block.header.hash();
            attempts += 1;
        }
        block.hash = hash;

        debug!(
            index = block.header.index,
            nonce = block.header.nonce,
            attempts,
            hash = %hash,
            "proof of work found"
        );
        block
    }
}

impl Default for ProofOfWork {
    fn default() -> Self {
        Self { difficulty: 2 }
    }
}

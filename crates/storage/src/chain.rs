//! Block storage and chain state management.

use crate::db::{BatchOp, Result, Storage, StorageError};
use herdledger_core::{Block, Hash, Transaction};

/// Keys for chain metadata.
const CHAIN_HEIGHT_KEY: &[u8] = b"chain:height";
const PENDING_KEY: &[u8] = b"pending:transactions";

/// Manages block storage and chain state.
///
/// Blocks are written once and never rewritten; the chain only grows.
#[derive(Clone)]
pub struct ChainStore {
    storage: Storage,
}

impl ChainStore {
    /// Create a new ChainStore over the given storage.
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    /// Get the underlying storage.
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    // =========================================================================
    // Block Storage
    // =========================================================================

    /// Store a block, advance the height and replace the pending queue in
    /// one atomic batch.
    ///
    /// Two index entries are written:
    /// - Primary: `block:index:{index}` → full block data
    /// - Secondary: `block:hash:{hash}` → index
    ///
    /// An empty `pending` slice clears the stored queue.
    fn put_block(&self, block: &Block, pending: &[Transaction]) -> Result<()> {
        let index = block.header.index;
        let pending_op = if pending.is_empty() {
            BatchOp::Remove {
                key: PENDING_KEY.to_vec(),
            }
        } else {
            BatchOp::insert(PENDING_KEY, pending)?
        };
        self.storage.batch(vec![
            BatchOp::insert(Storage::block_index_key(index), block)?,
            BatchOp::insert(Storage::block_hash_key(&block.hash), &index)?,
            BatchOp::insert(CHAIN_HEIGHT_KEY, &index)?,
            pending_op,
        ])
    }

    /// Get a block by its index.
    pub fn get_block_by_index(&self, index: u64) -> Result<Option<Block>> {
        self.storage.get(Storage::block_index_key(index))
    }

    /// Get a block by its hash.
    ///
    /// This performs two lookups:
    /// 1. hash → index (secondary index)
    /// 2. index → block (primary storage)
    pub fn get_block_by_hash(&self, hash: &Hash) -> Result<Option<Block>> {
        let index: Option<u64> = self.storage.get(Storage::block_hash_key(hash))?;
        match index {
            Some(i) => self.get_block_by_index(i),
            None => Ok(None),
        }
    }

    /// Check if a block exists by hash.
    pub fn has_block(&self, hash: &Hash) -> Result<bool> {
        self.storage.contains(Storage::block_hash_key(hash))
    }

    // =========================================================================
    // Chain Head Tracking
    // =========================================================================

    /// Get the index of the latest stored block, if any.
    pub fn get_height(&self) -> Result<Option<u64>> {
        self.storage.get(CHAIN_HEIGHT_KEY)
    }

    /// Get the latest block.
    pub fn get_latest_block(&self) -> Result<Option<Block>> {
        match self.get_height()? {
            Some(height) => self.get_block_by_index(height),
            None => Ok(None),
        }
    }

    /// Check if the chain is initialized (has a genesis block).
    pub fn is_initialized(&self) -> Result<bool> {
        Ok(self.get_height()?.is_some())
    }

    // =========================================================================
    // Genesis Block
    // =========================================================================

    /// Initialize the chain with a genesis block.
    ///
    /// This will fail if:
    /// - The block is not a genesis block
    /// - The chain is already initialized
    pub fn init_genesis(&self, genesis: &Block) -> Result<()> {
        if !genesis.is_genesis() {
            return Err(StorageError::InvalidGenesis(
                "Genesis block must have index 0 and a zero previous hash".into(),
            ));
        }

        if self.is_initialized()? {
            return Err(StorageError::InvalidGenesis(
                "Chain already initialized".into(),
            ));
        }

        self.put_block(genesis, &[])
    }

    // =========================================================================
    // Chain Operations
    // =========================================================================

    /// Append a new block to the chain.
    ///
    /// `pending` is the queue left after sealing `block`. It is written in
    /// the same batch as the block, so a stored queue never holds
    /// transactions that are already on the stored chain.
    ///
    /// This validates that:
    /// - The block index is exactly current height + 1
    /// - The block's previous hash matches the stored head
    ///
    /// Note: This does NOT validate the block hash or proof of work.
    /// Full validation should be done before calling this.
    pub fn append_block(&self, block: &Block, pending: &[Transaction]) -> Result<()> {
        let head = self
            .get_latest_block()?
            .ok_or_else(|| StorageError::InvalidGenesis("Chain not initialized".into()))?;

        if block.header.index != head.header.index + 1 {
            return Err(StorageError::InvalidBlock(format!(
                "Expected block index {}, got {}",
                head.header.index + 1,
                block.header.index
            )));
        }

        if block.header.previous_hash != head.hash {
            return Err(StorageError::InvalidBlock(format!(
                "Block previous hash {} doesn't match chain head {}",
                block.header.previous_hash, head.hash
            )));
        }

        self.put_block(block, pending)
    }

    /// Get blocks in a range [from_index, to_index].
    pub fn get_blocks_range(&self, from_index: u64, to_index: u64) -> Result<Vec<Block>> {
        let mut blocks = Vec::new();
        for index in from_index..=to_index {
            match self.get_block_by_index(index)? {
                Some(block) => blocks.push(block),
                None => break, // Stop at first missing block
            }
        }
        Ok(blocks)
    }

    /// Load the whole chain, genesis first. Empty if uninitialized.
    pub fn load_chain(&self) -> Result<Vec<Block>> {
        match self.get_height()? {
            Some(height) => {
                let blocks = self.get_blocks_range(0, height)?;
                if blocks.len() as u64 != height + 1 {
                    return Err(StorageError::NotFound(format!(
                        "block {} of {}",
                        blocks.len(),
                        height
                    )));
                }
                Ok(blocks)
            }
            None => Ok(Vec::new()),
        }
    }

    // =========================================================================
    // Pending Queue
    // =========================================================================

    /// Replace the stored pending queue.
    pub fn put_pending(&self, transactions: &[Transaction]) -> Result<()> {
        self.storage.put(PENDING_KEY, transactions)
    }

    /// Load the stored pending queue (empty if none).
    pub fn load_pending(&self) -> Result<Vec<Transaction>> {
        Ok(self.storage.get(PENDING_KEY)?.unwrap_or_default())
    }
}

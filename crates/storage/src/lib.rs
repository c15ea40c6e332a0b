//! Durable chain storage for herdledger.
//!
//! The ledger itself lives in memory; this crate gives it an append-only
//! home on disk so the chain survives a restart:
//! - Blocks (by index and by hash)
//! - Chain height
//! - The pending transaction queue
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                     Ledger (chain)                       │
//! └────────────────────────┬────────────────────────────────┘
//!                          │
//! ┌────────────────────────▼────────────────────────────────┐
//! │                   Storage Layer                          │
//! │  ┌───────────────────────┐  ┌────────────────────────┐  │
//! │  │ ChainStore            │  │ Storage (DB)           │  │
//! │  │  - Blocks             │  │  - sled wrapper        │  │
//! │  │  - Height             │  │  - bincode values      │  │
//! │  │  - Genesis            │  │  - key helpers         │  │
//! │  │  - Pending queue      │  │  - atomic batches      │  │
//! │  └───────────────────────┘  └────────────────────────┘  │
//! └────────────────────────┬────────────────────────────────┘
//!                          │
//! ┌────────────────────────▼────────────────────────────────┐
//! │                    sled Database                         │
//! │              (Embedded Key-Value Store)                  │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use herdledger_storage::{ChainStore, Storage};
//! use herdledger_core::Block;
//!
//! let storage = Storage::open("./ledger_data").unwrap();
//! let chain = ChainStore::new(storage);
//! chain.init_genesis(&Block::genesis()).unwrap();
//! let blocks = chain.load_chain().unwrap();
//! assert_eq!(blocks.len(), 1);
//! ```

pub mod chain;
pub mod db;

// Re-export commonly used types
pub use chain::ChainStore;
pub use db::{BatchOp, Result, Storage, StorageError};

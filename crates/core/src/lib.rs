//! Core ledger primitives for herdledger.
//!
//! This crate provides the fundamental types used throughout the ledger:
//! - Hashing (Blake3 digests, canonical encodings)
//! - Domain payloads (animal record lifecycle events)
//! - Transactions with integrity signatures
//! - Blocks, block headers and merkle roots

pub mod block;
pub mod hash;
pub mod merkle;
pub mod payload;
pub mod transaction;

// Re-export commonly used types at the crate root
pub use block::{Block, BlockHeader};
pub use hash::{hash, hash_concat, hash_encoded, Hash, ParseHashError, H256};
pub use merkle::merkle_root;
pub use payload::{
    AnimalMetadata, AnimalRecord, Approval, GeoPoint, Payload, PayloadKind, RecordUpdate,
    Rejection, ReviewStatus,
};
pub use transaction::{Transaction, SYSTEM_ADDRESS};

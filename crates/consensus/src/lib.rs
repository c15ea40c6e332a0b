//! Proof-of-work sealing and chain validation for herdledger.
//!
//! This crate provides:
//! - Proof-of-work sealing (nonce search against a leading-zero difficulty)
//! - Transaction validation (integrity signature)
//! - Block validation (stored hash, merkle root, work, parent links)
//! - Whole-chain validation
//!
//! # Example
//!
//! ```rust
//! use herdledger_consensus::{ChainValidator, ProofOfWork};
//! use herdledger_core::Block;
//!
//! let genesis = Block::genesis();
//! let pow = ProofOfWork::new(1).unwrap();
//!
//! let candidate = Block::new(1, genesis.hash, vec![], pow.difficulty());
//! let sealed = pow.seal(candidate);
//! assert!(pow.meets_target(&sealed.hash));
//!
//! ChainValidator::validate_chain(&[genesis, sealed]).unwrap();
//! ```

pub mod pow;
pub mod validator;

// Re-export commonly used types
pub use pow::{ConsensusError, ProofOfWork, MAX_DIFFICULTY};
pub use validator::{BlockValidator, ChainValidator, TransactionValidator, ValidationError};

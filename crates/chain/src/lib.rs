//! Ledger orchestration and provenance queries for herdledger.
//!
//! This crate brings the lower layers together:
//! - **Ledger**: sealed chain plus pending pool, optionally backed by sled
//! - **Pending pool**: verified transactions waiting for the next block
//! - **Provenance**: animal record history, verification and certificates
//! - **Handle**: shared async access with off-thread sealing
//!
//! # Example
//!
//! ```rust,no_run
//! use herdledger_chain::{Ledger, LedgerConfig, Provenance};
//! use herdledger_core::AnimalRecord;
//!
//! let mut ledger = Ledger::new(LedgerConfig::default()).unwrap();
//!
//! ledger.create_animal_record(AnimalRecord::new("A1").with_breed("Gir"), "owner1");
//! ledger.approve_animal_record("A1", "sup1");
//! ledger.seal_pending_block("miner1").unwrap();
//!
//! assert!(ledger.verify("A1").is_verified());
//! let certificate = ledger.certificate("A1").unwrap();
//! println!("{}", certificate.certificate_hash);
//! ```

pub mod handle;
pub mod ledger;
pub mod mempool;
pub mod provenance;

// Re-export commonly used types
pub use handle::LedgerHandle;
pub use ledger::{Ledger, LedgerConfig, LedgerError, LedgerStats, Result};
pub use mempool::{PendingPool, PendingPoolConfig, PoolError, PoolStats};
pub use provenance::{
    certificate_hash, Certificate, HistoryEntry, HistorySummary, Provenance, ProvenanceError,
    RecordStatus, Verification, VerificationFailure, VerificationResult,
};

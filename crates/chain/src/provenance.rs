//! Animal record provenance on top of the ledger.
//!
//! Record lifecycle events are wrapped as zero-value transactions addressed
//! to [`SYSTEM_ADDRESS`]. History, verification and certificates are derived
//! by scanning sealed blocks; pending transactions are not visible here.

use crate::ledger::Ledger;
use chrono::{DateTime, SecondsFormat, Utc};
use herdledger_core::{
    hash_concat, AnimalRecord, Approval, Hash, Payload, PayloadKind, RecordUpdate, Rejection,
    ReviewStatus, Transaction, SYSTEM_ADDRESS,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use uuid::Uuid;

/// Errors raised by provenance operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProvenanceError {
    #[error("cannot issue certificate for {animal_id}: {reason}")]
    InvalidRecord {
        animal_id: String,
        reason: VerificationFailure,
    },
}

pub type Result<T> = std::result::Result<T, ProvenanceError>;

/// One sealed event concerning an animal.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub block_index: u64,
    pub block_hash: Hash,
    pub transaction_id: Uuid,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: PayloadKind,
    pub data: Payload,
    pub from: Option<String>,
    pub to: String,
}

/// Why a record could not be verified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationFailure {
    #[error("No blockchain record found")]
    NoRecord,
    #[error("Record not approved")]
    NotApproved,
    #[error("Original record not found")]
    RecordMissing,
}

/// Evidence that a record was created and approved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verification {
    /// Id of the earliest `animal_record` transaction.
    pub record_tx_id: Uuid,
    /// Id of the earliest `animal_approval` transaction.
    pub approval_tx_id: Uuid,
    /// Number of sealed events for the animal.
    pub entry_count: usize,
    /// Timestamp of the most recent event.
    pub last_update: DateTime<Utc>,
}

/// Outcome of [`Provenance::verify`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", content = "details", rename_all = "snake_case")]
pub enum VerificationResult {
    Verified(Verification),
    Failed(VerificationFailure),
}

impl VerificationResult {
    pub fn is_verified(&self) -> bool {
        matches!(self, VerificationResult::Verified(_))
    }

    pub fn verification(&self) -> Option<&Verification> {
        match self {
            VerificationResult::Verified(v) => Some(v),
            VerificationResult::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<VerificationFailure> {
        match self {
            VerificationResult::Verified(_) => None,
            VerificationResult::Failed(f) => Some(*f),
        }
    }
}

/// Certificate line for one history entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistorySummary {
    #[serde(rename = "type")]
    pub kind: PayloadKind,
    pub timestamp: DateTime<Utc>,
    pub transaction_id: Uuid,
    pub block_hash: Hash,
}

impl From<&HistoryEntry> for HistorySummary {
    fn from(entry: &HistoryEntry) -> Self {
        Self {
            kind: entry.kind,
            timestamp: entry.timestamp,
            transaction_id: entry.transaction_id,
            block_hash: entry.block_hash,
        }
    }
}

/// Provenance certificate for a verified animal record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Certificate {
    pub animal_id: String,
    pub certificate_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub verification: Verification,
    pub transaction_history: Vec<HistorySummary>,
    pub certificate_hash: Hash,
}

/// Current review state of an animal, from its latest lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    Unknown,
    Pending,
    Approved,
    Rejected,
}

/// Digest binding a certificate to the verified events.
///
/// Hashes `animal_id ++ record_tx_id ++ approval_tx_id ++ last_update`, with
/// ids in hyphenated form and the timestamp as RFC 3339 in milliseconds.
pub fn certificate_hash(animal_id: &str, verification: &Verification) -> Hash {
    let record = verification.record_tx_id.to_string();
    let approval = verification.approval_tx_id.to_string();
    let last_update = verification
        .last_update
        .to_rfc3339_opts(SecondsFormat::Millis, true);

    hash_concat(&[
        animal_id.as_bytes(),
        record.as_bytes(),
        approval.as_bytes(),
        last_update.as_bytes(),
    ])
}

/// Provenance operations over a ledger.
///
/// Builders return the constructed transaction even when the ledger refuses
/// it; callers confirm inclusion through [`Provenance::history`].
pub trait Provenance {
    /// Register a new animal record on behalf of `owner`.
    fn create_animal_record(&mut self, record: AnimalRecord, owner: &str) -> Transaction;

    /// Record field changes to an existing animal.
    fn update_animal_record(
        &mut self,
        animal_id: &str,
        updates: BTreeMap<String, String>,
        updater: &str,
    ) -> Transaction;

    /// Record an approval by `approver`.
    fn approve_animal_record(&mut self, animal_id: &str, approver: &str) -> Transaction;

    /// Record a rejection by `rejector`.
    fn reject_animal_record(&mut self, animal_id: &str, rejector: &str, reason: &str)
        -> Transaction;

    /// Sealed events for an animal, oldest first.
    fn history(&self, animal_id: &str) -> Vec<HistoryEntry>;

    /// Check that the animal has both a record and an approval on chain.
    fn verify(&self, animal_id: &str) -> VerificationResult;

    /// Issue a certificate. Fails unless [`Provenance::verify`] succeeds.
    fn certificate(&self, animal_id: &str) -> Result<Certificate>;

    /// Review state from the latest record, approval or rejection event.
    fn current_status(&self, animal_id: &str) -> RecordStatus;
}

impl Ledger {
    fn submit_provenance(&mut self, actor: &str, data: Payload) -> Transaction {
        let tx = Transaction::transfer(actor, SYSTEM_ADDRESS, 0, data);
        self.submit_transaction(tx.clone());
        tx
    }
}

impl Provenance for Ledger {
    fn create_animal_record(&mut self, mut record: AnimalRecord, owner: &str) -> Transaction {
        if record.recorded_at.is_none() {
            record.recorded_at = Some(Utc::now());
        }
        self.submit_provenance(owner, Payload::RecordCreated(record))
    }

    fn update_animal_record(
        &mut self,
        animal_id: &str,
        updates: BTreeMap<String, String>,
        updater: &str,
    ) -> Transaction {
        let update = RecordUpdate {
            animal_id: animal_id.to_string(),
            updates,
            updater: updater.to_string(),
            timestamp: Utc::now(),
        };
        self.submit_provenance(updater, Payload::RecordUpdated(update))
    }

    fn approve_animal_record(&mut self, animal_id: &str, approver: &str) -> Transaction {
        let approval = Approval {
            animal_id: animal_id.to_string(),
            approver: approver.to_string(),
            status: ReviewStatus::Approved,
            timestamp: Utc::now(),
        };
        self.submit_provenance(approver, Payload::Approved(approval))
    }

    fn reject_animal_record(
        &mut self,
        animal_id: &str,
        rejector: &str,
        reason: &str,
    ) -> Transaction {
        let rejection = Rejection {
            animal_id: animal_id.to_string(),
            rejector: rejector.to_string(),
            reason: reason.to_string(),
            status: ReviewStatus::Rejected,
            timestamp: Utc::now(),
        };
        self.submit_provenance(rejector, Payload::Rejected(rejection))
    }

    fn history(&self, animal_id: &str) -> Vec<HistoryEntry> {
        let mut entries: Vec<HistoryEntry> = self
            .chain()
            .iter()
            .flat_map(|block| {
                block
                    .transactions
                    .iter()
                    .filter(|tx| tx.animal_id() == Some(animal_id))
                    .map(move |tx| HistoryEntry {
                        block_index: block.header.index,
                        block_hash: block.hash,
                        transaction_id: tx.transaction_id,
                        timestamp: tx.timestamp,
                        kind: tx.data.kind(),
                        data: tx.data.clone(),
                        from: tx.from.clone(),
                        to: tx.to.clone(),
                    })
            })
            .collect();

        // Stable: ties keep chain order.
        entries.sort_by_key(|entry| entry.timestamp);
        entries
    }

    fn verify(&self, animal_id: &str) -> VerificationResult {
        let history = self.history(animal_id);
        let Some(last) = history.last() else {
            return VerificationResult::Failed(VerificationFailure::NoRecord);
        };

        let first_of = |kind: PayloadKind| {
            history
                .iter()
                .find(|entry| entry.kind == kind)
                .map(|entry| entry.transaction_id)
        };

        let Some(approval_tx_id) = first_of(PayloadKind::AnimalApproval) else {
            return VerificationResult::Failed(VerificationFailure::NotApproved);
        };
        let Some(record_tx_id) = first_of(PayloadKind::AnimalRecord) else {
            return VerificationResult::Failed(VerificationFailure::RecordMissing);
        };

        VerificationResult::Verified(Verification {
            record_tx_id,
            approval_tx_id,
            entry_count: history.len(),
            last_update: last.timestamp,
        })
    }

    fn certificate(&self, animal_id: &str) -> Result<Certificate> {
        let verification = match self.verify(animal_id) {
            VerificationResult::Verified(v) => v,
            VerificationResult::Failed(reason) => {
                return Err(ProvenanceError::InvalidRecord {
                    animal_id: animal_id.to_string(),
                    reason,
                })
            }
        };

        let transaction_history = self
            .history(animal_id)
            .iter()
            .map(HistorySummary::from)
            .collect();

        Ok(Certificate {
            animal_id: animal_id.to_string(),
            certificate_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            certificate_hash: certificate_hash(animal_id, &verification),
            verification,
            transaction_history,
        })
    }

    fn current_status(&self, animal_id: &str) -> RecordStatus {
        self.history(animal_id)
            .iter()
            .rev()
            .find_map(|entry| match entry.data {
                Payload::RecordCreated(_) => Some(RecordStatus::Pending),
                Payload::Approved(_) => Some(RecordStatus::Approved),
                Payload::Rejected(_) => Some(RecordStatus::Rejected),
                Payload::RecordUpdated(_) | Payload::MiningReward => None,
            })
            .unwrap_or(RecordStatus::Unknown)
    }
}

//! Transaction construction and integrity signatures.
//!
//! The signature is a digest over the sender, recipient, amount, payload and
//! timestamp. It detects tampering but does not prove who created the
//! transaction: no keys are involved.

use crate::hash::{hash_encoded, Hash};
use crate::payload::Payload;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Recipient used by provenance transactions that move no value.
pub const SYSTEM_ADDRESS: &str = "system";

/// A transaction on the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Sender (None for system-originated transactions such as mining rewards).
    pub from: Option<String>,
    /// Recipient.
    pub to: String,
    /// Value transferred.
    pub amount: u64,
    /// Domain event.
    pub data: Payload,
    /// Creation time.
    pub timestamp: DateTime<Utc>,
    /// Unique identifier assigned at creation.
    pub transaction_id: Uuid,
    /// Digest of (from, to, amount, data, timestamp).
    pub signature: Hash,
}

/// Signed fields, in canonical order.
#[derive(Serialize)]
struct SignedFields<'a> {
    from: &'a Option<String>,
    to: &'a str,
    amount: u64,
    data: &'a Payload,
    timestamp: &'a DateTime<Utc>,
}

impl Transaction {
    /// Create a transaction stamped with the current time and a fresh id.
    pub fn create(from: Option<String>, to: impl Into<String>, amount: u64, data: Payload) -> Self {
        Self::create_at(from, to, amount, data, Utc::now())
    }

    /// Create a transaction with an explicit timestamp.
    pub fn create_at(
        from: Option<String>,
        to: impl Into<String>,
        amount: u64,
        data: Payload,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let mut tx = Self {
            from,
            to: to.into(),
            amount,
            data,
            timestamp,
            transaction_id: Uuid::new_v4(),
            signature: Hash::ZERO,
        };
        tx.signature = tx.signing_hash();
        tx
    }

    /// Create a value transfer between two named parties.
    pub fn transfer(from: impl Into<String>, to: impl Into<String>, amount: u64, data: Payload) -> Self {
        Self::create(Some(from.into()), to, amount, data)
    }

    /// Create a mining reward paid by the system to `beneficiary`.
    pub fn reward(beneficiary: impl Into<String>, amount: u64) -> Self {
        Self::create(None, beneficiary, amount, Payload::MiningReward)
    }

    /// Digest of the signed fields.
    pub fn signing_hash(&self) -> Hash {
        hash_encoded(&SignedFields {
            from: &self.from,
            to: &self.to,
            amount: self.amount,
            data: &self.data,
            timestamp: &self.timestamp,
        })
    }

    /// Full transaction digest (including id and signature). Used as a merkle leaf.
    pub fn hash(&self) -> Hash {
        hash_encoded(self)
    }

    /// Check that the stored signature matches the signed fields.
    pub fn verify(&self) -> bool {
        self.signature == self.signing_hash()
    }

    /// Check if the system originated this transaction.
    pub fn is_system(&self) -> bool {
        self.from.is_none()
    }

    /// The animal this transaction concerns, if any.
    pub fn animal_id(&self) -> Option<&str> {
        self.data.animal_id()
    }
}

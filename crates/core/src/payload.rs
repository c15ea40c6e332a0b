//! Domain payloads carried by ledger transactions.
//!
//! Every transaction carries exactly one [`Payload`]. The set is closed so
//! provenance queries can match exhaustively on the event kind.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// GPS position captured with an animal record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// Descriptive attributes captured at registration time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimalMetadata {
    pub age_months: Option<u32>,
    pub gender: Option<String>,
    pub images: Vec<String>,
    pub gps: Option<GeoPoint>,
}

/// Snapshot of an animal record at creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimalRecord {
    pub animal_id: String,
    pub breed: Option<String>,
    pub owner: Option<String>,
    pub location: Option<String>,
    /// When the record was captured by the registry, if known.
    pub recorded_at: Option<DateTime<Utc>>,
    pub metadata: AnimalMetadata,
}

impl AnimalRecord {
    /// Create a record snapshot with only the animal id set.
    pub fn new(animal_id: impl Into<String>) -> Self {
        Self {
            animal_id: animal_id.into(),
            breed: None,
            owner: None,
            location: None,
            recorded_at: None,
            metadata: AnimalMetadata::default(),
        }
    }

    pub fn with_breed(mut self, breed: impl Into<String>) -> Self {
        self.breed = Some(breed.into());
        self
    }

    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

/// Field-level diff applied to an existing record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordUpdate {
    pub animal_id: String,
    /// Field name to new value. Ordered so the canonical encoding is stable.
    pub updates: BTreeMap<String, String>,
    pub updater: String,
    pub timestamp: DateTime<Utc>,
}

/// Outcome of a review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Approved,
    Rejected,
}

/// A reviewer accepted the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Approval {
    pub animal_id: String,
    pub approver: String,
    pub status: ReviewStatus,
    pub timestamp: DateTime<Utc>,
}

/// A reviewer turned the record down.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rejection {
    pub animal_id: String,
    pub rejector: String,
    pub reason: String,
    pub status: ReviewStatus,
    pub timestamp: DateTime<Utc>,
}

/// The event a transaction records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Payload {
    #[serde(rename = "animal_record")]
    RecordCreated(AnimalRecord),
    #[serde(rename = "animal_update")]
    RecordUpdated(RecordUpdate),
    #[serde(rename = "animal_approval")]
    Approved(Approval),
    #[serde(rename = "animal_rejection")]
    Rejected(Rejection),
    #[serde(rename = "mining_reward")]
    MiningReward,
}

/// Discriminator of a [`Payload`], as exposed in query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadKind {
    AnimalRecord,
    AnimalUpdate,
    AnimalApproval,
    AnimalRejection,
    MiningReward,
}

impl PayloadKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayloadKind::AnimalRecord => "animal_record",
            PayloadKind::AnimalUpdate => "animal_update",
            PayloadKind::AnimalApproval => "animal_approval",
            PayloadKind::AnimalRejection => "animal_rejection",
            PayloadKind::MiningReward => "mining_reward",
        }
    }
}

impl fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Payload {
    /// Get the discriminator of this payload.
    pub fn kind(&self) -> PayloadKind {
        match self {
            Payload::RecordCreated(_) => PayloadKind::AnimalRecord,
            Payload::RecordUpdated(_) => PayloadKind::AnimalUpdate,
            Payload::Approved(_) => PayloadKind::AnimalApproval,
            Payload::Rejected(_) => PayloadKind::AnimalRejection,
            Payload::MiningReward => PayloadKind::MiningReward,
        }
    }

    /// The animal this payload concerns, if any.
    pub fn animal_id(&self) -> Option<&str> {
        match self {
            Payload::RecordCreated(record) => Some(&record.animal_id),
            Payload::RecordUpdated(update) => Some(&update.animal_id),
            Payload::Approved(approval) => Some(&approval.animal_id),
            Payload::Rejected(rejection) => Some(&rejection.animal_id),
            Payload::MiningReward => None,
        }
    }
}

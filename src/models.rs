//! Document-store record types.
//!
//! Status and role enums are closed tagged-variant types; they persist as
//! their human-readable camelCase string names (a storage-boundary adapter,
//! never a numeric representation). Fields are intentionally serialized even
//! when `None` so that a merge-upsert can reset a previously set value, e.g.
//! clearing `fuzzyScore` at the start of a new attempt.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Account role, owned by the identity side of the system.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, Default,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum Role {
    /// Regular account; cannot request business verification.
    #[default]
    Customer,
    /// Business account; the only role the pipeline serves.
    Business,
    /// Administrative account resolving `PendingAdmin` reviews.
    Admin,
}

/// Where an account stands in the verification pipeline.
///
/// `NotStarted` is initial. `Accepted` and `Rejected` are terminal for a
/// given attempt; a new request re-enters the machine from any state.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, Default,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum VerificationStatus {
    /// No verification request has run, or the last one was reset.
    #[default]
    NotStarted,
    /// Waiting on the account to prove email ownership.
    PendingEmail,
    /// Waiting on a human admin review.
    PendingAdmin,
    /// The request was rejected.
    Rejected,
    /// The business is verified.
    Accepted,
}

/// The `users/{userId}` record. Created at account creation; mutated only by
/// the verification state machine.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct BusinessProfile {
    /// Document key, mirrored into the record.
    pub user_id: Option<String>,
    /// Self-reported business display name.
    pub business_name: Option<String>,
    /// Account email address.
    pub email: Option<String>,
    /// Claimed business website.
    pub website: Option<String>,
    /// Account role; only `Business` may request verification.
    pub role: Role,
    /// Current position in the verification pipeline.
    pub verification_status: VerificationStatus,
    /// When the account last requested verification.
    pub verification_requested_at: Option<DateTime<Utc>>,
    /// Whether email ownership has been proven.
    pub email_verified: bool,
}

/// The `users/{userId}/businessVerification/{userId}` record: one per
/// account, overwritten on each request.
///
/// `fuzzy_score` reflects only the most recent successful domain-match
/// attempt; a mismatch or input error leaves it unset.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct VerificationAttempt {
    /// How many requests this account has made, including this one.
    pub attempt_number: u32,
    /// Whether this request failed input validation or parsing.
    pub error_occurred: bool,
    /// Snapshot of the profile's `emailVerified` flag at request time.
    pub email_verified: Option<bool>,
    /// Status after this request.
    pub verification_status: VerificationStatus,
    /// Fuzzy score of this request, unset on mismatch or input error.
    pub fuzzy_score: Option<i64>,
    /// When this request was made.
    pub requested_at: Option<DateTime<Utc>>,
    /// When the status last changed.
    pub status_updated_at: Option<DateTime<Utc>>,
}

/// The `emailVerificationTokens/{secret}` record. The secret itself is the
/// document key and never appears inside the record.
///
/// Fields are optional because a stored record missing any of them is
/// treated as incomplete rather than rejected at deserialization time.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct EmailOwnershipToken {
    /// Account the token was issued for.
    pub user_id: Option<String>,
    /// Recipient display name, reused when a replacement is issued.
    pub name: Option<String>,
    /// Email address the token proves ownership of.
    pub email: Option<String>,
    /// Issuance time.
    pub created_at: Option<DateTime<Utc>>,
    /// Expiry time, TTL past issuance.
    pub expires_at: Option<DateTime<Utc>>,
}

impl EmailOwnershipToken {
    /// Stamps `createdAt` now and `expiresAt` at the configured TTL.
    pub fn stamp(&mut self, ttl: chrono::Duration) {
        let now = Utc::now();
        self.created_at = Some(now);
        self.expires_at = Some(now + ttl);
    }
}

/// The decision returned to the caller after a verification request or an
/// email-click, mirrored into the persisted records.
#[derive(Debug, Clone)]
pub struct Decision {
    /// The status after this operation, when the operation reached the
    /// state machine at all.
    pub status: Option<VerificationStatus>,
    /// The computed fuzzy score, when one was computed this operation.
    pub fuzzy_score: Option<i64>,
    /// User-safe message; never carries internal error detail.
    pub message: String,
}

impl Decision {
    /// A decision that carries only a message: the state machine never ran.
    pub fn message_only(message: impl Into<String>) -> Self {
        Decision {
            status: None,
            fuzzy_score: None,
            message: message.into(),
        }
    }
}

//! Pairing code domain models.
//!
//! A parent creates a short numeric code; the child device enters it to link
//! itself to the parent. A code is single-use and valid for five minutes.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Lifetime of a pairing code in seconds.
pub const PAIRING_CODE_TTL_SECS: i64 = 300;

/// Pairing code domain model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairingCode {
    pub code: String,
    pub parent_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub linked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub child_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linked_at: Option<DateTime<Utc>>,
}

/// Reasons a pairing code cannot be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairingCodeRejection {
    Expired,
    AlreadyLinked,
}

impl PairingCode {
    /// Instant at which the code stops being valid.
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.created_at + Duration::seconds(PAIRING_CODE_TTL_SECS)
    }

    /// Whether the code has expired at `now`. Expiry is inclusive.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at()
    }

    /// Checks the code can still be linked at `now`.
    ///
    /// Expiry is reported before linkage so a stale code is never
    /// distinguishable from a used one by timing.
    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), PairingCodeRejection> {
        if self.is_expired(now) {
            return Err(PairingCodeRejection::Expired);
        }
        if self.linked {
            return Err(PairingCodeRejection::AlreadyLinked);
        }
        Ok(())
    }

    /// Seconds left before expiry, zero once expired.
    pub fn remaining_secs(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at() - now).num_seconds().max(0)
    }
}

/// Response after creating a pairing code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePairingCodeResponse {
    pub code: String,
    pub expires_at: DateTime<Utc>,
    pub expires_in_secs: i64,
}

/// Current state of a pairing code, polled by the parent app.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairingCodeStatusResponse {
    pub code: String,
    pub linked: bool,
    pub expired: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub child_id: Option<Uuid>,
    pub expires_at: DateTime<Utc>,
}

impl PairingCodeStatusResponse {
    pub fn from_code(code: &PairingCode, now: DateTime<Utc>) -> Self {
        Self {
            code: code.code.clone(),
            linked: code.linked,
            expired: !code.linked && code.is_expired(now),
            child_id: code.child_id,
            expires_at: code.expires_at(),
        }
    }
}

/// Request from a child device to link itself using a pairing code.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LinkDeviceRequest {
    #[validate(custom(function = "shared::validation::validate_pairing_code"))]
    pub code: String,
    #[validate(
        length(min = 1, max = 100, message = "device_name must be 1-100 characters"),
        custom(function = "shared::validation::validate_not_blank")
    )]
    pub device_name: String,
    #[validate(length(max = 100, message = "device_model must be at most 100 characters"))]
    pub device_model: Option<String>,
    /// The child (or guardian on the device) accepted monitoring consent.
    pub consent_accepted: bool,
}

/// Response to a successful link.
///
/// The device token is returned exactly once and only its hash is stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkDeviceResponse {
    pub parent_id: Uuid,
    pub child_id: Uuid,
    pub device_token: String,
    pub linked_at: DateTime<Utc>,
}

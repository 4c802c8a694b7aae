//! Parent and child identities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// A parent account. The parent id doubles as the push recipient id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parent {
    pub id: Uuid,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
}

/// A child device linked to a parent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Child {
    pub id: Uuid,
    pub parent_id: Uuid,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_model: Option<String>,
    pub linked_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_seen_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revoked_at: Option<DateTime<Utc>>,
}

impl Child {
    pub fn is_active(&self) -> bool {
        self.revoked_at.is_none()
    }
}

/// Request to register a parent.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RegisterParentRequest {
    #[validate(
        length(min = 1, max = 100, message = "display_name must be 1-100 characters"),
        custom(function = "shared::validation::validate_not_blank")
    )]
    pub display_name: String,
}

/// Response after parent registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterParentResponse {
    pub parent_id: Uuid,
    pub display_name: String,
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// Response listing a parent's children.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChildListResponse {
    pub children: Vec<Child>,
}

//! Pairing code entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the pairing_codes table.
#[derive(Debug, Clone, FromRow)]
pub struct PairingCodeEntity {
    pub id: Uuid,
    pub code: String,
    pub parent_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub linked: bool,
    pub child_id: Option<Uuid>,
    pub linked_at: Option<DateTime<Utc>>,
    pub device_name: Option<String>,
    pub device_model: Option<String>,
    pub consent_accepted: bool,
    pub consent_accepted_at: Option<DateTime<Utc>>,
}

impl From<PairingCodeEntity> for domain::models::PairingCode {
    fn from(entity: PairingCodeEntity) -> Self {
        Self {
            code: entity.code,
            parent_id: entity.parent_id,
            created_at: entity.created_at,
            linked: entity.linked,
            child_id: entity.child_id,
            linked_at: entity.linked_at,
        }
    }
}

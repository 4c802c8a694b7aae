//! Parent and child entities (database row mappings).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the parents table.
#[derive(Debug, Clone, FromRow)]
pub struct ParentEntity {
    pub id: Uuid,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
}

impl From<ParentEntity> for domain::models::Parent {
    fn from(entity: ParentEntity) -> Self {
        Self {
            id: entity.id,
            display_name: entity.display_name,
            created_at: entity.created_at,
        }
    }
}

/// Database row mapping for the children table.
#[derive(Debug, Clone, FromRow)]
pub struct ChildEntity {
    pub id: Uuid,
    pub parent_id: Uuid,
    pub display_name: String,
    pub device_model: Option<String>,
    pub device_token_hash: String,
    pub device_token_prefix: String,
    pub linked_at: DateTime<Utc>,
    pub last_seen_at: Option<DateTime<Utc>>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl From<ChildEntity> for domain::models::Child {
    fn from(entity: ChildEntity) -> Self {
        Self {
            id: entity.id,
            parent_id: entity.parent_id,
            display_name: entity.display_name,
            device_model: entity.device_model,
            linked_at: entity.linked_at,
            last_seen_at: entity.last_seen_at,
            revoked_at: entity.revoked_at,
        }
    }
}

//! Parent and child repositories.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::{ChildEntity, ParentEntity};
use crate::metrics::QueryTimer;

const CHILD_COLUMNS: &str = "id, parent_id, display_name, device_model, device_token_hash, \
     device_token_prefix, linked_at, last_seen_at, revoked_at";

/// Repository for parent accounts.
#[derive(Clone)]
pub struct ParentRepository {
    pool: PgPool,
}

impl ParentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a parent account.
    pub async fn create(&self, display_name: &str) -> Result<ParentEntity, sqlx::Error> {
        let timer = QueryTimer::new("create_parent");
        let result = sqlx::query_as::<_, ParentEntity>(
            r#"
            INSERT INTO parents (display_name)
            VALUES ($1)
            RETURNING id, display_name, created_at
            "#,
        )
        .bind(display_name)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Find a parent by ID.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<ParentEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_parent_by_id");
        let result = sqlx::query_as::<_, ParentEntity>(
            r#"
            SELECT id, display_name, created_at
            FROM parents
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }
}

/// Repository for linked child devices.
#[derive(Clone)]
pub struct ChildRepository {
    pool: PgPool,
}

impl ChildRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find an active child by the lookup prefix of its device token.
    ///
    /// The caller compares the full token hash.
    pub async fn find_active_by_token_prefix(
        &self,
        prefix: &str,
    ) -> Result<Vec<ChildEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_child_by_token_prefix");
        let result = sqlx::query_as::<_, ChildEntity>(&format!(
            "SELECT {} FROM children WHERE device_token_prefix = $1 AND revoked_at IS NULL",
            CHILD_COLUMNS
        ))
        .bind(prefix)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Find an active child owned by `parent_id`.
    pub async fn find_for_parent(
        &self,
        parent_id: Uuid,
        child_id: Uuid,
    ) -> Result<Option<ChildEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_child_for_parent");
        let result = sqlx::query_as::<_, ChildEntity>(&format!(
            "SELECT {} FROM children WHERE id = $1 AND parent_id = $2 AND revoked_at IS NULL",
            CHILD_COLUMNS
        ))
        .bind(child_id)
        .bind(parent_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// List a parent's active children, most recently linked first.
    pub async fn list_for_parent(&self, parent_id: Uuid) -> Result<Vec<ChildEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_children_for_parent");
        let result = sqlx::query_as::<_, ChildEntity>(&format!(
            "SELECT {} FROM children WHERE parent_id = $1 AND revoked_at IS NULL ORDER BY linked_at DESC",
            CHILD_COLUMNS
        ))
        .bind(parent_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Update last_seen_at.
    pub async fn touch_last_seen(&self, child_id: Uuid, at: DateTime<Utc>) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE children
            SET last_seen_at = $2
            WHERE id = $1 AND revoked_at IS NULL
            "#,
        )
        .bind(child_id)
        .bind(at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Revoke a child device (soft delete). Its device token stops working.
    pub async fn revoke(&self, parent_id: Uuid, child_id: Uuid) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("revoke_child");
        let result = sqlx::query(
            r#"
            UPDATE children
            SET revoked_at = NOW()
            WHERE id = $1 AND parent_id = $2 AND revoked_at IS NULL
            "#,
        )
        .bind(child_id)
        .bind(parent_id)
        .execute(&self.pool)
        .await?;
        timer.record();

        Ok(result.rows_affected() > 0)
    }
}

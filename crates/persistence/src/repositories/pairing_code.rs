//! Pairing code repository.
//!
//! Linking is a single conditional update inside a transaction: the code row
//! only transitions to linked while it is unlinked and unexpired, and the
//! child record is created in the same transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::models::PAIRING_CODE_TTL_SECS;
use domain::services::pairing::{InsertOutcome, PairingCodeStore, PairingError};
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use crate::entities::{ChildEntity, PairingCodeEntity};
use crate::metrics::QueryTimer;

const PAIRING_COLUMNS: &str = "id, code, parent_id, created_at, linked, child_id, linked_at, \
     device_name, device_model, consent_accepted, consent_accepted_at";

/// Input for linking a child device.
#[derive(Debug, Clone)]
pub struct LinkDeviceInput {
    pub code: String,
    pub device_name: String,
    pub device_model: Option<String>,
    pub consent_accepted: bool,
    pub device_token_hash: String,
    pub device_token_prefix: String,
}

/// Result of a link attempt.
#[derive(Debug)]
pub enum LinkOutcome {
    Linked {
        code: PairingCodeEntity,
        child: ChildEntity,
    },
    /// The code was missing, expired or already linked. Carries the current
    /// row, if any, so the caller can say which.
    Rejected(Option<PairingCodeEntity>),
}

/// Repository for pairing code database operations.
#[derive(Clone)]
pub struct PairingCodeRepository {
    pool: PgPool,
}

impl PairingCodeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a code by its value.
    pub async fn find_by_code(&self, code: &str) -> Result<Option<PairingCodeEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_pairing_code");
        let result = sqlx::query_as::<_, PairingCodeEntity>(&format!(
            "SELECT {} FROM pairing_codes WHERE code = $1",
            PAIRING_COLUMNS
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Find a code created by `parent_id`.
    pub async fn find_for_parent(
        &self,
        parent_id: Uuid,
        code: &str,
    ) -> Result<Option<PairingCodeEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_pairing_code_for_parent");
        let result = sqlx::query_as::<_, PairingCodeEntity>(&format!(
            "SELECT {} FROM pairing_codes WHERE code = $1 AND parent_id = $2",
            PAIRING_COLUMNS
        ))
        .bind(code)
        .bind(parent_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Link a child device using a code.
    pub async fn link_device(&self, input: LinkDeviceInput) -> Result<LinkOutcome, sqlx::Error> {
        let timer = QueryTimer::new("link_pairing_code");
        let mut tx = self.pool.begin().await?;

        let claimed = sqlx::query_as::<_, PairingCodeEntity>(&format!(
            r#"
            UPDATE pairing_codes
            SET linked = TRUE,
                linked_at = NOW(),
                device_name = $2,
                device_model = $3,
                consent_accepted = $4,
                consent_accepted_at = CASE WHEN $4 THEN NOW() ELSE NULL END
            WHERE code = $1
              AND linked = FALSE
              AND created_at > NOW() - make_interval(secs => $5)
            RETURNING {}
            "#,
            PAIRING_COLUMNS
        ))
        .bind(&input.code)
        .bind(&input.device_name)
        .bind(&input.device_model)
        .bind(input.consent_accepted)
        .bind(PAIRING_CODE_TTL_SECS as f64)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(mut code) = claimed else {
            tx.rollback().await?;
            timer.record();
            debug!("Pairing code not claimable, loading current state");
            let current = self.find_by_code(&input.code).await?;
            return Ok(LinkOutcome::Rejected(current));
        };

        let child = sqlx::query_as::<_, ChildEntity>(
            r#"
            INSERT INTO children (parent_id, display_name, device_model, device_token_hash, device_token_prefix)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, parent_id, display_name, device_model, device_token_hash,
                      device_token_prefix, linked_at, last_seen_at, revoked_at
            "#,
        )
        .bind(code.parent_id)
        .bind(&input.device_name)
        .bind(&input.device_model)
        .bind(&input.device_token_hash)
        .bind(&input.device_token_prefix)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE pairing_codes SET child_id = $2 WHERE id = $1")
            .bind(code.id)
            .bind(child.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        timer.record();

        code.child_id = Some(child.id);
        Ok(LinkOutcome::Linked { code, child })
    }

    /// Delete unlinked codes past expiry and linked codes older than the retention window.
    pub async fn delete_stale(&self, linked_retention_days: i32) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::new("delete_stale_pairing_codes");
        let result = sqlx::query(
            r#"
            DELETE FROM pairing_codes
            WHERE (linked = FALSE AND created_at <= NOW() - make_interval(secs => $1))
               OR (linked = TRUE AND linked_at < NOW() - make_interval(days => $2))
            "#,
        )
        .bind(PAIRING_CODE_TTL_SECS as f64)
        .bind(linked_retention_days)
        .execute(&self.pool)
        .await?;
        timer.record();

        Ok(result.rows_affected())
    }
}

/// Maps a unique violation on insert to a retryable conflict.
fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}

#[async_trait]
impl PairingCodeStore for PairingCodeRepository {
    async fn code_exists(&self, code: &str) -> Result<bool, PairingError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM pairing_codes WHERE code = $1)")
                .bind(code)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| PairingError::Store(e.to_string()))?;
        Ok(exists)
    }

    async fn insert_code(
        &self,
        code: &str,
        parent_id: Uuid,
        created_at: DateTime<Utc>,
    ) -> Result<InsertOutcome, PairingError> {
        let timer = QueryTimer::new("insert_pairing_code");
        let result = sqlx::query_as::<_, PairingCodeEntity>(&format!(
            r#"
            INSERT INTO pairing_codes (code, parent_id, created_at)
            VALUES ($1, $2, $3)
            RETURNING {}
            "#,
            PAIRING_COLUMNS
        ))
        .bind(code)
        .bind(parent_id)
        .bind(created_at)
        .fetch_one(&self.pool)
        .await;
        timer.record();

        match result {
            Ok(entity) => Ok(InsertOutcome::Inserted(entity.into())),
            Err(e) if is_unique_violation(&e) => Ok(InsertOutcome::Conflict),
            Err(e) => Err(PairingError::Store(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_database_error_is_not_unique_violation() {
        assert!(!is_unique_violation(&sqlx::Error::RowNotFound));
        assert!(!is_unique_violation(&sqlx::Error::PoolTimedOut));
    }
}

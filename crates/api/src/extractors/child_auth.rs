//! Child device token extractor.
//!
//! Devices send the opaque token they received at linking in
//! `X-Device-Token`. Only a SHA-256 hash and an 8 character lookup prefix
//! are stored.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use chrono::Utc;
use persistence::entities::ChildEntity;
use persistence::repositories::ChildRepository;
use shared::crypto::{extract_token_prefix, sha256_hex};
use sqlx::PgPool;
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;

pub const DEVICE_TOKEN_HEADER: &str = "X-Device-Token";

/// Authenticated, non-revoked child device.
#[derive(Debug, Clone)]
pub struct ChildAuth {
    pub child_id: Uuid,
    pub parent_id: Uuid,
    pub display_name: String,
}

impl ChildAuth {
    /// Resolves a device token to its child.
    pub async fn validate(pool: &PgPool, token: &str) -> Result<Self, ApiError> {
        let invalid = || ApiError::Unauthorized("Invalid or revoked device token".to_string());

        let prefix = extract_token_prefix(token).ok_or_else(invalid)?;
        let token_hash = sha256_hex(token);

        let repo = ChildRepository::new(pool.clone());
        let candidates = repo.find_active_by_token_prefix(prefix).await.map_err(|e| {
            tracing::error!("Database error during device token lookup: {}", e);
            ApiError::Internal("Authentication service unavailable".to_string())
        })?;

        let child = find_matching_hash(candidates, &token_hash).ok_or_else(invalid)?;

        // last_seen_at is informational, never fail the request on it
        let pool = pool.clone();
        let child_id = child.id;
        tokio::spawn(async move {
            let repo = ChildRepository::new(pool);
            if let Err(e) = repo.touch_last_seen(child_id, Utc::now()).await {
                tracing::warn!(child_id = %child_id, "Failed to update last_seen_at: {}", e);
            }
        });

        Ok(Self {
            child_id: child.id,
            parent_id: child.parent_id,
            display_name: child.display_name,
        })
    }
}

fn find_matching_hash(candidates: Vec<ChildEntity>, token_hash: &str) -> Option<ChildEntity> {
    candidates
        .into_iter()
        .find(|child| child.device_token_hash == token_hash)
}

#[async_trait]
impl FromRequestParts<AppState> for ChildAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(DEVICE_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                ApiError::Unauthorized(format!("Missing {} header", DEVICE_TOKEN_HEADER))
            })?;

        let auth = Self::validate(&state.pool, token.trim()).await?;
        tracing::Span::current().record("child_id", tracing::field::display(auth.child_id));
        Ok(auth)
    }
}

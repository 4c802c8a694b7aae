//! Listing and revoking linked child devices.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use domain::models::child::ChildListResponse;
use persistence::repositories::ChildRepository;
use tracing::info;
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::ParentAuth;

/// GET /api/v1/children
pub async fn list_children(
    State(state): State<AppState>,
    parent: ParentAuth,
) -> Result<Json<ChildListResponse>, ApiError> {
    let repo = ChildRepository::new(state.pool.clone());
    let children = repo
        .list_for_parent(parent.parent_id)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

    Ok(Json(ChildListResponse { children }))
}

/// Unlink a child. Its device token stops working immediately.
///
/// DELETE /api/v1/children/:child_id
pub async fn revoke_child(
    State(state): State<AppState>,
    Path(child_id): Path<Uuid>,
    parent: ParentAuth,
) -> Result<StatusCode, ApiError> {
    let repo = ChildRepository::new(state.pool.clone());
    if !repo.revoke(parent.parent_id, child_id).await? {
        return Err(ApiError::NotFound("Child not found".to_string()));
    }

    info!(parent_id = %parent.parent_id, child_id = %child_id, "Child device revoked");
    Ok(StatusCode::NO_CONTENT)
}

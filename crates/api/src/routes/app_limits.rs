//! Daily time limit routes.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use domain::models::app_limit::{AppLimitListResponse, SetAppLimitRequest};
use domain::models::AppLimit;
use persistence::repositories::AppLimitRepository;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::ParentAuth;
use crate::routes::{check_package_path, load_owned_child};

/// GET /api/v1/children/:child_id/app-limits
pub async fn list_limits(
    State(state): State<AppState>,
    Path(child_id): Path<Uuid>,
    parent: ParentAuth,
) -> Result<Json<AppLimitListResponse>, ApiError> {
    load_owned_child(&state, parent.parent_id, child_id).await?;

    let limits = AppLimitRepository::new(state.pool.clone())
        .list_for_child(child_id)
        .await?
        .into_iter()
        .map(AppLimit::from)
        .collect();

    Ok(Json(AppLimitListResponse { child_id, limits }))
}

/// Set the daily limit for one app. Zero means unlimited.
///
/// PUT /api/v1/children/:child_id/app-limits/:package_name
pub async fn set_limit(
    State(state): State<AppState>,
    Path((child_id, package_name)): Path<(Uuid, String)>,
    parent: ParentAuth,
    Json(request): Json<SetAppLimitRequest>,
) -> Result<Json<AppLimit>, ApiError> {
    check_package_path(&package_name)?;
    request.validate()?;
    load_owned_child(&state, parent.parent_id, child_id).await?;

    let limit = AppLimitRepository::new(state.pool.clone())
        .upsert(child_id, &package_name, request.daily_limit_minutes)
        .await?;

    info!(
        child_id = %child_id,
        package_name = %package_name,
        daily_limit_minutes = request.daily_limit_minutes,
        "App limit set"
    );

    Ok(Json(limit.into()))
}

/// DELETE /api/v1/children/:child_id/app-limits/:package_name
pub async fn delete_limit(
    State(state): State<AppState>,
    Path((child_id, package_name)): Path<(Uuid, String)>,
    parent: ParentAuth,
) -> Result<StatusCode, ApiError> {
    check_package_path(&package_name)?;
    load_owned_child(&state, parent.parent_id, child_id).await?;

    let deleted = AppLimitRepository::new(state.pool.clone())
        .delete(child_id, &package_name)
        .await?;

    if !deleted {
        return Err(ApiError::NotFound("App limit not found".to_string()));
    }

    info!(child_id = %child_id, package_name = %package_name, "App limit removed");
    Ok(StatusCode::NO_CONTENT)
}

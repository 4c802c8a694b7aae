//! Block flag routes.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use domain::models::block::{BlockListResponse, SetBlockRequest};
use domain::models::usage::DailyUsageQuery;
use domain::models::{AppStatus, BlockFlag};
use persistence::repositories::BlockFlagRepository;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::{ChildAuth, ParentAuth};
use crate::routes::{check_package_path, load_owned_child};

/// List block flags for a child.
///
/// GET /api/v1/children/:child_id/blocks
pub async fn list_blocks(
    State(state): State<AppState>,
    Path(child_id): Path<Uuid>,
    parent: ParentAuth,
) -> Result<Json<BlockListResponse>, ApiError> {
    load_owned_child(&state, parent.parent_id, child_id).await?;

    let blocks = BlockFlagRepository::new(state.pool.clone())
        .list_for_child(child_id)
        .await?
        .into_iter()
        .map(BlockFlag::from)
        .collect();

    Ok(Json(BlockListResponse { child_id, blocks }))
}

/// Block or unblock one app.
///
/// PUT /api/v1/children/:child_id/blocks/:package_name
pub async fn set_block(
    State(state): State<AppState>,
    Path((child_id, package_name)): Path<(Uuid, String)>,
    parent: ParentAuth,
    Json(request): Json<SetBlockRequest>,
) -> Result<Json<BlockFlag>, ApiError> {
    check_package_path(&package_name)?;
    request.validate()?;
    load_owned_child(&state, parent.parent_id, child_id).await?;

    let flag = BlockFlagRepository::new(state.pool.clone())
        .upsert(
            child_id,
            &package_name,
            request.app_name.as_deref(),
            request.blocked,
        )
        .await?;

    info!(
        child_id = %child_id,
        package_name = %package_name,
        blocked = request.blocked,
        "Block flag updated"
    );

    Ok(Json(flag.into()))
}

/// Block flag, daily limit and usage so far for one app.
///
/// Missing flags read as not blocked and missing limits as unlimited.
/// The device passes its local date; without one, the UTC date is used.
///
/// GET /api/v1/child/apps/:package_name/status
pub async fn child_app_status(
    State(state): State<AppState>,
    Path(package_name): Path<String>,
    Query(query): Query<DailyUsageQuery>,
    child: ChildAuth,
) -> Result<Json<AppStatus>, ApiError> {
    check_package_path(&package_name)?;
    let date = query.date.unwrap_or_else(|| Utc::now().date_naive());

    let status = BlockFlagRepository::new(state.pool.clone())
        .app_status(child.child_id, &package_name, date)
        .await?;

    Ok(Json(status.into()))
}

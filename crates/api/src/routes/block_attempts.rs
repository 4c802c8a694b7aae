//! Block attempt routes.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use domain::models::block_attempt::{
    BlockAttemptListResponse, BlockAttemptQuery, RecordBlockAttemptRequest,
};
use domain::models::BlockAttemptLog;
use domain::services::{BlockedAppAttemptPayload, NotificationType};
use persistence::repositories::BlockAttemptRepository;
use tracing::{info, Instrument};
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::{ChildAuth, ParentAuth};
use crate::middleware::metrics::{record_block_attempt, record_notification};
use crate::routes::load_owned_child;
use crate::routes::usage::resolve_range;

/// GET /api/v1/children/:child_id/block-attempts?from&to
pub async fn list_attempts(
    State(state): State<AppState>,
    Path(child_id): Path<Uuid>,
    Query(query): Query<BlockAttemptQuery>,
    parent: ParentAuth,
) -> Result<Json<BlockAttemptListResponse>, ApiError> {
    let (from, to) = resolve_range(query.from, query.to, Utc::now().date_naive())?;
    load_owned_child(&state, parent.parent_id, child_id).await?;

    let logs = BlockAttemptRepository::new(state.pool.clone())
        .list_for_child(child_id, from, to)
        .await?
        .into_iter()
        .map(BlockAttemptLog::from)
        .collect();

    Ok(Json(BlockAttemptListResponse::new(child_id, logs)))
}

/// Record that the child tried to open a blocked app and notify the parent.
///
/// The push runs in the background; its outcome never affects the response.
///
/// POST /api/v1/child/block-attempts
pub async fn record_attempt(
    State(state): State<AppState>,
    child: ChildAuth,
    Json(request): Json<RecordBlockAttemptRequest>,
) -> Result<Json<BlockAttemptLog>, ApiError> {
    request.validate()?;

    let log: BlockAttemptLog = BlockAttemptRepository::new(state.pool.clone())
        .record_attempt(
            child.child_id,
            &request.package_name,
            request.app_name.as_deref(),
            request.attempt_date(),
            &request.attempt_time(),
        )
        .await?
        .into();

    record_block_attempt();
    info!(
        child_id = %child.child_id,
        package_name = %log.package_name,
        attempt_count = log.attempt_count,
        reason = request.reason.as_deref().unwrap_or("unspecified"),
        "Block attempt recorded"
    );

    let payload = BlockedAppAttemptPayload {
        notification_type: NotificationType::BlockedAppAttempt,
        child_id: child.child_id,
        child_name: child.display_name.clone(),
        package_name: log.package_name.clone(),
        app_name: log.app_name.clone(),
        attempt_count: log.attempt_count,
        occurred_at: request.occurred_at,
    };
    let notifier = state.notifier.clone();
    let parent_id = child.parent_id;
    tokio::spawn(
        async move {
            let result = notifier.send_blocked_app_attempt(parent_id, payload).await;
            record_notification("blocked_app_attempt", result.label());
        }
        .in_current_span(),
    );

    Ok(Json(log))
}

//! Tamper alerts from child devices.

use axum::{extract::State, Json};
use domain::models::alert::{TamperAlertRequest, TamperAlertResponse};
use domain::services::{NotificationResult, NotificationType, TamperAlertPayload};
use tracing::warn;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::ChildAuth;
use crate::middleware::metrics::{record_notification, record_tamper_alert};

/// Forward a tamper alert to the parent.
///
/// The push is awaited so the device learns whether the parent was reached;
/// a failed push still answers 200.
///
/// POST /api/v1/child/alerts
pub async fn tamper_alert(
    State(state): State<AppState>,
    child: ChildAuth,
    Json(request): Json<TamperAlertRequest>,
) -> Result<Json<TamperAlertResponse>, ApiError> {
    request.validate()?;

    record_tamper_alert(request.kind.as_str());
    warn!(
        child_id = %child.child_id,
        kind = %request.kind,
        "Tamper alert raised"
    );

    let payload = TamperAlertPayload {
        notification_type: NotificationType::TamperAlert,
        child_id: child.child_id,
        child_name: child.display_name,
        kind: request.kind,
        detail: request.detail,
        occurred_at: request.occurred_at,
    };

    let result = state
        .notifier
        .send_tamper_alert(child.parent_id, payload)
        .await;
    record_notification("tamper_alert", result.label());

    Ok(Json(TamperAlertResponse {
        notified: result == NotificationResult::Sent,
    }))
}

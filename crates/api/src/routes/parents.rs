//! Parent registration.

use axum::{extract::State, http::StatusCode, Json};
use domain::models::child::{RegisterParentRequest, RegisterParentResponse};
use persistence::repositories::ParentRepository;
use tracing::info;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::metrics::record_parent_registered;

/// Register a parent and issue an access token.
///
/// POST /api/v1/parents
pub async fn register_parent(
    State(state): State<AppState>,
    Json(request): Json<RegisterParentRequest>,
) -> Result<(StatusCode, Json<RegisterParentResponse>), ApiError> {
    request.validate()?;

    let repo = ParentRepository::new(state.pool.clone());
    let parent = repo.create(request.display_name.trim()).await?;

    let (access_token, jti) = state.jwt.issue_parent_token(parent.id)?;
    record_parent_registered();

    info!(parent_id = %parent.id, jti = %jti, "Parent registered");

    Ok((
        StatusCode::CREATED,
        Json(RegisterParentResponse {
            parent_id: parent.id,
            display_name: parent.display_name,
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: state.jwt.access_token_expiry_secs,
        }),
    ))
}

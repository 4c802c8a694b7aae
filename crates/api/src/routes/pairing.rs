//! Pairing code lifecycle: create, inspect and link.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use domain::models::pairing_code::{
    CreatePairingCodeResponse, LinkDeviceRequest, LinkDeviceResponse, PairingCodeStatusResponse,
};
use domain::models::PairingCode;
use domain::services::pairing::validate_for_link;
use domain::services::{PairingError, PairingService};
use persistence::repositories::{LinkDeviceInput, LinkOutcome, PairingCodeRepository};
use shared::crypto::{extract_token_prefix, generate_device_token, sha256_hex};
use tracing::{info, warn};
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::ParentAuth;
use crate::middleware::metrics::{record_pairing_code_created, record_pairing_link};
use crate::routes::field_error;

/// Issue a fresh six digit code valid for five minutes.
///
/// POST /api/v1/pairing-codes
pub async fn create_pairing_code(
    State(state): State<AppState>,
    parent: ParentAuth,
) -> Result<(StatusCode, Json<CreatePairingCodeResponse>), ApiError> {
    let service = PairingService::new(PairingCodeRepository::new(state.pool.clone()));
    let code = service.create_code(parent.parent_id).await?;
    record_pairing_code_created();

    info!(parent_id = %parent.parent_id, "Pairing code created");

    let now = Utc::now();
    Ok((
        StatusCode::CREATED,
        Json(CreatePairingCodeResponse {
            expires_at: code.expires_at(),
            expires_in_secs: code.remaining_secs(now),
            code: code.code,
        }),
    ))
}

/// Lets the parent UI poll whether its code was used.
///
/// GET /api/v1/pairing-codes/:code
pub async fn get_pairing_code(
    State(state): State<AppState>,
    Path(code): Path<String>,
    parent: ParentAuth,
) -> Result<Json<PairingCodeStatusResponse>, ApiError> {
    shared::validation::validate_pairing_code(&code).map_err(|e| field_error("code", e))?;

    let repo = PairingCodeRepository::new(state.pool.clone());
    let entity = repo
        .find_for_parent(parent.parent_id, &code)
        .await?
        .ok_or_else(|| ApiError::from(PairingError::NotFound))?;

    let code: PairingCode = entity.into();
    Ok(Json(PairingCodeStatusResponse::from_code(&code, Utc::now())))
}

/// Link the calling device to the parent who issued the code.
///
/// POST /api/v1/pairing-codes/link
pub async fn link_device(
    State(state): State<AppState>,
    Json(request): Json<LinkDeviceRequest>,
) -> Result<(StatusCode, Json<LinkDeviceResponse>), ApiError> {
    request.validate()?;

    if !request.consent_accepted {
        return Err(ApiError::Validation(
            "Monitoring consent must be accepted before linking".to_string(),
        ));
    }

    let device_token = generate_device_token();
    let device_token_prefix = extract_token_prefix(&device_token)
        .ok_or_else(|| ApiError::Internal("Generated device token has no prefix".to_string()))?
        .to_string();

    let repo = PairingCodeRepository::new(state.pool.clone());
    let outcome = repo
        .link_device(LinkDeviceInput {
            code: request.code.clone(),
            device_name: request.device_name.trim().to_string(),
            device_model: request.device_model.clone(),
            consent_accepted: request.consent_accepted,
            device_token_hash: sha256_hex(&device_token),
            device_token_prefix,
        })
        .await?;

    match outcome {
        LinkOutcome::Linked { code, child } => {
            record_pairing_link("linked");
            info!(
                parent_id = %code.parent_id,
                child_id = %child.id,
                "Child device linked"
            );

            Ok((
                StatusCode::CREATED,
                Json(LinkDeviceResponse {
                    parent_id: child.parent_id,
                    child_id: child.id,
                    device_token,
                    linked_at: child.linked_at,
                }),
            ))
        }
        LinkOutcome::Rejected(current) => {
            let current: Option<PairingCode> = current.map(Into::into);
            let err = rejection_reason(current.as_ref());
            record_pairing_link(outcome_label(&err));
            warn!(reason = %err, "Pairing code rejected");
            Err(err.into())
        }
    }
}

/// Explains why the database refused to claim a code.
///
/// The claim uses the database clock, so a code that looks valid to the API
/// clock at the boundary is still reported as expired.
fn rejection_reason(current: Option<&PairingCode>) -> PairingError {
    match validate_for_link(current, Utc::now()) {
        Err(err) => err,
        Ok(()) => PairingError::Expired,
    }
}

fn outcome_label(err: &PairingError) -> &'static str {
    match err {
        PairingError::NotFound => "not_found",
        PairingError::Expired => "expired",
        PairingError::AlreadyLinked => "already_linked",
        PairingError::ExhaustedAttempts(_) | PairingError::Store(_) => "error",
    }
}

//! HTTP route handlers.

pub mod alerts;
pub mod app_limits;
pub mod block_attempts;
pub mod blocks;
pub mod children;
pub mod health;
pub mod pairing;
pub mod parents;
pub mod schedule_rules;
pub mod usage;

use persistence::entities::ChildEntity;
use persistence::repositories::ChildRepository;
use uuid::Uuid;
use validator::ValidationError;

use crate::app::AppState;
use crate::error::{ApiError, ValidationDetail};

/// Loads an active child owned by the authenticated parent.
///
/// Unknown, revoked and foreign children all read as not found.
pub(crate) async fn load_owned_child(
    state: &AppState,
    parent_id: Uuid,
    child_id: Uuid,
) -> Result<ChildEntity, ApiError> {
    ChildRepository::new(state.pool.clone())
        .find_for_parent(parent_id, child_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Child not found".to_string()))
}

/// Turns a single-field validation failure into an API error.
pub(crate) fn field_error(field: &str, err: ValidationError) -> ApiError {
    let message = err
        .message
        .map(|m| m.to_string())
        .unwrap_or_else(|| err.code.to_string());
    ApiError::InvalidFields {
        message: message.clone(),
        details: vec![ValidationDetail {
            field: field.to_string(),
            message,
        }],
    }
}

/// Validates a package name taken from the URL path.
pub(crate) fn check_package_path(package_name: &str) -> Result<(), ApiError> {
    shared::validation::validate_package_name(package_name)
        .map_err(|e| field_error("package_name", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_package_path() {
        assert!(check_package_path("com.example.game").is_ok());
        match check_package_path("not a package") {
            Err(ApiError::InvalidFields { details, .. }) => {
                assert_eq!(details[0].field, "package_name");
            }
            other => panic!("Expected InvalidFields, got {:?}", other),
        }
    }
}

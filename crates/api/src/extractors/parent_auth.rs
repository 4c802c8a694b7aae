//! Parent access token extractor.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use shared::jwt::JwtConfig;
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;

/// Authenticated parent, taken from `Authorization: Bearer <jwt>`.
#[derive(Debug, Clone)]
pub struct ParentAuth {
    pub parent_id: Uuid,
    /// JWT ID, logged for correlating sessions.
    pub jti: String,
}

impl ParentAuth {
    /// Validates a bearer header value.
    pub fn from_header(jwt: &JwtConfig, header: Option<&str>) -> Result<Self, ApiError> {
        let header = header
            .ok_or_else(|| ApiError::Unauthorized("Missing Authorization header".to_string()))?;

        let token = header.strip_prefix("Bearer ").ok_or_else(|| {
            ApiError::Unauthorized("Invalid Authorization header format".to_string())
        })?;

        let claims = jwt.verify_parent_token(token.trim())?;
        let parent_id = claims.parent_id()?;

        Ok(Self {
            parent_id,
            jti: claims.jti,
        })
    }
}

#[async_trait]
impl FromRequestParts<AppState> for ParentAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok());

        let auth = Self::from_header(&state.jwt, header)?;
        tracing::Span::current().record("parent_id", tracing::field::display(auth.parent_id));
        Ok(auth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_bearer_header_rejected() {
        let result = ParentAuth::from_header(&test_jwt(), Some("Basic abc"));
        assert!(matches!(result, Err(ApiError::Unauthorized(_))));

        let result = ParentAuth::from_header(&test_jwt(), None);
        assert!(matches!(result, Err(ApiError::Unauthorized(_))));
    }

    #[test]
    fn test_valid_token_accepted() {
        let jwt = test_jwt();
        let parent_id = Uuid::new_v4();
        let (token, jti) = jwt.issue_parent_token(parent_id).unwrap();

        let auth = ParentAuth::from_header(&jwt, Some(&format!("Bearer {}", token))).unwrap();
        assert_eq!(auth.parent_id, parent_id);
        assert_eq!(auth.jti, jti);
    }

    #[test]
    fn test_garbage_token_rejected() {
        let result = ParentAuth::from_header(&test_jwt(), Some("Bearer not.a.jwt"));
        assert!(matches!(result, Err(ApiError::Unauthorized(_))));
    }

    fn test_jwt() -> JwtConfig {
        JwtConfig::new(
            crate::test_keys::TEST_PRIVATE_KEY,
            crate::test_keys::TEST_PUBLIC_KEY,
            900,
        )
        .expect("test keys are valid")
    }
}

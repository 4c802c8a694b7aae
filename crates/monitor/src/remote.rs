//! Client for the Family Guard API as seen from a child device.

use async_trait::async_trait;
use chrono::NaiveDate;
use domain::models::alert::{TamperAlertRequest, TamperAlertResponse};
use domain::models::block_attempt::RecordBlockAttemptRequest;
use domain::models::pairing_code::{LinkDeviceRequest, LinkDeviceResponse};
use domain::models::schedule_rule::ScheduleRuleListResponse;
use domain::models::usage::{UploadUsageRequest, UploadUsageResponse};
use domain::models::{AppStatus, BlockAttemptLog, ScheduleRule};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEVICE_TOKEN_HEADER: &str = "X-Device-Token";

#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}, {code}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("No device token; the device is not linked")]
    NotLinked,
}

impl RemoteError {
    /// The server no longer accepts this device's token.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, RemoteError::Api { status: 401, .. })
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
    message: String,
}

/// Remote policy store and event sink used by the monitor loops.
#[async_trait]
pub trait PolicyRemote: Send + Sync {
    /// Block flag, daily limit and usage so far on the device's local `date`.
    async fn app_status(&self, package_name: &str, date: NaiveDate)
        -> Result<AppStatus, RemoteError>;

    /// Enabled schedule rules for this device.
    async fn schedule_rules(&self) -> Result<Vec<ScheduleRule>, RemoteError>;

    async fn record_block_attempt(
        &self,
        request: &RecordBlockAttemptRequest,
    ) -> Result<BlockAttemptLog, RemoteError>;

    async fn upload_usage(
        &self,
        request: &UploadUsageRequest,
    ) -> Result<UploadUsageResponse, RemoteError>;

    async fn tamper_alert(
        &self,
        request: &TamperAlertRequest,
    ) -> Result<TamperAlertResponse, RemoteError>;
}

/// HTTP implementation of [`PolicyRemote`].
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    device_token: Option<String>,
}

#[derive(Serialize)]
struct DateQuery {
    date: NaiveDate,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("family-guard-monitor/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            device_token: None,
        })
    }

    pub fn with_device_token(mut self, token: impl Into<String>) -> Self {
        self.device_token = Some(token.into());
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn token(&self) -> Result<&str, RemoteError> {
        self.device_token.as_deref().ok_or(RemoteError::NotLinked)
    }

    async fn handle_error(response: Response) -> RemoteError {
        let status = response.status().as_u16();
        match response.json::<ErrorBody>().await {
            Ok(body) => RemoteError::Api {
                status,
                code: body.error,
                message: body.message,
            },
            Err(_) => RemoteError::Api {
                status,
                code: "unknown".to_string(),
                message: "Unknown error".to_string(),
            },
        }
    }

    async fn parse<T: DeserializeOwned>(response: Response) -> Result<T, RemoteError> {
        if !response.status().is_success() {
            return Err(Self::handle_error(response).await);
        }
        response
            .json()
            .await
            .map_err(|e| RemoteError::Parse(e.to_string()))
    }

    async fn get_authed<T: DeserializeOwned>(
        &self,
        path: &str,
        query: Option<&DateQuery>,
    ) -> Result<T, RemoteError> {
        let mut request = self
            .client
            .get(self.url(path))
            .header(DEVICE_TOKEN_HEADER, self.token()?);
        if let Some(query) = query {
            request = request.query(query);
        }
        Self::parse(request.send().await?).await
    }

    async fn post_authed<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, RemoteError> {
        let response = self
            .client
            .post(self.url(path))
            .header(DEVICE_TOKEN_HEADER, self.token()?)
            .json(body)
            .send()
            .await?;
        Self::parse(response).await
    }

    /// Claims a pairing code. Needs no device token.
    pub async fn link_device(
        &self,
        request: &LinkDeviceRequest,
    ) -> Result<LinkDeviceResponse, RemoteError> {
        let response = self
            .client
            .post(self.url("/api/v1/pairing-codes/link"))
            .json(request)
            .send()
            .await?;

        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            tracing::warn!("Pairing link rate limited by server");
        }
        Self::parse(response).await
    }
}

#[async_trait]
impl PolicyRemote for ApiClient {
    async fn app_status(
        &self,
        package_name: &str,
        date: NaiveDate,
    ) -> Result<AppStatus, RemoteError> {
        self.get_authed(
            &format!("/api/v1/child/apps/{}/status", package_name),
            Some(&DateQuery { date }),
        )
        .await
    }

    async fn schedule_rules(&self) -> Result<Vec<ScheduleRule>, RemoteError> {
        let body: ScheduleRuleListResponse =
            self.get_authed("/api/v1/child/schedule-rules", None).await?;
        Ok(body.rules)
    }

    async fn record_block_attempt(
        &self,
        request: &RecordBlockAttemptRequest,
    ) -> Result<BlockAttemptLog, RemoteError> {
        self.post_authed("/api/v1/child/block-attempts", request)
            .await
    }

    async fn upload_usage(
        &self,
        request: &UploadUsageRequest,
    ) -> Result<UploadUsageResponse, RemoteError> {
        self.post_authed("/api/v1/child/usage", request).await
    }

    async fn tamper_alert(
        &self,
        request: &TamperAlertRequest,
    ) -> Result<TamperAlertResponse, RemoteError> {
        self.post_authed("/api/v1/child/alerts", request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::models::TamperKind;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> ApiClient {
        ApiClient::new(server.uri(), Duration::from_secs(5))
            .unwrap()
            .with_device_token("fgd_testtoken")
    }

    #[tokio::test]
    async fn test_app_status_sends_token_and_date() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/child/apps/com.example.game/status"))
            .and(header("X-Device-Token", "fgd_testtoken"))
            .and(query_param("date", "2024-03-04"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "package_name": "com.example.game",
                "blocked": true,
                "daily_limit_minutes": 30,
                "used_today_ms": 60000
            })))
            .expect(1)
            .mount(&server)
            .await;

        let status = client(&server)
            .app_status(
                "com.example.game",
                NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
            )
            .await
            .unwrap();

        assert!(status.blocked);
        assert_eq!(status.daily_limit_minutes, Some(30));
        assert_eq!(status.used_today_ms, 60_000);
    }

    #[tokio::test]
    async fn test_schedule_rules_unwraps_list() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/child/schedule-rules"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "child_id": "6c9b5c8e-2f55-4c8e-9d1a-4f3c1b7a2e10",
                "rules": []
            })))
            .mount(&server)
            .await;

        let rules = client(&server).schedule_rules().await.unwrap();
        assert!(rules.is_empty());
    }

    #[tokio::test]
    async fn test_api_error_body_is_parsed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/child/alerts"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": "unauthorized",
                "message": "Invalid device token"
            })))
            .mount(&server)
            .await;

        let err = client(&server)
            .tamper_alert(&TamperAlertRequest {
                kind: TamperKind::UsageAccessRevoked,
                detail: None,
                occurred_at: chrono::Utc::now(),
            })
            .await
            .unwrap_err();

        assert!(err.is_unauthorized());
        match err {
            RemoteError::Api { code, message, .. } => {
                assert_eq!(code, "unauthorized");
                assert_eq!(message, "Invalid device token");
            }
            other => panic!("Expected Api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_non_json_error_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/child/usage"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let err = client(&server)
            .upload_usage(&UploadUsageRequest { records: vec![] })
            .await
            .unwrap_err();

        assert!(matches!(err, RemoteError::Api { status: 502, .. }));
    }

    #[tokio::test]
    async fn test_authed_call_without_token_fails_fast() {
        let client = ApiClient::new("http://127.0.0.1:9", Duration::from_secs(1)).unwrap();
        let err = client.schedule_rules().await.unwrap_err();
        assert!(matches!(err, RemoteError::NotLinked));
    }

    #[tokio::test]
    async fn test_link_device_posts_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/pairing-codes/link"))
            .and(body_partial_json(json!({
                "code": "482913",
                "consent_accepted": true
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "parent_id": "0d6e1f7a-6b1c-4f0e-8a51-3c2f1e9b7d44",
                "child_id": "6c9b5c8e-2f55-4c8e-9d1a-4f3c1b7a2e10",
                "device_token": "fgd_newtoken",
                "linked_at": "2024-03-04T10:00:00Z"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::new(format!("{}/", server.uri()), Duration::from_secs(5)).unwrap();
        let response = client
            .link_device(&LinkDeviceRequest {
                code: "482913".into(),
                device_name: "Tablet".into(),
                device_model: None,
                consent_accepted: true,
            })
            .await
            .unwrap();

        assert_eq!(response.device_token, "fgd_newtoken");
    }
}

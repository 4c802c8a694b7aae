//! Push notifications through an outbound serverless function.
//!
//! The function owns the device-registration and transport details; this
//! service only POSTs `{recipientId, title, body, data}` with a bearer key
//! and retries transient failures.

use std::time::Duration;

use domain::services::{
    BlockedAppAttemptPayload, NotificationResult, NotificationService, PushMessage,
    TamperAlertPayload,
};
use reqwest::{Client, StatusCode};
use uuid::Uuid;

use crate::config::PushConfig;

/// Error type for push dispatch.
#[derive(Debug, thiserror::Error)]
pub enum PushError {
    #[error("Push notifications are not enabled")]
    NotEnabled,

    #[error("Failed to build HTTP client: {0}")]
    Client(reqwest::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Push function rejected the message ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Recipient has no registered device")]
    NoRecipient,
}

/// Notification service backed by the push function.
pub struct PushFunctionNotificationService {
    client: Client,
    config: PushConfig,
}

impl PushFunctionNotificationService {
    pub fn new(config: PushConfig) -> Result<Self, PushError> {
        if !config.enabled {
            return Err(PushError::NotEnabled);
        }

        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(PushError::Client)?;

        Ok(Self { client, config })
    }

    /// Sends one message, retrying timeouts, connection errors and 5xx with
    /// exponential backoff (100ms, 200ms, 400ms, ...).
    pub async fn send(&self, message: &PushMessage) -> Result<(), PushError> {
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let factor = 1u64.checked_shl(attempt - 1).unwrap_or(u64::MAX);
                tokio::time::sleep(Duration::from_millis(100u64.saturating_mul(factor))).await;
            }

            let mut request = self.client.post(&self.config.function_url).json(message);
            if !self.config.api_key.is_empty() {
                request = request.bearer_auth(&self.config.api_key);
            }

            match request.send().await {
                Ok(resp) if resp.status().is_success() => {
                    tracing::debug!(
                        recipient_id = %message.recipient_id,
                        attempt,
                        "Push message delivered to function"
                    );
                    return Ok(());
                }
                Ok(resp) if resp.status() == StatusCode::NOT_FOUND => {
                    return Err(PushError::NoRecipient);
                }
                Ok(resp) => {
                    let status = resp.status();
                    let body = resp.text().await.unwrap_or_default();
                    let error = PushError::Rejected {
                        status: status.as_u16(),
                        body,
                    };
                    if !status.is_server_error() && status != StatusCode::TOO_MANY_REQUESTS {
                        return Err(error);
                    }
                    last_error = Some(error);
                }
                Err(e) => {
                    last_error = Some(PushError::Http(e));
                }
            }
        }

        Err(last_error.unwrap_or(PushError::Rejected {
            status: 0,
            body: "no attempt made".to_string(),
        }))
    }

    async fn dispatch(&self, kind: &'static str, message: PushMessage) -> NotificationResult {
        match self.send(&message).await {
            Ok(()) => {
                tracing::info!(
                    recipient_id = %message.recipient_id,
                    kind,
                    "Push notification sent"
                );
                NotificationResult::Sent
            }
            Err(PushError::NoRecipient) => {
                tracing::warn!(
                    recipient_id = %message.recipient_id,
                    kind,
                    "Parent has no registered device, notification skipped"
                );
                NotificationResult::Skipped
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    recipient_id = %message.recipient_id,
                    kind,
                    "Failed to send push notification"
                );
                NotificationResult::Failed(e.to_string())
            }
        }
    }
}

#[async_trait::async_trait]
impl NotificationService for PushFunctionNotificationService {
    async fn send_blocked_app_attempt(
        &self,
        parent_id: Uuid,
        payload: BlockedAppAttemptPayload,
    ) -> NotificationResult {
        let message = PushMessage::blocked_app_attempt(parent_id, &payload);
        self.dispatch("blocked_app_attempt", message).await
    }

    async fn send_tamper_alert(
        &self,
        parent_id: Uuid,
        payload: TamperAlertPayload,
    ) -> NotificationResult {
        let message = PushMessage::tamper_alert(parent_id, &payload);
        self.dispatch("tamper_alert", message).await
    }
}

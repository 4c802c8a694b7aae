//! Notification service for parent push notifications.
//!
//! Provides abstractions for notifying a parent about events on a child
//! device. Delivery happens through an outbound push function; this module
//! only shapes the payloads.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::TamperKind;

/// Notification type enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    BlockedAppAttempt,
    TamperAlert,
}

impl std::fmt::Display for NotificationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationType::BlockedAppAttempt => write!(f, "blocked_app_attempt"),
            NotificationType::TamperAlert => write!(f, "tamper_alert"),
        }
    }
}

/// Payload for a child opening a blocked app.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockedAppAttemptPayload {
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub child_id: Uuid,
    pub child_name: String,
    pub package_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,
    /// Attempts recorded today, including this one.
    pub attempt_count: i32,
    pub occurred_at: NaiveDateTime,
}

/// Payload for tampering detected on a child device.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TamperAlertPayload {
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub child_id: Uuid,
    pub child_name: String,
    pub kind: TamperKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// A rendered push message addressed to one parent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushMessage {
    pub recipient_id: Uuid,
    pub title: String,
    pub body: String,
    pub data: serde_json::Value,
}

impl PushMessage {
    pub fn blocked_app_attempt(recipient_id: Uuid, payload: &BlockedAppAttemptPayload) -> Self {
        let app = payload.app_name.as_deref().unwrap_or(&payload.package_name);
        Self {
            recipient_id,
            title: "Blocked app opened".to_string(),
            body: format!(
                "{} tried to open {} ({} attempt{} today)",
                payload.child_name,
                app,
                payload.attempt_count,
                if payload.attempt_count == 1 { "" } else { "s" }
            ),
            data: serde_json::to_value(payload).unwrap_or(serde_json::Value::Null),
        }
    }

    pub fn tamper_alert(recipient_id: Uuid, payload: &TamperAlertPayload) -> Self {
        let what = match payload.kind {
            TamperKind::DeviceAdminDisabled => "turned off device protection",
            TamperKind::UsageAccessRevoked => "revoked usage access",
            TamperKind::UninstallAttempt => "tried to uninstall Family Guard",
        };
        Self {
            recipient_id,
            title: "Protection alert".to_string(),
            body: format!("{} {}", payload.child_name, what),
            data: serde_json::to_value(payload).unwrap_or(serde_json::Value::Null),
        }
    }
}

/// Result of a notification send attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum NotificationResult {
    /// Notification was sent successfully.
    Sent,
    /// Notification sending failed (but was non-blocking).
    Failed(String),
    /// Notification was skipped (push disabled).
    Skipped,
}

impl NotificationResult {
    /// Metric label for the outcome.
    pub fn label(&self) -> &'static str {
        match self {
            NotificationResult::Sent => "sent",
            NotificationResult::Failed(_) => "failed",
            NotificationResult::Skipped => "skipped",
        }
    }
}

/// Notification service trait for sending push notifications to parents.
#[async_trait::async_trait]
pub trait NotificationService: Send + Sync {
    /// Notify a parent that their child opened a blocked app.
    async fn send_blocked_app_attempt(
        &self,
        parent_id: Uuid,
        payload: BlockedAppAttemptPayload,
    ) -> NotificationResult;

    /// Notify a parent about tampering on a child device.
    async fn send_tamper_alert(
        &self,
        parent_id: Uuid,
        payload: TamperAlertPayload,
    ) -> NotificationResult;
}

/// Mock notification service for development and testing.
///
/// Logs notifications but doesn't actually send them.
#[derive(Debug, Clone, Default)]
pub struct MockNotificationService {
    /// Whether to simulate failures for testing.
    pub simulate_failure: bool,
}

impl MockNotificationService {
    pub fn new() -> Self {
        Self {
            simulate_failure: false,
        }
    }

    /// Create a mock service that simulates failures.
    pub fn failing() -> Self {
        Self {
            simulate_failure: true,
        }
    }
}

#[async_trait::async_trait]
impl NotificationService for MockNotificationService {
    async fn send_blocked_app_attempt(
        &self,
        parent_id: Uuid,
        payload: BlockedAppAttemptPayload,
    ) -> NotificationResult {
        if self.simulate_failure {
            tracing::warn!(
                parent_id = %parent_id,
                child_id = %payload.child_id,
                "Mock notification service simulating failure"
            );
            return NotificationResult::Failed("Simulated failure".to_string());
        }

        tracing::info!(
            parent_id = %parent_id,
            child_id = %payload.child_id,
            package_name = %payload.package_name,
            attempt_count = payload.attempt_count,
            "Mock: Would send blocked_app_attempt notification"
        );

        NotificationResult::Sent
    }

    async fn send_tamper_alert(
        &self,
        parent_id: Uuid,
        payload: TamperAlertPayload,
    ) -> NotificationResult {
        if self.simulate_failure {
            tracing::warn!(
                parent_id = %parent_id,
                child_id = %payload.child_id,
                "Mock notification service simulating failure"
            );
            return NotificationResult::Failed("Simulated failure".to_string());
        }

        tracing::info!(
            parent_id = %parent_id,
            child_id = %payload.child_id,
            kind = %payload.kind,
            "Mock: Would send tamper_alert notification"
        );

        NotificationResult::Sent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn attempt_payload(attempt_count: i32) -> BlockedAppAttemptPayload {
        BlockedAppAttemptPayload {
            notification_type: NotificationType::BlockedAppAttempt,
            child_id: Uuid::nil(),
            child_name: "Emma".to_string(),
            package_name: "com.game".to_string(),
            app_name: Some("Game".to_string()),
            attempt_count,
            occurred_at: NaiveDate::from_ymd_opt(2024, 5, 1)
                .unwrap()
                .and_hms_opt(20, 15, 0)
                .unwrap(),
        }
    }

    #[test]
    fn test_notification_type_display() {
        assert_eq!(
            NotificationType::BlockedAppAttempt.to_string(),
            "blocked_app_attempt"
        );
        assert_eq!(NotificationType::TamperAlert.to_string(), "tamper_alert");
    }

    #[test]
    fn test_blocked_attempt_payload_serialization() {
        let json = serde_json::to_value(attempt_payload(1)).unwrap();
        assert_eq!(json["type"], "blocked_app_attempt");
        assert_eq!(json["packageName"], "com.game");
        assert_eq!(json["attemptCount"], 1);
    }

    #[test]
    fn test_push_message_body() {
        let parent = Uuid::new_v4();
        let single = PushMessage::blocked_app_attempt(parent, &attempt_payload(1));
        assert_eq!(single.body, "Emma tried to open Game (1 attempt today)");
        assert_eq!(single.recipient_id, parent);

        let many = PushMessage::blocked_app_attempt(parent, &attempt_payload(4));
        assert!(many.body.ends_with("(4 attempts today)"));

        let serialized = serde_json::to_value(&single).unwrap();
        assert!(serialized.get("recipientId").is_some());
        assert_eq!(serialized["data"]["childName"], "Emma");
    }

    #[test]
    fn test_tamper_push_message() {
        let payload = TamperAlertPayload {
            notification_type: NotificationType::TamperAlert,
            child_id: Uuid::nil(),
            child_name: "Emma".to_string(),
            kind: TamperKind::DeviceAdminDisabled,
            detail: None,
            occurred_at: Utc::now(),
        };
        let message = PushMessage::tamper_alert(Uuid::nil(), &payload);
        assert_eq!(message.title, "Protection alert");
        assert_eq!(message.body, "Emma turned off device protection");
        assert_eq!(message.data["kind"], "device_admin_disabled");
    }

    #[tokio::test]
    async fn test_mock_notification_service() {
        let service = MockNotificationService::new();
        let result = service
            .send_blocked_app_attempt(Uuid::new_v4(), attempt_payload(2))
            .await;
        assert_eq!(result, NotificationResult::Sent);

        let failing = MockNotificationService::failing();
        let result = failing
            .send_blocked_app_attempt(Uuid::new_v4(), attempt_payload(2))
            .await;
        assert!(matches!(result, NotificationResult::Failed(_)));
    }
}

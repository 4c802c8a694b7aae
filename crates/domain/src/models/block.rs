//! Remote block flags and the per-app status a child device evaluates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Parent-controlled block flag for one app on one child device.
///
/// A missing flag means the app is not blocked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockFlag {
    pub child_id: Uuid,
    pub package_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,
    pub blocked: bool,
    pub updated_at: DateTime<Utc>,
}

/// Request to set or clear a block flag.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SetBlockRequest {
    pub blocked: bool,
    #[validate(length(max = 255, message = "app_name must be at most 255 characters"))]
    pub app_name: Option<String>,
}

/// Response listing the block flags of one child.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockListResponse {
    pub child_id: Uuid,
    pub blocks: Vec<BlockFlag>,
}

/// Everything the device needs to decide whether an app is blocked right now.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppStatus {
    pub package_name: String,
    /// Remote block flag; false when no flag exists.
    pub blocked: bool,
    /// Daily limit; `None` when unlimited.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_limit_minutes: Option<i32>,
    /// Usage recorded so far today.
    #[serde(default)]
    pub used_today_ms: i64,
}

impl AppStatus {
    /// Status for an app with no flag, no limit and no usage.
    pub fn unrestricted(package_name: impl Into<String>) -> Self {
        Self {
            package_name: package_name.into(),
            ..Default::default()
        }
    }

    /// Whether today's usage has reached the configured limit.
    ///
    /// A zero or negative limit is treated as unlimited.
    pub fn limit_reached(&self) -> bool {
        match self.daily_limit_minutes {
            Some(minutes) if minutes > 0 => self.used_today_ms >= i64::from(minutes) * 60_000,
            _ => false,
        }
    }
}

/// Why an app is blocked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BlockReason {
    /// The parent set the block flag.
    AdminBlock,
    /// A schedule rule is active.
    Schedule { rule_name: String },
    /// Today's usage reached the daily limit.
    DailyLimit { limit_minutes: i32 },
}

impl BlockReason {
    /// Short reason label used in logs and stored attempts.
    pub fn label(&self) -> &'static str {
        match self {
            BlockReason::AdminBlock => "admin_block",
            BlockReason::Schedule { .. } => "schedule",
            BlockReason::DailyLimit { .. } => "daily_limit",
        }
    }
}

impl std::fmt::Display for BlockReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BlockReason::AdminBlock => write!(f, "blocked by parent"),
            BlockReason::Schedule { rule_name } => write!(f, "blocked by schedule '{}'", rule_name),
            BlockReason::DailyLimit { limit_minutes } => {
                write!(f, "daily limit of {} minutes reached", limit_minutes)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unrestricted_status() {
        let status = AppStatus::unrestricted("com.example");
        assert!(!status.blocked);
        assert!(status.daily_limit_minutes.is_none());
        assert!(!status.limit_reached());
    }

    #[test]
    fn test_limit_reached() {
        let mut status = AppStatus {
            package_name: "com.game".into(),
            blocked: false,
            daily_limit_minutes: Some(30),
            used_today_ms: 29 * 60_000,
        };
        assert!(!status.limit_reached());

        status.used_today_ms = 30 * 60_000;
        assert!(status.limit_reached());
    }

    #[test]
    fn test_zero_limit_is_unlimited() {
        let status = AppStatus {
            package_name: "com.game".into(),
            blocked: false,
            daily_limit_minutes: Some(0),
            used_today_ms: 10 * 3_600_000,
        };
        assert!(!status.limit_reached());
    }

    #[test]
    fn test_status_deserializes_with_missing_fields() {
        let status: AppStatus =
            serde_json::from_str(r#"{"package_name":"com.x","blocked":true}"#).unwrap();
        assert!(status.blocked);
        assert_eq!(status.used_today_ms, 0);
        assert!(status.daily_limit_minutes.is_none());
    }

    #[test]
    fn test_block_reason_serialization() {
        let json = serde_json::to_value(BlockReason::Schedule {
            rule_name: "Bedtime".into(),
        })
        .unwrap();
        assert_eq!(json["kind"], "schedule");
        assert_eq!(json["rule_name"], "Bedtime");
        assert_eq!(BlockReason::AdminBlock.label(), "admin_block");
        assert_eq!(
            BlockReason::DailyLimit { limit_minutes: 60 }.to_string(),
            "daily limit of 60 minutes reached"
        );
    }
}

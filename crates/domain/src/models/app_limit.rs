//! Per-app daily time limits.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Daily limit for one app on one child device. Zero means unlimited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppLimit {
    pub child_id: Uuid,
    pub package_name: String,
    pub daily_limit_minutes: i32,
    pub updated_at: DateTime<Utc>,
}

impl AppLimit {
    /// The limit as seen by enforcement: `None` when unlimited.
    pub fn effective_minutes(&self) -> Option<i32> {
        (self.daily_limit_minutes > 0).then_some(self.daily_limit_minutes)
    }
}

/// Request to set a daily limit.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SetAppLimitRequest {
    #[validate(range(min = 0, max = 1440, message = "daily_limit_minutes must be 0-1440"))]
    pub daily_limit_minutes: i32,
}

/// Response listing the limits of one child.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppLimitListResponse {
    pub child_id: Uuid,
    pub limits: Vec<AppLimit>,
}

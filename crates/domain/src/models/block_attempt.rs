//! Block attempt log models.
//!
//! Each time a child opens a blocked app the device records an attempt. The
//! log keeps one row per (child, package, day) with a counter and the ordered
//! list of attempt times.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Format of an entry in `attempt_times`.
pub const ATTEMPT_TIME_FORMAT: &str = "%H:%M:%S";

/// Daily block attempt log for one app on one child device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockAttemptLog {
    pub child_id: Uuid,
    pub package_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,
    pub attempt_date: NaiveDate,
    pub attempt_count: i32,
    /// Local times of each attempt, oldest first, formatted `HH:MM:SS`.
    pub attempt_times: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

impl BlockAttemptLog {
    /// Starts an empty log for a day.
    pub fn new(child_id: Uuid, package_name: impl Into<String>, attempt_date: NaiveDate) -> Self {
        Self {
            child_id,
            package_name: package_name.into(),
            app_name: None,
            attempt_date,
            attempt_count: 0,
            attempt_times: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    /// Appends one attempt. Mirrors the atomic upsert done in storage.
    pub fn record(&mut self, at: NaiveTime) {
        self.attempt_count += 1;
        self.attempt_times.push(format_attempt_time(at));
        self.updated_at = Utc::now();
    }
}

/// Formats a local time as stored in the attempt list.
pub fn format_attempt_time(at: NaiveTime) -> String {
    at.format(ATTEMPT_TIME_FORMAT).to_string()
}

/// Request from a child device to record an attempt.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RecordBlockAttemptRequest {
    #[validate(custom(function = "shared::validation::validate_package_name"))]
    pub package_name: String,
    #[validate(length(max = 255, message = "app_name must be at most 255 characters"))]
    pub app_name: Option<String>,
    /// Local wall-clock time on the device when the attempt happened.
    pub occurred_at: NaiveDateTime,
    /// Reason label reported by the device (`admin_block`, `schedule`, `daily_limit`).
    #[validate(length(max = 32, message = "reason must be at most 32 characters"))]
    pub reason: Option<String>,
}

impl RecordBlockAttemptRequest {
    pub fn attempt_date(&self) -> NaiveDate {
        self.occurred_at.date()
    }

    pub fn attempt_time(&self) -> String {
        format_attempt_time(self.occurred_at.time())
    }
}

/// Query parameters for listing attempt logs.
#[derive(Debug, Clone, Deserialize)]
pub struct BlockAttemptQuery {
    #[serde(default)]
    pub from: Option<NaiveDate>,
    #[serde(default)]
    pub to: Option<NaiveDate>,
}

/// Response listing attempt logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockAttemptListResponse {
    pub child_id: Uuid,
    pub total_attempts: i64,
    pub logs: Vec<BlockAttemptLog>,
}

impl BlockAttemptListResponse {
    pub fn new(child_id: Uuid, logs: Vec<BlockAttemptLog>) -> Self {
        let total_attempts = logs.iter().map(|l| i64::from(l.attempt_count)).sum();
        Self {
            child_id,
            total_attempts,
            logs,
        }
    }
}

//! App usage domain models.
//!
//! One record per (child, package, day). The device reports cumulative
//! foreground totals, so a stored duration never decreases within a day.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Maximum number of records accepted in one usage upload.
pub const MAX_USAGE_BATCH: usize = 500;

/// Daily usage of one app on one child device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub child_id: Uuid,
    /// Package name (e.g., com.example.app)
    pub package_name: String,
    /// Display name of the app
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,
    /// Local calendar day on the device
    pub usage_date: NaiveDate,
    /// Foreground time in milliseconds
    pub duration_ms: i64,
    pub updated_at: DateTime<Utc>,
}

/// One entry of a usage upload.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UsageRecordInput {
    #[validate(custom(function = "shared::validation::validate_package_name"))]
    pub package_name: String,
    #[validate(length(max = 255, message = "app_name must be at most 255 characters"))]
    pub app_name: Option<String>,
    pub usage_date: NaiveDate,
    #[validate(range(min = 0, max = 86_400_000, message = "duration_ms must be within one day"))]
    pub duration_ms: i64,
}

/// Batch usage upload from a child device.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UploadUsageRequest {
    #[validate(length(min = 1, max = 500, message = "records must contain 1-500 entries"), nested)]
    pub records: Vec<UsageRecordInput>,
}

/// Response for a usage upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadUsageResponse {
    pub accepted: usize,
}

/// Query parameters for the daily usage report.
#[derive(Debug, Clone, Deserialize)]
pub struct DailyUsageQuery {
    /// Day to report (defaults to today, UTC)
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

/// Query parameters for usage history.
#[derive(Debug, Clone, Deserialize)]
pub struct UsageHistoryQuery {
    #[serde(default)]
    pub from: Option<NaiveDate>,
    #[serde(default)]
    pub to: Option<NaiveDate>,
    /// Filter by package name
    #[serde(default)]
    pub package_name: Option<String>,
}

/// One app in the daily usage report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyUsageItem {
    pub package_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,
    pub duration_ms: i64,
    /// Configured daily limit, absent when unlimited
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_limit_minutes: Option<i32>,
    pub blocked: bool,
}

/// Daily usage report for one child.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyUsageReport {
    pub child_id: Uuid,
    pub date: NaiveDate,
    pub total_duration_ms: i64,
    /// Apps ordered by descending usage
    pub apps: Vec<DailyUsageItem>,
}

impl DailyUsageReport {
    /// Builds a report, sorting apps by usage and totalling durations.
    pub fn new(child_id: Uuid, date: NaiveDate, mut apps: Vec<DailyUsageItem>) -> Self {
        apps.sort_by(|a, b| {
            b.duration_ms
                .cmp(&a.duration_ms)
                .then_with(|| a.package_name.cmp(&b.package_name))
        });
        let total_duration_ms = apps.iter().map(|a| a.duration_ms).sum();
        Self {
            child_id,
            date,
            total_duration_ms,
            apps,
        }
    }
}

/// Usage history response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageHistoryResponse {
    pub child_id: Uuid,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub records: Vec<UsageRecord>,
}

/// Merges a reported cumulative duration with the stored one.
pub fn merge_duration(stored_ms: i64, reported_ms: i64) -> i64 {
    stored_ms.max(reported_ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(package: &str, duration_ms: i64) -> DailyUsageItem {
        DailyUsageItem {
            package_name: package.to_string(),
            app_name: None,
            duration_ms,
            daily_limit_minutes: None,
            blocked: false,
        }
    }

    #[test]
    fn test_daily_report_sorted_and_totalled() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let report = DailyUsageReport::new(
            Uuid::nil(),
            date,
            vec![item("com.a", 1_000), item("com.b", 5_000), item("com.c", 1_000)],
        );

        assert_eq!(report.total_duration_ms, 7_000);
        let order: Vec<_> = report.apps.iter().map(|a| a.package_name.as_str()).collect();
        assert_eq!(order, vec!["com.b", "com.a", "com.c"]);
    }

    #[test]
    fn test_merge_duration_never_decreases() {
        assert_eq!(merge_duration(10_000, 4_000), 10_000);
        assert_eq!(merge_duration(10_000, 12_000), 12_000);
    }

    #[test]
    fn test_upload_request_validation() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let valid = UploadUsageRequest {
            records: vec![UsageRecordInput {
                package_name: "com.example.game".into(),
                app_name: Some("Game".into()),
                usage_date: date,
                duration_ms: 60_000,
            }],
        };
        assert!(valid.validate().is_ok());

        let empty = UploadUsageRequest { records: vec![] };
        assert!(empty.validate().is_err());

        let bad_package = UploadUsageRequest {
            records: vec![UsageRecordInput {
                package_name: "not a package".into(),
                app_name: None,
                usage_date: date,
                duration_ms: 1,
            }],
        };
        assert!(bad_package.validate().is_err());

        let negative = UploadUsageRequest {
            records: vec![UsageRecordInput {
                package_name: "com.example".into(),
                app_name: None,
                usage_date: date,
                duration_ms: -5,
            }],
        };
        assert!(negative.validate().is_err());
    }
}

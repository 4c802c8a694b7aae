//! Usage record and block attempt log entities (database row mappings).

use chrono::{DateTime, NaiveDate, Utc};
use domain::models::{BlockAttemptLog, UsageRecord};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the usage_records table.
#[derive(Debug, Clone, FromRow)]
pub struct UsageRecordEntity {
    pub child_id: Uuid,
    pub package_name: String,
    pub app_name: Option<String>,
    pub usage_date: NaiveDate,
    pub duration_ms: i64,
    pub updated_at: DateTime<Utc>,
}

impl From<UsageRecordEntity> for UsageRecord {
    fn from(entity: UsageRecordEntity) -> Self {
        Self {
            child_id: entity.child_id,
            package_name: entity.package_name,
            app_name: entity.app_name,
            usage_date: entity.usage_date,
            duration_ms: entity.duration_ms,
            updated_at: entity.updated_at,
        }
    }
}

/// Usage joined with the app's block flag and limit, for the daily report.
#[derive(Debug, Clone, FromRow)]
pub struct DailyUsageRowEntity {
    pub package_name: String,
    pub app_name: Option<String>,
    pub duration_ms: i64,
    pub daily_limit_minutes: Option<i32>,
    pub blocked: Option<bool>,
}

impl From<DailyUsageRowEntity> for domain::models::usage::DailyUsageItem {
    fn from(entity: DailyUsageRowEntity) -> Self {
        Self {
            package_name: entity.package_name,
            app_name: entity.app_name,
            duration_ms: entity.duration_ms,
            daily_limit_minutes: entity.daily_limit_minutes.filter(|m| *m > 0),
            blocked: entity.blocked.unwrap_or(false),
        }
    }
}

/// Database row mapping for the block_attempt_logs table.
#[derive(Debug, Clone, FromRow)]
pub struct BlockAttemptLogEntity {
    pub child_id: Uuid,
    pub package_name: String,
    pub app_name: Option<String>,
    pub attempt_date: NaiveDate,
    pub attempt_count: i32,
    pub attempt_times: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

impl From<BlockAttemptLogEntity> for BlockAttemptLog {
    fn from(entity: BlockAttemptLogEntity) -> Self {
        Self {
            child_id: entity.child_id,
            package_name: entity.package_name,
            app_name: entity.app_name,
            attempt_date: entity.attempt_date,
            attempt_count: entity.attempt_count,
            attempt_times: entity.attempt_times,
            updated_at: entity.updated_at,
        }
    }
}

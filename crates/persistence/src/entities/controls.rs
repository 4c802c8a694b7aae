//! Block flag, schedule rule and app limit entities (database row mappings).

use chrono::{DateTime, Utc};
use domain::models::schedule_rule::weekday_from_iso;
use domain::models::{AppLimit, AppStatus, BlockFlag, RuleScope, ScheduleRule};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the block_flags table.
#[derive(Debug, Clone, FromRow)]
pub struct BlockFlagEntity {
    pub child_id: Uuid,
    pub package_name: String,
    pub app_name: Option<String>,
    pub blocked: bool,
    pub updated_at: DateTime<Utc>,
}

impl From<BlockFlagEntity> for BlockFlag {
    fn from(entity: BlockFlagEntity) -> Self {
        Self {
            child_id: entity.child_id,
            package_name: entity.package_name,
            app_name: entity.app_name,
            blocked: entity.blocked,
            updated_at: entity.updated_at,
        }
    }
}

/// Database row mapping for the schedule_rules table.
#[derive(Debug, Clone, FromRow)]
pub struct ScheduleRuleEntity {
    pub id: Uuid,
    pub child_id: Uuid,
    pub name: String,
    pub package_name: Option<String>,
    pub start_ms: i64,
    pub end_ms: i64,
    /// ISO weekday numbers, Monday = 1.
    pub days: Vec<i16>,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ScheduleRuleEntity> for ScheduleRule {
    fn from(entity: ScheduleRuleEntity) -> Self {
        Self {
            id: entity.id,
            child_id: entity.child_id,
            name: entity.name,
            scope: RuleScope::from_package(entity.package_name),
            start_ms: entity.start_ms,
            end_ms: entity.end_ms,
            days: entity.days.into_iter().filter_map(weekday_from_iso).collect(),
            enabled: entity.enabled,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}

/// Database row mapping for the app_limits table.
#[derive(Debug, Clone, FromRow)]
pub struct AppLimitEntity {
    pub child_id: Uuid,
    pub package_name: String,
    pub daily_limit_minutes: i32,
    pub updated_at: DateTime<Utc>,
}

impl From<AppLimitEntity> for AppLimit {
    fn from(entity: AppLimitEntity) -> Self {
        Self {
            child_id: entity.child_id,
            package_name: entity.package_name,
            daily_limit_minutes: entity.daily_limit_minutes,
            updated_at: entity.updated_at,
        }
    }
}

/// Flag, limit and today's usage for one app, gathered in one query.
#[derive(Debug, Clone, FromRow)]
pub struct AppStatusEntity {
    pub package_name: String,
    pub blocked: bool,
    pub daily_limit_minutes: Option<i32>,
    pub used_today_ms: i64,
}

impl From<AppStatusEntity> for AppStatus {
    fn from(entity: AppStatusEntity) -> Self {
        Self {
            package_name: entity.package_name,
            blocked: entity.blocked,
            daily_limit_minutes: entity.daily_limit_minutes.filter(|m| *m > 0),
            used_today_ms: entity.used_today_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;

    #[test]
    fn test_schedule_rule_entity_to_domain() {
        let entity = ScheduleRuleEntity {
            id: Uuid::new_v4(),
            child_id: Uuid::new_v4(),
            name: "School".to_string(),
            package_name: None,
            start_ms: 8 * 3_600_000,
            end_ms: 15 * 3_600_000,
            days: vec![1, 3, 5],
            enabled: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let rule: ScheduleRule = entity.into();
        assert_eq!(rule.scope, RuleScope::AllApps);
        assert_eq!(rule.days, vec![Weekday::Mon, Weekday::Wed, Weekday::Fri]);
    }

    #[test]
    fn test_schedule_rule_entity_drops_unknown_days() {
        let entity = ScheduleRuleEntity {
            id: Uuid::new_v4(),
            child_id: Uuid::new_v4(),
            name: "Weekend".to_string(),
            package_name: Some("com.game".to_string()),
            start_ms: 0,
            end_ms: 1_000,
            days: vec![6, 7, 9],
            enabled: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let rule: ScheduleRule = entity.into();
        assert_eq!(rule.scope, RuleScope::Package("com.game".to_string()));
        assert_eq!(rule.days, vec![Weekday::Sat, Weekday::Sun]);
    }
}

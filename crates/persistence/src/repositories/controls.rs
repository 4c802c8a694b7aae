//! Repositories for parent-set app controls: block flags, schedule rules
//! and daily limits.

use chrono::{NaiveDate, Weekday};
use domain::models::schedule_rule::weekday_to_iso;
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::{AppLimitEntity, AppStatusEntity, BlockFlagEntity, ScheduleRuleEntity};
use crate::metrics::QueryTimer;

const RULE_COLUMNS: &str =
    "id, child_id, name, package_name, start_ms, end_ms, days, enabled, created_at, updated_at";

/// Input for creating or replacing a schedule rule.
#[derive(Debug, Clone)]
pub struct ScheduleRuleInput {
    pub name: String,
    pub package_name: Option<String>,
    pub start_ms: i64,
    pub end_ms: i64,
    pub days: Vec<Weekday>,
    pub enabled: bool,
}

impl ScheduleRuleInput {
    fn iso_days(&self) -> Vec<i16> {
        self.days.iter().copied().map(weekday_to_iso).collect()
    }
}

/// Repository for block flags.
#[derive(Clone)]
pub struct BlockFlagRepository {
    pool: PgPool,
}

impl BlockFlagRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Set or clear the block flag of an app.
    pub async fn upsert(
        &self,
        child_id: Uuid,
        package_name: &str,
        app_name: Option<&str>,
        blocked: bool,
    ) -> Result<BlockFlagEntity, sqlx::Error> {
        let timer = QueryTimer::new("upsert_block_flag");
        let result = sqlx::query_as::<_, BlockFlagEntity>(
            r#"
            INSERT INTO block_flags (child_id, package_name, app_name, blocked)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (child_id, package_name) DO UPDATE SET
                blocked = EXCLUDED.blocked,
                app_name = COALESCE(EXCLUDED.app_name, block_flags.app_name),
                updated_at = NOW()
            RETURNING child_id, package_name, app_name, blocked, updated_at
            "#,
        )
        .bind(child_id)
        .bind(package_name)
        .bind(app_name)
        .bind(blocked)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// List all flags of a child.
    pub async fn list_for_child(&self, child_id: Uuid) -> Result<Vec<BlockFlagEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_block_flags");
        let result = sqlx::query_as::<_, BlockFlagEntity>(
            r#"
            SELECT child_id, package_name, app_name, blocked, updated_at
            FROM block_flags
            WHERE child_id = $1
            ORDER BY package_name
            "#,
        )
        .bind(child_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Gather flag, limit and usage on `usage_date` for one app.
    ///
    /// Missing rows read as not blocked, unlimited and unused.
    pub async fn app_status(
        &self,
        child_id: Uuid,
        package_name: &str,
        usage_date: NaiveDate,
    ) -> Result<AppStatusEntity, sqlx::Error> {
        let timer = QueryTimer::new("get_app_status");
        let result = sqlx::query_as::<_, AppStatusEntity>(
            r#"
            SELECT
                $2::TEXT AS package_name,
                COALESCE(
                    (SELECT blocked FROM block_flags WHERE child_id = $1 AND package_name = $2),
                    FALSE
                ) AS blocked,
                (SELECT daily_limit_minutes FROM app_limits
                 WHERE child_id = $1 AND package_name = $2 AND daily_limit_minutes > 0
                ) AS daily_limit_minutes,
                COALESCE(
                    (SELECT duration_ms FROM usage_records
                     WHERE child_id = $1 AND package_name = $2 AND usage_date = $3),
                    0
                )::BIGINT AS used_today_ms
            "#,
        )
        .bind(child_id)
        .bind(package_name)
        .bind(usage_date)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }
}

/// Repository for schedule rules.
#[derive(Clone)]
pub struct ScheduleRuleRepository {
    pool: PgPool,
}

impl ScheduleRuleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        child_id: Uuid,
        input: &ScheduleRuleInput,
    ) -> Result<ScheduleRuleEntity, sqlx::Error> {
        let timer = QueryTimer::new("create_schedule_rule");
        let result = sqlx::query_as::<_, ScheduleRuleEntity>(&format!(
            r#"
            INSERT INTO schedule_rules (child_id, name, package_name, start_ms, end_ms, days, enabled)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            RULE_COLUMNS
        ))
        .bind(child_id)
        .bind(&input.name)
        .bind(&input.package_name)
        .bind(input.start_ms)
        .bind(input.end_ms)
        .bind(input.iso_days())
        .bind(input.enabled)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn find_by_id(
        &self,
        child_id: Uuid,
        rule_id: Uuid,
    ) -> Result<Option<ScheduleRuleEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_schedule_rule");
        let result = sqlx::query_as::<_, ScheduleRuleEntity>(&format!(
            "SELECT {} FROM schedule_rules WHERE id = $1 AND child_id = $2",
            RULE_COLUMNS
        ))
        .bind(rule_id)
        .bind(child_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// List rules of a child, oldest first. `enabled_only` filters disabled rules.
    pub async fn list_for_child(
        &self,
        child_id: Uuid,
        enabled_only: bool,
    ) -> Result<Vec<ScheduleRuleEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_schedule_rules");
        let result = sqlx::query_as::<_, ScheduleRuleEntity>(&format!(
            "SELECT {} FROM schedule_rules WHERE child_id = $1 AND ($2 = FALSE OR enabled) ORDER BY created_at, id",
            RULE_COLUMNS
        ))
        .bind(child_id)
        .bind(enabled_only)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Replace every field of a rule.
    pub async fn update(
        &self,
        child_id: Uuid,
        rule_id: Uuid,
        input: &ScheduleRuleInput,
    ) -> Result<Option<ScheduleRuleEntity>, sqlx::Error> {
        let timer = QueryTimer::new("update_schedule_rule");
        let result = sqlx::query_as::<_, ScheduleRuleEntity>(&format!(
            r#"
            UPDATE schedule_rules
            SET name = $3, package_name = $4, start_ms = $5, end_ms = $6,
                days = $7, enabled = $8, updated_at = NOW()
            WHERE id = $1 AND child_id = $2
            RETURNING {}
            "#,
            RULE_COLUMNS
        ))
        .bind(rule_id)
        .bind(child_id)
        .bind(&input.name)
        .bind(&input.package_name)
        .bind(input.start_ms)
        .bind(input.end_ms)
        .bind(input.iso_days())
        .bind(input.enabled)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn delete(&self, child_id: Uuid, rule_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM schedule_rules WHERE id = $1 AND child_id = $2")
            .bind(rule_id)
            .bind(child_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Repository for daily app limits.
#[derive(Clone)]
pub struct AppLimitRepository {
    pool: PgPool,
}

impl AppLimitRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn upsert(
        &self,
        child_id: Uuid,
        package_name: &str,
        daily_limit_minutes: i32,
    ) -> Result<AppLimitEntity, sqlx::Error> {
        let timer = QueryTimer::new("upsert_app_limit");
        let result = sqlx::query_as::<_, AppLimitEntity>(
            r#"
            INSERT INTO app_limits (child_id, package_name, daily_limit_minutes)
            VALUES ($1, $2, $3)
            ON CONFLICT (child_id, package_name) DO UPDATE SET
                daily_limit_minutes = EXCLUDED.daily_limit_minutes,
                updated_at = NOW()
            RETURNING child_id, package_name, daily_limit_minutes, updated_at
            "#,
        )
        .bind(child_id)
        .bind(package_name)
        .bind(daily_limit_minutes)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn list_for_child(&self, child_id: Uuid) -> Result<Vec<AppLimitEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_app_limits");
        let result = sqlx::query_as::<_, AppLimitEntity>(
            r#"
            SELECT child_id, package_name, daily_limit_minutes, updated_at
            FROM app_limits
            WHERE child_id = $1
            ORDER BY package_name
            "#,
        )
        .bind(child_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn delete(&self, child_id: Uuid, package_name: &str) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM app_limits WHERE child_id = $1 AND package_name = $2")
                .bind(child_id)
                .bind(package_name)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }
}

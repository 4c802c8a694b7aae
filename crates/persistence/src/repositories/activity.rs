//! Repositories for device-reported activity: daily usage and block attempts.

use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::{BlockAttemptLogEntity, DailyUsageRowEntity, UsageRecordEntity};
use crate::metrics::QueryTimer;

/// One usage row to upsert.
#[derive(Debug, Clone)]
pub struct UsageUpsert {
    pub package_name: String,
    pub app_name: Option<String>,
    pub usage_date: NaiveDate,
    pub duration_ms: i64,
}

/// Repository for daily usage records.
#[derive(Clone)]
pub struct UsageRepository {
    pool: PgPool,
}

impl UsageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Upsert a batch of records atomically.
    ///
    /// The device reports cumulative daily totals, so the stored duration is
    /// the larger of stored and reported and never decreases within a day.
    pub async fn upsert_batch(
        &self,
        child_id: Uuid,
        records: &[UsageUpsert],
    ) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::new("upsert_usage_batch");
        let mut tx = self.pool.begin().await?;
        let mut affected = 0;

        for record in records {
            let result = sqlx::query(
                r#"
                INSERT INTO usage_records (child_id, package_name, app_name, usage_date, duration_ms)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (child_id, package_name, usage_date) DO UPDATE SET
                    duration_ms = GREATEST(usage_records.duration_ms, EXCLUDED.duration_ms),
                    app_name = COALESCE(EXCLUDED.app_name, usage_records.app_name),
                    updated_at = NOW()
                "#,
            )
            .bind(child_id)
            .bind(&record.package_name)
            .bind(&record.app_name)
            .bind(record.usage_date)
            .bind(record.duration_ms)
            .execute(&mut *tx)
            .await?;
            affected += result.rows_affected();
        }

        tx.commit().await?;
        timer.record();
        Ok(affected)
    }

    /// Usage on one day joined with block flags and limits.
    pub async fn daily_report(
        &self,
        child_id: Uuid,
        usage_date: NaiveDate,
    ) -> Result<Vec<DailyUsageRowEntity>, sqlx::Error> {
        let timer = QueryTimer::new("daily_usage_report");
        let result = sqlx::query_as::<_, DailyUsageRowEntity>(
            r#"
            SELECT
                u.package_name,
                COALESCE(u.app_name, b.app_name) AS app_name,
                u.duration_ms,
                l.daily_limit_minutes,
                b.blocked
            FROM usage_records u
            LEFT JOIN block_flags b
                ON b.child_id = u.child_id AND b.package_name = u.package_name
            LEFT JOIN app_limits l
                ON l.child_id = u.child_id AND l.package_name = u.package_name
            WHERE u.child_id = $1 AND u.usage_date = $2
            ORDER BY u.duration_ms DESC, u.package_name
            "#,
        )
        .bind(child_id)
        .bind(usage_date)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Records between two days inclusive, optionally for one package.
    pub async fn history(
        &self,
        child_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
        package_name: Option<&str>,
    ) -> Result<Vec<UsageRecordEntity>, sqlx::Error> {
        let timer = QueryTimer::new("usage_history");
        let result = sqlx::query_as::<_, UsageRecordEntity>(
            r#"
            SELECT child_id, package_name, app_name, usage_date, duration_ms, updated_at
            FROM usage_records
            WHERE child_id = $1
              AND usage_date BETWEEN $2 AND $3
              AND ($4::TEXT IS NULL OR package_name = $4)
            ORDER BY usage_date DESC, duration_ms DESC
            "#,
        )
        .bind(child_id)
        .bind(from)
        .bind(to)
        .bind(package_name)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }
}

/// Repository for block attempt logs.
#[derive(Clone)]
pub struct BlockAttemptRepository {
    pool: PgPool,
}

impl BlockAttemptRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Record one attempt.
    ///
    /// Counter increment and time append happen in a single upsert, so
    /// concurrent attempts on the same day never lose an update.
    pub async fn record_attempt(
        &self,
        child_id: Uuid,
        package_name: &str,
        app_name: Option<&str>,
        attempt_date: NaiveDate,
        attempt_time: &str,
    ) -> Result<BlockAttemptLogEntity, sqlx::Error> {
        let timer = QueryTimer::new("record_block_attempt");
        let result = sqlx::query_as::<_, BlockAttemptLogEntity>(
            r#"
            INSERT INTO block_attempt_logs
                (child_id, package_name, app_name, attempt_date, attempt_count, attempt_times)
            VALUES ($1, $2, $3, $4, 1, ARRAY[$5::TEXT])
            ON CONFLICT (child_id, package_name, attempt_date) DO UPDATE SET
                attempt_count = block_attempt_logs.attempt_count + 1,
                attempt_times = array_append(block_attempt_logs.attempt_times, $5::TEXT),
                app_name = COALESCE(EXCLUDED.app_name, block_attempt_logs.app_name),
                updated_at = NOW()
            RETURNING child_id, package_name, app_name, attempt_date, attempt_count,
                      attempt_times, updated_at
            "#,
        )
        .bind(child_id)
        .bind(package_name)
        .bind(app_name)
        .bind(attempt_date)
        .bind(attempt_time)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Logs between two days inclusive, newest first.
    pub async fn list_for_child(
        &self,
        child_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<BlockAttemptLogEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_block_attempts");
        let result = sqlx::query_as::<_, BlockAttemptLogEntity>(
            r#"
            SELECT child_id, package_name, app_name, attempt_date, attempt_count,
                   attempt_times, updated_at
            FROM block_attempt_logs
            WHERE child_id = $1 AND attempt_date BETWEEN $2 AND $3
            ORDER BY attempt_date DESC, attempt_count DESC
            "#,
        )
        .bind(child_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }
}

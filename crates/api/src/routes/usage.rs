//! Usage routes: daily report and history for parents, batch upload for devices.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{Duration, NaiveDate, Utc};
use domain::models::usage::{
    DailyUsageItem, DailyUsageQuery, DailyUsageReport, UploadUsageRequest, UploadUsageResponse,
    UsageHistoryQuery, UsageHistoryResponse,
};
use domain::models::UsageRecord;
use persistence::repositories::{UsageRepository, UsageUpsert};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::{ChildAuth, ParentAuth};
use crate::middleware::metrics::record_usage_records;
use crate::routes::{check_package_path, load_owned_child};

/// Days covered by a history query without explicit bounds.
const DEFAULT_HISTORY_DAYS: i64 = 7;

/// Longest range a single history query may span.
const MAX_HISTORY_DAYS: i64 = 92;

/// Resolves optional bounds to an inclusive day range ending at `today`.
pub(crate) fn resolve_range(
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<(NaiveDate, NaiveDate), ApiError> {
    let to = to.unwrap_or(today);
    let from = match from {
        Some(from) => from,
        None => to
            .checked_sub_signed(Duration::days(DEFAULT_HISTORY_DAYS - 1))
            .ok_or_else(|| ApiError::Validation("'to' is out of range".to_string()))?,
    };

    if from > to {
        return Err(ApiError::Validation(
            "'from' must not be after 'to'".to_string(),
        ));
    }
    if (to - from).num_days() >= MAX_HISTORY_DAYS {
        return Err(ApiError::Validation(format!(
            "Date range must span at most {} days",
            MAX_HISTORY_DAYS
        )));
    }
    Ok((from, to))
}

/// Per-app usage for one day, with block flags and limits.
///
/// GET /api/v1/children/:child_id/usage?date=
pub async fn daily_report(
    State(state): State<AppState>,
    Path(child_id): Path<Uuid>,
    Query(query): Query<DailyUsageQuery>,
    parent: ParentAuth,
) -> Result<Json<DailyUsageReport>, ApiError> {
    load_owned_child(&state, parent.parent_id, child_id).await?;
    let date = query.date.unwrap_or_else(|| Utc::now().date_naive());

    let apps = UsageRepository::new(state.pool.clone())
        .daily_report(child_id, date)
        .await?
        .into_iter()
        .map(DailyUsageItem::from)
        .collect();

    Ok(Json(DailyUsageReport::new(child_id, date, apps)))
}

/// GET /api/v1/children/:child_id/usage/history?from&to&package_name
pub async fn usage_history(
    State(state): State<AppState>,
    Path(child_id): Path<Uuid>,
    Query(query): Query<UsageHistoryQuery>,
    parent: ParentAuth,
) -> Result<Json<UsageHistoryResponse>, ApiError> {
    if let Some(package_name) = query.package_name.as_deref() {
        check_package_path(package_name)?;
    }
    let (from, to) = resolve_range(query.from, query.to, Utc::now().date_naive())?;
    load_owned_child(&state, parent.parent_id, child_id).await?;

    let records = UsageRepository::new(state.pool.clone())
        .history(child_id, from, to, query.package_name.as_deref())
        .await?
        .into_iter()
        .map(UsageRecord::from)
        .collect();

    Ok(Json(UsageHistoryResponse {
        child_id,
        from,
        to,
        records,
    }))
}

/// Upsert the device's cumulative daily totals.
///
/// POST /api/v1/child/usage
pub async fn upload_usage(
    State(state): State<AppState>,
    child: ChildAuth,
    Json(request): Json<UploadUsageRequest>,
) -> Result<Json<UploadUsageResponse>, ApiError> {
    request.validate()?;

    let rows: Vec<UsageUpsert> = request
        .records
        .into_iter()
        .filter(|r| r.duration_ms > 0)
        .map(|r| UsageUpsert {
            package_name: r.package_name,
            app_name: r.app_name,
            usage_date: r.usage_date,
            duration_ms: r.duration_ms,
        })
        .collect();

    if !rows.is_empty() {
        UsageRepository::new(state.pool.clone())
            .upsert_batch(child.child_id, &rows)
            .await?;
    }

    record_usage_records(rows.len());
    info!(child_id = %child.child_id, accepted = rows.len(), "Usage uploaded");

    Ok(Json(UploadUsageResponse {
        accepted: rows.len(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    #[test]
    fn test_resolve_range_defaults_to_last_week() {
        let (from, to) = resolve_range(None, None, day(10)).unwrap();
        assert_eq!(to, day(10));
        assert_eq!(from, day(4));
    }

    #[test]
    fn test_resolve_range_keeps_explicit_bounds() {
        let (from, to) = resolve_range(Some(day(1)), Some(day(2)), day(20)).unwrap();
        assert_eq!((from, to), (day(1), day(2)));
    }

    #[test]
    fn test_resolve_range_single_day() {
        assert!(resolve_range(Some(day(5)), Some(day(5)), day(20)).is_ok());
    }

    #[test]
    fn test_resolve_range_rejects_inverted() {
        assert!(matches!(
            resolve_range(Some(day(6)), Some(day(5)), day(20)),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn test_resolve_range_rejects_too_long() {
        let to = day(31);
        let from = to - Duration::days(MAX_HISTORY_DAYS);
        assert!(resolve_range(Some(from), Some(to), to).is_err());
        let from = to - Duration::days(MAX_HISTORY_DAYS - 1);
        assert!(resolve_range(Some(from), Some(to), to).is_ok());
    }

    #[test]
    fn test_resolve_range_rejects_to_at_earliest_date() {
        assert!(matches!(
            resolve_range(None, Some(NaiveDate::MIN), day(20)),
            Err(ApiError::Validation(_))
        ));
        assert!(resolve_range(Some(NaiveDate::MIN), Some(NaiveDate::MIN), day(20)).is_ok());
    }
}

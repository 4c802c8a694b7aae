//! Schedule rule routes.
//!
//! Parents manage rules per child; the device reads only its enabled rules.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use domain::models::schedule_rule::{
    normalize_days, validate_scope, validate_time_window, CreateScheduleRuleRequest,
    ScheduleRuleListResponse, UpdateScheduleRuleRequest,
};
use domain::models::{RuleScope, ScheduleRule};
use persistence::repositories::{ScheduleRuleInput, ScheduleRuleRepository};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::{ChildAuth, ParentAuth};
use crate::routes::{field_error, load_owned_child};

/// Checks the cross-field constraints the derive cannot express.
fn check_rule(scope: &RuleScope, start_ms: i64, end_ms: i64) -> Result<(), ApiError> {
    validate_time_window(start_ms, end_ms).map_err(|e| field_error("end_ms", e))?;
    validate_scope(scope).map_err(|e| field_error("scope", e))?;
    Ok(())
}

fn rule_input(rule: &ScheduleRule) -> ScheduleRuleInput {
    ScheduleRuleInput {
        name: rule.name.clone(),
        package_name: rule.scope.package_name().map(str::to_string),
        start_ms: rule.start_ms,
        end_ms: rule.end_ms,
        days: rule.days.clone(),
        enabled: rule.enabled,
    }
}

async fn load_rule(
    repo: &ScheduleRuleRepository,
    child_id: Uuid,
    rule_id: Uuid,
) -> Result<ScheduleRule, ApiError> {
    repo.find_by_id(child_id, rule_id)
        .await?
        .map(ScheduleRule::from)
        .ok_or_else(|| ApiError::NotFound("Schedule rule not found".to_string()))
}

/// GET /api/v1/children/:child_id/schedule-rules
pub async fn list_rules(
    State(state): State<AppState>,
    Path(child_id): Path<Uuid>,
    parent: ParentAuth,
) -> Result<Json<ScheduleRuleListResponse>, ApiError> {
    load_owned_child(&state, parent.parent_id, child_id).await?;

    let rules = ScheduleRuleRepository::new(state.pool.clone())
        .list_for_child(child_id, false)
        .await?
        .into_iter()
        .map(ScheduleRule::from)
        .collect();

    Ok(Json(ScheduleRuleListResponse { child_id, rules }))
}

/// POST /api/v1/children/:child_id/schedule-rules
pub async fn create_rule(
    State(state): State<AppState>,
    Path(child_id): Path<Uuid>,
    parent: ParentAuth,
    Json(request): Json<CreateScheduleRuleRequest>,
) -> Result<(StatusCode, Json<ScheduleRule>), ApiError> {
    request.validate()?;
    check_rule(&request.scope, request.start_ms, request.end_ms)?;
    load_owned_child(&state, parent.parent_id, child_id).await?;

    let input = ScheduleRuleInput {
        name: request.name.trim().to_string(),
        package_name: request.scope.package_name().map(str::to_string),
        start_ms: request.start_ms,
        end_ms: request.end_ms,
        days: normalize_days(request.days),
        enabled: request.enabled,
    };

    let rule: ScheduleRule = ScheduleRuleRepository::new(state.pool.clone())
        .create(child_id, &input)
        .await?
        .into();

    info!(
        child_id = %child_id,
        rule_id = %rule.id,
        start_ms = rule.start_ms,
        end_ms = rule.end_ms,
        "Schedule rule created"
    );

    Ok((StatusCode::CREATED, Json(rule)))
}

/// Partial update; the merged rule is re-checked as a whole.
///
/// PUT /api/v1/children/:child_id/schedule-rules/:rule_id
pub async fn update_rule(
    State(state): State<AppState>,
    Path((child_id, rule_id)): Path<(Uuid, Uuid)>,
    parent: ParentAuth,
    Json(request): Json<UpdateScheduleRuleRequest>,
) -> Result<Json<ScheduleRule>, ApiError> {
    request.validate()?;
    load_owned_child(&state, parent.parent_id, child_id).await?;

    let repo = ScheduleRuleRepository::new(state.pool.clone());
    let mut rule = load_rule(&repo, child_id, rule_id).await?;
    request.apply_to(&mut rule);
    check_rule(&rule.scope, rule.start_ms, rule.end_ms)?;

    let updated: ScheduleRule = repo
        .update(child_id, rule_id, &rule_input(&rule))
        .await?
        .map(ScheduleRule::from)
        .ok_or_else(|| ApiError::NotFound("Schedule rule not found".to_string()))?;

    info!(child_id = %child_id, rule_id = %rule_id, "Schedule rule updated");
    Ok(Json(updated))
}

/// DELETE /api/v1/children/:child_id/schedule-rules/:rule_id
pub async fn delete_rule(
    State(state): State<AppState>,
    Path((child_id, rule_id)): Path<(Uuid, Uuid)>,
    parent: ParentAuth,
) -> Result<StatusCode, ApiError> {
    load_owned_child(&state, parent.parent_id, child_id).await?;

    let deleted = ScheduleRuleRepository::new(state.pool.clone())
        .delete(child_id, rule_id)
        .await?;

    if !deleted {
        return Err(ApiError::NotFound("Schedule rule not found".to_string()));
    }

    info!(child_id = %child_id, rule_id = %rule_id, "Schedule rule deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Enabled rules for the calling device.
///
/// GET /api/v1/child/schedule-rules
pub async fn child_rules(
    State(state): State<AppState>,
    child: ChildAuth,
) -> Result<Json<ScheduleRuleListResponse>, ApiError> {
    let rules = ScheduleRuleRepository::new(state.pool.clone())
        .list_for_child(child.child_id, true)
        .await?
        .into_iter()
        .map(ScheduleRule::from)
        .collect();

    Ok(Json(ScheduleRuleListResponse {
        child_id: child.child_id,
        rules,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Utc, Weekday};

    #[test]
    fn test_check_rule_rejects_overnight_window() {
        let err = check_rule(&RuleScope::AllApps, 79_200_000, 3_600_000).unwrap_err();
        match err {
            ApiError::InvalidFields { details, .. } => assert_eq!(details[0].field, "end_ms"),
            other => panic!("Expected InvalidFields, got {:?}", other),
        }
    }

    #[test]
    fn test_check_rule_rejects_bad_package_scope() {
        let scope = RuleScope::Package("not a package".into());
        assert!(check_rule(&scope, 0, 1_000).is_err());
        assert!(check_rule(&RuleScope::Package("com.example.game".into()), 0, 1_000).is_ok());
    }

    #[test]
    fn test_whole_day_window_is_accepted() {
        assert!(check_rule(&RuleScope::AllApps, 0, 86_400_000).is_ok());
    }

    #[test]
    fn test_rule_input_carries_scope_package() {
        let now = Utc::now();
        let rule = ScheduleRule {
            id: Uuid::new_v4(),
            child_id: Uuid::new_v4(),
            name: "Bedtime".into(),
            scope: RuleScope::Package("com.example.game".into()),
            start_ms: 0,
            end_ms: 25_200_000,
            days: vec![Weekday::Mon, Weekday::Fri],
            enabled: true,
            created_at: now,
            updated_at: now,
        };
        let input = rule_input(&rule);
        assert_eq!(input.package_name.as_deref(), Some("com.example.game"));
        assert_eq!(input.days, vec![Weekday::Mon, Weekday::Fri]);

        let all = ScheduleRule {
            scope: RuleScope::AllApps,
            ..rule
        };
        assert!(rule_input(&all).package_name.is_none());
    }
}

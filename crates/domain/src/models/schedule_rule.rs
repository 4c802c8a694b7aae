//! Schedule rule domain models.
//!
//! A schedule rule blocks one app (or every app) during a daily time window
//! on selected weekdays. Windows are expressed in milliseconds since local
//! midnight and never wrap past midnight.

use chrono::{DateTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use shared::validation::MILLIS_PER_DAY;

/// Which packages a schedule rule applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "package_name", rename_all = "snake_case")]
pub enum RuleScope {
    /// Wildcard: every package on the device.
    AllApps,
    /// Exactly one package.
    Package(String),
}

impl RuleScope {
    /// Builds a scope from a nullable package column (NULL = all apps).
    pub fn from_package(package_name: Option<String>) -> Self {
        match package_name {
            Some(name) => RuleScope::Package(name),
            None => RuleScope::AllApps,
        }
    }

    /// The scoped package, or `None` for the wildcard.
    pub fn package_name(&self) -> Option<&str> {
        match self {
            RuleScope::AllApps => None,
            RuleScope::Package(name) => Some(name),
        }
    }

    /// Whether this scope covers the given package.
    pub fn matches(&self, package_name: &str) -> bool {
        match self {
            RuleScope::AllApps => true,
            RuleScope::Package(name) => name == package_name,
        }
    }
}

/// Schedule rule domain model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleRule {
    pub id: Uuid,
    pub child_id: Uuid,
    pub name: String,
    pub scope: RuleScope,
    /// Window start, inclusive, ms since local midnight.
    pub start_ms: i64,
    /// Window end, exclusive, ms since local midnight.
    pub end_ms: i64,
    pub days: Vec<Weekday>,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ScheduleRule {
    /// Whether the rule is active on the given weekday.
    pub fn applies_on(&self, weekday: Weekday) -> bool {
        self.days.contains(&weekday)
    }

    /// Whether a time of day falls inside `[start_ms, end_ms)`.
    pub fn covers(&self, time_of_day_ms: i64) -> bool {
        self.start_ms <= time_of_day_ms && time_of_day_ms < self.end_ms
    }
}

/// Request to create a schedule rule.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateScheduleRuleRequest {
    #[validate(length(min = 1, max = 100, message = "name must be 1-100 characters"))]
    pub name: String,
    pub scope: RuleScope,
    #[validate(range(min = 0, max = 86_400_000, message = "start_ms must be within one day"))]
    pub start_ms: i64,
    #[validate(range(min = 0, max = 86_400_000, message = "end_ms must be within one day"))]
    pub end_ms: i64,
    #[serde(default)]
    pub days: Vec<Weekday>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

/// Request to update a schedule rule. Absent fields keep their current value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateScheduleRuleRequest {
    #[validate(length(min = 1, max = 100, message = "name must be 1-100 characters"))]
    pub name: Option<String>,
    pub scope: Option<RuleScope>,
    #[validate(range(min = 0, max = 86_400_000, message = "start_ms must be within one day"))]
    pub start_ms: Option<i64>,
    #[validate(range(min = 0, max = 86_400_000, message = "end_ms must be within one day"))]
    pub end_ms: Option<i64>,
    pub days: Option<Vec<Weekday>>,
    pub enabled: Option<bool>,
}

impl UpdateScheduleRuleRequest {
    /// Applies the present fields onto an existing rule.
    pub fn apply_to(self, rule: &mut ScheduleRule) {
        if let Some(name) = self.name {
            rule.name = name;
        }
        if let Some(scope) = self.scope {
            rule.scope = scope;
        }
        if let Some(start_ms) = self.start_ms {
            rule.start_ms = start_ms;
        }
        if let Some(end_ms) = self.end_ms {
            rule.end_ms = end_ms;
        }
        if let Some(days) = self.days {
            rule.days = normalize_days(days);
        }
        if let Some(enabled) = self.enabled {
            rule.enabled = enabled;
        }
    }
}

/// Response listing the rules of one child.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleRuleListResponse {
    pub child_id: Uuid,
    pub rules: Vec<ScheduleRule>,
}

fn default_enabled() -> bool {
    true
}

/// Validates a rule window: `start < end`, both within one day.
pub fn validate_time_window(start_ms: i64, end_ms: i64) -> Result<(), ValidationError> {
    if !(0..=MILLIS_PER_DAY).contains(&start_ms) || !(0..=MILLIS_PER_DAY).contains(&end_ms) {
        let mut err = ValidationError::new("window_range");
        err.message = Some("Window bounds must be within one day".into());
        return Err(err);
    }
    if start_ms >= end_ms {
        let mut err = ValidationError::new("window_order");
        err.message = Some("Window start must be before its end (no overnight windows)".into());
        return Err(err);
    }
    Ok(())
}

/// Validates the package of a scoped rule.
pub fn validate_scope(scope: &RuleScope) -> Result<(), ValidationError> {
    match scope.package_name() {
        Some(name) => shared::validation::validate_package_name(name),
        None => Ok(()),
    }
}

/// Sorts weekdays Monday-first and removes duplicates.
pub fn normalize_days(days: Vec<Weekday>) -> Vec<Weekday> {
    let mut numbers: Vec<u32> = days.iter().map(|d| d.number_from_monday()).collect();
    numbers.sort_unstable();
    numbers.dedup();
    numbers
        .into_iter()
        .filter_map(|n| weekday_from_iso(n as i16))
        .collect()
}

/// Converts a weekday to its ISO number (Monday = 1).
pub fn weekday_to_iso(weekday: Weekday) -> i16 {
    weekday.number_from_monday() as i16
}

/// Converts an ISO weekday number (Monday = 1) back to a weekday.
pub fn weekday_from_iso(number: i16) -> Option<Weekday> {
    match number {
        1 => Some(Weekday::Mon),
        2 => Some(Weekday::Tue),
        3 => Some(Weekday::Wed),
        4 => Some(Weekday::Thu),
        5 => Some(Weekday::Fri),
        6 => Some(Weekday::Sat),
        7 => Some(Weekday::Sun),
        _ => None,
    }
}

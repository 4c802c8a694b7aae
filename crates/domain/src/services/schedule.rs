//! Schedule rule evaluation.
//!
//! A package is blocked by schedule when any rule is enabled, covers the
//! package, lists the current weekday and contains the current time of day.
//! Rules have no priority; the first match in list order is reported.

use chrono::{Datelike, NaiveDateTime, Timelike};

use crate::models::ScheduleRule;

/// Milliseconds elapsed since local midnight.
pub fn time_of_day_ms(now: NaiveDateTime) -> i64 {
    let time = now.time();
    i64::from(time.num_seconds_from_midnight()) * 1_000 + i64::from(time.nanosecond() / 1_000_000)
}

/// Whether one rule blocks `package_name` at local time `now`.
pub fn rule_matches(rule: &ScheduleRule, package_name: &str, now: NaiveDateTime) -> bool {
    rule.enabled
        && rule.scope.matches(package_name)
        && rule.applies_on(now.weekday())
        && rule.covers(time_of_day_ms(now))
}

/// First rule that blocks `package_name` at `now`, if any.
pub fn matching_rule<'a>(
    rules: &'a [ScheduleRule],
    package_name: &str,
    now: NaiveDateTime,
) -> Option<&'a ScheduleRule> {
    rules.iter().find(|rule| rule_matches(rule, package_name, now))
}

/// Whether any rule blocks `package_name` at `now`.
pub fn is_blocked_by_schedule(rules: &[ScheduleRule], package_name: &str, now: NaiveDateTime) -> bool {
    matching_rule(rules, package_name, now).is_some()
}

//! Block decision and foreground tracking for the on-device monitor.

use chrono::NaiveDateTime;

use crate::models::{AppStatus, BlockReason, ScheduleRule};
use crate::services::schedule::matching_rule;

/// Decides whether an app is blocked right now.
///
/// Precedence: parent block flag, then active schedule, then daily limit.
pub fn evaluate_block(
    status: &AppStatus,
    rules: &[ScheduleRule],
    now: NaiveDateTime,
) -> Option<BlockReason> {
    if status.blocked {
        return Some(BlockReason::AdminBlock);
    }

    if let Some(rule) = matching_rule(rules, &status.package_name, now) {
        return Some(BlockReason::Schedule {
            rule_name: rule.name.clone(),
        });
    }

    if status.limit_reached() {
        return status
            .daily_limit_minutes
            .map(|limit_minutes| BlockReason::DailyLimit { limit_minutes });
    }

    None
}

/// What the fast loop should do after observing a foreground app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForegroundAction {
    /// Same package as the previous observation.
    Unchanged,
    /// Blocked and not yet shown: launch the block screen.
    ShowBlockScreen,
    /// Blocked but the block screen is already up for this package.
    AlreadyShown,
    /// Not blocked.
    Allowed,
}

/// Two-slot memory of the fast loop: last observed package and the package
/// the block screen is currently shown for.
#[derive(Debug, Clone, Default)]
pub struct ForegroundTracker {
    last_seen: Option<String>,
    blocked_shown: Option<String>,
}

impl ForegroundTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_seen(&self) -> Option<&str> {
        self.last_seen.as_deref()
    }

    pub fn blocked_shown(&self) -> Option<&str> {
        self.blocked_shown.as_deref()
    }

    /// Forgets the last evaluated package so the next observation is
    /// re-evaluated even if the foreground app did not change. The
    /// blocked-shown slot is kept, so a still-blocked app is not shown twice.
    pub fn invalidate(&mut self) {
        self.last_seen = None;
    }

    /// Whether `package_name` differs from the last evaluated package.
    pub fn is_new_foreground(&self, package_name: &str) -> bool {
        self.last_seen.as_deref() != Some(package_name)
    }

    /// Records an evaluated observation and returns the action to take.
    ///
    /// Call only after the block decision succeeded; a failed evaluation must
    /// leave the tracker untouched so the next tick retries.
    pub fn record(&mut self, package_name: &str, blocked: bool) -> ForegroundAction {
        if !self.is_new_foreground(package_name) {
            return ForegroundAction::Unchanged;
        }
        self.last_seen = Some(package_name.to_string());

        if !blocked {
            self.blocked_shown = None;
            return ForegroundAction::Allowed;
        }

        if self.blocked_shown.as_deref() == Some(package_name) {
            ForegroundAction::AlreadyShown
        } else {
            self.blocked_shown = Some(package_name.to_string());
            ForegroundAction::ShowBlockScreen
        }
    }
}

//! Foreground app detection.

use async_trait::async_trait;
use chrono::{Duration, NaiveDateTime};
use std::sync::Arc;

use crate::error::ProviderError;
use crate::shell::run_shell;
use crate::usage_stats::{most_recent_foreground, UsageStatsProvider};
use shared::validation::validate_package_name;

/// Reports which app the child is using right now.
#[async_trait]
pub trait ForegroundSource: Send + Sync {
    /// Package in the foreground at `now`, or `None` when nothing is known.
    async fn current_foreground(
        &self,
        now: NaiveDateTime,
    ) -> Result<Option<String>, ProviderError>;
}

/// Most recently resumed app over a trailing usage-stats window.
pub struct UsageStatsForeground {
    provider: Arc<dyn UsageStatsProvider>,
    window: Duration,
}

impl UsageStatsForeground {
    pub fn new(provider: Arc<dyn UsageStatsProvider>, window: Duration) -> Self {
        Self { provider, window }
    }
}

#[async_trait]
impl ForegroundSource for UsageStatsForeground {
    async fn current_foreground(
        &self,
        now: NaiveDateTime,
    ) -> Result<Option<String>, ProviderError> {
        let events = self.provider.events(now - self.window, now).await?;
        Ok(most_recent_foreground(&events).map(str::to_string))
    }
}

/// Focused window as reported by the window manager dump.
pub struct FocusedWindowForeground {
    command: String,
    timeout: std::time::Duration,
}

impl FocusedWindowForeground {
    pub fn new(command: impl Into<String>, timeout: std::time::Duration) -> Self {
        Self {
            command: command.into(),
            timeout,
        }
    }
}

#[async_trait]
impl ForegroundSource for FocusedWindowForeground {
    async fn current_foreground(
        &self,
        _now: NaiveDateTime,
    ) -> Result<Option<String>, ProviderError> {
        let output = run_shell(&self.command, self.timeout).await?;
        Ok(parse_focused_package(&output))
    }
}

/// Extracts the package of the focused window.
///
/// `mCurrentFocus` is preferred; surface lines are the fallback. Window
/// names look like `com.android.chrome/com.google.android.apps.chrome.Main`.
pub fn parse_focused_package(output: &str) -> Option<String> {
    let focus = output
        .lines()
        .filter(|l| l.contains("mCurrentFocus=") || l.contains("mFocusedApp="))
        .find_map(package_from_window_line);

    focus.or_else(|| {
        output
            .lines()
            .filter(|l| l.contains("mSurface=Surface(name="))
            .find_map(package_from_surface_line)
    })
}

fn package_from_window_line(line: &str) -> Option<String> {
    // mCurrentFocus=Window{1f2e3d u0 com.example.game/com.example.game.MainActivity}
    line.split_whitespace()
        .find(|token| token.contains('/'))
        .and_then(|token| token.split('/').next())
        .map(|pkg| pkg.trim_matches(|c: char| c == '{' || c == '}'))
        .filter(|pkg| is_package_like(pkg))
        .map(str::to_string)
}

fn package_from_surface_line(line: &str) -> Option<String> {
    let start = line.find("(name=")? + "(name=".len();
    let name = &line[start..];
    let name = &name[..name.find(')')?];
    let (pkg, _activity) = name.split_once('/')?;
    let pkg = pkg.trim();
    is_package_like(pkg).then(|| pkg.to_string())
}

fn is_package_like(value: &str) -> bool {
    value.contains('.') && validate_package_name(value).is_ok()
}

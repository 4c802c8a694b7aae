//! Usage-stats events and per-app foreground time.
//!
//! The device exposes activity transitions through `dumpsys usagestats`.
//! Lines of interest look like:
//!
//! ```text
//! time="2024-03-01 21:15:07" type=ACTIVITY_RESUMED package=com.android.chrome class=...
//! ```

use async_trait::async_trait;
use chrono::NaiveDateTime;
use std::collections::HashMap;
use std::time::Duration;

use crate::error::ProviderError;
use crate::shell::run_shell;
use shared::validation::validate_package_name;

/// Transition of an app into or out of the foreground.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum UsageEventKind {
    Resumed,
    Paused,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageEvent {
    pub package_name: String,
    pub kind: UsageEventKind,
    pub time: NaiveDateTime,
}

/// Foreground time of one app over a window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppUsage {
    pub package_name: String,
    pub duration_ms: i64,
}

/// Source of usage-stats events.
#[async_trait]
pub trait UsageStatsProvider: Send + Sync {
    /// Events with `since <= time <= until`, oldest first.
    async fn events(
        &self,
        since: NaiveDateTime,
        until: NaiveDateTime,
    ) -> Result<Vec<UsageEvent>, ProviderError>;
}

/// Reads events by running a usage-stats dump command.
pub struct DumpsysUsageStats {
    command: String,
    timeout: Duration,
}

impl DumpsysUsageStats {
    pub fn new(command: impl Into<String>, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            timeout,
        }
    }
}

#[async_trait]
impl UsageStatsProvider for DumpsysUsageStats {
    async fn events(
        &self,
        since: NaiveDateTime,
        until: NaiveDateTime,
    ) -> Result<Vec<UsageEvent>, ProviderError> {
        let output = run_shell(&self.command, self.timeout).await?;
        let mut events: Vec<UsageEvent> = parse_events(&output)
            .into_iter()
            .filter(|e| e.time >= since && e.time <= until)
            .collect();

        // The dump repeats events across its daily, weekly and monthly sections.
        events.sort_by(|a, b| {
            (a.time, a.kind, &a.package_name).cmp(&(b.time, b.kind, &b.package_name))
        });
        events.dedup();
        Ok(events)
    }
}

/// Parses every recognised transition in a usage-stats dump.
///
/// Unknown event types and malformed lines are skipped.
pub fn parse_events(output: &str) -> Vec<UsageEvent> {
    output.lines().filter_map(parse_line).collect()
}

fn parse_line(line: &str) -> Option<UsageEvent> {
    let line = line.trim();
    let rest = line.strip_prefix("time=\"")?;
    let (time, rest) = rest.split_once('"')?;
    let time = parse_time(time)?;

    let mut kind = None;
    let mut package_name = None;
    for field in rest.split_whitespace() {
        if let Some(value) = field.strip_prefix("type=") {
            kind = match value {
                "ACTIVITY_RESUMED" | "MOVE_TO_FOREGROUND" => Some(UsageEventKind::Resumed),
                "ACTIVITY_PAUSED" | "MOVE_TO_BACKGROUND" => Some(UsageEventKind::Paused),
                _ => return None,
            };
        } else if let Some(value) = field.strip_prefix("package=") {
            // Used as a URL path segment when the status is fetched.
            if validate_package_name(value).is_err() {
                return None;
            }
            package_name = Some(value.to_string());
        }
    }

    Some(UsageEvent {
        package_name: package_name?,
        kind: kind?,
        time,
    })
}

fn parse_time(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
}

fn clipped_ms(
    start: NaiveDateTime,
    end: NaiveDateTime,
    since: NaiveDateTime,
    until: NaiveDateTime,
) -> i64 {
    let start = start.max(since);
    let end = end.min(until);
    if end > start {
        (end - start).num_milliseconds()
    } else {
        0
    }
}

/// Package of the latest resume event, if any.
pub fn most_recent_foreground(events: &[UsageEvent]) -> Option<&str> {
    events
        .iter()
        .filter(|e| e.kind == UsageEventKind::Resumed)
        .max_by_key(|e| e.time)
        .map(|e| e.package_name.as_str())
}

/// Sums foreground time per app inside `since..until`.
///
/// A pause with no earlier event for that app means the app was already in
/// the foreground at `since`. A resume without a pause runs until `until`.
/// Apps with zero time are omitted; the result is sorted by time, longest first.
pub fn aggregate_foreground_time(
    events: &[UsageEvent],
    since: NaiveDateTime,
    until: NaiveDateTime,
) -> Vec<AppUsage> {
    let mut sorted: Vec<&UsageEvent> = events.iter().collect();
    sorted.sort_by_key(|e| e.time);

    let mut open: HashMap<&str, NaiveDateTime> = HashMap::new();
    let mut totals: HashMap<&str, i64> = HashMap::new();

    for event in sorted {
        let package = event.package_name.as_str();
        let first_for_package = !totals.contains_key(package);
        let total = totals.entry(package).or_insert(0);

        match event.kind {
            UsageEventKind::Resumed => {
                open.entry(package).or_insert(event.time);
            }
            UsageEventKind::Paused => {
                if let Some(start) = open.remove(package) {
                    *total += clipped_ms(start, event.time, since, until);
                } else if first_for_package {
                    *total += clipped_ms(since, event.time, since, until);
                }
            }
        }
    }

    for (package, start) in open {
        *totals.entry(package).or_insert(0) += clipped_ms(start, until, since, until);
    }

    let mut usage: Vec<AppUsage> = totals
        .into_iter()
        .filter(|(_, ms)| *ms > 0)
        .map(|(package, duration_ms)| AppUsage {
            package_name: package.to_string(),
            duration_ms,
        })
        .collect();
    usage.sort_by(|a, b| {
        b.duration_ms
            .cmp(&a.duration_ms)
            .then_with(|| a.package_name.cmp(&b.package_name))
    });
    usage
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn event(package: &str, kind: UsageEventKind, time: NaiveDateTime) -> UsageEvent {
        UsageEvent {
            package_name: package.to_string(),
            kind,
            time,
        }
    }

    const DUMP: &str = r#"
  In-memory daily stats
    events
      time="2024-03-01 21:00:00" type=ACTIVITY_RESUMED package=com.example.game class=com.example.game.Main instanceId=1
      time="2024-03-01 21:10:00" type=ACTIVITY_PAUSED package=com.example.game class=com.example.game.Main instanceId=1
      time="2024-03-01 21:10:01" type=SCREEN_INTERACTIVE package=android
      time="2024-03-01 21:10:02.250" type=MOVE_TO_FOREGROUND package=com.example.video class=.Player
      garbage line
"#;

    #[test]
    fn test_parse_events_from_dump() {
        let events = parse_events(DUMP);
        assert_eq!(events.len(), 3);
        assert_eq!(events[0], event("com.example.game", UsageEventKind::Resumed, at(21, 0, 0)));
        assert_eq!(events[1].kind, UsageEventKind::Paused);
        assert_eq!(events[2].package_name, "com.example.video");
        assert_eq!(events[2].time.and_utc().timestamp_subsec_millis(), 250);
    }

    #[test]
    fn test_parse_skips_malformed_package_names() {
        let dump = r#"
      time="2024-03-01 21:00:00" type=ACTIVITY_RESUMED package=com.evil/../../parent class=.Main
      time="2024-03-01 21:00:01" type=ACTIVITY_RESUMED package=com.evil?date=x class=.Main
      time="2024-03-01 21:00:02" type=ACTIVITY_RESUMED package=com.evil%2Fx class=.Main
      time="2024-03-01 21:00:03" type=ACTIVITY_RESUMED package=com.example.game class=.Main
"#;
        let events = parse_events(dump);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].package_name, "com.example.game");
    }

    #[test]
    fn test_most_recent_foreground() {
        let events = parse_events(DUMP);
        assert_eq!(most_recent_foreground(&events), Some("com.example.video"));
        assert_eq!(most_recent_foreground(&[]), None);
    }

    #[test]
    fn test_aggregate_closed_and_open_sessions() {
        let events = vec![
            event("a", UsageEventKind::Resumed, at(10, 0, 0)),
            event("a", UsageEventKind::Paused, at(10, 30, 0)),
            event("b", UsageEventKind::Resumed, at(10, 30, 0)),
        ];
        let usage = aggregate_foreground_time(&events, at(0, 0, 0), at(11, 0, 0));
        assert_eq!(
            usage,
            vec![
                AppUsage {
                    package_name: "a".into(),
                    duration_ms: 30 * 60_000
                },
                AppUsage {
                    package_name: "b".into(),
                    duration_ms: 30 * 60_000
                },
            ]
        );
    }

    #[test]
    fn test_aggregate_pause_without_resume_counts_from_window_start() {
        let events = vec![event("a", UsageEventKind::Paused, at(10, 5, 0))];
        let usage = aggregate_foreground_time(&events, at(10, 0, 0), at(11, 0, 0));
        assert_eq!(usage[0].duration_ms, 5 * 60_000);
    }

    #[test]
    fn test_aggregate_ignores_stray_pause_after_session() {
        let events = vec![
            event("a", UsageEventKind::Resumed, at(10, 0, 0)),
            event("a", UsageEventKind::Paused, at(10, 1, 0)),
            event("a", UsageEventKind::Paused, at(10, 2, 0)),
        ];
        let usage = aggregate_foreground_time(&events, at(9, 0, 0), at(11, 0, 0));
        assert_eq!(usage[0].duration_ms, 60_000);
    }

    #[test]
    fn test_aggregate_omits_zero_time() {
        let events = vec![
            event("a", UsageEventKind::Resumed, at(10, 0, 0)),
            event("a", UsageEventKind::Paused, at(10, 0, 0)),
        ];
        assert!(aggregate_foreground_time(&events, at(9, 0, 0), at(11, 0, 0)).is_empty());
    }
}

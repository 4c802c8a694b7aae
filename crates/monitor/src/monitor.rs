//! The two polling loops of the on-device monitor.
//!
//! The fast loop watches the foreground app and launches the block screen.
//! The slow loop aggregates usage per local day and uploads it. Each loop
//! owns its state; both stop when the shutdown channel flips to `true`.

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};
use domain::models::block_attempt::RecordBlockAttemptRequest;
use domain::models::usage::{UploadUsageRequest, UsageRecordInput, MAX_USAGE_BATCH};
use domain::models::BlockReason;
use domain::services::{evaluate_block, ForegroundAction, ForegroundTracker};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::app_labels::AppLabels;
use crate::block_screen::BlockScreen;
use crate::config::LoopConfig;
use crate::foreground::ForegroundSource;
use crate::remote::PolicyRemote;
use crate::usage_stats::{aggregate_foreground_time, UsageStatsProvider};

const MAX_DAILY_MS: i64 = 86_400_000;

/// Result of one fast-loop tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FastTickOutcome {
    /// No foreground app was reported.
    Idle,
    /// Same package as the last evaluated one.
    Unchanged,
    Allowed,
    /// The block screen was launched for this reason.
    Blocked(BlockReason),
    /// Still blocked; the block screen is already up.
    AlreadyShown,
    /// A provider or remote call failed; nothing was recorded.
    Failed,
}

/// Foreground watcher and block-screen trigger.
pub struct FastLoop {
    foreground: Arc<dyn ForegroundSource>,
    remote: Arc<dyn PolicyRemote>,
    block_screen: Arc<dyn BlockScreen>,
    labels: Arc<AppLabels>,
    tracker: ForegroundTracker,
    ticks: u64,
    reevaluate_every_ticks: u64,
}

impl FastLoop {
    pub fn new(
        foreground: Arc<dyn ForegroundSource>,
        remote: Arc<dyn PolicyRemote>,
        block_screen: Arc<dyn BlockScreen>,
        labels: Arc<AppLabels>,
        reevaluate_every_ticks: u64,
    ) -> Self {
        Self {
            foreground,
            remote,
            block_screen,
            labels,
            tracker: ForegroundTracker::new(),
            ticks: 0,
            reevaluate_every_ticks,
        }
    }

    pub fn tracker(&self) -> &ForegroundTracker {
        &self.tracker
    }

    /// Runs one observation at local wall-clock time `now`.
    pub async fn tick(&mut self, now: NaiveDateTime) -> FastTickOutcome {
        self.ticks += 1;
        if self.reevaluate_every_ticks > 0 && self.ticks % self.reevaluate_every_ticks == 0 {
            // Picks up remote changes while the same app stays in front.
            self.tracker.invalidate();
        }

        let package_name = match self.foreground.current_foreground(now).await {
            Ok(Some(package_name)) => package_name,
            Ok(None) => return FastTickOutcome::Idle,
            Err(e) => {
                warn!(error = %e, "Foreground lookup failed");
                return FastTickOutcome::Failed;
            }
        };

        if !self.tracker.is_new_foreground(&package_name) {
            return FastTickOutcome::Unchanged;
        }

        let status = match self.remote.app_status(&package_name, now.date()).await {
            Ok(status) => status,
            Err(e) => {
                warn!(package_name = %package_name, error = %e, "Failed to fetch app status");
                return FastTickOutcome::Failed;
            }
        };
        let rules = match self.remote.schedule_rules().await {
            Ok(rules) => rules,
            Err(e) => {
                warn!(package_name = %package_name, error = %e, "Failed to fetch schedule rules");
                return FastTickOutcome::Failed;
            }
        };

        let reason = evaluate_block(&status, &rules, now);
        match (self.tracker.record(&package_name, reason.is_some()), reason) {
            (ForegroundAction::ShowBlockScreen, Some(reason)) => {
                self.enforce(&package_name, &reason, now).await;
                FastTickOutcome::Blocked(reason)
            }
            (ForegroundAction::AlreadyShown, _) => FastTickOutcome::AlreadyShown,
            (ForegroundAction::Unchanged, _) => FastTickOutcome::Unchanged,
            _ => {
                debug!(package_name = %package_name, "Foreground app allowed");
                FastTickOutcome::Allowed
            }
        }
    }

    async fn enforce(&self, package_name: &str, reason: &BlockReason, now: NaiveDateTime) {
        info!(package_name, reason = reason.label(), "Blocking foreground app");

        if let Err(e) = self.block_screen.show(package_name, reason).await {
            warn!(package_name, error = %e, "Failed to launch block screen");
        }

        let request = RecordBlockAttemptRequest {
            package_name: package_name.to_string(),
            app_name: self.labels.get(package_name).await,
            occurred_at: now,
            reason: Some(reason.label().to_string()),
        };
        match self.remote.record_block_attempt(&request).await {
            Ok(log) => debug!(
                package_name,
                attempt_count = log.attempt_count,
                "Block attempt recorded"
            ),
            Err(e) => warn!(package_name, error = %e, "Failed to record block attempt"),
        }
    }
}

/// Result of one slow-loop tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlowTickReport {
    /// Records accepted by the server.
    pub uploaded: usize,
    /// Packages skipped because they are blocked.
    pub blocked: Vec<String>,
    /// Packages whose status could not be fetched.
    pub failed: Vec<String>,
}

/// Usage aggregator and uploader.
pub struct SlowLoop {
    usage_stats: Arc<dyn UsageStatsProvider>,
    remote: Arc<dyn PolicyRemote>,
    block_screen: Arc<dyn BlockScreen>,
    labels: Arc<AppLabels>,
    lookback: chrono::Duration,
}

impl SlowLoop {
    pub fn new(
        usage_stats: Arc<dyn UsageStatsProvider>,
        remote: Arc<dyn PolicyRemote>,
        block_screen: Arc<dyn BlockScreen>,
        labels: Arc<AppLabels>,
        lookback: chrono::Duration,
    ) -> Self {
        Self {
            usage_stats,
            remote,
            block_screen,
            labels,
            lookback,
        }
    }

    /// Aggregates the lookback window and uploads one total per app and
    /// local day, each under the day the time was spent on.
    pub async fn tick(&self, now: NaiveDateTime) -> SlowTickReport {
        let mut report = SlowTickReport::default();
        let since = now - self.lookback;

        let events = match self.usage_stats.events(since, now).await {
            Ok(events) => events,
            Err(e) => {
                warn!(error = %e, "Usage stats lookup failed");
                return report;
            }
        };

        // Blocking follows today's status, fetched once per package.
        let mut blocked: HashMap<String, Option<bool>> = HashMap::new();
        let mut records = Vec::new();
        for (usage_date, start, end) in day_windows(since, now) {
            for usage in aggregate_foreground_time(&events, start, end) {
                let is_blocked = match blocked.get(&usage.package_name).copied() {
                    Some(cached) => cached,
                    None => {
                        let fetched = self
                            .check_blocked(&usage.package_name, now, &mut report)
                            .await;
                        blocked.insert(usage.package_name.clone(), fetched);
                        fetched
                    }
                };
                if is_blocked != Some(false) {
                    continue;
                }

                records.push(UsageRecordInput {
                    app_name: self.labels.get(&usage.package_name).await,
                    package_name: usage.package_name,
                    usage_date,
                    duration_ms: usage.duration_ms.min(MAX_DAILY_MS),
                });
            }
        }

        for batch in records.chunks(MAX_USAGE_BATCH) {
            let request = UploadUsageRequest {
                records: batch.to_vec(),
            };
            match self.remote.upload_usage(&request).await {
                Ok(response) => report.uploaded += response.accepted,
                Err(e) => warn!(records = batch.len(), error = %e, "Usage upload failed"),
            }
        }

        info!(
            uploaded = report.uploaded,
            blocked = report.blocked.len(),
            failed = report.failed.len(),
            "Usage sync finished"
        );
        report
    }

    /// Fetches the status and shows the block screen for a blocked app.
    /// `None` when the status could not be fetched.
    async fn check_blocked(
        &self,
        package_name: &str,
        now: NaiveDateTime,
        report: &mut SlowTickReport,
    ) -> Option<bool> {
        let status = match self.remote.app_status(package_name, now.date()).await {
            Ok(status) => status,
            Err(e) => {
                warn!(package_name, error = %e, "Failed to fetch app status");
                report.failed.push(package_name.to_string());
                return None;
            }
        };

        if status.blocked {
            if let Err(e) = self
                .block_screen
                .show(package_name, &BlockReason::AdminBlock)
                .await
            {
                warn!(package_name, error = %e, "Failed to launch block screen");
            }
            report.blocked.push(package_name.to_string());
        }
        Some(status.blocked)
    }
}

/// Splits `since..until` at local midnights, oldest day first.
fn day_windows(
    since: NaiveDateTime,
    until: NaiveDateTime,
) -> Vec<(NaiveDate, NaiveDateTime, NaiveDateTime)> {
    let mut windows = Vec::new();
    let mut day = since.date();
    while day <= until.date() {
        let start = since.max(day.and_time(NaiveTime::MIN));
        let next = day.succ_opt();
        let end = next.map_or(until, |next| until.min(next.and_time(NaiveTime::MIN)));
        if start < end {
            windows.push((day, start, end));
        }
        match next {
            Some(next) => day = next,
            None => break,
        }
    }
    windows
}

/// Runs both loops until shutdown.
pub struct UsageMonitor {
    fast: FastLoop,
    slow: SlowLoop,
    fast_interval: Duration,
    slow_interval: Duration,
}

impl UsageMonitor {
    pub fn new(
        config: &LoopConfig,
        foreground: Arc<dyn ForegroundSource>,
        usage_stats: Arc<dyn UsageStatsProvider>,
        remote: Arc<dyn PolicyRemote>,
        block_screen: Arc<dyn BlockScreen>,
        labels: Arc<AppLabels>,
    ) -> Self {
        Self {
            fast: FastLoop::new(
                foreground,
                remote.clone(),
                block_screen.clone(),
                labels.clone(),
                config.reevaluate_every_ticks,
            ),
            slow: SlowLoop::new(
                usage_stats,
                remote,
                block_screen,
                labels,
                config.usage_lookback(),
            ),
            fast_interval: config.fast_interval(),
            slow_interval: config.slow_interval(),
        }
    }

    /// Spawns both loops. The handles finish once `shutdown` is set.
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
        let Self {
            mut fast,
            slow,
            fast_interval,
            slow_interval,
        } = self;

        let mut fast_shutdown = shutdown.clone();
        let fast_handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(fast_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            info!(interval_ms = fast_interval.as_millis() as u64, "Fast loop started");

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        fast.tick(Local::now().naive_local()).await;
                    }
                    changed = fast_shutdown.changed() => {
                        if changed.is_err() || *fast_shutdown.borrow() {
                            info!("Fast loop stopping");
                            break;
                        }
                    }
                }
            }
        });

        let mut slow_shutdown = shutdown;
        let slow_handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(slow_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(interval_secs = slow_interval.as_secs(), "Slow loop started");

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        slow.tick(Local::now().naive_local()).await;
                    }
                    changed = slow_shutdown.changed() => {
                        if changed.is_err() || *slow_shutdown.borrow() {
                            info!("Slow loop stopping");
                            break;
                        }
                    }
                }
            }
        });

        vec![fast_handle, slow_handle]
    }
}

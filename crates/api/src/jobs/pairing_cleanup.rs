//! Removes pairing codes nobody can use any more.

use persistence::repositories::PairingCodeRepository;
use sqlx::PgPool;
use std::time::Duration;
use tracing::info;

use super::scheduler::Job;

/// Deletes unlinked codes past expiry and linked codes past the retention window.
pub struct PairingCleanupJob {
    repo: PairingCodeRepository,
    interval: Duration,
    linked_retention_days: i32,
}

impl PairingCleanupJob {
    pub fn new(pool: PgPool, interval_secs: u64, linked_retention_days: i32) -> Self {
        Self {
            repo: PairingCodeRepository::new(pool),
            interval: Duration::from_secs(interval_secs.max(1)),
            linked_retention_days,
        }
    }
}

#[async_trait::async_trait]
impl Job for PairingCleanupJob {
    fn name(&self) -> &'static str {
        "pairing_cleanup"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn execute(&self) -> anyhow::Result<()> {
        let deleted = self.repo.delete_stale(self.linked_retention_days).await?;
        if deleted > 0 {
            info!(deleted, "Stale pairing codes removed");
        }
        metrics::counter!("pairing_codes_deleted_total").increment(deleted);
        Ok(())
    }
}

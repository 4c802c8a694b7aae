//! Background jobs.

mod pairing_cleanup;
mod pool_metrics;
mod scheduler;

pub use pairing_cleanup::PairingCleanupJob;
pub use pool_metrics::PoolMetricsJob;
pub use scheduler::{Job, JobScheduler};

use sqlx::PgPool;

use crate::config::JobsConfig;

/// Builds the scheduler with every job the server runs.
pub fn build_scheduler(pool: &PgPool, config: &JobsConfig) -> JobScheduler {
    let mut scheduler = JobScheduler::new();
    scheduler.register(PairingCleanupJob::new(
        pool.clone(),
        config.pairing_cleanup_interval_secs,
        config.linked_code_retention_days,
    ));
    scheduler.register(PoolMetricsJob::new(
        pool.clone(),
        config.pool_metrics_interval_secs,
    ));
    scheduler
}

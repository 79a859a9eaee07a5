//! Periodic cleanup of old metric history rows.
//!
//! Spawns as a background task alongside the round loop and deletes
//! `metric_history` rows older than the configured retention period, on a
//! fixed interval, until cancelled.

use std::time::Duration;

use chrono::Utc;
use metrion_db::repositories::MetricHistoryRepo;
use metrion_db::DbPool;
use tokio_util::sync::CancellationToken;

/// How often the cleanup job runs.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(3600); // 1 hour

/// Run the metric-history retention loop.
///
/// Deletes rows recorded more than `retention_hours` ago. Runs until
/// `cancel` is triggered; purge failures are logged and retried on the next
/// tick, never fatal.
pub async fn run(pool: DbPool, retention_hours: i64, cancel: CancellationToken) {
    tracing::info!(
        retention_hours,
        interval_secs = CLEANUP_INTERVAL.as_secs(),
        "Metric history retention job started"
    );

    let mut interval = tokio::time::interval(CLEANUP_INTERVAL);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Metric history retention job stopping");
                break;
            }
            _ = interval.tick() => {
                let cutoff = Utc::now() - chrono::Duration::hours(retention_hours);
                match MetricHistoryRepo::delete_older_than(&pool, cutoff).await {
                    Ok(deleted) => {
                        if deleted > 0 {
                            tracing::info!(deleted, "Metric history retention: purged old rows");
                        } else {
                            tracing::debug!("Metric history retention: no rows to purge");
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Metric history retention: cleanup failed");
                    }
                }
            }
        }
    }
}

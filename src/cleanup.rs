//! Scheduled removal of stale refresh token records.
//!
//! Expired refresh tokens already fail verification; the sweep only keeps the
//! whitelist from growing without bound.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tracing::{error, info};

use crate::clock::{Clock, DAY_SECS};
use crate::db::Database;

/// Records at least this old are removed by a sweep.
pub const REFRESH_RETENTION_SECS: u64 = 8 * DAY_SECS;

/// When and how often the sweep runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanupSchedule {
    /// UTC hour of the first run
    pub hour_utc: u8,
    pub interval: Duration,
    pub retention_secs: u64,
}

impl Default for CleanupSchedule {
    fn default() -> Self {
        Self {
            hour_utc: 3,
            interval: Duration::from_secs(DAY_SECS),
            retention_secs: REFRESH_RETENTION_SECS,
        }
    }
}

/// Time from `now` (Unix seconds) until the next occurrence of `hour_utc`:00.
/// Zero when `now` is exactly on the hour.
pub fn delay_until_hour(now: u64, hour_utc: u8) -> Duration {
    let target = u64::from(hour_utc % 24) * 3600;
    let into_day = now % DAY_SECS;
    let secs = if into_day <= target {
        target - into_day
    } else {
        DAY_SECS - into_day + target
    };
    Duration::from_secs(secs)
}

/// Delete refresh records created at or before `now - retention_secs`.
pub async fn sweep(db: &Database, now: u64, retention_secs: u64) -> Result<u64, sqlx::Error> {
    let cutoff = now.saturating_sub(retention_secs);
    db.refresh_tokens().delete_created_at_or_before(cutoff).await
}

/// Run one sweep and log the outcome. Failures are logged, never returned.
pub async fn run_cleanup(db: &Database, clock: &dyn Clock, retention_secs: u64) {
    match sweep(db, clock.now(), retention_secs).await {
        Ok(count) => info!(count, "Cleaned up stale refresh tokens"),
        Err(e) => error!(error = %e, "Failed to clean up refresh tokens"),
    }
}

/// Spawn a background task that runs the sweep on `schedule`.
/// Returns a handle that can be used to abort the task.
pub fn spawn_cleanup_scheduler(
    db: Database,
    clock: Arc<dyn Clock>,
    schedule: CleanupSchedule,
) -> tokio::task::JoinHandle<()> {
    let delay = delay_until_hour(clock.now(), schedule.hour_utc);
    info!(
        first_run_in_secs = delay.as_secs(),
        hour_utc = schedule.hour_utc,
        "Refresh token cleanup scheduled"
    );

    tokio::spawn(async move {
        let mut interval = tokio::time::interval_at(Instant::now() + delay, schedule.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            run_cleanup(&db, clock.as_ref(), schedule.retention_secs).await;
        }
    })
}

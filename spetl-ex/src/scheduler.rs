//! Hourly timer
//!
//! Fires the extraction at minute zero of every hour (`0 * * * *`, UTC).
//! A failed run is logged and the timer keeps going.

use crate::extraction::ExtractionContext;
use chrono::{DateTime, Duration as ChronoDuration, DurationRound, Utc};
use std::future::Future;
use tracing::info;

/// Counters kept across the lifetime of the scheduler
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScheduleStats {
    pub runs: u64,
    pub failures: u64,
}

/// First top of the hour strictly after `now`
pub fn next_top_of_hour(now: DateTime<Utc>) -> DateTime<Utc> {
    let hour = ChronoDuration::hours(1);
    let floor = now.duration_trunc(hour).unwrap_or(now);
    floor + hour
}

/// Run the extraction every hour until `shutdown` resolves
pub async fn run_hourly<F>(ctx: &ExtractionContext, shutdown: F) -> ScheduleStats
where
    F: Future<Output = ()>,
{
    let mut stats = ScheduleStats::default();
    tokio::pin!(shutdown);

    loop {
        let now = Utc::now();
        let next = next_top_of_hour(now);
        let wait = (next - now).to_std().unwrap_or_default();
        info!("Next extraction at {} (in {:?})", next.format("%Y-%m-%d %H:%M:%S UTC"), wait);

        tokio::select! {
            _ = &mut shutdown => {
                info!("Scheduler stopping");
                return stats;
            }
            _ = tokio::time::sleep(wait) => {}
        }

        stats.runs += 1;
        if ctx.run(Utc::now()).await.is_err() {
            stats.failures += 1;
        }
    }
}

// Daily scan trigger

use std::sync::Arc;

use chrono::{DateTime, Days, Local, LocalResult, NaiveTime, TimeZone};
use tokio::task::JoinHandle;

use crate::app::{DealFinder, ScanTrigger};

/// Next occurrence of `hour:00` strictly after `now`, in `now`'s zone.
pub fn next_run_after<Tz: TimeZone>(now: &DateTime<Tz>, hour: u32) -> Option<DateTime<Tz>> {
    let at = NaiveTime::from_hms_opt(hour, 0, 0)?;
    let tz = now.timezone();
    let today = now.date_naive();

    // A DST gap can swallow the target hour; move on to the next day then
    (0..=2u64).find_map(|offset| {
        let date = today.checked_add_days(Days::new(offset))?;
        let candidate = match tz.from_local_datetime(&date.and_time(at)) {
            LocalResult::Single(t) => t,
            LocalResult::Ambiguous(earliest, _) => earliest,
            LocalResult::None => return None,
        };
        (candidate > *now).then_some(candidate)
    })
}

/// Spawn a task that runs a scheduled scan every day at `hour` local time.
pub fn spawn_daily(finder: Arc<DealFinder>, hour: u32) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let now = Local::now();
            let Some(next) = next_run_after(&now, hour) else {
                tracing::error!(hour, "cannot compute next scan time, scheduler stopped");
                return;
            };

            let wait = (next.clone() - now).to_std().unwrap_or_default();
            tracing::info!(next = %next, "next scheduled scan");
            tokio::time::sleep(wait).await;

            match finder.run_scan(ScanTrigger::Scheduled).await {
                Ok(summary) => tracing::info!(
                    deals = summary.deals,
                    notified = summary.notified,
                    "scheduled scan complete"
                ),
                Err(e) => tracing::warn!(error = %e, "scheduled scan skipped"),
            }
        }
    })
}

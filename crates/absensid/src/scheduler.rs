//! Daily roster refresh at a fixed local wall-clock time.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Days, Duration, Local, LocalResult, NaiveTime, TimeZone};

use crate::sync::{RosterSync, SyncError, SyncReport};

/// Longest single sleep, so wall-clock jumps (suspend, NTP) are noticed.
const MAX_SLEEP: StdDuration = StdDuration::from_secs(30);

/// Fires once per day at `at`, local time.
#[derive(Debug, Clone, Copy)]
pub struct SyncSchedule {
    pub at: NaiveTime,
}

impl SyncSchedule {
    pub fn new(at: NaiveTime) -> Self {
        Self { at }
    }

    /// The first instant strictly after `now` whose wall clock reads `at`.
    ///
    /// Times skipped by a DST jump fire one hour later; repeated times fire
    /// on their first occurrence.
    pub fn next_fire_after<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> DateTime<Tz> {
        let tz = now.timezone();
        let mut date = now.date_naive();
        loop {
            let naive = date.and_time(self.at);
            let candidate = match tz.from_local_datetime(&naive) {
                LocalResult::Single(t) | LocalResult::Ambiguous(t, _) => Some(t),
                LocalResult::None => tz.from_local_datetime(&(naive + Duration::hours(1))).earliest(),
            };
            if let Some(t) = candidate.filter(|t| t > now) {
                return t;
            }
            date = match date.checked_add_days(Days::new(1)) {
                Some(d) => d,
                None => return now.clone(),
            };
        }
    }
}

/// Run the schedule forever: sleep until the next fire time, sync, repeat.
///
/// A failed cycle is logged and the previous roster stays in place. Days the
/// process was not running are not caught up.
pub async fn run(schedule: SyncSchedule, sync: Arc<RosterSync>) {
    tracing::info!(at = %schedule.at.format("%H:%M"), "daily roster sync scheduled");
    run_with(schedule, Local::now, MAX_SLEEP, || {
        let sync = Arc::clone(&sync);
        async move { sync.run().await }
    })
    .await
}

async fn run_with<Tz, C, F, Fut>(schedule: SyncSchedule, clock: C, max_sleep: StdDuration, mut sync_once: F)
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
    C: Fn() -> DateTime<Tz>,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<SyncReport, SyncError>>,
{
    loop {
        let next = schedule.next_fire_after(&clock());
        tracing::debug!(next = %next.to_rfc3339(), "waiting for next sync");
        loop {
            let now = clock();
            if now >= next {
                break;
            }
            let wait = next.clone().signed_duration_since(now).to_std().unwrap_or_default();
            tokio::time::sleep(wait.min(max_sleep)).await;
        }

        match sync_once().await {
            Ok(report) => tracing::info!(loaded = report.loaded, "scheduled roster sync done"),
            Err(e) => tracing::error!(error = %e, "scheduled roster sync failed; keeping previous roster"),
        }
    }
}

//! Hourly trigger for scheduled deadline alerts.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Duration;

use chrono::DateTime;
use chrono::FixedOffset;
use chrono::NaiveDateTime;
use chrono::NaiveTime;
use chrono::Offset;
use chrono::TimeDelta;
use chrono::Timelike;
use chrono::Utc;
use log::debug;
use log::error;
use log::info;
use log::warn;
use tokio::time::sleep;

use crate::service::alert_service::AlertService;

/// Longest stretch of missed hours that is replayed after a stall.
const MAX_CATCH_UP_HOURS: i64 = 24;

/// Runs [`AlertService::run_scheduled_alerts`] at the top of every hour.
///
/// Each run is spawned so a slow run never delays the next tick. Hours skipped
/// while the process was stalled are replayed on the following tick.
pub struct AlertScheduler {
    service: Arc<AlertService>,
    utc_offset_hours: i32,
    running: AtomicBool,
}

impl AlertScheduler {
    pub fn new(service: Arc<AlertService>, utc_offset_hours: i32) -> Arc<Self> {
        info!("Initializing AlertScheduler with UTC offset {utc_offset_hours:+}h.");
        Arc::new(Self {
            service,
            utc_offset_hours,
            running: AtomicBool::new(false),
        })
    }

    /// Starts the hourly loop.
    pub fn start(self: Arc<Self>) -> anyhow::Result<()> {
        if !self.running.swap(true, Ordering::SeqCst) {
            info!("Starting AlertScheduler loop.");
            self.spawn_loop();
        }
        Ok(())
    }

    /// Stops the loop after the current wait.
    pub fn stop(self: Arc<Self>) -> anyhow::Result<()> {
        info!("Stopping AlertScheduler loop.");
        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn spawn_loop(self: Arc<Self>) {
        tokio::spawn(async move {
            let mut last_run: Option<NaiveDateTime> = None;
            loop {
                let wait = duration_until_next_hour(Utc::now());
                debug!("Next alert run in {wait:?}.");
                sleep(wait).await;

                if !self.running.load(Ordering::SeqCst) {
                    info!("Stopping alert loop.");
                    break;
                }

                let now = local_time(Utc::now(), self.utc_offset_hours);
                let due = due_hours(last_run, now);
                if due.len() > 1 {
                    warn!("Catching up {} missed alert hour(s).", due.len() - 1);
                }
                for hour in due {
                    tokio::spawn(self.clone().run_at(hour));
                }
                last_run = Some(now);
            }
        });
    }

    async fn run_at(self: Arc<Self>, hour: NaiveDateTime) {
        match self.service.run_scheduled_alerts(hour).await {
            Ok(summary) => info!("Alert run at {hour} finished: {summary}"),
            Err(e) => error!("Alert run at {hour} failed: {e}"),
        }
    }
}

/// Hours that need a run at `now`, oldest first, given the time of the previous tick.
///
/// The first tick runs the current hour only. A tick in the same hour as the
/// previous one, or one after the clock moved back, runs nothing.
pub fn due_hours(last_run: Option<NaiveDateTime>, now: NaiveDateTime) -> Vec<NaiveDateTime> {
    let current = start_of_hour(now);
    let Some(last) = last_run.map(start_of_hour) else {
        return vec![current];
    };
    let missed = (current - last).num_hours().clamp(0, MAX_CATCH_UP_HOURS);
    (0..missed)
        .rev()
        .map(|back| current - TimeDelta::hours(back))
        .collect()
}

fn start_of_hour(time: NaiveDateTime) -> NaiveDateTime {
    time.date().and_time(NaiveTime::MIN) + TimeDelta::hours(i64::from(time.hour()))
}

/// Wall-clock time at a fixed offset from UTC.
pub fn local_time(now: DateTime<Utc>, utc_offset_hours: i32) -> NaiveDateTime {
    let offset = FixedOffset::east_opt(utc_offset_hours * 3600).unwrap_or_else(|| Utc.fix());
    now.with_timezone(&offset).naive_local()
}

/// Time left until the next full hour, plus a one-second margin past the boundary.
pub fn duration_until_next_hour(now: DateTime<Utc>) -> Duration {
    let into_hour = u64::from(now.minute() * 60 + now.second());
    Duration::from_secs(3600 - into_hour + 1)
        .saturating_sub(Duration::from_nanos(u64::from(now.nanosecond() % 1_000_000_000)))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_duration_until_next_hour() {
        let at = |h, m, s| Utc.with_ymd_and_hms(2024, 3, 1, h, m, s).unwrap();

        assert_eq!(
            duration_until_next_hour(at(6, 0, 0)),
            Duration::from_secs(3601)
        );
        assert_eq!(
            duration_until_next_hour(at(6, 59, 59)),
            Duration::from_secs(2)
        );
        assert_eq!(
            duration_until_next_hour(at(23, 30, 0)),
            Duration::from_secs(1801)
        );
    }

    #[test]
    fn test_due_hours() {
        let at = |d, h, m| {
            chrono::NaiveDate::from_ymd_opt(2024, 3, d)
                .unwrap()
                .and_hms_opt(h, m, 0)
                .unwrap()
        };

        assert_eq!(due_hours(None, at(1, 9, 0)), vec![at(1, 9, 0)]);
        // Next tick one hour later.
        assert_eq!(due_hours(Some(at(1, 8, 0)), at(1, 9, 0)), vec![at(1, 9, 0)]);
        // Loop stalled past the 9:00 tick.
        assert_eq!(
            due_hours(Some(at(1, 8, 0)), at(1, 10, 5)),
            vec![at(1, 9, 0), at(1, 10, 0)]
        );
        // Across midnight.
        assert_eq!(
            due_hours(Some(at(1, 23, 0)), at(2, 1, 0)),
            vec![at(2, 0, 0), at(2, 1, 0)]
        );
        assert!(due_hours(Some(at(1, 9, 0)), at(1, 9, 59)).is_empty());
        assert!(due_hours(Some(at(1, 10, 0)), at(1, 9, 0)).is_empty());
    }

    #[test]
    fn test_due_hours_caps_catch_up() {
        let start = chrono::NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let now = start + TimeDelta::hours(100);

        let due = due_hours(Some(start), now);
        assert_eq!(due.len(), MAX_CATCH_UP_HOURS as usize);
        assert_eq!(due.first(), Some(&(now - TimeDelta::hours(23))));
        assert_eq!(due.last(), Some(&now));
    }

    #[test]
    fn test_local_time() {
        let utc = Utc.with_ymd_and_hms(2024, 3, 1, 23, 15, 0).unwrap();
        let local = local_time(utc, 2);
        assert_eq!(local.hour(), 1);
        assert_eq!(local.date(), chrono::NaiveDate::from_ymd_opt(2024, 3, 2).unwrap());
        assert_eq!(local_time(utc, 0).hour(), 23);
    }
}

//! Cron-driven trigger loop.
//!
//! Sleeps until the next cron occurrence, runs the pipeline, then plans the
//! following occurrence from the current time. A run fired at occurrence N
//! covers the interval starting at occurrence N-1, and that interval start is
//! the run's logical trigger timestamp (the 11:00 hourly run is stored under
//! 10:00). Slots missed while a run was in progress (or while the process
//! was down) are skipped, never caught up.

use chrono::{DateTime, Timelike, Utc};
use std::str::FromStr;
use tokio::sync::watch;

use crate::blob::BlobStore;
use crate::context::TriggerTimestamp;
use crate::pipeline::Pipeline;
use crate::weather::WeatherSource;

/// Errors from scheduler operations.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("Invalid cron expression: {0}")]
    CronParse(String),
    #[error("Schedule '{0}' has no upcoming occurrence")]
    Exhausted(String),
}

type Result<T> = std::result::Result<T, SchedulerError>;

/// Parse a cron expression, accepting 5-field, 6/7-field and `@hourly` forms.
pub fn parse_schedule(cron_expr: &str) -> Result<cron::Schedule> {
    let expr = normalize_cron_expr(cron_expr);
    cron::Schedule::from_str(&expr)
        .map_err(|e| SchedulerError::CronParse(format!("{}: {}", cron_expr, e)))
}

/// Normalise a cron expression to the `cron` crate's format.
///
/// Standard cron has 5 fields (min hr dom month dow). The `cron` crate
/// expects 6 fields (sec min hr dom month dow). If the expression has
/// exactly 5 whitespace-separated fields, "0 " is prepended to pin the
/// seconds to zero.
fn normalize_cron_expr(expr: &str) -> String {
    let trimmed = expr.trim();
    let fields: Vec<&str> = trimmed.split_whitespace().collect();
    if fields.len() == 5 {
        format!("0 {}", trimmed)
    } else {
        trimmed.to_string()
    }
}

/// First occurrence strictly after `after`.
pub fn next_run_after(schedule: &cron::Schedule, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
    schedule.after(&after).next()
}

/// Logical date of the run fired at `slot`: the occurrence just before it.
///
/// Falls back to `slot` itself when the schedule has no earlier occurrence.
pub fn logical_date(schedule: &cron::Schedule, slot: DateTime<Utc>) -> DateTime<Utc> {
    schedule.after(&slot).next_back().unwrap_or(slot)
}

/// Start of the hour containing `now`; the trigger used for manual runs.
pub fn hour_slot(now: DateTime<Utc>) -> DateTime<Utc> {
    now.with_nanosecond(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_minute(0))
        .unwrap_or(now)
}

/// Counts of runs performed by [`run_scheduler`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerReport {
    pub succeeded: u64,
    pub failed: u64,
}

/// Run the scheduler loop until the shutdown signal fires.
///
/// Runs never overlap inside one process. A failed run is logged with its
/// stage and error and the loop moves on to the next slot.
pub async fn run_scheduler<W, B>(
    pipeline: &Pipeline<W, B>,
    cron_expr: &str,
    mut shutdown: watch::Receiver<()>,
) -> Result<SchedulerReport>
where
    W: WeatherSource,
    B: BlobStore,
{
    let schedule = parse_schedule(cron_expr)?;
    let mut report = SchedulerReport::default();

    log::info!("[Scheduler] starting with schedule '{}'", cron_expr);

    loop {
        let now = Utc::now();
        let slot = next_run_after(&schedule, now)
            .ok_or_else(|| SchedulerError::Exhausted(cron_expr.to_string()))?;
        let wait = (slot - now).to_std().unwrap_or_default();
        log::info!("[Scheduler] next run at {} (in {:?})", slot, wait);

        tokio::select! {
            _ = tokio::time::sleep(wait) => {
                let trigger = TriggerTimestamp::from_datetime(logical_date(&schedule, slot));
                match pipeline.run(&trigger).await {
                    Ok(_) => report.succeeded += 1,
                    Err(failure) => {
                        report.failed += 1;
                        log::error!("[Scheduler] run {} failed: {}", trigger, failure);
                    }
                }
            }
            _ = shutdown.changed() => {
                log::info!("[Scheduler] shutdown signal received, exiting");
                break;
            }
        }
    }

    log::info!(
        "[Scheduler] stopped after {} successful and {} failed runs",
        report.succeeded,
        report.failed
    );
    Ok(report)
}

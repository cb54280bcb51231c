//! Daily trigger: one cron job per configured time of day, local time zone.
//!
//! Jobs share one lock so at most one run is in flight; a trigger that fires
//! while a previous run is still going is skipped, not queued.

use crate::pipeline::{Pipeline, RunOutcome};
use anyhow::{Context, Result};
use chrono::{Local, NaiveTime, Timelike};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{info, warn};

/// `"07:30"` → `"0 30 7 * * *"` (sec min hour dom month dow).
pub fn cron_for(time_of_day: &str) -> Result<String> {
    let t = NaiveTime::parse_from_str(time_of_day.trim(), "%H:%M")
        .with_context(|| format!("Invalid schedule time {:?} (expected HH:MM)", time_of_day))?;
    Ok(format!("0 {} {} * * *", t.minute(), t.hour()))
}

/// Register one job per time and start the scheduler. The returned handle
/// must be kept alive; dropping it stops the jobs.
pub async fn build_scheduler(pipeline: Arc<Pipeline>, times: &[String]) -> Result<JobScheduler> {
    let crons = times
        .iter()
        .map(|t| cron_for(t).map(|c| (t.trim().to_string(), c)))
        .collect::<Result<Vec<_>>>()?;

    if crons.is_empty() {
        anyhow::bail!("No schedule times configured");
    }

    let scheduler = JobScheduler::new().await.context("Failed to create scheduler")?;
    let running = Arc::new(Mutex::new(()));

    for (label, cron) in crons {
        let pipeline = Arc::clone(&pipeline);
        let running = Arc::clone(&running);
        let job_label = label.clone();

        let job = Job::new_async_tz(cron.as_str(), Local, move |_uuid, _lock| {
            let pipeline = Arc::clone(&pipeline);
            let running = Arc::clone(&running);
            let label = job_label.clone();

            Box::pin(async move {
                let Ok(_guard) = running.try_lock_owned() else {
                    warn!("scheduler: {} trigger skipped, previous run still in progress", label);
                    return;
                };

                info!("scheduler: {} run starting", label);
                match pipeline.run_once().await {
                    RunOutcome::Completed(stats) => {
                        info!("scheduler: {} run complete ({} rows)", label, stats.rows_written)
                    }
                    other => warn!("scheduler: {} run ended early: {:?}", label, other),
                }
            })
        })
        .with_context(|| format!("Failed to create job for {}", label))?;

        scheduler
            .add(job)
            .await
            .with_context(|| format!("Failed to register job for {}", label))?;
        info!("Scheduled daily run at {} ({})", label, cron);
    }

    scheduler.start().await.context("Failed to start scheduler")?;
    Ok(scheduler)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cron_for() {
        assert_eq!(cron_for("07:00").unwrap(), "0 0 7 * * *");
        assert_eq!(cron_for(" 22:15 ").unwrap(), "0 15 22 * * *");
    }

    #[test]
    fn test_cron_for_rejects_bad_times() {
        assert!(cron_for("25:00").is_err());
        assert!(cron_for("7am").is_err());
        assert!(cron_for("").is_err());
    }

    #[tokio::test]
    async fn test_build_scheduler_rejects_empty_and_invalid() {
        let pipeline = Arc::new(Pipeline::new(crate::config::AppConfig::default()));
        assert!(build_scheduler(Arc::clone(&pipeline), &[]).await.is_err());
        assert!(build_scheduler(pipeline, &["10:00".into(), "noon".into()]).await.is_err());
    }
}

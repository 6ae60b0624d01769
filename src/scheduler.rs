use anyhow::Result;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use crate::config::SchedulerConfig;
use crate::db::Store;

pub struct Scheduler {
    store: Store,
    config: SchedulerConfig,
}

impl Scheduler {
    #[must_use]
    pub const fn new(store: Store, config: SchedulerConfig) -> Self {
        Self { store, config }
    }

    /// Start the cron scheduler. The returned handle must be kept alive
    /// for the lifetime of the process.
    pub async fn start(&self) -> Result<Option<JobScheduler>> {
        if !self.config.enabled {
            info!("Scheduler is disabled in config");
            return Ok(None);
        }

        info!("Starting background scheduler");

        let sched = JobScheduler::new().await?;

        let store = self.store.clone();
        let inactivity_days = self.config.inactivity_days;

        let job = Job::new_async(self.config.sweep_cron.as_str(), move |_uuid, _lock| {
            let store = store.clone();
            Box::pin(async move {
                let start = std::time::Instant::now();
                info!(event = "job_started", job_name = "deactivate_stale_users");

                match sweep_inactive_users(&store, inactivity_days).await {
                    Ok(count) => info!(
                        event = "job_finished",
                        job_name = "deactivate_stale_users",
                        deactivated = count,
                        duration_ms =
                            u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
                    ),
                    Err(e) => error!(
                        event = "job_failed",
                        job_name = "deactivate_stale_users",
                        error = %e,
                    ),
                }
            })
        })?;

        sched.add(job).await?;
        sched.start().await?;

        Ok(Some(sched))
    }
}

/// Deactivate users whose last login is older than the threshold.
/// Repeated runs are no-ops once a user is inactive.
pub async fn sweep_inactive_users(store: &Store, inactivity_days: i64) -> Result<u64> {
    let cutoff = (chrono::Utc::now() - chrono::Duration::days(inactivity_days)).to_rfc3339();
    store.deactivate_stale_users(&cutoff).await
}

//! Built-in job implementations seeded by `install_defaults`.
//!
//! Kept deliberately thin: each one is an example of the [`Job`] contract
//! more than a feature in its own right. Deployments register their real
//! workloads next to these.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tracing::info;

use chronod_core::config::BackupConfig;
use chronod_store::{JobFilter, RunStatus, ScheduleStore};

use crate::registry::{Job, JobContext};

pub const BACKUP_SYSTEM_NAME: &str = "jobs.backup-database";
pub const REPORT_SYSTEM_NAME: &str = "jobs.report-yesterday-activity";

/// Copies the live database into a timestamped file under the configured
/// backup directory. Safe to retry: a re-run just writes another snapshot.
pub struct BackupDatabaseJob {
    store: Arc<ScheduleStore>,
    dir: PathBuf,
}

impl BackupDatabaseJob {
    pub fn new(store: Arc<ScheduleStore>, config: &BackupConfig) -> Self {
        Self {
            store,
            dir: PathBuf::from(&config.dir),
        }
    }
}

#[async_trait]
impl Job for BackupDatabaseJob {
    fn system_name(&self) -> &str {
        BACKUP_SYSTEM_NAME
    }

    fn describe(&self) -> &str {
        "snapshot the scheduler database into the backup directory"
    }

    async fn execute(&self, ctx: &JobContext) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let file = self
            .dir
            .join(format!("chronod-{}.db", ctx.fired_at.format("%Y%m%d-%H%M%S")));
        self.store.backup_to(&file)?;
        info!(path = %file.display(), "backup written");
        Ok(())
    }
}

/// Logs a summary of yesterday's scheduler activity: how many definitions
/// ran, succeeded, and failed within the previous UTC day.
pub struct ActivityReportJob {
    store: Arc<ScheduleStore>,
}

impl ActivityReportJob {
    pub fn new(store: Arc<ScheduleStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Job for ActivityReportJob {
    fn system_name(&self) -> &str {
        REPORT_SYSTEM_NAME
    }

    fn describe(&self) -> &str {
        "log a summary of the previous day's job runs"
    }

    async fn execute(&self, ctx: &JobContext) -> anyhow::Result<()> {
        let day_end = ctx
            .fired_at
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .map(|naive| naive.and_utc())
            .unwrap_or_else(Utc::now);
        let day_start = day_end - Duration::days(1);

        let all = self.store.list(JobFilter {
            include_disabled: true,
            include_deleted: false,
        })?;

        let ran_yesterday = all.iter().filter(|d| {
            d.last_run_time
                .is_some_and(|t| t >= day_start && t < day_end)
        });
        let (mut succeeded, mut failed) = (0usize, 0usize);
        for def in ran_yesterday {
            match def.last_run_status {
                RunStatus::Success => succeeded += 1,
                RunStatus::Failed => failed += 1,
                RunStatus::Never => {}
            }
        }

        info!(
            day = %day_start.format("%Y-%m-%d"),
            definitions = all.len(),
            succeeded,
            failed,
            "daily activity report"
        );
        Ok(())
    }
}

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use tracing::info;

use chronod_core::config::MaintenanceConfig;
use chronod_store::ScheduleStore;

use crate::registry::{Job, JobContext};

/// System name the maintenance sweep is registered and persisted under.
pub const MAINTENANCE_SYSTEM_NAME: &str = "maintenance.purge-jobs";

/// Registered job that hard-deletes disabled or soft-deleted definitions
/// once they have sat untouched for the grace period.
///
/// Runs through the dispatcher like any other job; its own definition is
/// excluded from the sweep so it cannot purge itself while disabled.
pub struct MaintenanceJob {
    store: Arc<ScheduleStore>,
    grace: Duration,
}

impl MaintenanceJob {
    pub fn new(store: Arc<ScheduleStore>, config: &MaintenanceConfig) -> Self {
        Self {
            store,
            grace: Duration::days(config.grace_days.max(0)),
        }
    }
}

#[async_trait]
impl Job for MaintenanceJob {
    fn system_name(&self) -> &str {
        MAINTENANCE_SYSTEM_NAME
    }

    fn describe(&self) -> &str {
        "purge disabled and soft-deleted job definitions past the grace period"
    }

    async fn execute(&self, ctx: &JobContext) -> anyhow::Result<()> {
        let cutoff = ctx.fired_at - self.grace;
        let removed = self.store.purge_stale(cutoff, MAINTENANCE_SYSTEM_NAME)?;
        info!(removed, grace_days = self.grace.num_days(), "maintenance sweep done");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rusqlite::Connection;

    use chronod_store::{JobFilter, NewJobDefinition, TimeUnit};

    fn seed(store: &ScheduleStore, system_name: &str, enabled: bool) {
        store
            .create(&NewJobDefinition {
                name: system_name.to_string(),
                system_name: system_name.to_string(),
                interval_value: 1,
                time_unit: TimeUnit::Day,
                enabled,
            })
            .unwrap();
    }

    #[tokio::test]
    async fn sweep_spares_fresh_rows_and_itself() {
        let store = Arc::new(ScheduleStore::new(Connection::open_in_memory().unwrap()).unwrap());
        seed(&store, "jobs.active", true);
        seed(&store, "jobs.disabled", false);
        seed(&store, MAINTENANCE_SYSTEM_NAME, false);

        let ctx = JobContext {
            job_id: "m".into(),
            system_name: MAINTENANCE_SYSTEM_NAME.into(),
            fired_at: Utc::now(),
        };

        // Rows were touched moments ago: a 7-day grace spares everything.
        let job = MaintenanceJob::new(Arc::clone(&store), &MaintenanceConfig { grace_days: 7 });
        job.execute(&ctx).await.unwrap();
        assert_eq!(
            store
                .list(JobFilter {
                    include_disabled: true,
                    include_deleted: true
                })
                .unwrap()
                .len(),
            3
        );

        // Zero grace makes the disabled row stale immediately, but the
        // sweep's own definition survives.
        let job = MaintenanceJob::new(Arc::clone(&store), &MaintenanceConfig { grace_days: 0 });
        let ctx = JobContext {
            fired_at: Utc::now() + chrono::Duration::seconds(1),
            ..ctx
        };
        job.execute(&ctx).await.unwrap();

        let rest = store
            .list(JobFilter {
                include_disabled: true,
                include_deleted: true,
            })
            .unwrap();
        let names: Vec<_> = rest.iter().map(|d| d.system_name.as_str()).collect();
        assert!(names.contains(&"jobs.active"));
        assert!(names.contains(&MAINTENANCE_SYSTEM_NAME));
        assert!(!names.contains(&"jobs.disabled"));
    }
}

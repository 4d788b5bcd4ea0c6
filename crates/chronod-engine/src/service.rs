//! Administrative façade over the store, registry, and dispatcher.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{info, instrument};

use chronod_store::{JobDefinition, JobFilter, JobState, NewJobDefinition, ScheduleStore, TimeUnit};

use crate::dispatcher::DispatcherHandle;
use crate::error::{Result, SchedulerError};
use crate::jobs::{BACKUP_SYSTEM_NAME, REPORT_SYSTEM_NAME};
use crate::maintenance::MAINTENANCE_SYSTEM_NAME;
use crate::registry::JobRegistry;

/// Partial update for the mutable definition fields. `system_name` is
/// deliberately absent: changing it would orphan run history.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobUpdate {
    pub name: Option<String>,
    pub interval_value: Option<u32>,
    pub time_unit: Option<TimeUnit>,
    pub enabled: Option<bool>,
}

/// One method per administrative action. All collaborators are injected;
/// the service owns no state of its own.
pub struct SchedulerService {
    store: Arc<ScheduleStore>,
    registry: Arc<JobRegistry>,
    dispatcher: DispatcherHandle,
}

impl SchedulerService {
    pub fn new(
        store: Arc<ScheduleStore>,
        registry: Arc<JobRegistry>,
        dispatcher: DispatcherHandle,
    ) -> Self {
        Self {
            store,
            registry,
            dispatcher,
        }
    }

    /// Seed the built-in definitions. Everything starts disabled so
    /// operators opt in explicitly; idempotent across restarts.
    #[instrument(skip(self))]
    pub fn install_defaults(&self) -> Result<usize> {
        let defaults = vec![
            NewJobDefinition {
                name: "Back up the scheduler database".to_string(),
                system_name: BACKUP_SYSTEM_NAME.to_string(),
                interval_value: 5,
                time_unit: TimeUnit::Minute,
                enabled: false,
            },
            NewJobDefinition {
                name: "Report yesterday's activity".to_string(),
                system_name: REPORT_SYSTEM_NAME.to_string(),
                interval_value: 1,
                time_unit: TimeUnit::Day,
                enabled: false,
            },
            NewJobDefinition {
                name: "Purge disabled and deleted jobs".to_string(),
                system_name: MAINTENANCE_SYSTEM_NAME.to_string(),
                interval_value: 5,
                time_unit: TimeUnit::Day,
                enabled: false,
            },
        ];
        let seeded = self.store.create_batch(&defaults)?;
        info!(seeded, "default job definitions installed");
        Ok(seeded)
    }

    pub fn list_jobs(
        &self,
        include_disabled: bool,
        include_deleted: bool,
    ) -> Result<Vec<JobDefinition>> {
        Ok(self.store.list(JobFilter {
            include_disabled,
            include_deleted,
        })?)
    }

    /// Validate then persist a new definition.
    #[instrument(skip(self, new), fields(system_name = %new.system_name))]
    pub fn create_job(&self, new: NewJobDefinition) -> Result<JobDefinition> {
        if new.interval_value == 0 {
            return Err(SchedulerError::Validation(
                "interval_value must be positive".to_string(),
            ));
        }
        if !self.registry.contains(&new.system_name) {
            return Err(SchedulerError::UnknownJob {
                system_name: new.system_name,
            });
        }
        if self.store.get_by_system_name(&new.system_name)?.is_some() {
            return Err(SchedulerError::Validation(format!(
                "a definition for '{}' already exists",
                new.system_name
            )));
        }
        Ok(self.store.create(&new)?)
    }

    /// Apply a partial update. Deleted definitions cannot be edited or
    /// revived; they must be re-created.
    #[instrument(skip(self, update))]
    pub fn update_job(&self, id: &str, update: JobUpdate) -> Result<JobDefinition> {
        let mut def = self.visible(id)?;

        if let Some(name) = update.name {
            def.name = name;
        }
        if let Some(interval_value) = update.interval_value {
            def.interval_value = interval_value;
        }
        if let Some(time_unit) = update.time_unit {
            def.time_unit = time_unit;
        }
        if let Some(enabled) = update.enabled {
            def.enabled = enabled;
        }

        if def.interval_value == 0 {
            return Err(SchedulerError::Validation(
                "interval_value must be positive".to_string(),
            ));
        }

        self.store.update(&def)?;
        self.visible(id)
    }

    /// Soft-delete: the row leaves listings and dispatch but survives until
    /// a purge.
    #[instrument(skip(self))]
    pub fn delete_job(&self, id: &str) -> Result<()> {
        self.visible(id)?;
        Ok(self.store.soft_delete(id)?)
    }

    /// Remove every soft-deleted or disabled definition right now,
    /// regardless of the maintenance grace period. Returns the count.
    #[instrument(skip(self))]
    pub fn clear_all_jobs(&self) -> Result<usize> {
        Ok(self.store.hard_delete_purged()?)
    }

    /// Force-trigger a job, bypassing its recurrence rule. The execution is
    /// detached; its outcome lands in the definition's run bookkeeping.
    #[instrument(skip(self))]
    pub fn run_job_now(&self, id: &str) -> Result<()> {
        let _handle = self.dispatcher.run_now(id)?;
        Ok(())
    }

    fn visible(&self, id: &str) -> Result<JobDefinition> {
        self.store
            .get(id)?
            .filter(|d| d.state() != JobState::Deleted)
            .ok_or_else(|| SchedulerError::NotFound { id: id.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use rusqlite::Connection;
    use tokio::sync::watch;

    use chronod_core::config::DispatcherConfig;

    use crate::dispatcher::Dispatcher;
    use crate::registry::{Job, JobContext, RegistryBuilder};

    struct NoopJob(&'static str);

    #[async_trait]
    impl Job for NoopJob {
        fn system_name(&self) -> &str {
            self.0
        }
        fn describe(&self) -> &str {
            "noop"
        }
        async fn execute(&self, _ctx: &JobContext) -> anyhow::Result<()> {
            Ok(())
        }
    }

    struct Fixture {
        service: SchedulerService,
        store: Arc<ScheduleStore>,
        _shutdown_tx: watch::Sender<bool>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(ScheduleStore::new(Connection::open_in_memory().unwrap()).unwrap());
        let registry = Arc::new(
            RegistryBuilder::new()
                .register(Arc::new(NoopJob("test.job")))
                .unwrap()
                .register(Arc::new(NoopJob(BACKUP_SYSTEM_NAME)))
                .unwrap()
                .register(Arc::new(NoopJob(REPORT_SYSTEM_NAME)))
                .unwrap()
                .register(Arc::new(NoopJob(MAINTENANCE_SYSTEM_NAME)))
                .unwrap()
                .build(),
        );
        let (shutdown_tx, rx) = watch::channel(false);
        let dispatcher = Dispatcher::new(
            Arc::clone(&store),
            Arc::clone(&registry),
            &DispatcherConfig::default(),
            rx,
        );
        let service = SchedulerService::new(Arc::clone(&store), registry, dispatcher.handle());
        Fixture {
            service,
            store,
            _shutdown_tx: shutdown_tx,
        }
    }

    fn request(system_name: &str, interval_value: u32) -> NewJobDefinition {
        NewJobDefinition {
            name: system_name.to_string(),
            system_name: system_name.to_string(),
            interval_value,
            time_unit: TimeUnit::Minute,
            enabled: true,
        }
    }

    #[test]
    fn create_rejects_zero_interval_without_persisting() {
        let f = fixture();
        assert!(matches!(
            f.service.create_job(request("test.job", 0)),
            Err(SchedulerError::Validation(_))
        ));
        assert!(f.service.list_jobs(true, true).unwrap().is_empty());
    }

    #[test]
    fn create_rejects_unregistered_system_name_without_persisting() {
        let f = fixture();
        assert!(matches!(
            f.service.create_job(request("unregistered-job", 5)),
            Err(SchedulerError::UnknownJob { .. })
        ));
        assert!(f.service.list_jobs(true, true).unwrap().is_empty());
    }

    #[test]
    fn create_rejects_live_duplicates() {
        let f = fixture();
        f.service.create_job(request("test.job", 5)).unwrap();
        assert!(matches!(
            f.service.create_job(request("test.job", 5)),
            Err(SchedulerError::Validation(_))
        ));
    }

    #[test]
    fn install_defaults_seeds_once_and_disabled() {
        let f = fixture();
        assert_eq!(f.service.install_defaults().unwrap(), 3);
        assert_eq!(f.service.install_defaults().unwrap(), 0);

        let jobs = f.service.list_jobs(true, false).unwrap();
        assert_eq!(jobs.len(), 3);
        assert!(jobs.iter().all(|d| !d.enabled));
    }

    #[test]
    fn update_applies_partial_fields() {
        let f = fixture();
        let def = f.service.create_job(request("test.job", 5)).unwrap();

        let updated = f
            .service
            .update_job(
                &def.id,
                JobUpdate {
                    interval_value: Some(10),
                    enabled: Some(false),
                    ..JobUpdate::default()
                },
            )
            .unwrap();
        assert_eq!(updated.interval_value, 10);
        assert!(!updated.enabled);
        assert_eq!(updated.name, def.name);

        assert!(matches!(
            f.service.update_job(&def.id, JobUpdate {
                interval_value: Some(0),
                ..JobUpdate::default()
            }),
            Err(SchedulerError::Validation(_))
        ));
    }

    #[test]
    fn deleted_definitions_are_invisible_to_admin_calls() {
        let f = fixture();
        let def = f.service.create_job(request("test.job", 5)).unwrap();
        f.service.delete_job(&def.id).unwrap();

        assert!(matches!(
            f.service.delete_job(&def.id),
            Err(SchedulerError::NotFound { .. })
        ));
        assert!(matches!(
            f.service
                .update_job(&def.id, JobUpdate { enabled: Some(true), ..JobUpdate::default() }),
            Err(SchedulerError::NotFound { .. })
        ));
        // Still present in the raw store until a purge runs.
        assert!(f.store.get(&def.id).unwrap().is_some());
    }

    #[test]
    fn clear_all_reports_the_removed_count() {
        let f = fixture();
        f.service.install_defaults().unwrap(); // three disabled rows
        let keep = f.service.create_job(request("test.job", 5)).unwrap();

        assert_eq!(f.service.clear_all_jobs().unwrap(), 3);
        let rest = f.service.list_jobs(true, true).unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].id, keep.id);
    }

    #[tokio::test]
    async fn run_job_now_is_not_found_for_missing_or_deleted() {
        let f = fixture();
        assert!(matches!(
            f.service.run_job_now("missing"),
            Err(SchedulerError::NotFound { .. })
        ));

        let def = f.service.create_job(request("test.job", 5)).unwrap();
        f.service.delete_job(&def.id).unwrap();
        assert!(matches!(
            f.service.run_job_now(&def.id),
            Err(SchedulerError::NotFound { .. })
        ));
    }
}

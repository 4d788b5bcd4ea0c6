//! Closed job registry: a startup-time mapping from system names to
//! executable implementations, immutable once built.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{Result, SchedulerError};

/// Per-run metadata handed to a job implementation.
#[derive(Debug, Clone)]
pub struct JobContext {
    /// ID of the definition that fired.
    pub job_id: String,
    pub system_name: String,
    /// The dispatch-decision instant; also what gets recorded as the
    /// definition's last run time.
    pub fired_at: DateTime<Utc>,
}

/// Contract every schedulable job implements.
///
/// Executions may be cancelled at any await point (timeout or process
/// shutdown) and may be retried after a recorded failure, so side effects
/// must be left in a recoverable state.
#[async_trait]
pub trait Job: Send + Sync {
    /// Stable key this implementation is registered and persisted under.
    fn system_name(&self) -> &str;
    /// One-line human-readable description.
    fn describe(&self) -> &str;
    async fn execute(&self, ctx: &JobContext) -> anyhow::Result<()>;
}

/// Collects registrations before the process starts dispatching.
#[derive(Default)]
pub struct RegistryBuilder {
    jobs: HashMap<String, Arc<dyn Job>>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a job. A second registration under the same system name is a
    /// startup-time error, never a silent overwrite.
    pub fn register(mut self, job: Arc<dyn Job>) -> Result<Self> {
        let system_name = job.system_name().to_string();
        if self.jobs.contains_key(&system_name) {
            return Err(SchedulerError::DuplicateJob { system_name });
        }
        self.jobs.insert(system_name, job);
        Ok(self)
    }

    pub fn build(self) -> JobRegistry {
        JobRegistry { jobs: self.jobs }
    }
}

/// Read-only map from system name to implementation.
pub struct JobRegistry {
    jobs: HashMap<String, Arc<dyn Job>>,
}

impl JobRegistry {
    pub fn resolve(&self, system_name: &str) -> Result<Arc<dyn Job>> {
        self.jobs
            .get(system_name)
            .cloned()
            .ok_or_else(|| SchedulerError::UnknownJob {
                system_name: system_name.to_string(),
            })
    }

    pub fn contains(&self, system_name: &str) -> bool {
        self.jobs.contains_key(system_name)
    }

    /// Registered system names, for listings and create-time validation.
    pub fn system_names(&self) -> Vec<&str> {
        self.jobs.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoopJob(&'static str);

    #[async_trait]
    impl Job for NoopJob {
        fn system_name(&self) -> &str {
            self.0
        }
        fn describe(&self) -> &str {
            "does nothing"
        }
        async fn execute(&self, _ctx: &JobContext) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn resolve_registered_job() {
        let registry = RegistryBuilder::new()
            .register(Arc::new(NoopJob("a")))
            .unwrap()
            .build();
        assert!(registry.contains("a"));
        assert_eq!(registry.resolve("a").unwrap().system_name(), "a");
    }

    #[test]
    fn resolve_unknown_fails() {
        let registry = RegistryBuilder::new().build();
        assert!(matches!(
            registry.resolve("ghost"),
            Err(SchedulerError::UnknownJob { .. })
        ));
    }

    #[test]
    fn duplicate_registration_is_fatal() {
        let result = RegistryBuilder::new()
            .register(Arc::new(NoopJob("a")))
            .unwrap()
            .register(Arc::new(NoopJob("a")));
        assert!(matches!(result, Err(SchedulerError::DuplicateJob { .. })));
    }
}

//! Tick-driven dispatch: scan the store, filter due definitions, run each
//! in a bounded worker pool under a per-id overlap guard.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use chronod_core::config::DispatcherConfig;
use chronod_store::{JobFilter, JobDefinition, RunStatus, ScheduleStore};

use crate::error::{Result, SchedulerError};
use crate::recurrence;
use crate::registry::{JobContext, JobRegistry};

struct Shared {
    store: Arc<ScheduleStore>,
    registry: Arc<JobRegistry>,
    /// IDs with an execution currently in flight.
    running: Mutex<HashSet<String>>,
    /// Bounds worst-case parallelism across all jobs.
    workers: Arc<Semaphore>,
    job_timeout: Duration,
    /// Flips to true when the process is shutting down; in-flight
    /// executions are cancelled and recorded as failed.
    shutdown: watch::Receiver<bool>,
}

/// Releases the per-id run guard when an execution finishes, however it
/// finishes.
struct RunGuard {
    shared: Arc<Shared>,
    id: String,
}

impl RunGuard {
    /// Claim the guard for `id`. Returns `None` when a run is already in
    /// flight — the caller skips, never queues.
    fn try_claim(shared: &Arc<Shared>, id: &str) -> Option<RunGuard> {
        let mut running = shared.running.lock().unwrap();
        if running.insert(id.to_string()) {
            Some(RunGuard {
                shared: Arc::clone(shared),
                id: id.to_string(),
            })
        } else {
            None
        }
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.shared.running.lock().unwrap().remove(&self.id);
    }
}

/// Drives the scan/dispatch loop. Create once, call [`handle`](Self::handle)
/// for the administrative force-trigger side, then hand the dispatcher to
/// [`run`](Self::run) on its own task.
pub struct Dispatcher {
    shared: Arc<Shared>,
    tick: Duration,
}

/// Cheap clone of the dispatcher's shared state for "run now" calls while
/// the loop owns the `Dispatcher` itself.
#[derive(Clone)]
pub struct DispatcherHandle {
    shared: Arc<Shared>,
}

impl Dispatcher {
    pub fn new(
        store: Arc<ScheduleStore>,
        registry: Arc<JobRegistry>,
        config: &DispatcherConfig,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                store,
                registry,
                running: Mutex::new(HashSet::new()),
                workers: Arc::new(Semaphore::new(config.max_parallel_jobs.max(1))),
                job_timeout: Duration::from_secs(config.job_timeout_secs),
                shutdown,
            }),
            tick: Duration::from_secs(config.tick_secs.max(1)),
        }
    }

    pub fn handle(&self) -> DispatcherHandle {
        DispatcherHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Main loop. Ticks on the configured cadence until shutdown.
    pub async fn run(self) {
        info!(tick_secs = self.tick.as_secs(), "dispatcher started");
        let mut shutdown = self.shared.shutdown.clone();
        let mut interval = tokio::time::interval(self.tick);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    // Store unavailability is systemic but non-fatal: log
                    // and retry on the next tick.
                    if let Err(e) = self.tick_at(Utc::now()) {
                        error!("dispatcher tick error: {e}");
                    }
                }
                res = shutdown.changed() => {
                    // A closed channel means the owner is gone; stop too.
                    if res.is_err() || *shutdown.borrow() {
                        info!("dispatcher shutting down");
                        break;
                    }
                }
            }
        }
    }

    /// One scan/dispatch pass at virtual time `now`. Returns a handle per
    /// spawned execution; the run loop detaches them, tests await them.
    pub fn tick_at(&self, now: DateTime<Utc>) -> Result<Vec<JoinHandle<()>>> {
        let candidates = self.shared.store.list(JobFilter::default())?;

        let mut handles = Vec::new();
        for def in candidates {
            if !recurrence::is_due(&def, now) {
                continue;
            }
            let Some(guard) = RunGuard::try_claim(&self.shared, &def.id) else {
                // Still running from a previous interval: skip, don't queue.
                debug!(job_id = %def.id, "overlapping run skipped");
                continue;
            };
            handles.push(spawn_execute(Arc::clone(&self.shared), def, now, guard));
        }
        Ok(handles)
    }
}

impl DispatcherHandle {
    /// Force-trigger `id` immediately, bypassing the due check but honoring
    /// the per-id run guard and the normal failure isolation.
    pub fn run_now(&self, id: &str) -> Result<JoinHandle<()>> {
        let def = self
            .shared
            .store
            .get(id)?
            .filter(|d| !d.deleted)
            .ok_or_else(|| SchedulerError::NotFound { id: id.to_string() })?;

        let Some(guard) = RunGuard::try_claim(&self.shared, &def.id) else {
            return Err(SchedulerError::AlreadyRunning { id: id.to_string() });
        };

        info!(job_id = %def.id, system_name = %def.system_name, "force-triggered");
        Ok(spawn_execute(Arc::clone(&self.shared), def, Utc::now(), guard))
    }
}

/// Run one execution attempt on its own task and record the outcome.
///
/// Every failure path — unknown registration, job error, timeout, shutdown
/// cancellation — ends in `record_run_result`; nothing here can abort the
/// tick that spawned it.
fn spawn_execute(
    shared: Arc<Shared>,
    def: JobDefinition,
    fired_at: DateTime<Utc>,
    guard: RunGuard,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let _guard = guard;

        let Ok(_permit) = Arc::clone(&shared.workers).acquire_owned().await else {
            return; // pool closed: process is going away
        };

        let status = match shared.registry.resolve(&def.system_name) {
            Err(e) => {
                warn!(job_id = %def.id, "cannot dispatch: {e}");
                RunStatus::Failed
            }
            Ok(job) => {
                let ctx = JobContext {
                    job_id: def.id.clone(),
                    system_name: def.system_name.clone(),
                    fired_at,
                };
                let mut shutdown = shared.shutdown.clone();
                let cancelled = async move {
                    // Completes only on a real shutdown signal. A dropped
                    // sender without a signal must not cancel the run.
                    if shutdown.wait_for(|stopping| *stopping).await.is_err() {
                        std::future::pending::<()>().await;
                    }
                };
                tokio::select! {
                    outcome = tokio::time::timeout(shared.job_timeout, job.execute(&ctx)) => {
                        match outcome {
                            Ok(Ok(())) => {
                                debug!(job_id = %def.id, system_name = %def.system_name, "job succeeded");
                                RunStatus::Success
                            }
                            Ok(Err(e)) => {
                                warn!(job_id = %def.id, system_name = %def.system_name, "job failed: {e:#}");
                                RunStatus::Failed
                            }
                            Err(_) => {
                                warn!(
                                    job_id = %def.id,
                                    timeout_secs = shared.job_timeout.as_secs(),
                                    "job timed out"
                                );
                                RunStatus::Failed
                            }
                        }
                    }
                    _ = cancelled => {
                        warn!(job_id = %def.id, "job cancelled by shutdown");
                        RunStatus::Failed
                    }
                }
            }
        };

        // The guard serialises result writes per id, so completions can
        // never overwrite each other out of order.
        if let Err(e) = shared.store.record_run_result(&def.id, fired_at, status) {
            error!(job_id = %def.id, "failed to record run result: {e}");
        }
    })
}

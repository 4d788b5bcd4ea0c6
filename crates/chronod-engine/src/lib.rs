//! `chronod-engine` — the scheduling kernel: recurrence arithmetic, the job
//! registry, the tick-driven dispatcher, and the administrative façade.
//!
//! # Overview
//!
//! Definitions live in [`chronod_store`]. Every tick the [`Dispatcher`]
//! lists enabled, non-deleted definitions, asks [`recurrence::is_due`]
//! which have reached their period boundary, resolves each through the
//! [`JobRegistry`], and runs it in a bounded worker pool under a per-id
//! overlap guard. Outcomes are written back as run bookkeeping, which in
//! turn drives the next due computation.
//!
//! Failure isolation is the design rule throughout: a job that errors,
//! times out, or has no registered implementation is recorded as failed
//! and never affects the tick or its neighbors.

pub mod dispatcher;
pub mod error;
pub mod jobs;
pub mod maintenance;
pub mod recurrence;
pub mod registry;
pub mod service;

pub use dispatcher::{Dispatcher, DispatcherHandle};
pub use error::{Result, SchedulerError};
pub use maintenance::{MaintenanceJob, MAINTENANCE_SYSTEM_NAME};
pub use registry::{Job, JobContext, JobRegistry, RegistryBuilder};
pub use service::{JobUpdate, SchedulerService};

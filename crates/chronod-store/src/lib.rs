//! `chronod-store` — SQLite persistence for scheduler job definitions.
//!
//! One `jobs` table holds every [`JobDefinition`]. The [`ScheduleStore`]
//! wraps a single connection behind a `Mutex`; every mutation is a single
//! SQL statement, so a dispatcher-issued run-result write can never lose a
//! race against a concurrent administrative update.

pub mod db;
pub mod error;
pub mod store;
pub mod types;

pub use error::{Result, StoreError};
pub use store::{JobFilter, ScheduleStore};
pub use types::{JobDefinition, JobState, NewJobDefinition, RunStatus, TimeUnit};

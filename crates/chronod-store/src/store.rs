use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::types::{JobDefinition, NewJobDefinition, RunStatus, TimeUnit};

/// Which rows a [`ScheduleStore::list`] call should return.
///
/// The default selects dispatch candidates only: enabled and not deleted.
#[derive(Debug, Clone, Copy, Default)]
pub struct JobFilter {
    pub include_disabled: bool,
    pub include_deleted: bool,
}

const SELECT_COLS: &str = "id, name, system_name, interval_value, time_unit,
        enabled, deleted, last_run_time, last_run_status, created_at, updated_at";

/// Thread-safe store for persisted job definitions.
///
/// Wraps a single SQLite connection in a `Mutex`. Every mutation is one SQL
/// statement, so concurrent writers (dispatcher workers recording results,
/// admin calls editing fields) can never interleave a read-modify-write.
pub struct ScheduleStore {
    db: Mutex<Connection>,
}

impl ScheduleStore {
    /// Wrap an already-open connection, initialising the schema if needed.
    pub fn new(conn: Connection) -> Result<Self> {
        crate::db::init_db(&conn)?;
        Ok(Self {
            db: Mutex::new(conn),
        })
    }

    /// Insert a new definition. Returns the fully populated record.
    ///
    /// A live duplicate `system_name` surfaces as a constraint violation;
    /// callers that want a typed error should check first (the service
    /// façade does).
    #[instrument(skip(self, new), fields(system_name = %new.system_name))]
    pub fn create(&self, new: &NewJobDefinition) -> Result<JobDefinition> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT INTO jobs
             (id, name, system_name, interval_value, time_unit,
              enabled, deleted, last_run_time, last_run_status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, NULL, 'never', ?7, ?7)",
            rusqlite::params![
                id,
                new.name,
                new.system_name,
                new.interval_value,
                new.time_unit.to_string(),
                new.enabled,
                now
            ],
        )?;
        info!(job_id = %id, "job definition created");

        Ok(JobDefinition {
            id,
            name: new.name.clone(),
            system_name: new.system_name.clone(),
            interval_value: new.interval_value,
            time_unit: new.time_unit,
            enabled: new.enabled,
            deleted: false,
            last_run_time: None,
            last_run_status: RunStatus::Never,
            created_at: now.clone(),
            updated_at: now,
        })
    }

    /// Batch seed. A definition whose `system_name` already exists as a
    /// non-deleted row is left untouched, so the call is idempotent.
    /// Returns the number of rows actually inserted.
    #[instrument(skip_all, fields(count = defs.len()))]
    pub fn create_batch(&self, defs: &[NewJobDefinition]) -> Result<usize> {
        let now = Utc::now().to_rfc3339();
        let db = self.db.lock().unwrap();
        let mut inserted = 0;
        for new in defs {
            // OR IGNORE rides on the partial unique index over live rows.
            let n = db.execute(
                "INSERT OR IGNORE INTO jobs
                 (id, name, system_name, interval_value, time_unit,
                  enabled, deleted, last_run_time, last_run_status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, NULL, 'never', ?7, ?7)",
                rusqlite::params![
                    Uuid::new_v4().to_string(),
                    new.name,
                    new.system_name,
                    new.interval_value,
                    new.time_unit.to_string(),
                    new.enabled,
                    now
                ],
            )?;
            inserted += n;
        }
        info!(inserted, "batch seed complete");
        Ok(inserted)
    }

    /// Retrieve a definition by ID, returning `None` if it does not exist.
    pub fn get(&self, id: &str) -> Result<Option<JobDefinition>> {
        let db = self.db.lock().unwrap();
        match db.query_row(
            &format!("SELECT {SELECT_COLS} FROM jobs WHERE id = ?1"),
            rusqlite::params![id],
            row_to_def,
        ) {
            Ok(def) => Ok(Some(def)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StoreError::Database(e)),
        }
    }

    /// Retrieve a live (non-deleted) definition by its system name.
    pub fn get_by_system_name(&self, system_name: &str) -> Result<Option<JobDefinition>> {
        let db = self.db.lock().unwrap();
        match db.query_row(
            &format!("SELECT {SELECT_COLS} FROM jobs WHERE system_name = ?1 AND deleted = 0"),
            rusqlite::params![system_name],
            row_to_def,
        ) {
            Ok(def) => Ok(Some(def)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StoreError::Database(e)),
        }
    }

    /// List definitions matching `filter`, ordered by creation time.
    pub fn list(&self, filter: JobFilter) -> Result<Vec<JobDefinition>> {
        let mut sql = format!("SELECT {SELECT_COLS} FROM jobs WHERE 1 = 1");
        if !filter.include_disabled {
            sql.push_str(" AND enabled = 1");
        }
        if !filter.include_deleted {
            sql.push_str(" AND deleted = 0");
        }
        sql.push_str(" ORDER BY created_at");

        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(&sql)?;
        let defs = stmt
            .query_map([], row_to_def)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(defs)
    }

    /// Update the mutable fields of a definition: name, interval, unit,
    /// enabled. `id` and `system_name` are immutable; run bookkeeping is
    /// only written through [`record_run_result`](Self::record_run_result).
    #[instrument(skip(self, def), fields(job_id = %def.id))]
    pub fn update(&self, def: &JobDefinition) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let db = self.db.lock().unwrap();
        let n = db.execute(
            "UPDATE jobs
             SET name = ?1, interval_value = ?2, time_unit = ?3,
                 enabled = ?4, updated_at = ?5
             WHERE id = ?6",
            rusqlite::params![
                def.name,
                def.interval_value,
                def.time_unit.to_string(),
                def.enabled,
                now,
                def.id
            ],
        )?;
        if n == 0 {
            return Err(StoreError::NotFound { id: def.id.clone() });
        }
        debug!(job_id = %def.id, "job definition updated");
        Ok(())
    }

    /// Mark a definition deleted without erasing it. Purged later by the
    /// maintenance sweep or an explicit clear-all.
    #[instrument(skip(self))]
    pub fn soft_delete(&self, id: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let db = self.db.lock().unwrap();
        let n = db.execute(
            "UPDATE jobs SET deleted = 1, enabled = 0, updated_at = ?1 WHERE id = ?2",
            rusqlite::params![now, id],
        )?;
        if n == 0 {
            return Err(StoreError::NotFound { id: id.to_string() });
        }
        info!(job_id = %id, "job definition soft-deleted");
        Ok(())
    }

    /// Remove every soft-deleted or disabled row. Returns the count removed.
    #[instrument(skip(self))]
    pub fn hard_delete_purged(&self) -> Result<usize> {
        let db = self.db.lock().unwrap();
        let n = db.execute("DELETE FROM jobs WHERE deleted = 1 OR enabled = 0", [])?;
        info!(removed = n, "purged disabled/deleted job definitions");
        Ok(n)
    }

    /// Grace-period variant of [`hard_delete_purged`](Self::hard_delete_purged):
    /// only rows last touched before `cutoff` are removed, and the row named
    /// by `keep_system_name` (the maintenance job itself) is always spared.
    #[instrument(skip(self), fields(cutoff = %cutoff))]
    pub fn purge_stale(&self, cutoff: DateTime<Utc>, keep_system_name: &str) -> Result<usize> {
        let db = self.db.lock().unwrap();
        let n = db.execute(
            "DELETE FROM jobs
             WHERE (deleted = 1 OR enabled = 0)
               AND updated_at < ?1
               AND system_name != ?2",
            rusqlite::params![cutoff.to_rfc3339(), keep_system_name],
        )?;
        if n > 0 {
            info!(removed = n, "purged stale job definitions");
        }
        Ok(n)
    }

    /// Write a compacted copy of the whole database to `path`.
    ///
    /// Uses `VACUUM INTO`, which snapshots consistently while other
    /// statements keep running against the live file.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub fn backup_to(&self, path: &std::path::Path) -> Result<()> {
        let db = self.db.lock().unwrap();
        db.execute("VACUUM INTO ?1", rusqlite::params![path.to_string_lossy()])?;
        info!("database backed up");
        Ok(())
    }

    /// Record the outcome of an execution attempt. One atomic statement —
    /// never a read followed by a write.
    #[instrument(skip(self), fields(job_id = %id, %status))]
    pub fn record_run_result(
        &self,
        id: &str,
        timestamp: DateTime<Utc>,
        status: RunStatus,
    ) -> Result<()> {
        let ts = timestamp.to_rfc3339();
        let db = self.db.lock().unwrap();
        let n = db.execute(
            "UPDATE jobs
             SET last_run_time = ?1, last_run_status = ?2, updated_at = ?1
             WHERE id = ?3",
            rusqlite::params![ts, status.to_string(), id],
        )?;
        if n == 0 {
            return Err(StoreError::NotFound { id: id.to_string() });
        }
        Ok(())
    }
}

fn row_to_def(row: &rusqlite::Row<'_>) -> rusqlite::Result<JobDefinition> {
    let time_unit: String = row.get(4)?;
    let last_run_time: Option<String> = row.get(7)?;
    let last_run_status: String = row.get(8)?;
    Ok(JobDefinition {
        id: row.get(0)?,
        name: row.get(1)?,
        system_name: row.get(2)?,
        interval_value: row.get(3)?,
        time_unit: time_unit.parse().unwrap_or(TimeUnit::Day),
        enabled: row.get(5)?,
        deleted: row.get(6)?,
        last_run_time: last_run_time.and_then(|s| {
            DateTime::parse_from_rfc3339(&s)
                .ok()
                .map(|dt| dt.with_timezone(&Utc))
        }),
        last_run_status: last_run_status.parse().unwrap_or(RunStatus::Never),
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

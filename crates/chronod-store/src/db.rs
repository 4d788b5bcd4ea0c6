use rusqlite::Connection;

use crate::error::Result;

/// Initialise the scheduler schema in `conn`.
///
/// Creates the `jobs` table (idempotent) and a partial index covering the
/// dispatcher's per-tick candidate query.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS jobs (
            id              TEXT    NOT NULL PRIMARY KEY,
            name            TEXT    NOT NULL,
            system_name     TEXT    NOT NULL,
            interval_value  INTEGER NOT NULL,
            time_unit       TEXT    NOT NULL,
            enabled         INTEGER NOT NULL DEFAULT 0,
            deleted         INTEGER NOT NULL DEFAULT 0,
            last_run_time   TEXT,               -- ISO-8601 or NULL
            last_run_status TEXT    NOT NULL DEFAULT 'never',
            created_at      TEXT    NOT NULL,
            updated_at      TEXT    NOT NULL
        ) STRICT;

        -- Dispatcher scan: SELECT … WHERE enabled = 1 AND deleted = 0
        CREATE INDEX IF NOT EXISTS idx_jobs_candidates
            ON jobs (enabled, deleted);

        -- One live definition per system_name; purged rows don't count.
        CREATE UNIQUE INDEX IF NOT EXISTS idx_jobs_system_name_live
            ON jobs (system_name) WHERE deleted = 0;
        ",
    )?;
    Ok(())
}

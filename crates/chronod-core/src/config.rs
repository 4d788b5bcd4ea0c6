use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Dispatcher tick cadence. One second is coarse enough not to busy-loop and
/// fine enough to honor second-granularity recurrences.
pub const DEFAULT_TICK_SECS: u64 = 1;
/// Upper bound on simultaneously executing jobs.
pub const DEFAULT_MAX_PARALLEL_JOBS: usize = 4;
/// A job still running after this long is cancelled and recorded as failed.
pub const DEFAULT_JOB_TIMEOUT_SECS: u64 = 300;
/// Disabled or soft-deleted definitions younger than this survive the
/// maintenance sweep (they can still be inspected or re-created from).
pub const DEFAULT_MAINTENANCE_GRACE_DAYS: i64 = 7;

/// Top-level config (chronod.toml + CHRONOD_* env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChronodConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub dispatcher: DispatcherConfig,
    #[serde(default)]
    pub maintenance: MaintenanceConfig,
    #[serde(default)]
    pub backup: BackupConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatcherConfig {
    #[serde(default = "default_tick_secs")]
    pub tick_secs: u64,
    #[serde(default = "default_max_parallel_jobs")]
    pub max_parallel_jobs: usize,
    #[serde(default = "default_job_timeout_secs")]
    pub job_timeout_secs: u64,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            tick_secs: DEFAULT_TICK_SECS,
            max_parallel_jobs: DEFAULT_MAX_PARALLEL_JOBS,
            job_timeout_secs: DEFAULT_JOB_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceConfig {
    #[serde(default = "default_grace_days")]
    pub grace_days: i64,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            grace_days: DEFAULT_MAINTENANCE_GRACE_DAYS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupConfig {
    #[serde(default = "default_backup_dir")]
    pub dir: String,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            dir: default_backup_dir(),
        }
    }
}

impl ChronodConfig {
    /// Load config: explicit path > `~/.chronod/chronod.toml` > built-in
    /// defaults, with CHRONOD_* env vars layered on top.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: ChronodConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("CHRONOD_").split("_"))
            .extract()
            .map_err(|e| crate::error::CoreError::Config(e.to_string()))?;

        Ok(config)
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.chronod/chronod.toml", home)
}

fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.chronod/chronod.db", home)
}

fn default_backup_dir() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.chronod/backups", home)
}

fn default_tick_secs() -> u64 {
    DEFAULT_TICK_SECS
}

fn default_max_parallel_jobs() -> usize {
    DEFAULT_MAX_PARALLEL_JOBS
}

fn default_job_timeout_secs() -> u64 {
    DEFAULT_JOB_TIMEOUT_SECS
}

fn default_grace_days() -> i64 {
    DEFAULT_MAINTENANCE_GRACE_DAYS
}

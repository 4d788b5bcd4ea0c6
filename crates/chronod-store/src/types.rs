use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unit half of a recurrence rule. Combined with an interval multiplier it
/// forms the full period, e.g. `5 × Minute`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeUnit {
    Second,
    Minute,
    Hour,
    Day,
    /// Calendar month — added via date arithmetic, not a fixed 30 days.
    Month,
    /// Calendar year — added via date arithmetic, not a fixed 365 days.
    Year,
}

impl std::fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TimeUnit::Second => "second",
            TimeUnit::Minute => "minute",
            TimeUnit::Hour => "hour",
            TimeUnit::Day => "day",
            TimeUnit::Month => "month",
            TimeUnit::Year => "year",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for TimeUnit {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "second" => Ok(TimeUnit::Second),
            "minute" => Ok(TimeUnit::Minute),
            "hour" => Ok(TimeUnit::Hour),
            "day" => Ok(TimeUnit::Day),
            "month" => Ok(TimeUnit::Month),
            "year" => Ok(TimeUnit::Year),
            other => Err(format!("unknown time unit: {other}")),
        }
    }
}

/// Outcome of the most recent execution attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// The job has not been executed yet.
    Never,
    Success,
    Failed,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RunStatus::Never => "never",
            RunStatus::Success => "success",
            RunStatus::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for RunStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "never" => Ok(RunStatus::Never),
            "success" => Ok(RunStatus::Success),
            "failed" => Ok(RunStatus::Failed),
            other => Err(format!("unknown run status: {other}")),
        }
    }
}

/// Effective lifecycle state, derived from the `enabled`/`deleted` flags.
///
/// `Deleted` wins over `Disabled`: a soft-deleted row stays deleted until it
/// is purged, regardless of its enabled flag. There is no `Deleted → Active`
/// transition; a deleted definition must be re-created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Enabled and not deleted — a dispatch candidate.
    Active,
    /// Present but opted out of dispatch.
    Disabled,
    /// Soft-deleted — hidden from normal listings, awaiting purge.
    Deleted,
}

/// A persisted job definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDefinition {
    /// UUID v4 string — primary key, immutable.
    pub id: String,
    /// Human-readable label.
    pub name: String,
    /// Stable key binding this definition to its registered implementation.
    /// Unique among non-deleted rows; immutable after creation.
    pub system_name: String,
    /// Positive multiplier over `time_unit`.
    pub interval_value: u32,
    pub time_unit: TimeUnit,
    /// Only enabled definitions are dispatch candidates.
    pub enabled: bool,
    /// Soft-delete marker.
    pub deleted: bool,
    /// Completion time of the most recent attempt, success or failure.
    pub last_run_time: Option<DateTime<Utc>>,
    pub last_run_status: RunStatus,
    /// ISO-8601 timestamp of row creation.
    pub created_at: String,
    /// ISO-8601 timestamp of the last mutation; the maintenance sweep uses
    /// it as the staleness clock for purged rows.
    pub updated_at: String,
}

impl JobDefinition {
    pub fn state(&self) -> JobState {
        if self.deleted {
            JobState::Deleted
        } else if self.enabled {
            JobState::Active
        } else {
            JobState::Disabled
        }
    }
}

/// Fields supplied by the caller when creating a definition; the store
/// assigns `id`, timestamps, and run bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewJobDefinition {
    pub name: String,
    pub system_name: String,
    pub interval_value: u32,
    pub time_unit: TimeUnit,
    pub enabled: bool,
}

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use seed_core::{ErrorInfo, SeedError};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a tracked execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// Opened by `begin`, not completed yet.
    Running,
    /// Body committed.
    Success,
    /// Body failed and its writes were rolled back.
    Failed,
    /// Supersedes an earlier success after the rollback body ran.
    RolledBack,
}

impl ExecutionStatus {
    /// Persisted representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Running => "running",
            ExecutionStatus::Success => "success",
            ExecutionStatus::Failed => "failed",
            ExecutionStatus::RolledBack => "rolled_back",
        }
    }

    /// True for every status except [`ExecutionStatus::Running`].
    pub fn is_finished(&self) -> bool {
        !matches!(self, ExecutionStatus::Running)
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionStatus {
    type Err = SeedError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "running" => Ok(ExecutionStatus::Running),
            "success" => Ok(ExecutionStatus::Success),
            "failed" => Ok(ExecutionStatus::Failed),
            "rolled_back" => Ok(ExecutionStatus::RolledBack),
            other => Err(SeedError::Tracking(
                ErrorInfo::new("tracking-status", "unknown execution status")
                    .with_context("status", other),
            )),
        }
    }
}

/// Fields of a tracking row before the store assigns its id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordDraft {
    pub seeder_name: String,
    pub environment: String,
    pub batch_number: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub records_affected: u64,
    pub status: ExecutionStatus,
    pub error_message: Option<String>,
    pub content_hash: String,
}

/// One tracking row: a seeder executed (or rolled back) in one environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub id: i64,
    pub seeder_name: String,
    pub environment: String,
    pub batch_number: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub records_affected: u64,
    pub status: ExecutionStatus,
    pub error_message: Option<String>,
    pub content_hash: String,
}

impl ExecutionRecord {
    /// Attaches a store assigned id to a draft.
    pub fn from_draft(id: i64, draft: RecordDraft) -> Self {
        Self {
            id,
            seeder_name: draft.seeder_name,
            environment: draft.environment,
            batch_number: draft.batch_number,
            started_at: draft.started_at,
            finished_at: draft.finished_at,
            records_affected: draft.records_affected,
            status: draft.status,
            error_message: draft.error_message,
            content_hash: draft.content_hash,
        }
    }

    /// Wall time between start and finish, in milliseconds.
    pub fn duration_ms(&self) -> Option<u64> {
        let finished = self.finished_at?;
        let millis = (finished - self.started_at).num_milliseconds();
        Some(u64::try_from(millis).unwrap_or(0))
    }
}

/// Conjunctive filter over tracking rows; `None` fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub seeder_name: Option<String>,
    pub environment: Option<String>,
    pub batch_number: Option<u64>,
    pub status: Option<ExecutionStatus>,
}

impl RecordFilter {
    /// Matches every row.
    pub fn any() -> Self {
        Self::default()
    }

    pub fn seeder(mut self, name: impl Into<String>) -> Self {
        self.seeder_name = Some(name.into());
        self
    }

    pub fn environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }

    pub fn batch(mut self, batch_number: u64) -> Self {
        self.batch_number = Some(batch_number);
        self
    }

    pub fn status(mut self, status: ExecutionStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Evaluates the filter in memory.
    pub fn matches(&self, record: &ExecutionRecord) -> bool {
        self.seeder_name
            .as_deref()
            .map_or(true, |name| record.seeder_name == name)
            && self
                .environment
                .as_deref()
                .map_or(true, |env| record.environment == env)
            && self
                .batch_number
                .map_or(true, |batch| record.batch_number == batch)
            && self.status.map_or(true, |status| record.status == status)
    }
}

/// How the tracker classifies a seeder against its history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// Never successfully applied, or rolled back since.
    Pending,
    /// Latest success carries the current content hash.
    UpToDate,
    /// Latest success carries a different content hash.
    Changed,
    /// Re-run requested regardless of history.
    Forced,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Pending => "pending",
            Classification::UpToDate => "up_to_date",
            Classification::Changed => "changed",
            Classification::Forced => "forced",
        }
    }

    /// Whether a run would execute the seeder body.
    pub fn needs_execution(&self) -> bool {
        !matches!(self, Classification::UpToDate)
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome passed to [`crate::Tracker::complete`]; an error message exists iff failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Success { records_affected: u64 },
    Failed { error_message: String },
}

/// Aggregate counters over tracking rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackingStatistics {
    pub total_executions: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub rolled_back: usize,
    /// Mean duration of successful executions.
    pub average_duration_ms: Option<f64>,
    /// Sum of records affected by successful executions.
    pub total_records_affected: u64,
}

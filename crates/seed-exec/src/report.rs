use chrono::{DateTime, Utc};
use seed_core::SeedError;
use seed_track::{Classification, ExecutionRecord, ExecutionStatus, TrackingStatistics};
use serde::{Deserialize, Serialize};

/// Why a candidate was not executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    UpToDate,
    EnvironmentExcluded,
    /// A dependency neither ran earlier in the invocation nor is up to date.
    DependencyNotSatisfied,
}

/// Final state of one candidate in a run invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ItemOutcome {
    /// Committed and recorded. `hook_error` is set when `after_run` failed afterwards.
    Succeeded {
        classification: Classification,
        records_affected: u64,
        duration_ms: u64,
        batch_number: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        hook_error: Option<SeedError>,
    },
    Failed {
        classification: Classification,
        error: SeedError,
    },
    Skipped {
        reason: SkipReason,
    },
    /// Dry run: the seeder would execute.
    WouldRun {
        classification: Classification,
    },
    /// Dry run: the seeder would be skipped.
    WouldSkip {
        reason: SkipReason,
    },
    /// An earlier failure aborted the invocation before this seeder ran.
    NotReached {
        classification: Classification,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunItem {
    pub name: String,
    #[serde(flatten)]
    pub outcome: ItemOutcome,
}

/// Per-candidate outcomes of a run, in execution order, plus the first fatal error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub environment: String,
    pub dry_run: bool,
    /// Allocated only when at least one seeder executed.
    pub batch_number: Option<u64>,
    pub items: Vec<RunItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<SeedError>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    pub fn succeeded(&self) -> Vec<&str> {
        self.names_where(|outcome| matches!(outcome, ItemOutcome::Succeeded { .. }))
    }

    pub fn failed(&self) -> Vec<&str> {
        self.names_where(|outcome| matches!(outcome, ItemOutcome::Failed { .. }))
    }

    pub fn skipped(&self) -> Vec<&str> {
        self.names_where(|outcome| matches!(outcome, ItemOutcome::Skipped { .. }))
    }

    pub fn not_reached(&self) -> Vec<&str> {
        self.names_where(|outcome| matches!(outcome, ItemOutcome::NotReached { .. }))
    }

    pub fn outcome(&self, name: &str) -> Option<&ItemOutcome> {
        self.items
            .iter()
            .find(|item| item.name == name)
            .map(|item| &item.outcome)
    }

    /// Converts a partially failed report into its first fatal error.
    pub fn into_result(self) -> Result<RunReport, SeedError> {
        match self.failure {
            Some(err) => Err(err),
            None => Ok(self),
        }
    }

    fn names_where(&self, predicate: impl Fn(&ItemOutcome) -> bool) -> Vec<&str> {
        self.items
            .iter()
            .filter(|item| predicate(&item.outcome))
            .map(|item| item.name.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RollbackOutcome {
    /// Committed and recorded. `hook_error` is set when `after_rollback` failed afterwards.
    RolledBack {
        duration_ms: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        hook_error: Option<SeedError>,
    },
    Failed { error: SeedError },
    WouldRollBack,
    NotReached,
    /// Tracked but no longer registered, so there is no rollback body to call.
    Unregistered,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollbackItem {
    pub name: String,
    pub batch_number: u64,
    #[serde(flatten)]
    pub outcome: RollbackOutcome,
}

/// Items in the order they were (or would be) rolled back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollbackReport {
    pub environment: String,
    pub dry_run: bool,
    pub items: Vec<RollbackItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<SeedError>,
}

impl RollbackReport {
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    pub fn rolled_back(&self) -> Vec<&str> {
        self.items
            .iter()
            .filter(|item| matches!(item.outcome, RollbackOutcome::RolledBack { .. }))
            .map(|item| item.name.as_str())
            .collect()
    }

    /// Registered seeders the rollback matched, whatever their outcome.
    pub fn matched(&self) -> Vec<&str> {
        self.items
            .iter()
            .filter(|item| !matches!(item.outcome, RollbackOutcome::Unregistered))
            .map(|item| item.name.as_str())
            .collect()
    }

    pub fn into_result(self) -> Result<RollbackReport, SeedError> {
        match self.failure {
            Some(err) => Err(err),
            None => Ok(self),
        }
    }
}

/// `run` is absent when the rollback failed or matched nothing to re-run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshReport {
    pub rollback: RollbackReport,
    pub run: Option<RunReport>,
}

impl RefreshReport {
    pub fn is_success(&self) -> bool {
        self.rollback.is_success() && self.run.as_ref().map_or(true, RunReport::is_success)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreshReport {
    /// Tracking rows forgotten before the run.
    pub cleared: usize,
    pub run: RunReport,
}

/// Per-seeder status line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeederStatus {
    pub name: String,
    pub classification: Classification,
    /// Whether the seeder applies to the environment.
    pub eligible: bool,
    pub last_status: Option<ExecutionStatus>,
    pub last_run_at: Option<DateTime<Utc>>,
    pub last_duration_ms: Option<u64>,
    pub last_records_affected: Option<u64>,
    pub last_batch: Option<u64>,
    pub last_error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<ExecutionRecord>,
}

/// Status of every registered seeder plus aggregate counters when detailed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    pub environment: String,
    pub seeders: Vec<SeederStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statistics: Option<TrackingStatistics>,
}

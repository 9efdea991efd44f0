use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use seed_core::{SeedError, SeederDefinition};

use crate::record::{
    Classification, Completion, ExecutionRecord, ExecutionStatus, RecordDraft, RecordFilter,
    TrackingStatistics,
};
use crate::store::TrackingStore;

/// Open execution returned by [`Tracker::begin`] and consumed by [`Tracker::complete`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionHandle {
    record: ExecutionRecord,
}

impl ExecutionHandle {
    pub fn id(&self) -> i64 {
        self.record.id
    }

    pub fn seeder_name(&self) -> &str {
        &self.record.seeder_name
    }

    pub fn batch_number(&self) -> u64 {
        self.record.batch_number
    }
}

/// Durable execution history on top of a [`TrackingStore`].
///
/// The tracker owns the batch counter and is the only component that writes tracking rows.
#[derive(Debug)]
pub struct Tracker<T> {
    store: T,
}

impl<T: TrackingStore> Tracker<T> {
    pub fn new(store: T) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &T {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut T {
        &mut self.store
    }

    pub fn into_store(self) -> T {
        self.store
    }

    /// Most recent row with status success or failed for the pair.
    pub fn latest(
        &self,
        seeder_name: &str,
        environment: &str,
    ) -> Result<Option<ExecutionRecord>, SeedError> {
        let rows = self.store.query(
            &RecordFilter::any()
                .seeder(seeder_name)
                .environment(environment),
        )?;
        Ok(rows.into_iter().rev().find(|record| {
            matches!(
                record.status,
                ExecutionStatus::Success | ExecutionStatus::Failed
            )
        }))
    }

    /// Most recent finished row for the pair, including rollbacks.
    pub fn current(
        &self,
        seeder_name: &str,
        environment: &str,
    ) -> Result<Option<ExecutionRecord>, SeedError> {
        let rows = self.store.query(
            &RecordFilter::any()
                .seeder(seeder_name)
                .environment(environment),
        )?;
        Ok(rows
            .into_iter()
            .rev()
            .find(|record| record.status.is_finished()))
    }

    pub fn classify(
        &self,
        definition: &SeederDefinition,
        environment: &str,
        force: bool,
    ) -> Result<Classification, SeedError> {
        if force {
            return Ok(Classification::Forced);
        }
        let classification = match self.current(&definition.name, environment)? {
            Some(record) if record.status == ExecutionStatus::Success => {
                if record.content_hash == definition.content_hash {
                    Classification::UpToDate
                } else {
                    Classification::Changed
                }
            }
            _ => Classification::Pending,
        };
        Ok(classification)
    }

    /// Persists a `running` row stamped with the current time.
    pub fn begin(
        &mut self,
        seeder_name: &str,
        environment: &str,
        batch_number: u64,
        content_hash: &str,
    ) -> Result<ExecutionHandle, SeedError> {
        let draft = RecordDraft {
            seeder_name: seeder_name.to_string(),
            environment: environment.to_string(),
            batch_number,
            started_at: Utc::now(),
            finished_at: None,
            records_affected: 0,
            status: ExecutionStatus::Running,
            error_message: None,
            content_hash: content_hash.to_string(),
        };
        let id = self.store.insert(&draft)?;
        tracing::debug!(seeder = %seeder_name, environment = %environment, batch = batch_number, id, "execution opened");
        Ok(ExecutionHandle {
            record: ExecutionRecord::from_draft(id, draft),
        })
    }

    /// Closes an open row and returns its final state.
    pub fn complete(
        &mut self,
        handle: ExecutionHandle,
        completion: Completion,
    ) -> Result<ExecutionRecord, SeedError> {
        let mut record = handle.record;
        record.finished_at = Some(Utc::now().max(record.started_at));
        match completion {
            Completion::Success { records_affected } => {
                record.status = ExecutionStatus::Success;
                record.records_affected = records_affected;
                record.error_message = None;
            }
            Completion::Failed { error_message } => {
                record.status = ExecutionStatus::Failed;
                record.records_affected = 0;
                record.error_message = Some(error_message);
            }
        }
        self.store.update(&record)?;
        tracing::debug!(
            seeder = %record.seeder_name,
            status = %record.status,
            duration_ms = record.duration_ms().unwrap_or(0),
            "execution closed"
        );
        Ok(record)
    }

    /// Writes a `rolled_back` row superseding `superseded`, keeping its batch number.
    ///
    /// `started_at` is when the rollback body started; the row finishes now.
    pub fn mark_rolled_back(
        &mut self,
        superseded: &ExecutionRecord,
        started_at: DateTime<Utc>,
    ) -> Result<ExecutionRecord, SeedError> {
        let draft = RecordDraft {
            seeder_name: superseded.seeder_name.clone(),
            environment: superseded.environment.clone(),
            batch_number: superseded.batch_number,
            started_at,
            finished_at: Some(Utc::now().max(started_at)),
            records_affected: 0,
            status: ExecutionStatus::RolledBack,
            error_message: None,
            content_hash: superseded.content_hash.clone(),
        };
        let id = self.store.insert(&draft)?;
        tracing::debug!(seeder = %draft.seeder_name, batch = draft.batch_number, id, "rollback recorded");
        Ok(ExecutionRecord::from_draft(id, draft))
    }

    pub fn next_batch_number(&mut self) -> Result<u64, SeedError> {
        let batch = self.store.next_batch()?;
        tracing::debug!(batch, "allocated batch number");
        Ok(batch)
    }

    /// Forgets tracking rows matching the filter without touching seeded data.
    pub fn clear(
        &mut self,
        seeder_name: Option<&str>,
        environment: Option<&str>,
    ) -> Result<usize, SeedError> {
        let filter = RecordFilter {
            seeder_name: seeder_name.map(str::to_string),
            environment: environment.map(str::to_string),
            ..RecordFilter::default()
        };
        let removed = self.store.delete(&filter)?;
        tracing::warn!(
            seeder = seeder_name.unwrap_or("*"),
            environment = environment.unwrap_or("*"),
            removed,
            "cleared tracking history"
        );
        Ok(removed)
    }

    pub fn records_for_batch(&self, batch_number: u64) -> Result<Vec<ExecutionRecord>, SeedError> {
        self.store.query(&RecordFilter::any().batch(batch_number))
    }

    pub fn records_for_seeder(&self, seeder_name: &str) -> Result<Vec<ExecutionRecord>, SeedError> {
        self.store.query(&RecordFilter::any().seeder(seeder_name))
    }

    /// For every seeder whose most recent finished row in `environment` is a success,
    /// that row. Ordered by id.
    pub fn current_successes(&self, environment: &str) -> Result<Vec<ExecutionRecord>, SeedError> {
        let rows = self
            .store
            .query(&RecordFilter::any().environment(environment))?;
        let mut current: BTreeMap<String, ExecutionRecord> = BTreeMap::new();
        for record in rows.into_iter().filter(|r| r.status.is_finished()) {
            current.insert(record.seeder_name.clone(), record);
        }
        let mut successes: Vec<ExecutionRecord> = current
            .into_values()
            .filter(|record| record.status == ExecutionStatus::Success)
            .collect();
        successes.sort_by_key(|record| record.id);
        Ok(successes)
    }

    pub fn history(&self, environment: Option<&str>) -> Result<Vec<ExecutionRecord>, SeedError> {
        let filter = RecordFilter {
            environment: environment.map(str::to_string),
            ..RecordFilter::default()
        };
        self.store.query(&filter)
    }

    pub fn statistics(&self, environment: Option<&str>) -> Result<TrackingStatistics, SeedError> {
        let rows = self.history(environment)?;
        let mut stats = TrackingStatistics {
            total_executions: rows.len(),
            ..TrackingStatistics::default()
        };
        let mut total_ms = 0u64;
        let mut timed = 0u64;
        for record in &rows {
            match record.status {
                ExecutionStatus::Success => {
                    stats.succeeded += 1;
                    stats.total_records_affected += record.records_affected;
                    if let Some(ms) = record.duration_ms() {
                        total_ms += ms;
                        timed += 1;
                    }
                }
                ExecutionStatus::Failed => stats.failed += 1,
                ExecutionStatus::RolledBack => stats.rolled_back += 1,
                ExecutionStatus::Running => {}
            }
        }
        if timed > 0 {
            stats.average_duration_ms = Some(total_ms as f64 / timed as f64);
        }
        Ok(stats)
    }
}

use seed_core::{ErrorInfo, SeedError};

use crate::record::{ExecutionRecord, RecordDraft, RecordFilter};

/// Persistence collaborator for tracking rows and the batch counter.
///
/// Implementations must return rows ordered by ascending id, which is also the order in
/// which they were inserted.
pub trait TrackingStore {
    /// Persists a new row and returns its id.
    fn insert(&mut self, draft: &RecordDraft) -> Result<i64, SeedError>;

    /// Overwrites the row with the same id.
    fn update(&mut self, record: &ExecutionRecord) -> Result<(), SeedError>;

    /// Rows matching `filter`, ordered by id.
    fn query(&self, filter: &RecordFilter) -> Result<Vec<ExecutionRecord>, SeedError>;

    /// Deletes rows matching `filter` and returns how many were removed.
    fn delete(&mut self, filter: &RecordFilter) -> Result<usize, SeedError>;

    /// Atomically allocates the next batch number.
    ///
    /// Numbers are never reused, including after rows are deleted.
    fn next_batch(&mut self) -> Result<u64, SeedError>;
}

impl<T: TrackingStore + ?Sized> TrackingStore for &mut T {
    fn insert(&mut self, draft: &RecordDraft) -> Result<i64, SeedError> {
        (**self).insert(draft)
    }

    fn update(&mut self, record: &ExecutionRecord) -> Result<(), SeedError> {
        (**self).update(record)
    }

    fn query(&self, filter: &RecordFilter) -> Result<Vec<ExecutionRecord>, SeedError> {
        (**self).query(filter)
    }

    fn delete(&mut self, filter: &RecordFilter) -> Result<usize, SeedError> {
        (**self).delete(filter)
    }

    fn next_batch(&mut self) -> Result<u64, SeedError> {
        (**self).next_batch()
    }
}

/// Volatile store for tests and dry tooling.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Vec<ExecutionRecord>,
    next_id: i64,
    batch_counter: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl TrackingStore for MemoryStore {
    fn insert(&mut self, draft: &RecordDraft) -> Result<i64, SeedError> {
        self.next_id += 1;
        self.records
            .push(ExecutionRecord::from_draft(self.next_id, draft.clone()));
        Ok(self.next_id)
    }

    fn update(&mut self, record: &ExecutionRecord) -> Result<(), SeedError> {
        let slot = self
            .records
            .iter_mut()
            .find(|existing| existing.id == record.id)
            .ok_or_else(|| {
                SeedError::Tracking(
                    ErrorInfo::new("tracking-missing-record", "tracking row does not exist")
                        .with_context("id", record.id.to_string()),
                )
            })?;
        *slot = record.clone();
        Ok(())
    }

    fn query(&self, filter: &RecordFilter) -> Result<Vec<ExecutionRecord>, SeedError> {
        Ok(self
            .records
            .iter()
            .filter(|record| filter.matches(record))
            .cloned()
            .collect())
    }

    fn delete(&mut self, filter: &RecordFilter) -> Result<usize, SeedError> {
        let before = self.records.len();
        self.records.retain(|record| !filter.matches(record));
        Ok(before - self.records.len())
    }

    fn next_batch(&mut self) -> Result<u64, SeedError> {
        let highest = self
            .records
            .iter()
            .map(|record| record.batch_number)
            .max()
            .unwrap_or(0);
        self.batch_counter = self.batch_counter.max(highest) + 1;
        Ok(self.batch_counter)
    }
}

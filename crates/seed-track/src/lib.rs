//! Execution tracking: tracking rows, the store contract with in-memory and SQLite
//! backends, and the [`Tracker`] that classifies seeders against their history.

mod record;
mod sqlite;
mod store;
mod tracker;

pub use record::{
    Classification, Completion, ExecutionRecord, ExecutionStatus, RecordDraft, RecordFilter,
    TrackingStatistics,
};
pub use sqlite::{SqliteStore, SCHEMA_VERSION};
pub use store::{MemoryStore, TrackingStore};
pub use tracker::{ExecutionHandle, Tracker};

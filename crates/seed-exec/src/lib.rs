//! Seeder manager: the run, rollback, refresh and status state machine on top of the
//! registry, resolver and tracker.

mod manager;
mod options;
mod report;
mod rollback;

pub use manager::SeederManager;
pub use options::{ChangePolicy, RefreshOptions, RollbackOptions, RollbackTarget, RunOptions};
pub use report::{
    FreshReport, ItemOutcome, RefreshReport, RollbackItem, RollbackOutcome, RollbackReport,
    RunItem, RunReport, SeederStatus, SkipReason, StatusReport,
};

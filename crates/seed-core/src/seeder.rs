//! Executable side of a seeder and the collaborator contracts it runs against.

use std::borrow::Cow;
use std::error::Error;

use crate::definition::SeederDefinition;

/// Error type returned by seeder bodies, hooks and session transactions.
pub type BodyError = Box<dyn Error + Send + Sync>;

/// Transaction boundary offered by the data access session.
///
/// The manager opens exactly one transaction per executed seeder: on success it commits,
/// on failure it rolls back so that only that seeder's writes are undone.
pub trait Transactional {
    /// Opens a transaction scoped to one seeder.
    fn begin(&mut self) -> Result<(), BodyError>;
    /// Makes the writes of the current transaction durable.
    fn commit(&mut self) -> Result<(), BodyError>;
    /// Discards the writes of the current transaction.
    fn rollback(&mut self) -> Result<(), BodyError>;
}

/// Per-invocation context handed to seeder bodies and hooks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedContext {
    /// Name of the seeder being executed.
    pub seeder: String,
    /// Environment the invocation targets.
    pub environment: String,
    /// Batch shared by all seeders executed in the current invocation.
    pub batch_number: Option<u64>,
    /// Advisory batch size copied from the definition.
    pub batch_size: usize,
    records_affected: u64,
}

impl SeedContext {
    /// Creates a context for `definition` in `environment`.
    pub fn new(
        definition: &SeederDefinition,
        environment: impl Into<String>,
        batch_number: Option<u64>,
    ) -> Self {
        Self {
            seeder: definition.name.clone(),
            environment: environment.into(),
            batch_number,
            batch_size: definition.batch_size,
            records_affected: 0,
        }
    }

    /// Adds `count` to the number of records the body reports as affected.
    pub fn affected(&mut self, count: u64) {
        self.records_affected = self.records_affected.saturating_add(count);
    }

    /// Total records reported as affected so far.
    pub fn records_affected(&self) -> u64 {
        self.records_affected
    }
}

/// Optional lifecycle hooks a seeder implementation may expose.
///
/// Every method defaults to a no-op so implementations only override what they need.
pub trait SeederHooks {
    /// Precondition gate evaluated before anything is recorded.
    fn validate(&self, _ctx: &SeedContext) -> Result<(), BodyError> {
        Ok(())
    }

    /// Called before the execution record is opened.
    fn before_run(&self, _ctx: &SeedContext) -> Result<(), BodyError> {
        Ok(())
    }

    /// Called after the execution record is completed successfully.
    fn after_run(&self, _ctx: &SeedContext) -> Result<(), BodyError> {
        Ok(())
    }

    /// Called before the rollback body runs.
    fn before_rollback(&self, _ctx: &SeedContext) -> Result<(), BodyError> {
        Ok(())
    }

    /// Called after a rollback has been committed and recorded.
    fn after_rollback(&self, _ctx: &SeedContext) -> Result<(), BodyError> {
        Ok(())
    }
}

/// A named unit of data population logic executed against a session of type `S`.
pub trait Seeder<S> {
    /// Declared metadata; the registry fills in the content hash.
    fn definition(&self) -> SeederDefinition;

    /// Opaque payload identifying the executable logic, such as embedded source text or
    /// the statements the seeder issues. Any change must change the payload.
    fn logic(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(&[])
    }

    /// Populates data through `session`.
    fn run(&self, session: &mut S, ctx: &mut SeedContext) -> Result<(), BodyError>;

    /// Reverts the data written by [`Seeder::run`].
    fn rollback(&self, _session: &mut S, ctx: &mut SeedContext) -> Result<(), BodyError> {
        Err(format!("seeder {} has no rollback body", ctx.seeder).into())
    }

    /// Lifecycle hooks, if the implementation exposes them.
    fn hooks(&self) -> Option<&dyn SeederHooks> {
        None
    }
}

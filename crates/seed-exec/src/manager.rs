use std::collections::BTreeSet;

use seed_core::{BodyError, Registry, SeedContext, SeedError, SeederDefinition, Transactional};
use seed_graph::{resolve, DependencyGraph};
use seed_track::{
    Classification, Completion, ExecutionRecord, Tracker, TrackingStatistics, TrackingStore,
};

use crate::options::{ChangePolicy, RunOptions};
use crate::report::{
    FreshReport, ItemOutcome, RunItem, RunReport, SeederStatus, SkipReason, StatusReport,
};

/// Orchestrates runs, rollbacks and status queries over a registry, a tracker and the
/// data session handed to seeder bodies.
///
/// Execution is strictly sequential: one seeder body runs to completion, inside its own
/// transaction, before the next starts.
pub struct SeederManager<S, T> {
    pub(crate) registry: Registry<S>,
    pub(crate) tracker: Tracker<T>,
    pub(crate) session: S,
    pub(crate) change_policy: ChangePolicy,
}

impl<S, T> SeederManager<S, T>
where
    S: Transactional,
    T: TrackingStore,
{
    pub fn new(registry: Registry<S>, tracker: Tracker<T>, session: S) -> Self {
        Self {
            registry,
            tracker,
            session,
            change_policy: ChangePolicy::default(),
        }
    }

    pub fn with_change_policy(mut self, change_policy: ChangePolicy) -> Self {
        self.change_policy = change_policy;
        self
    }

    pub fn registry(&self) -> &Registry<S> {
        &self.registry
    }

    pub fn tracker(&self) -> &Tracker<T> {
        &self.tracker
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut S {
        &mut self.session
    }

    pub fn into_parts(self) -> (Registry<S>, Tracker<T>, S) {
        (self.registry, self.tracker, self.session)
    }

    /// Definitions in registration order.
    pub fn list_seeders(&self) -> Vec<SeederDefinition> {
        self.registry.all().into_iter().cloned().collect()
    }

    /// Executes every eligible candidate in resolved order.
    ///
    /// Resolution, filter and tracking lookup errors are returned before anything runs.
    /// A candidate whose dependencies neither execute earlier in the invocation nor are up
    /// to date is skipped. A failing seeder stops the invocation; the report then carries
    /// the outcome of every candidate and the failure.
    pub fn run(&mut self, options: &RunOptions) -> Result<RunReport, SeedError> {
        let environment = options.environment.as_str();
        let candidates = self.candidates(options)?;

        let mut report = RunReport {
            environment: environment.to_string(),
            dry_run: options.dry_run,
            batch_number: None,
            items: Vec::new(),
            failure: None,
        };
        let mut planned = Vec::new();
        let mut satisfied: BTreeSet<String> = BTreeSet::new();
        for name in candidates {
            let definition = self
                .registry
                .find_by_name(&name)
                .ok_or_else(|| SeedError::unknown_seeder(&name))?;
            let outcome = if !definition.applies_to(environment) {
                tracing::info!(seeder = %name, environment, "skipping seeder excluded from environment");
                skipped(options.dry_run, SkipReason::EnvironmentExcluded)
            } else {
                let classification =
                    self.tracker
                        .classify(definition, environment, options.force)?;
                if !classification.needs_execution() {
                    tracing::info!(seeder = %name, environment, "skipping up to date seeder");
                    satisfied.insert(name.clone());
                    skipped(options.dry_run, SkipReason::UpToDate)
                } else if let Some(missing) =
                    self.unsatisfied_dependency(definition, environment, &satisfied)?
                {
                    tracing::warn!(
                        seeder = %name,
                        dependency = %missing,
                        environment,
                        "skipping seeder whose dependency has not been applied"
                    );
                    skipped(options.dry_run, SkipReason::DependencyNotSatisfied)
                } else {
                    planned.push(report.items.len());
                    satisfied.insert(name.clone());
                    if options.dry_run {
                        ItemOutcome::WouldRun { classification }
                    } else {
                        ItemOutcome::NotReached { classification }
                    }
                }
            };
            report.items.push(RunItem { name, outcome });
        }

        if options.dry_run || planned.is_empty() {
            tracing::info!(
                environment,
                dry_run = options.dry_run,
                candidates = report.items.len(),
                would_run = planned.len(),
                "nothing executed"
            );
            return Ok(report);
        }

        let batch = self.tracker.next_batch_number()?;
        report.batch_number = Some(batch);
        tracing::info!(environment, batch, seeders = planned.len(), "starting run");
        for index in planned {
            let classification = match report.items[index].outcome {
                ItemOutcome::NotReached { classification } => classification,
                _ => continue,
            };
            let name = report.items[index].name.clone();
            match self.execute(&name, environment, batch, classification) {
                Ok((record, hook_error)) => {
                    report.items[index].outcome = ItemOutcome::Succeeded {
                        classification,
                        records_affected: record.records_affected,
                        duration_ms: record.duration_ms().unwrap_or(0),
                        batch_number: batch,
                        hook_error: hook_error.clone(),
                    };
                    if let Some(err) = hook_error {
                        tracing::error!(seeder = %name, batch, error = %err, "run aborted");
                        report.failure = Some(err);
                        break;
                    }
                }
                Err(err) => {
                    tracing::error!(seeder = %name, batch, error = %err, "run aborted");
                    report.items[index].outcome = ItemOutcome::Failed {
                        classification,
                        error: err.clone(),
                    };
                    report.failure = Some(err);
                    break;
                }
            }
        }
        if report.is_success() {
            tracing::info!(environment, batch, executed = report.succeeded().len(), "run finished");
        }
        Ok(report)
    }

    /// Forgets the tracking history of the selected candidates, then runs them forced.
    ///
    /// Without name or tag filters the whole environment is cleared. No rollback body is
    /// invoked. A dry run clears nothing.
    pub fn fresh(&mut self, options: &RunOptions) -> Result<FreshReport, SeedError> {
        let candidates = self.candidates(options)?;
        let cleared = if options.dry_run {
            0
        } else if options.names.is_empty() && options.tags.is_empty() {
            self.tracker.clear(None, Some(&options.environment))?
        } else {
            let mut cleared = 0;
            for name in &candidates {
                cleared += self
                    .tracker
                    .clear(Some(name), Some(&options.environment))?;
            }
            cleared
        };
        let forced = RunOptions {
            force: true,
            ..options.clone()
        };
        let run = self.run(&forced)?;
        Ok(FreshReport { cleared, run })
    }

    pub fn statistics(&self, environment: Option<&str>) -> Result<TrackingStatistics, SeedError> {
        self.tracker.statistics(environment)
    }

    /// Classification and last execution of every registered seeder, in registration order.
    pub fn status(&self, environment: &str, detailed: bool) -> Result<StatusReport, SeedError> {
        let mut seeders = Vec::with_capacity(self.registry.len());
        for definition in self.registry.all() {
            let classification = self.tracker.classify(definition, environment, false)?;
            let latest = self.tracker.latest(&definition.name, environment)?;
            let history = if detailed {
                self.tracker
                    .records_for_seeder(&definition.name)?
                    .into_iter()
                    .filter(|record| record.environment == environment)
                    .collect()
            } else {
                Vec::new()
            };
            seeders.push(SeederStatus {
                name: definition.name.clone(),
                classification,
                eligible: definition.applies_to(environment),
                last_status: latest.as_ref().map(|record| record.status),
                last_run_at: latest.as_ref().map(|record| record.started_at),
                last_duration_ms: latest.as_ref().and_then(ExecutionRecord::duration_ms),
                last_records_affected: latest.as_ref().map(|record| record.records_affected),
                last_batch: latest.as_ref().map(|record| record.batch_number),
                last_error: latest.and_then(|record| record.error_message),
                history,
            });
        }
        let statistics = if detailed {
            Some(self.tracker.statistics(Some(environment))?)
        } else {
            None
        };
        Ok(StatusReport {
            environment: environment.to_string(),
            seeders,
            statistics,
        })
    }

    /// Names selected by the name and tag filters, in resolved order.
    ///
    /// Both filters must match when both are given. With `with_dependencies` the
    /// selection is widened to its dependency closure.
    fn candidates(&self, options: &RunOptions) -> Result<Vec<String>, SeedError> {
        let order = resolve(self.registry.all())?;
        if options.names.is_empty() && options.tags.is_empty() {
            return Ok(order);
        }
        for name in &options.names {
            if !self.registry.contains(name) {
                return Err(SeedError::unknown_seeder(name));
            }
        }
        let mut selected: BTreeSet<String> = self
            .registry
            .all()
            .into_iter()
            .filter(|definition| {
                options.names.is_empty() || options.names.contains(&definition.name)
            })
            .filter(|definition| {
                options.tags.is_empty() || definition.has_any_tag(&options.tags)
            })
            .map(|definition| definition.name.clone())
            .collect();
        if options.with_dependencies && !selected.is_empty() {
            let roots: Vec<String> = selected.into_iter().collect();
            let graph = DependencyGraph::build(self.registry.all())?;
            selected = graph.dependency_closure(&roots)?;
        }
        Ok(order
            .into_iter()
            .filter(|name| selected.contains(name))
            .collect())
    }

    /// First dependency of `definition` that is neither planned earlier in this
    /// invocation nor up to date in `environment`.
    fn unsatisfied_dependency(
        &self,
        definition: &SeederDefinition,
        environment: &str,
        satisfied: &BTreeSet<String>,
    ) -> Result<Option<String>, SeedError> {
        for dependency in &definition.dependencies {
            if satisfied.contains(dependency) {
                continue;
            }
            let applied = match self.registry.find_by_name(dependency) {
                Some(upstream) => {
                    self.tracker.classify(upstream, environment, false)? == Classification::UpToDate
                }
                None => false,
            };
            if !applied {
                return Ok(Some(dependency.clone()));
            }
        }
        Ok(None)
    }

    fn execute(
        &mut self,
        name: &str,
        environment: &str,
        batch: u64,
        classification: Classification,
    ) -> Result<(ExecutionRecord, Option<SeedError>), SeedError> {
        let Self {
            registry,
            tracker,
            session,
            change_policy,
        } = self;
        let definition = registry
            .find_by_name(name)
            .ok_or_else(|| SeedError::unknown_seeder(name))?;
        let seeder = registry
            .seeder(name)
            .ok_or_else(|| SeedError::unknown_seeder(name))?;
        let mut ctx = SeedContext::new(definition, environment, Some(batch));
        if let Some(hooks) = seeder.hooks() {
            hooks
                .validate(&ctx)
                .map_err(|err| SeedError::validation_failed(name, err.to_string()))?;
            hooks
                .before_run(&ctx)
                .map_err(|err| SeedError::hook_failed(name, "before_run", err.to_string()))?;
        }

        let handle = tracker.begin(name, environment, batch, &definition.content_hash)?;
        let revert_first = *change_policy == ChangePolicy::RollbackThenRerun
            && classification == Classification::Changed
            && definition.can_rollback;
        tracing::info!(seeder = %name, batch, classification = %classification, revert_first, "running seeder");
        let outcome = in_transaction(session, |session| {
            if revert_first {
                let mut revert_ctx = SeedContext::new(definition, environment, Some(batch));
                seeder.rollback(session, &mut revert_ctx)?;
            }
            seeder.run(session, &mut ctx)
        });

        match outcome {
            Ok(()) => {
                let record = tracker.complete(
                    handle,
                    Completion::Success {
                        records_affected: ctx.records_affected(),
                    },
                )?;
                tracing::info!(
                    seeder = %name,
                    batch,
                    records_affected = record.records_affected,
                    duration_ms = record.duration_ms().unwrap_or(0),
                    "seeder succeeded"
                );
                let hook_error = seeder.hooks().and_then(|hooks| {
                    hooks
                        .after_run(&ctx)
                        .err()
                        .map(|err| SeedError::hook_failed(name, "after_run", err.to_string()))
                });
                Ok((record, hook_error))
            }
            Err(err) => {
                let message = err.to_string();
                tracing::error!(seeder = %name, batch, error = %message, "seeder failed");
                tracker.complete(
                    handle,
                    Completion::Failed {
                        error_message: message.clone(),
                    },
                )?;
                Err(SeedError::execution(name, message))
            }
        }
    }
}

fn skipped(dry_run: bool, reason: SkipReason) -> ItemOutcome {
    if dry_run {
        ItemOutcome::WouldSkip { reason }
    } else {
        ItemOutcome::Skipped { reason }
    }
}

/// Runs `body` inside one session transaction, rolling back on any failure including a
/// failed commit.
pub(crate) fn in_transaction<S, F>(session: &mut S, body: F) -> Result<(), BodyError>
where
    S: Transactional,
    F: FnOnce(&mut S) -> Result<(), BodyError>,
{
    session.begin()?;
    match body(session).and_then(|()| session.commit()) {
        Ok(()) => Ok(()),
        Err(err) => {
            if let Err(rollback_err) = session.rollback() {
                tracing::error!(error = %rollback_err, "transaction rollback failed");
            }
            Err(err)
        }
    }
}

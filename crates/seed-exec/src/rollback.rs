use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};

use chrono::Utc;
use seed_core::{SeedContext, SeedError, Transactional};
use seed_graph::resolve;
use seed_track::{ExecutionRecord, TrackingStore};

use crate::manager::{in_transaction, SeederManager};
use crate::options::{RefreshOptions, RollbackOptions, RollbackTarget, RunOptions};
use crate::report::{RefreshReport, RollbackItem, RollbackOutcome, RollbackReport};

impl<S, T> SeederManager<S, T>
where
    S: Transactional,
    T: TrackingStore,
{
    /// Undoes the current successes matched by the target, dependents first.
    ///
    /// Every matched seeder must support rollback, otherwise nothing is touched. A failing
    /// rollback body stops the invocation; rollbacks already committed stay in place.
    pub fn rollback(&mut self, options: &RollbackOptions) -> Result<RollbackReport, SeedError> {
        let environment = options.environment.as_str();
        let matched = self.match_target(environment, &options.target)?;
        let order = resolve(self.registry.all())?;
        let position: BTreeMap<&str, usize> = order
            .iter()
            .enumerate()
            .map(|(index, name)| (name.as_str(), index))
            .collect();
        let (mut registered, unregistered): (Vec<_>, Vec<_>) = matched
            .into_iter()
            .partition(|record| position.contains_key(record.seeder_name.as_str()));
        registered.sort_by_key(|record| Reverse(position[record.seeder_name.as_str()]));

        for record in &registered {
            let supported = self
                .registry
                .find_by_name(&record.seeder_name)
                .is_some_and(|definition| definition.can_rollback);
            if !supported {
                tracing::error!(seeder = %record.seeder_name, environment, "rollback not supported");
                return Err(SeedError::rollback_not_supported(&record.seeder_name));
            }
        }

        let mut report = RollbackReport {
            environment: environment.to_string(),
            dry_run: options.dry_run,
            items: Vec::with_capacity(registered.len() + unregistered.len()),
            failure: None,
        };
        for record in &unregistered {
            tracing::warn!(seeder = %record.seeder_name, environment, "tracked seeder is no longer registered");
            report.items.push(RollbackItem {
                name: record.seeder_name.clone(),
                batch_number: record.batch_number,
                outcome: RollbackOutcome::Unregistered,
            });
        }
        let first = report.items.len();
        for record in &registered {
            report.items.push(RollbackItem {
                name: record.seeder_name.clone(),
                batch_number: record.batch_number,
                outcome: if options.dry_run {
                    RollbackOutcome::WouldRollBack
                } else {
                    RollbackOutcome::NotReached
                },
            });
        }
        if options.dry_run {
            tracing::info!(environment, matched = registered.len(), "dry rollback");
            return Ok(report);
        }

        for (offset, record) in registered.iter().enumerate() {
            let item = &mut report.items[first + offset];
            match self.revert(record) {
                Ok((duration_ms, hook_error)) => {
                    item.outcome = RollbackOutcome::RolledBack {
                        duration_ms,
                        hook_error: hook_error.clone(),
                    };
                    if let Some(err) = hook_error {
                        report.failure = Some(err);
                        break;
                    }
                }
                Err(err) => {
                    item.outcome = RollbackOutcome::Failed { error: err.clone() };
                    report.failure = Some(err);
                    break;
                }
            }
        }
        Ok(report)
    }

    /// Rolls back the target, then re-runs the same seeders forced.
    ///
    /// The run is skipped when the rollback fails.
    pub fn refresh(&mut self, options: &RefreshOptions) -> Result<RefreshReport, SeedError> {
        let rollback = self.rollback(options)?;
        if !rollback.is_success() {
            return Ok(RefreshReport {
                rollback,
                run: None,
            });
        }
        let names: Vec<String> = match &options.target {
            RollbackTarget::All => Vec::new(),
            RollbackTarget::Names(names) => names.clone(),
            RollbackTarget::Batch(_) | RollbackTarget::LastBatches(_) => rollback
                .matched()
                .into_iter()
                .map(str::to_string)
                .collect(),
        };
        let names: Vec<String> = names
            .into_iter()
            .filter(|name| self.registry.contains(name))
            .collect();
        if names.is_empty() && options.target != RollbackTarget::All {
            return Ok(RefreshReport {
                rollback,
                run: None,
            });
        }
        let run = self.run(
            &RunOptions::new(&options.environment)
                .names(names)
                .force(true)
                .with_dependencies(false)
                .dry_run(options.dry_run),
        )?;
        Ok(RefreshReport {
            rollback,
            run: Some(run),
        })
    }

    fn match_target(
        &self,
        environment: &str,
        target: &RollbackTarget,
    ) -> Result<Vec<ExecutionRecord>, SeedError> {
        let current = self.tracker.current_successes(environment)?;
        let matched = match target {
            RollbackTarget::Names(names) => {
                for name in names {
                    let tracked = current.iter().any(|record| &record.seeder_name == name);
                    if !tracked && !self.registry.contains(name) {
                        return Err(SeedError::unknown_seeder(name));
                    }
                }
                current
                    .into_iter()
                    .filter(|record| names.contains(&record.seeder_name))
                    .collect()
            }
            RollbackTarget::Batch(batch) => current
                .into_iter()
                .filter(|record| record.batch_number == *batch)
                .collect(),
            RollbackTarget::LastBatches(count) => {
                let batches: BTreeSet<u64> =
                    current.iter().map(|record| record.batch_number).collect();
                let recent: BTreeSet<u64> = batches.into_iter().rev().take(*count).collect();
                current
                    .into_iter()
                    .filter(|record| recent.contains(&record.batch_number))
                    .collect()
            }
            RollbackTarget::All => current,
        };
        Ok(matched)
    }

    /// Returns the rollback duration and the `after_rollback` failure, if any.
    fn revert(
        &mut self,
        record: &ExecutionRecord,
    ) -> Result<(u64, Option<SeedError>), SeedError> {
        let Self {
            registry,
            tracker,
            session,
            ..
        } = self;
        let name = record.seeder_name.as_str();
        let definition = registry
            .find_by_name(name)
            .ok_or_else(|| SeedError::unknown_seeder(name))?;
        let seeder = registry
            .seeder(name)
            .ok_or_else(|| SeedError::unknown_seeder(name))?;
        let mut ctx = SeedContext::new(definition, &record.environment, Some(record.batch_number));
        if let Some(hooks) = seeder.hooks() {
            hooks
                .before_rollback(&ctx)
                .map_err(|err| SeedError::hook_failed(name, "before_rollback", err.to_string()))?;
        }

        let started_at = Utc::now();
        in_transaction(session, |session| seeder.rollback(session, &mut ctx)).map_err(|err| {
            tracing::error!(seeder = %name, batch = record.batch_number, error = %err, "rollback failed");
            SeedError::rollback_failed(name, err.to_string())
        })?;
        let rolled = tracker.mark_rolled_back(record, started_at)?;
        let duration_ms = rolled.duration_ms().unwrap_or(0);
        tracing::info!(seeder = %name, batch = record.batch_number, duration_ms, "seeder rolled back");

        let hook_error = seeder.hooks().and_then(|hooks| {
            hooks
                .after_rollback(&ctx)
                .err()
                .map(|err| SeedError::hook_failed(name, "after_rollback", err.to_string()))
        });
        Ok((duration_ms, hook_error))
    }
}

use std::error::Error;

use clap::Args;
use seed_exec::{RollbackOptions, RollbackOutcome, RollbackReport, RollbackTarget};

use super::finish;
use crate::{Context, Manager};

#[derive(Args, Debug)]
pub struct RollbackArgs {
    /// Roll back the named seeder; repeatable.
    #[arg(long = "seeder", value_name = "NAME", group = "target")]
    pub seeders: Vec<String>,
    /// Roll back everything recorded under one batch number.
    #[arg(long, group = "target")]
    pub batch: Option<u64>,
    /// Roll back the most recent N batches.
    #[arg(long, value_name = "N", group = "target")]
    pub last: Option<usize>,
    /// Roll back every tracked success in the environment.
    #[arg(long, group = "target")]
    pub all: bool,
    #[arg(long)]
    pub dry_run: bool,
}

impl RollbackArgs {
    /// `None` when no target flag was given.
    pub fn target(&self) -> Option<RollbackTarget> {
        if let Some(batch) = self.batch {
            Some(RollbackTarget::Batch(batch))
        } else if let Some(count) = self.last {
            Some(RollbackTarget::LastBatches(count))
        } else if self.all {
            Some(RollbackTarget::All)
        } else if !self.seeders.is_empty() {
            Some(RollbackTarget::Names(self.seeders.clone()))
        } else {
            None
        }
    }
}

pub fn run(
    args: &RollbackArgs,
    context: &Context,
    manager: &mut Manager,
) -> Result<(), Box<dyn Error>> {
    let target = args
        .target()
        .ok_or("choose what to roll back with --seeder, --batch, --last or --all")?;
    let dry_run = args.dry_run || context.config.dry_run_by_default;
    super::ensure_confirmed(context, dry_run, false, "roll back seeders")?;
    let options = RollbackOptions::new(&context.environment, target).dry_run(dry_run);
    let report = manager.rollback(&options)?;
    finish(context.json, &report, print_report, report.failure.as_ref())
}

pub(crate) fn print_report(report: &RollbackReport) {
    let mode = if report.dry_run { " (dry run)" } else { "" };
    println!("rollback in {}{mode}", report.environment);
    if report.items.is_empty() {
        println!("  nothing to roll back");
    }
    for item in &report.items {
        let state = match &item.outcome {
            RollbackOutcome::RolledBack {
                duration_ms,
                hook_error: None,
            } => format!("rolled back ({duration_ms} ms)"),
            RollbackOutcome::RolledBack {
                duration_ms,
                hook_error: Some(err),
            } => format!("rolled back ({duration_ms} ms), after_rollback FAILED: {err}"),
            RollbackOutcome::Failed { error } => format!("FAILED: {error}"),
            RollbackOutcome::WouldRollBack => "would roll back".to_string(),
            RollbackOutcome::NotReached => "not reached".to_string(),
            RollbackOutcome::Unregistered => "skipped (no longer registered)".to_string(),
        };
        println!("  {:<28} batch {:<6} {state}", item.name, item.batch_number);
    }
    if let Some(err) = &report.failure {
        println!("failed: {err}");
    }
}

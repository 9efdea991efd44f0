use std::error::Error;

use clap::Args;
use seed_exec::{ItemOutcome, RunOptions, RunReport, SkipReason};

use super::finish;
use crate::{Context, Manager};

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Only run the named seeder; repeatable.
    #[arg(long = "seeder", value_name = "NAME")]
    pub seeders: Vec<String>,
    /// Only run seeders carrying one of these tags; repeatable.
    #[arg(long = "tag", value_name = "TAG")]
    pub tags: Vec<String>,
    /// Execute even when the last success matches the current content hash.
    #[arg(long)]
    pub force: bool,
    /// Report what would run without executing or recording anything.
    #[arg(long)]
    pub dry_run: bool,
    /// Run only the selected seeders, not what they depend on.
    #[arg(long)]
    pub no_dependencies: bool,
}

pub fn run(args: &RunArgs, context: &Context, manager: &mut Manager) -> Result<(), Box<dyn Error>> {
    let dry_run = args.dry_run || context.config.dry_run_by_default;
    super::ensure_confirmed(context, dry_run, false, "run seeders")?;
    let options = RunOptions::new(&context.environment)
        .names(args.seeders.iter().cloned())
        .tags(args.tags.iter().cloned())
        .force(args.force)
        .dry_run(dry_run)
        .with_dependencies(!args.no_dependencies);
    let report = manager.run(&options)?;
    finish(context.json, &report, print_report, report.failure.as_ref())
}

pub(crate) fn print_report(report: &RunReport) {
    let mode = if report.dry_run { " (dry run)" } else { "" };
    match report.batch_number {
        Some(batch) => println!("environment {}{mode}, batch {batch}", report.environment),
        None => println!("environment {}{mode}", report.environment),
    }
    if report.items.is_empty() {
        println!("  nothing to run");
    }
    for item in &report.items {
        println!("  {:<28} {}", item.name, describe(&item.outcome));
    }
    if let Some(err) = &report.failure {
        println!("failed: {err}");
    }
}

fn describe(outcome: &ItemOutcome) -> String {
    match outcome {
        ItemOutcome::Succeeded {
            classification,
            records_affected,
            duration_ms,
            hook_error,
            ..
        } => {
            let ran = format!("ran ({classification}, {records_affected} records, {duration_ms} ms)");
            match hook_error {
                Some(err) => format!("{ran}, after_run FAILED: {err}"),
                None => ran,
            }
        }
        ItemOutcome::Failed {
            classification,
            error,
        } => format!("FAILED ({classification}): {error}"),
        ItemOutcome::Skipped { reason } => format!("skipped ({})", reason_label(*reason)),
        ItemOutcome::WouldRun { classification } => format!("would run ({classification})"),
        ItemOutcome::WouldSkip { reason } => format!("would skip ({})", reason_label(*reason)),
        ItemOutcome::NotReached { classification } => {
            format!("not reached ({classification})")
        }
    }
}

fn reason_label(reason: SkipReason) -> &'static str {
    match reason {
        SkipReason::UpToDate => "up to date",
        SkipReason::EnvironmentExcluded => "not for this environment",
        SkipReason::DependencyNotSatisfied => "dependency not applied",
    }
}

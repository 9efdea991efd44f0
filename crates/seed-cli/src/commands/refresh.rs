use std::error::Error;

use clap::Args;
use seed_exec::{RefreshOptions, RefreshReport, RollbackTarget};

use super::finish;
use crate::{Context, Manager};

#[derive(Args, Debug)]
pub struct RefreshArgs {
    /// Refresh only the named seeder; repeatable. Defaults to every tracked seeder.
    #[arg(long = "seeder", value_name = "NAME")]
    pub seeders: Vec<String>,
    #[arg(long)]
    pub dry_run: bool,
}

pub fn run(
    args: &RefreshArgs,
    context: &Context,
    manager: &mut Manager,
) -> Result<(), Box<dyn Error>> {
    let target = if args.seeders.is_empty() {
        RollbackTarget::All
    } else {
        RollbackTarget::Names(args.seeders.clone())
    };
    let dry_run = args.dry_run || context.config.dry_run_by_default;
    super::ensure_confirmed(context, dry_run, false, "refresh seeders")?;
    let options = RefreshOptions::new(&context.environment, target).dry_run(dry_run);
    let report = manager.refresh(&options)?;
    let failure = report
        .rollback
        .failure
        .as_ref()
        .or_else(|| report.run.as_ref().and_then(|run| run.failure.as_ref()));
    finish(context.json, &report, print_report, failure)
}

fn print_report(report: &RefreshReport) {
    super::rollback::print_report(&report.rollback);
    match &report.run {
        Some(run) => super::run::print_report(run),
        None => println!("run skipped"),
    }
}

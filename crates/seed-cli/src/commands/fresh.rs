use std::error::Error;

use clap::Args;
use seed_exec::{FreshReport, RunOptions};

use super::finish;
use crate::{Context, Manager};

#[derive(Args, Debug)]
pub struct FreshArgs {
    /// Show what would run; tracking history is left untouched.
    #[arg(long)]
    pub dry_run: bool,
}

pub fn run(args: &FreshArgs, context: &Context, manager: &mut Manager) -> Result<(), Box<dyn Error>> {
    let dry_run = args.dry_run || context.config.dry_run_by_default;
    super::ensure_confirmed(
        context,
        dry_run,
        true,
        "clear tracking history and re-run every seeder",
    )?;
    let options = RunOptions::new(&context.environment).dry_run(dry_run);
    let report = manager.fresh(&options)?;
    finish(context.json, &report, print_report, report.run.failure.as_ref())
}

fn print_report(report: &FreshReport) {
    println!("cleared {} tracking records", report.cleared);
    super::run::print_report(&report.run);
}

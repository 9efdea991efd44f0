use std::error::Error;

use clap::Args;
use seed_exec::StatusReport;

use super::print_json;
use crate::{Context, Manager};

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Include execution history and aggregate statistics.
    #[arg(long)]
    pub detailed: bool,
}

pub fn run(args: &StatusArgs, context: &Context, manager: &Manager) -> Result<(), Box<dyn Error>> {
    let report = manager.status(&context.environment, args.detailed)?;
    if context.json {
        return print_json(&report);
    }
    print_report(&report);
    Ok(())
}

fn print_report(report: &StatusReport) {
    println!("status for {}", report.environment);
    println!(
        "  {:<28} {:<12} {:<12} {:>6} {:>9}  last run",
        "seeder", "state", "last", "batch", "records"
    );
    for seeder in &report.seeders {
        let state = if seeder.eligible {
            seeder.classification.as_str()
        } else {
            "excluded"
        };
        let last = seeder.last_status.as_ref().map_or("-", |status| status.as_str());
        let batch = seeder
            .last_batch
            .map_or_else(|| "-".to_string(), |batch| batch.to_string());
        let records = seeder
            .last_records_affected
            .map_or_else(|| "-".to_string(), |count| count.to_string());
        let at = seeder
            .last_run_at
            .map_or_else(|| "-".to_string(), |at| at.to_rfc3339());
        println!(
            "  {:<28} {:<12} {:<12} {:>6} {:>9}  {at}",
            seeder.name, state, last, batch, records
        );
        if let Some(error) = &seeder.last_error {
            println!("      error: {error}");
        }
        for record in &seeder.history {
            println!(
                "      #{} {} batch {} {} records",
                record.id, record.status, record.batch_number, record.records_affected
            );
        }
    }
    if let Some(stats) = &report.statistics {
        let average = stats
            .average_duration_ms
            .map_or_else(|| "-".to_string(), |ms| format!("{ms:.1}"));
        println!(
            "total {} (succeeded {}, failed {}, rolled back {}), {} records, avg {average} ms",
            stats.total_executions,
            stats.succeeded,
            stats.failed,
            stats.rolled_back,
            stats.total_records_affected,
        );
    }
}

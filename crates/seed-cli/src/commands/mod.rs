use std::error::Error;

use seed_core::{ErrorInfo, SeedError};
use serde::Serialize;

use crate::Context;

pub mod fresh;
pub mod list;
pub mod refresh;
pub mod rollback;
pub mod run;
pub mod status;

/// Refuses a mutating command in a protected environment unless `--yes` was given.
/// `always` extends the guard to every environment. Dry runs always pass.
pub(crate) fn ensure_confirmed(
    context: &Context,
    dry_run: bool,
    always: bool,
    action: &str,
) -> Result<(), SeedError> {
    let guarded = always || context.config.is_protected(&context.environment);
    if dry_run || context.confirmed || !guarded {
        return Ok(());
    }
    tracing::warn!(environment = %context.environment, action, "refusing unconfirmed command");
    Err(SeedError::Config(
        ErrorInfo::new(
            "config-protected-environment",
            format!("refusing to {action} in {} without confirmation", context.environment),
        )
        .with_context("environment", context.environment.clone())
        .with_hint("pass --yes to confirm, or --dry-run to preview"),
    ))
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Prints `report` then turns a recorded failure into the command's error.
pub(crate) fn finish<T: Serialize>(
    json: bool,
    report: &T,
    human: impl FnOnce(&T),
    failure: Option<&SeedError>,
) -> Result<(), Box<dyn Error>> {
    if json {
        print_json(report)?;
    } else {
        human(report);
    }
    match failure {
        Some(err) => Err(Box::new(err.clone())),
        None => Ok(()),
    }
}

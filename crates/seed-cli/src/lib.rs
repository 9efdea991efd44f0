//! Library side of `seedctl`: configuration, the SQLite data session, SQL seeders declared
//! in configuration and the subcommand implementations.

use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use seed_core::SeedError;
use seed_exec::SeederManager;
use seed_track::{SqliteStore, Tracker};

pub mod commands;
pub mod config;
pub mod logging;
pub mod sql;

use commands::{
    fresh::FreshArgs, refresh::RefreshArgs, rollback::RollbackArgs, run::RunArgs,
    status::StatusArgs,
};
use config::SeedConfig;
use sql::{registry_from_config, SqliteSession};

#[derive(Parser, Debug)]
#[command(name = "seedctl", about = "Dependency-aware database seeding with change tracking")]
pub struct Cli {
    /// Configuration file; defaults to seeder.config.{yaml,yml,toml,json} in the working directory.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Target environment, overriding configuration and environment variables.
    #[arg(long, global = true)]
    pub env: Option<String>,
    /// Print reports as JSON.
    #[arg(long, global = true)]
    pub json: bool,
    /// Confirm mutating commands in protected environments and `fresh`.
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run pending and changed seeders in dependency order.
    Run(RunArgs),
    /// Roll back tracked seeders, dependents first.
    Rollback(RollbackArgs),
    /// Roll back seeders and run them again.
    Refresh(RefreshArgs),
    /// Forget tracking history and run every seeder.
    Fresh(FreshArgs),
    /// Show per-seeder classification and last execution.
    Status(StatusArgs),
    /// List registered seeders in registration order.
    List,
}

/// Resolved settings shared by every subcommand.
#[derive(Debug, Clone)]
pub struct Context {
    pub config: SeedConfig,
    pub environment: String,
    pub json: bool,
    /// `--yes` was given.
    pub confirmed: bool,
}

pub type Manager = SeederManager<SqliteSession, SqliteStore>;

/// Configuration file, then `SEEDER_*` variables, then command-line flags.
pub fn load_context(cli: &Cli) -> Result<Context, SeedError> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let mut config = SeedConfig::discover(cli.config.as_deref(), &cwd)?;
    config.apply_env(|key| std::env::var(key).ok())?;
    if let Some(environment) = &cli.env {
        config.environment = environment.trim().to_lowercase();
    }
    config.validate()?;
    Ok(Context {
        environment: config.environment.clone(),
        config,
        json: cli.json,
        confirmed: cli.yes,
    })
}

pub fn open_manager(config: &SeedConfig) -> Result<Manager, SeedError> {
    let registry = registry_from_config(&config.seeders)?;
    let tracker = Tracker::new(SqliteStore::open(&config.tracking_path)?);
    let session = SqliteSession::open(&config.data_path)?;
    Ok(SeederManager::new(registry, tracker, session).with_change_policy(config.change_policy))
}

pub fn dispatch(command: &Command, context: &Context) -> Result<(), Box<dyn Error>> {
    let mut manager = open_manager(&context.config)?;
    match command {
        Command::Run(args) => commands::run::run(args, context, &mut manager),
        Command::Rollback(args) => commands::rollback::run(args, context, &mut manager),
        Command::Refresh(args) => commands::refresh::run(args, context, &mut manager),
        Command::Fresh(args) => commands::fresh::run(args, context, &mut manager),
        Command::Status(args) => commands::status::run(args, context, &manager),
        Command::List => commands::list::run(context, &manager),
    }
}

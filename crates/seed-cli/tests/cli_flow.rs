use std::fs;
use std::path::Path;

use clap::Parser;
use rusqlite::Connection;
use seed_cli::commands::{
    fresh::FreshArgs, rollback::RollbackArgs, run::RunArgs, status::StatusArgs,
};
use seed_cli::config::SeedConfig;
use seed_cli::{dispatch, open_manager, Cli, Command, Context};
use seed_exec::{ItemOutcome, RunOptions, SkipReason};
use seed_track::{Classification, ExecutionStatus, SqliteStore, Tracker};
use tempfile::tempdir;

const CONFIG: &str = r#"
environment: development
tracking_path: TRACKING
data_path: DATA
seeders:
  - name: schema
    priority: 1
    can_rollback: true
    up:
      - "CREATE TABLE IF NOT EXISTS roles (name TEXT PRIMARY KEY)"
      - "CREATE TABLE IF NOT EXISTS users (name TEXT PRIMARY KEY, role TEXT NOT NULL)"
    down:
      - "DROP TABLE users"
      - "DROP TABLE roles"
  - name: roles
    dependencies: [schema]
    tags: [reference]
    can_rollback: true
    up:
      - "INSERT OR IGNORE INTO roles (name) VALUES ('admin'), ('editor')"
    down:
      - "DELETE FROM roles"
  - name: users
    dependencies: [roles]
    environments: [development]
    can_rollback: true
    up:
      - "INSERT OR IGNORE INTO users (name, role) VALUES ('ada', 'admin')"
    down:
      - "DELETE FROM users"
"#;

fn write_config(dir: &Path, body: &str) -> SeedConfig {
    let path = dir.join("seeder.config.yaml");
    let text = body
        .replace("TRACKING", &dir.join("tracking.sqlite").display().to_string())
        .replace("DATA", &dir.join("data.sqlite").display().to_string());
    fs::write(&path, text).expect("write config");
    let config = SeedConfig::discover(None, dir).expect("discover");
    config.validate().expect("valid");
    config
}

fn context(config: &SeedConfig, environment: &str) -> Context {
    Context {
        config: config.clone(),
        environment: environment.to_string(),
        json: false,
        confirmed: false,
    }
}

fn confirmed(config: &SeedConfig, environment: &str) -> Context {
    Context {
        confirmed: true,
        ..context(config, environment)
    }
}

fn count(dir: &Path, table: &str) -> i64 {
    let conn = Connection::open(dir.join("data.sqlite")).expect("open data");
    conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
        .expect("count")
}

fn tracker(dir: &Path) -> Tracker<SqliteStore> {
    Tracker::new(SqliteStore::open(dir.join("tracking.sqlite")).expect("open tracking"))
}

fn run_args() -> RunArgs {
    RunArgs {
        seeders: Vec::new(),
        tags: Vec::new(),
        force: false,
        dry_run: false,
        no_dependencies: false,
    }
}

#[test]
fn run_then_rerun_skips_up_to_date_seeders() {
    let dir = tempdir().expect("tempdir");
    let config = write_config(dir.path(), CONFIG);

    dispatch(&Command::Run(run_args()), &context(&config, "development")).expect("first run");
    assert_eq!(count(dir.path(), "roles"), 2);
    assert_eq!(count(dir.path(), "users"), 1);

    let successes = tracker(dir.path())
        .current_successes("development")
        .expect("successes");
    let names: Vec<_> = successes.iter().map(|r| r.seeder_name.as_str()).collect();
    assert_eq!(names, vec!["schema", "roles", "users"]);
    assert!(successes.iter().all(|r| r.batch_number == 1));
    assert_eq!(successes[1].records_affected, 2);

    let mut manager = open_manager(&config).expect("manager");
    let report = manager.run(&RunOptions::new("development")).expect("rerun");
    assert_eq!(report.batch_number, None);
    assert_eq!(
        report.outcome("roles"),
        Some(&ItemOutcome::Skipped {
            reason: SkipReason::UpToDate
        })
    );
    assert_eq!(count(dir.path(), "roles"), 2);
}

#[test]
fn environment_exclusion_and_rollback_by_name() {
    let dir = tempdir().expect("tempdir");
    let config = write_config(dir.path(), CONFIG);

    dispatch(&Command::Run(run_args()), &confirmed(&config, "production")).expect("production");
    assert_eq!(count(dir.path(), "users"), 0);
    assert!(tracker(dir.path())
        .current_successes("production")
        .expect("successes")
        .iter()
        .all(|r| r.seeder_name != "users"));

    dispatch(&Command::Run(run_args()), &context(&config, "development")).expect("development");
    assert_eq!(count(dir.path(), "users"), 1);

    let rollback = RollbackArgs {
        seeders: vec!["users".into()],
        batch: None,
        last: None,
        all: false,
        dry_run: false,
    };
    dispatch(&Command::Rollback(rollback), &context(&config, "development")).expect("rollback");
    assert_eq!(count(dir.path(), "users"), 0);
    assert_eq!(count(dir.path(), "roles"), 2);

    let latest = tracker(dir.path())
        .current("users", "development")
        .expect("current")
        .expect("row");
    assert_eq!(latest.status, ExecutionStatus::RolledBack);

    let manager = open_manager(&config).expect("manager");
    let status = manager.status("development", false).expect("status");
    let users = status
        .seeders
        .iter()
        .find(|s| s.name == "users")
        .expect("users status");
    assert_eq!(users.classification, Classification::Pending);
    dispatch(
        &Command::Status(StatusArgs { detailed: true }),
        &context(&config, "development"),
    )
    .expect("status command");
}

#[test]
fn failing_statement_discards_the_seeder_writes() {
    let dir = tempdir().expect("tempdir");
    let broken = CONFIG.replace(
        "\"INSERT OR IGNORE INTO users (name, role) VALUES ('ada', 'admin')\"",
        "\"INSERT OR IGNORE INTO users (name, role) VALUES ('ada', 'admin')\"\n      - \"INSERT INTO missing_table VALUES (1)\"",
    );
    let config = write_config(dir.path(), &broken);

    let err = dispatch(&Command::Run(run_args()), &context(&config, "development"))
        .expect_err("run fails");
    assert!(err.to_string().contains("users"));
    assert_eq!(count(dir.path(), "roles"), 2);
    assert_eq!(count(dir.path(), "users"), 0);

    let row = tracker(dir.path())
        .current("users", "development")
        .expect("current")
        .expect("row");
    assert_eq!(row.status, ExecutionStatus::Failed);
    assert!(row.error_message.is_some());
}

#[test]
fn dry_run_by_default_records_nothing() {
    let dir = tempdir().expect("tempdir");
    let mut config = write_config(dir.path(), CONFIG);
    config.dry_run_by_default = true;

    dispatch(&Command::Run(run_args()), &context(&config, "development")).expect("dry run");
    assert!(tracker(dir.path())
        .history(None)
        .expect("history")
        .is_empty());
}

#[test]
fn protected_environment_requires_confirmation() {
    let dir = tempdir().expect("tempdir");
    let config = write_config(dir.path(), CONFIG);
    assert!(config.is_protected("production"));

    let err = dispatch(&Command::Run(run_args()), &context(&config, "production"))
        .expect_err("unconfirmed");
    assert!(err.to_string().contains("config-protected-environment"));
    assert!(tracker(dir.path()).history(None).expect("history").is_empty());

    let preview = RunArgs {
        dry_run: true,
        ..run_args()
    };
    dispatch(&Command::Run(preview), &context(&config, "production")).expect("dry run");
    assert!(tracker(dir.path()).history(None).expect("history").is_empty());

    dispatch(&Command::Run(run_args()), &confirmed(&config, "production")).expect("confirmed");
    assert_eq!(count(dir.path(), "roles"), 2);

    let rollback = RollbackArgs {
        seeders: Vec::new(),
        batch: None,
        last: None,
        all: true,
        dry_run: false,
    };
    let err = dispatch(&Command::Rollback(rollback), &context(&config, "production"))
        .expect_err("unconfirmed rollback");
    assert!(err.to_string().contains("config-protected-environment"));
    assert_eq!(count(dir.path(), "roles"), 2);

    let err = dispatch(
        &Command::Fresh(FreshArgs { dry_run: false }),
        &context(&config, "development"),
    )
    .expect_err("fresh needs confirmation everywhere");
    assert!(err.to_string().contains("config-protected-environment"));
}

#[test]
fn command_line_parsing() {
    let cli = Cli::try_parse_from([
        "seedctl", "run", "--seeder", "roles", "--seeder", "users", "--env", "staging", "--json",
    ])
    .expect("parse run");
    assert_eq!(cli.env.as_deref(), Some("staging"));
    assert!(cli.json);
    match cli.command {
        Command::Run(args) => assert_eq!(args.seeders, vec!["roles", "users"]),
        other => panic!("unexpected command {other:?}"),
    }

    let cli = Cli::try_parse_from(["seedctl", "--yes", "run", "--no-dependencies"])
        .expect("parse confirmed run");
    assert!(cli.yes);
    match cli.command {
        Command::Run(args) => assert!(args.no_dependencies),
        other => panic!("unexpected command {other:?}"),
    }

    assert!(Cli::try_parse_from(["seedctl", "rollback", "--batch", "1", "--all"]).is_err());
    let cli = Cli::try_parse_from(["seedctl", "rollback", "--last", "2", "--dry-run"])
        .expect("parse rollback");
    match cli.command {
        Command::Rollback(args) => {
            assert_eq!(args.target(), Some(seed_exec::RollbackTarget::LastBatches(2)));
            assert!(args.dry_run);
        }
        other => panic!("unexpected command {other:?}"),
    }
}

mod common;

use common::{calls, manager, take, TestSeeder};
use seed_core::SeederDefinition;
use seed_exec::{ItemOutcome, RollbackOptions, RollbackOutcome, RollbackTarget, RunOptions};
use seed_track::{Classification, ExecutionStatus};

#[test]
fn hooks_wrap_run_and_rollback() {
    let calls = calls();
    let mut manager = manager(vec![TestSeeder::new(
        SeederDefinition::new("roles").rollback(true),
        &calls,
    )
    .with_hooks(false)]);

    manager.run(&RunOptions::new("development")).expect("run");
    assert_eq!(
        take(&calls),
        vec!["validate:roles", "before_run:roles", "run:roles", "after_run:roles"]
    );

    manager
        .rollback(&RollbackOptions::new("development", RollbackTarget::All))
        .expect("rollback");
    assert_eq!(
        take(&calls),
        vec!["before_rollback:roles", "rollback:roles", "after_rollback:roles"]
    );
}

#[test]
fn failing_after_hooks_keep_the_committed_outcome() {
    let calls = calls();
    let mut manager = manager(vec![
        TestSeeder::new(SeederDefinition::new("roles").rollback(true), &calls)
            .with_failing_after_hooks(),
        TestSeeder::new(SeederDefinition::new("users").depends_on(["roles"]), &calls),
    ]);

    let report = manager.run(&RunOptions::new("development")).expect("report");
    assert!(!report.is_success());
    assert_eq!(report.failure.as_ref().map(|err| err.code()), Some("hook-failed"));
    match report.outcome("roles") {
        Some(ItemOutcome::Succeeded {
            records_affected,
            hook_error: Some(err),
            ..
        }) => {
            assert_eq!(*records_affected, 1);
            assert_eq!(err.info().context_value("hook"), Some("after_run"));
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    assert_eq!(report.succeeded(), vec!["roles"]);
    assert_eq!(report.not_reached(), vec!["users"]);
    let latest = manager
        .tracker()
        .latest("roles", "development")
        .expect("latest")
        .expect("row");
    assert_eq!(latest.status, ExecutionStatus::Success);
    take(&calls);

    let rollback = manager
        .rollback(&RollbackOptions::new(
            "development",
            RollbackTarget::Names(vec!["roles".into()]),
        ))
        .expect("rollback");
    assert_eq!(rollback.rolled_back(), vec!["roles"]);
    assert!(matches!(
        &rollback.items[0].outcome,
        RollbackOutcome::RolledBack {
            hook_error: Some(_),
            ..
        }
    ));
    assert_eq!(
        rollback.failure.as_ref().and_then(|err| err.info().context_value("hook")),
        Some("after_rollback")
    );
    let current = manager
        .tracker()
        .current("roles", "development")
        .expect("current")
        .expect("row");
    assert_eq!(current.status, ExecutionStatus::RolledBack);
}

#[test]
fn validation_rejection_records_nothing() {
    let calls = calls();
    let mut manager = manager(vec![
        TestSeeder::new(SeederDefinition::new("roles"), &calls).with_hooks(true),
        TestSeeder::new(SeederDefinition::new("users").depends_on(["roles"]), &calls),
    ]);
    let report = manager.run(&RunOptions::new("development")).expect("report");
    let failure = report.failure.clone().expect("failure");
    assert_eq!(failure.code(), "validation-failed");
    assert_eq!(failure.seeder(), Some("roles"));
    assert_eq!(report.not_reached(), vec!["users"]);
    assert_eq!(take(&calls), vec!["validate:roles"]);
    assert!(manager.tracker().history(None).expect("history").is_empty());
    assert_eq!(manager.session().commits, 0);
}

#[test]
fn status_reports_last_execution_and_statistics() {
    let calls = calls();
    let mut manager = manager(vec![
        TestSeeder::new(SeederDefinition::new("roles"), &calls).rows(3),
        TestSeeder::new(SeederDefinition::new("users").depends_on(["roles"]), &calls).failing(),
        TestSeeder::new(
            SeederDefinition::new("demo").environments(["development"]),
            &calls,
        ),
    ]);
    manager.run(&RunOptions::new("testing")).expect("report");

    let status = manager.status("testing", false).expect("status");
    assert_eq!(status.environment, "testing");
    assert!(status.statistics.is_none());
    let names: Vec<&str> = status.seeders.iter().map(|entry| entry.name.as_str()).collect();
    assert_eq!(names, vec!["roles", "users", "demo"]);

    let roles = &status.seeders[0];
    assert_eq!(roles.classification, Classification::UpToDate);
    assert_eq!(roles.last_status, Some(ExecutionStatus::Success));
    assert_eq!(roles.last_records_affected, Some(3));
    assert_eq!(roles.last_batch, Some(1));
    assert!(roles.last_run_at.is_some());
    assert!(roles.history.is_empty());

    let users = &status.seeders[1];
    assert_eq!(users.classification, Classification::Pending);
    assert_eq!(users.last_status, Some(ExecutionStatus::Failed));
    assert!(users.last_error.is_some());

    let demo = &status.seeders[2];
    assert!(!demo.eligible);
    assert_eq!(demo.last_status, None);

    let detailed = manager.status("testing", true).expect("detailed");
    assert_eq!(detailed.seeders[0].history.len(), 1);
    let stats = detailed.statistics.expect("statistics");
    assert_eq!(stats.total_executions, 2);
    assert_eq!(stats.succeeded, 1);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.total_records_affected, 3);

    let listed: Vec<String> = manager
        .list_seeders()
        .into_iter()
        .map(|definition| definition.name)
        .collect();
    assert_eq!(listed, vec!["roles", "users", "demo"]);
    assert!(manager
        .list_seeders()
        .iter()
        .all(|definition| definition.content_hash.len() == 64));
}

#[test]
fn reports_serialize_for_machine_output() {
    let calls = calls();
    let mut manager = manager(vec![
        TestSeeder::new(SeederDefinition::new("roles"), &calls),
        TestSeeder::new(SeederDefinition::new("users"), &calls).failing(),
    ]);
    let report = manager.run(&RunOptions::new("development")).expect("report");
    let value = serde_json::to_value(&report).expect("json");
    assert_eq!(value["batch_number"], 1);
    assert_eq!(value["items"][0]["name"], "roles");
    assert_eq!(value["items"][0]["state"], "succeeded");
    assert_eq!(value["items"][1]["state"], "failed");
    assert_eq!(value["items"][1]["error"]["family"], "Execution");
    assert_eq!(value["failure"]["detail"]["code"], "seeder-failed");
}

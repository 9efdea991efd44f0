use seed_core::errors::{
    CYCLIC_DEPENDENCY, ROLLBACK_NOT_SUPPORTED, SEEDER_FAILED, UNKNOWN_DEPENDENCY,
};
use seed_core::{from_json_slice, to_canonical_json_bytes, SeedError};

#[test]
fn unknown_dependency_names_both_sides() {
    let err = SeedError::unknown_dependency("users", "roles");
    assert!(matches!(err, SeedError::Resolution(_)));
    assert_eq!(err.code(), UNKNOWN_DEPENDENCY);
    assert_eq!(err.info().context_value("seeder"), Some("users"));
    assert_eq!(err.info().context_value("missing"), Some("roles"));
}

#[test]
fn cyclic_dependency_lists_remaining_nodes() {
    let err = SeedError::cyclic_dependency(
        &["a".to_string(), "b".to_string()],
        &[("a".to_string(), "b".to_string()), ("b".to_string(), "a".to_string())],
    );
    assert_eq!(err.code(), CYCLIC_DEPENDENCY);
    assert_eq!(err.info().context_value("remaining"), Some("a,b"));
    assert_eq!(err.info().context_value("edges"), Some("a->b,b->a"));
}

#[test]
fn execution_and_rollback_errors_carry_the_seeder() {
    let err = SeedError::execution("users", "constraint violated");
    assert_eq!(err.code(), SEEDER_FAILED);
    assert_eq!(err.seeder(), Some("users"));
    assert!(err.to_string().contains("constraint violated"));

    let err = SeedError::rollback_not_supported("roles");
    assert_eq!(err.code(), ROLLBACK_NOT_SUPPORTED);
    assert!(err.info().hint.is_some());
}

#[test]
fn errors_serialize_with_family_tag() {
    let err = SeedError::tracking("tracking-insert", "disk full");
    let bytes = to_canonical_json_bytes(&err).unwrap();
    let text = String::from_utf8(bytes.clone()).unwrap();
    assert!(text.starts_with("{\"detail\":"));
    assert!(text.contains("\"family\":\"Tracking\""));
    let parsed: SeedError = from_json_slice(&bytes).unwrap();
    assert_eq!(parsed, err);
}

#[test]
fn hook_and_validation_errors_are_execution_family() {
    let err = SeedError::validation_failed("users", "table missing");
    assert!(matches!(err, SeedError::Execution(_)));
    assert_eq!(err.code(), seed_core::errors::VALIDATION_FAILED);

    let err = SeedError::hook_failed("users", "after_run", "cache flush");
    assert_eq!(err.code(), seed_core::errors::HOOK_FAILED);
    assert_eq!(err.info().context_value("hook"), Some("after_run"));

    let err = SeedError::rollback_failed("roles", "fk violation");
    assert!(matches!(err, SeedError::Rollback(_)));
    assert_eq!(err.seeder(), Some("roles"));
}

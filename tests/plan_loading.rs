// tests/plan_loading.rs

use std::io::Write;
use std::time::Duration;

use tempfile::NamedTempFile;
use warmdag::config::{PlanFile, load_and_validate, parse_duration};
use warmdag::coordinator_from_plan;
use warmdag::engine::{CoordinatorOptions, DependencyFailurePolicy, DEFAULT_GRACE_PERIOD};
use warmdag::errors::WarmdagError;
use warmdag_test_utils::builders::{PlanFileBuilder, UnitConfigBuilder};

fn plan_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{contents}").unwrap();
    file
}

#[test]
fn test_full_plan_loads() {
    let file = plan_file(
        r#"
[config]
pool_size = 3
grace_period = "250ms"
timeout = "1m"
on_dependency_failure = "skip"

[unit.database]
cmd = "echo database"

[unit.api]
cmd = "echo api"
after = ["database"]
"#,
    );

    let plan = load_and_validate(file.path()).unwrap();

    assert_eq!(plan.config.pool_size, Some(3));
    assert_eq!(plan.config.timeout.as_deref(), Some("1m"));
    assert_eq!(plan.config.on_dependency_failure, DependencyFailurePolicy::Skip);
    assert_eq!(plan.unit["api"].after, vec!["database"]);

    let options = CoordinatorOptions::from_config(&plan.config).unwrap();
    assert_eq!(options.pool_size, 3);
    assert_eq!(options.grace_period, Duration::from_millis(250));
    assert_eq!(options.dependency_failure_policy, DependencyFailurePolicy::Skip);
}

#[test]
fn test_defaults_apply_without_config_section() {
    let plan = PlanFile::from_toml_str(
        r#"
[unit.only]
cmd = "true"
"#,
    )
    .unwrap();

    let options = CoordinatorOptions::from_config(&plan.config).unwrap();
    assert!(options.pool_size >= 1);
    assert_eq!(options.grace_period, DEFAULT_GRACE_PERIOD);
    assert_eq!(options.dependency_failure_policy, DependencyFailurePolicy::Continue);
    assert!(plan.config.timeout.is_none());
}

#[test]
fn test_dag_cycle_returns_structured_error() {
    let file = plan_file(
        r#"
[unit.A]
cmd = "echo A"
after = ["B"]

[unit.B]
cmd = "echo B"
after = ["A"]
"#,
    );

    match load_and_validate(file.path()) {
        Err(WarmdagError::DagCycle(msg)) => {
            assert!(msg.contains("cycle detected"));
            assert!(msg.contains('A') || msg.contains('B'));
        }
        Err(e) => panic!("Expected DagCycle error, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn test_unknown_dependency_returns_config_error() {
    let file = plan_file(
        r#"
[unit.A]
cmd = "echo A"
after = ["NonExistent"]
"#,
    );

    match load_and_validate(file.path()) {
        Err(WarmdagError::ConfigError(msg)) => {
            assert!(msg.contains("unknown dependency"));
            assert!(msg.contains("NonExistent"));
        }
        Err(e) => panic!("Expected ConfigError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn test_self_dependency_is_rejected() {
    let result = PlanFileBuilder::new()
        .with_unit("A", UnitConfigBuilder::new("echo A").after("A").build())
        .try_build();

    match result {
        Err(WarmdagError::ConfigError(msg)) => assert!(msg.contains("cannot depend on itself")),
        other => panic!("Expected ConfigError, got: {:?}", other),
    }
}

#[test]
fn test_empty_plan_is_rejected() {
    let result = PlanFile::from_toml_str("[config]\npool_size = 2\n");
    assert!(matches!(result, Err(WarmdagError::ConfigError(msg)) if msg.contains("at least one")));
}

#[test]
fn test_zero_pool_size_is_rejected() {
    let result = PlanFileBuilder::new()
        .pool_size(0)
        .with_unit("A", UnitConfigBuilder::new("echo A").build())
        .try_build();

    assert!(matches!(result, Err(WarmdagError::ConfigError(msg)) if msg.contains("pool_size")));
}

#[test]
fn test_bad_duration_names_the_field() {
    let result = PlanFileBuilder::new()
        .timeout("soon")
        .with_unit("A", UnitConfigBuilder::new("echo A").build())
        .try_build();

    match result {
        Err(WarmdagError::ConfigError(msg)) => {
            assert!(msg.starts_with("[config].timeout:"), "got: {msg}");
        }
        other => panic!("Expected ConfigError, got: {:?}", other),
    }
}

#[test]
fn test_invalid_toml_and_unknown_policy() {
    assert!(matches!(
        PlanFile::from_toml_str("[unit.A\ncmd = 1"),
        Err(WarmdagError::TomlError(_))
    ));
    assert!(matches!(
        PlanFile::from_toml_str(
            "[config]\non_dependency_failure = \"retry\"\n[unit.A]\ncmd = \"true\"\n"
        ),
        Err(WarmdagError::TomlError(_))
    ));
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = load_and_validate(dir.path().join("Warmup.toml"));
    assert!(matches!(result, Err(WarmdagError::IoError(_))));
}

#[test]
fn test_parse_duration_suffixes() {
    assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
    assert_eq!(parse_duration("5s").unwrap(), Duration::from_secs(5));
    assert_eq!(parse_duration(" 2m ").unwrap(), Duration::from_secs(120));
    assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));

    assert!(parse_duration("").is_err());
    assert!(parse_duration("10").is_err());
    assert!(parse_duration("10d").is_err());
    assert!(parse_duration("ms").is_err());

    match parse_duration("9999999999999999h") {
        Err(WarmdagError::ConfigError(msg)) => assert!(msg.contains("too large"), "{msg}"),
        other => panic!("expected ConfigError, got {other:?}"),
    }
    assert!(parse_duration("999999999999999999m").is_err());
}

#[test]
fn test_policy_from_str() {
    assert_eq!(
        "skip".parse::<DependencyFailurePolicy>().unwrap(),
        DependencyFailurePolicy::Skip
    );
    assert_eq!(
        "Continue".parse::<DependencyFailurePolicy>().unwrap(),
        DependencyFailurePolicy::Continue
    );
    assert!("abort".parse::<DependencyFailurePolicy>().is_err());
}

#[test]
fn test_coordinator_from_plan_mirrors_units_and_edges() {
    let plan = PlanFileBuilder::new()
        .pool_size(3)
        .with_unit("db", UnitConfigBuilder::new("echo db").build())
        .with_unit("cache", UnitConfigBuilder::new("echo cache").after("db").build())
        .with_unit(
            "api",
            UnitConfigBuilder::new("echo api").after("db").after("cache").build(),
        )
        .build();

    let coordinator = coordinator_from_plan(&plan, None).unwrap();
    assert_eq!(coordinator.graph().len(), 3);
    assert_eq!(coordinator.graph().edge_count(), 3);
    assert_eq!(coordinator.options().pool_size, 3);

    let overridden = coordinator_from_plan(&plan, Some(7)).unwrap();
    assert_eq!(overridden.options().pool_size, 7);

    let roots: Vec<_> = coordinator
        .build_tree()
        .unwrap()
        .iter()
        .map(|r| r.unit().clone())
        .collect();
    assert_eq!(roots, vec!["api"]);
}

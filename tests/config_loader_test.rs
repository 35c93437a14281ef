//! Integration tests for hierarchical configuration loading

use std::fs;
use std::path::Path;

use warden::domain::models::{PatternRule, Severity};
use warden::infrastructure::config::ConfigLoader;

fn write_config(root: &Path, name: &str, contents: &str) {
    let dir = root.join(".warden");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(name), contents).unwrap();
}

#[test]
fn test_defaults_without_config_files() {
    let dir = tempfile::tempdir().unwrap();
    let config = temp_env::with_vars_unset(["WARDEN_LOGGING__LEVEL"], || {
        ConfigLoader::load_from_dir(dir.path())
    })
    .unwrap();

    assert!((config.policy.thresholds.reject - 2000.0).abs() < f64::EPSILON);
    assert_eq!(config.policy.refinement.max_iterations, 3);
    assert!(config.history_path.is_none());
}

#[test]
fn test_local_overrides_project_config() {
    let dir = tempfile::tempdir().unwrap();
    write_config(
        dir.path(),
        "config.yaml",
        r"
policy:
  session_limits:
    max_external_calls: 20
  refinement:
    strictness: [minor, critical]
history_path: .warden/history.jsonl
",
    );
    write_config(
        dir.path(),
        "local.yaml",
        "policy:\n  session_limits:\n    max_external_calls: 8\n",
    );

    let config = ConfigLoader::load_from_dir(dir.path()).unwrap();

    assert_eq!(config.policy.session_limits.max_external_calls, 8);
    assert_eq!(config.policy.session_limits.max_tokens, 500_000);
    assert_eq!(
        config.policy.refinement.strictness,
        vec![Severity::Minor, Severity::Critical]
    );
    assert!(config.history_path.is_some());
}

#[test]
fn test_env_overrides_files() {
    let dir = tempfile::tempdir().unwrap();
    write_config(dir.path(), "config.yaml", "policy:\n  thresholds:\n    reject: 1500.0\n");

    let config = temp_env::with_vars(
        [
            ("WARDEN_POLICY__THRESHOLDS__REJECT", Some("1200")),
            ("WARDEN_LOGGING__LEVEL", Some("debug")),
        ],
        || ConfigLoader::load_from_dir(dir.path()),
    )
    .unwrap();

    assert!((config.policy.thresholds.reject - 1200.0).abs() < f64::EPSILON);
    assert_eq!(config.logging.level, "debug");
}

#[test]
fn test_custom_forbidden_patterns_replace_defaults() {
    let dir = tempfile::tempdir().unwrap();
    write_config(
        dir.path(),
        "config.yaml",
        r#"
policy:
  forbidden_patterns:
    - name: no-force-push
      description: never rewrite shared history
      rule:
        kind: tool
        names: [git_push]
    - name: no-lockfile-edits
      rule:
        kind: path
        glob: "**/Cargo.lock"
"#,
    );

    let config = ConfigLoader::load_from_dir(dir.path()).unwrap();
    let names: Vec<&str> = config
        .policy
        .forbidden_patterns
        .iter()
        .map(|p| p.name.as_str())
        .collect();

    assert_eq!(names, vec!["no-force-push", "no-lockfile-edits"]);
    assert!(matches!(
        config.policy.forbidden_patterns[1].rule,
        PatternRule::Path { .. }
    ));
}

#[test]
fn test_invalid_policy_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    write_config(
        dir.path(),
        "config.yaml",
        "policy:\n  thresholds:\n    auto_proceed: 900.0\n    prompt: 100.0\n",
    );

    let err = ConfigLoader::load_from_dir(dir.path()).unwrap_err();
    assert!(err.to_string().contains("Invalid thresholds"));
}

#[test]
fn test_load_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("governance.yaml");
    fs::write(&path, "policy:\n  allow_privileged: true\nlogging:\n  level: info\n").unwrap();

    let config = ConfigLoader::load_from_file(&path).unwrap();
    assert!(config.policy.allow_privileged);
    assert_eq!(config.logging.level, "info");
}

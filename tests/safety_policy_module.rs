use gitward::orchestration::{Plan, RiskLevel, Step};
use gitward::safety::{
    apply_confirmation, assess, check_write_volume, confine, deny_if_sensitive, preflight_policy,
    scan_forbidden_arguments, validate, PolicyViolation, MAX_WRITE_STEPS,
};
use serde_json::{json, Map, Value};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn args(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn registered(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|name| name.to_string()).collect()
}

fn write_step(capability: &str) -> Step {
    Step::assessed(capability, args(json!({ "path": "notes.md" })))
}

#[test]
fn policy_module_confines_paths_to_the_workspace() {
    let outer = tempdir().expect("tempdir");
    let root = outer.path().join("ws");
    fs::create_dir_all(root.join("src")).expect("mkdir");
    fs::write(outer.path().join("outside.txt"), "x").expect("write");

    let inside = confine(&root, Path::new("src/new_file.rs")).expect("inside");
    assert!(inside.ends_with("src/new_file.rs"));
    assert!(confine(&root, Path::new(".")).is_ok());

    for escape in ["../outside.txt", "src/../../outside.txt", "missing/../../x"] {
        let err = confine(&root, Path::new(escape)).expect_err(escape);
        assert!(matches!(err, PolicyViolation::PathEscape { .. }), "{escape}");
    }
    let absolute = outer.path().join("outside.txt");
    assert!(matches!(
        confine(&root, &absolute),
        Err(PolicyViolation::PathEscape { .. })
    ));
}

#[cfg(unix)]
#[test]
fn policy_module_rejects_symlinks_that_leave_the_workspace() {
    let outer = tempdir().expect("tempdir");
    let root = outer.path().join("ws");
    fs::create_dir_all(&root).expect("mkdir");
    std::os::unix::fs::symlink(outer.path(), root.join("escape")).expect("symlink");

    let err = confine(&root, Path::new("escape/anything")).expect_err("symlink escape");
    assert!(matches!(err, PolicyViolation::PathEscape { .. }));
}

#[cfg(unix)]
#[test]
fn policy_module_rejects_dangling_symlinks_that_point_outside() {
    let outer = tempdir().expect("tempdir");
    let root = outer.path().join("ws");
    fs::create_dir_all(&root).expect("mkdir");
    std::os::unix::fs::symlink(outer.path().join("pwned.txt"), root.join("notes.txt"))
        .expect("symlink");

    let err = confine(&root, Path::new("notes.txt")).expect_err("dangling escape");
    assert!(matches!(err, PolicyViolation::PathEscape { .. }));
}

#[test]
fn policy_module_denies_sensitive_files_and_forbidden_fragments() {
    assert!(matches!(
        deny_if_sensitive(Path::new("config/.env")),
        Err(PolicyViolation::SensitiveFile { .. })
    ));
    assert!(deny_if_sensitive(Path::new("config/env.md")).is_ok());

    let err = scan_forbidden_arguments(["push", "--force", "origin"]).expect_err("forbidden");
    assert_eq!(
        err,
        PolicyViolation::ForbiddenOperation {
            fragment: "push --force".to_string()
        }
    );
    assert!(scan_forbidden_arguments(["push", "origin", "main"]).is_ok());
    assert!(check_write_volume(MAX_WRITE_STEPS).is_ok());
    assert!(check_write_volume(MAX_WRITE_STEPS + 1).is_err());
}

#[test]
fn risk_module_defaults_unknown_capabilities_to_medium() {
    for name in ["rm_rf", "push", "", "Status"] {
        let assessment = assess(name, &Map::new());
        assert_eq!(assessment.level, RiskLevel::Medium, "{name}");
    }
}

#[test]
fn risk_module_escalates_force_delete_and_names_written_paths() {
    assert_eq!(
        assess("delete_branch", &args(json!({"force": true}))).level,
        RiskLevel::High
    );
    assert!(assess("delete_branch", &args(json!({"force": false}))).level <= RiskLevel::High);

    let written = assess("write_file", &args(json!({"path": "x"})));
    assert_eq!(written.level, RiskLevel::High);
    assert!(written.reason.contains('x'));
    assert_eq!(assess("status", &Map::new()).level, RiskLevel::Low);
}

#[test]
fn validator_module_requires_questions_for_empty_plans() {
    let errors = validate(&Plan::default(), &registered(&["status"]));
    assert!(errors.iter().any(|error| error.contains("questions")));

    let plan = Plan::clarification("unclear", "Which branch?");
    assert!(validate(&plan, &registered(&["status"])).is_empty());
}

#[test]
fn validator_module_requires_confirmation_for_write_steps() {
    let plan = Plan {
        intent: "write".to_string(),
        steps: vec![write_step("write_file")],
        ..Plan::default()
    };
    let errors = validate(&plan, &registered(&["write_file"]));
    assert!(errors.iter().any(|error| error.contains("needs_confirmation")));
}

#[test]
fn validator_module_rejects_too_many_writes_regardless_of_risk() {
    let mut steps = (0..11).map(|_| write_step("stage")).collect::<Vec<_>>();
    for step in &mut steps {
        step.risk_level = RiskLevel::High;
    }
    let plan = Plan {
        intent: "bulk".to_string(),
        needs_confirmation: true,
        steps,
        ..Plan::default()
    };
    let errors = validate(&plan, &registered(&["stage"]));
    assert!(errors.iter().any(|error| error.contains("exceeding the limit")));
}

#[test]
fn validator_module_reports_unregistered_capabilities() {
    let plan = Plan {
        intent: "inspect".to_string(),
        steps: vec![Step::assessed("status", Map::new())],
        ..Plan::default()
    };
    let errors = validate(&plan, &registered(&["log"]));
    assert_eq!(errors, vec!["unregistered capability: status".to_string()]);
}

#[test]
fn preflight_module_flags_escapes_and_sensitive_targets() {
    let root = tempdir().expect("tempdir");
    let plan = Plan {
        intent: "read".to_string(),
        needs_confirmation: true,
        steps: vec![
            Step::assessed("read_file", args(json!({"path": "../etc/passwd"}))),
            Step::assessed("read_file", args(json!({"path": ".env"}))),
            Step::assessed("write_file", args(json!({"path": "ok.md", "content": "reset --hard"}))),
        ],
        ..Plan::default()
    };
    let findings = preflight_policy(&plan, root.path());
    assert_eq!(findings.len(), 2, "{findings:?}");
    assert!(findings[0].starts_with("step 1 (read_file)"));
    assert!(findings[1].contains(".env"));
}

#[test]
fn confirmation_module_unlocks_only_gated_steps() {
    let mut plan = Plan {
        intent: "mixed".to_string(),
        needs_confirmation: true,
        steps: vec![
            Step::assessed("status", Map::new()),
            Step::assessed("commit", args(json!({"message": "m"}))),
            Step::assessed("delete_branch", args(json!({"name": "old"}))),
        ],
        ..Plan::default()
    };
    let untouched = plan.clone();
    apply_confirmation(&mut plan, false);
    assert_eq!(plan, untouched);

    apply_confirmation(&mut plan, true);
    assert!(plan.steps[0].simulate);
    assert!(!plan.steps[1].simulate);
    assert!(!plan.steps[2].simulate);
}

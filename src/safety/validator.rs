use crate::orchestration::plan::{Plan, RiskLevel, Step};
use crate::safety::policy::{
    check_write_volume, confine, deny_if_sensitive, deny_option_like, scan_forbidden_arguments,
    PolicyViolation,
};
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::Path;

pub const WRITE_CAPABILITIES: &[&str] = &[
    "init_repo",
    "stage",
    "commit",
    "switch_branch",
    "create_branch",
    "delete_branch",
    "stash_push",
    "stash_pop",
    "merge",
    "write_file",
    "patch_file",
];

const PATH_ARGUMENTS: &[&str] = &["path", "dir"];
const UNSCANNED_ARGUMENTS: &[&str] = &["content", "unified_diff"];
const REVISION_ARGUMENTS: &[&str] = &[
    "ref",
    "branch",
    "name",
    "target_branch",
    "from_ref",
    "author",
];

pub fn is_write_capability(capability: &str) -> bool {
    WRITE_CAPABILITIES.contains(&capability)
}

pub fn validate(plan: &Plan, registered: &BTreeSet<String>) -> Vec<String> {
    let mut errors = Vec::new();

    if plan.steps.is_empty() && plan.questions.is_empty() {
        errors.push("plan has no steps and no questions; an empty plan must ask one".to_string());
    }

    for step in &plan.steps {
        if !registered.contains(&step.capability) {
            errors.push(format!("unregistered capability: {}", step.capability));
        }
    }

    let write_steps = plan
        .steps
        .iter()
        .filter(|step| is_write_capability(&step.capability))
        .collect::<Vec<_>>();
    if write_steps.is_empty() {
        return errors;
    }

    if let Err(violation) = check_write_volume(write_steps.len()) {
        errors.push(violation.to_string());
    }
    if !plan.needs_confirmation {
        errors.push("plan contains write steps but needs_confirmation is false".to_string());
    }
    for step in write_steps {
        if step.risk_level == RiskLevel::Low {
            errors.push(format!(
                "write step `{}` must have medium or high risk, got low",
                step.capability
            ));
        }
        if step.risk_reason.trim().is_empty() {
            errors.push(format!(
                "write step `{}` is missing a risk reason",
                step.capability
            ));
        }
    }
    errors
}

/// Checks every step's path-like arguments against the workspace root and
/// scans its string arguments for forbidden fragments.
pub fn preflight_policy(plan: &Plan, workspace_root: &Path) -> Vec<String> {
    let mut errors = Vec::new();
    for (index, step) in plan.steps.iter().enumerate() {
        for violation in step_violations(step, workspace_root) {
            errors.push(format!(
                "step {} ({}): {violation}",
                index + 1,
                step.capability
            ));
        }
    }
    errors
}

fn step_violations(step: &Step, workspace_root: &Path) -> Vec<PolicyViolation> {
    let mut violations = Vec::new();

    let mut paths = PATH_ARGUMENTS
        .iter()
        .filter_map(|key| step.arguments.get(*key).and_then(Value::as_str))
        .collect::<Vec<_>>();
    if let Some(Value::Array(items)) = step.arguments.get("paths") {
        paths.extend(items.iter().filter_map(Value::as_str));
    }
    for path in paths {
        let checked = confine(workspace_root, Path::new(path))
            .and_then(|resolved| deny_if_sensitive(&resolved));
        if let Err(violation) = checked {
            violations.push(violation);
        }
    }

    for key in REVISION_ARGUMENTS {
        if let Some(value) = step.arguments.get(*key).and_then(Value::as_str) {
            if let Err(violation) = deny_option_like(key, value) {
                violations.push(violation);
            }
        }
    }

    let mut tokens = Vec::new();
    for (key, value) in &step.arguments {
        if UNSCANNED_ARGUMENTS.contains(&key.as_str()) {
            continue;
        }
        collect_strings(value, &mut tokens);
    }
    if let Err(violation) = scan_forbidden_arguments(&tokens) {
        violations.push(violation);
    }
    violations
}

fn collect_strings<'a>(value: &'a Value, out: &mut Vec<&'a str>) {
    match value {
        Value::String(text) => out.push(text),
        Value::Array(items) => items.iter().for_each(|item| collect_strings(item, out)),
        Value::Object(map) => map.values().for_each(|item| collect_strings(item, out)),
        _ => {}
    }
}

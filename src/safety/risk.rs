use crate::orchestration::plan::RiskLevel;
use serde_json::{Map, Value};

pub const UNKNOWN_CAPABILITY_REASON: &str = "unknown capability, conservative default";

const READ_ONLY: &str = "read-only operation";

const RISK_TABLE: &[(&str, RiskLevel, &str)] = &[
    ("status", RiskLevel::Low, READ_ONLY),
    ("diff", RiskLevel::Low, READ_ONLY),
    ("log", RiskLevel::Low, READ_ONLY),
    ("log_graph", RiskLevel::Low, READ_ONLY),
    ("list_branches", RiskLevel::Low, READ_ONLY),
    ("list_remotes", RiskLevel::Low, READ_ONLY),
    ("show", RiskLevel::Low, READ_ONLY),
    ("list_files", RiskLevel::Low, READ_ONLY),
    ("read_file", RiskLevel::Low, READ_ONLY),
    ("search_files", RiskLevel::Low, READ_ONLY),
    ("build_index", RiskLevel::Low, "builds a read-only index"),
    ("index_status", RiskLevel::Low, READ_ONLY),
    ("search_index", RiskLevel::Low, READ_ONLY),
    ("summarize_repo", RiskLevel::Low, READ_ONLY),
    ("suggest_organization", RiskLevel::Low, READ_ONLY),
    ("init_repo", RiskLevel::Medium, "creates a .git directory"),
    ("stage", RiskLevel::Medium, "modifies the staging area"),
    ("commit", RiskLevel::Medium, "creates a commit"),
    (
        "switch_branch",
        RiskLevel::Medium,
        "switching branches may change the working tree",
    ),
    ("create_branch", RiskLevel::Medium, "creates a branch"),
    ("delete_branch", RiskLevel::High, "deletes a branch"),
    ("stash_push", RiskLevel::Medium, "stashes working tree changes"),
    ("stash_pop", RiskLevel::High, "restoring a stash may conflict"),
    ("merge", RiskLevel::High, "merging may conflict"),
    ("write_file", RiskLevel::High, "writes a file"),
    ("patch_file", RiskLevel::High, "patches a file"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assessment {
    pub level: RiskLevel,
    pub reason: String,
}

impl Assessment {
    fn new(level: RiskLevel, reason: impl Into<String>) -> Self {
        Self {
            level,
            reason: reason.into(),
        }
    }
}

pub fn assess(capability: &str, arguments: &Map<String, Value>) -> Assessment {
    let Some((_, level, reason)) = RISK_TABLE.iter().find(|(name, _, _)| *name == capability)
    else {
        return Assessment::new(RiskLevel::Medium, UNKNOWN_CAPABILITY_REASON);
    };

    match capability {
        "delete_branch" if is_truthy(arguments.get("force")) => {
            Assessment::new(RiskLevel::High, "force-deleting a branch")
        }
        "switch_branch" if is_truthy(arguments.get("create")) => {
            Assessment::new(RiskLevel::Medium, "creates and switches to a branch")
        }
        "write_file" | "patch_file" => match arguments.get("path").filter(|v| is_truthy(Some(v)))
        {
            Some(path) => Assessment::new(
                RiskLevel::High,
                format!("{reason}: {}", display_argument(path)),
            ),
            None => Assessment::new(RiskLevel::High, *reason),
        },
        _ => Assessment::new(*level, *reason),
    }
}

pub fn is_known_capability(capability: &str) -> bool {
    RISK_TABLE.iter().any(|(name, _, _)| *name == capability)
}

fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(flag)) => *flag,
        Some(Value::Number(number)) => number.as_f64().is_some_and(|n| n != 0.0),
        Some(Value::String(text)) => !text.is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(Value::Object(map)) => !map.is_empty(),
    }
}

fn display_argument(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

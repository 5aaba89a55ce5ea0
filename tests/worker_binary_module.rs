use gitward::config::Settings;
use gitward::orchestration::connect;
use gitward::rpc::{ProcessChannel, RpcClient, RpcError};
use serde_json::{json, Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::tempdir;

fn worker_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_gitward-worker"))
}

fn client(workspace: &Path) -> RpcClient<ProcessChannel> {
    let channel = ProcessChannel::spawn(&worker_binary(), workspace).expect("spawn worker");
    RpcClient::new(channel, Duration::from_secs(10))
}

fn args(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

#[test]
fn worker_binary_lists_every_capability() {
    let dir = tempdir().expect("tempdir");
    let mut client = client(dir.path());
    let tools = client.list_tools().expect("tools");
    assert_eq!(tools.len(), 26);
    for name in ["status", "write_file", "build_index", "merge"] {
        assert!(tools.contains_key(name), "{name}");
        assert!(tools[name]["description"].is_string());
    }
    client.close();
}

#[test]
fn worker_binary_write_file_dry_run_leaves_disk_untouched() {
    let dir = tempdir().expect("tempdir");
    let mut client = client(dir.path());
    let result = client
        .call_tool(
            "write_file",
            args(json!({"path": "notes/todo.md", "content": "ship it\n"})),
        )
        .expect("call");
    assert_eq!(result["ok"], true);
    assert_eq!(result["dry_run"], true);
    assert!(result["diff"]
        .as_str()
        .is_some_and(|diff| diff.contains("+ship it")));
    assert!(!dir.path().join("notes/todo.md").exists());
}

#[test]
fn worker_binary_refuses_paths_outside_the_workspace() {
    let dir = tempdir().expect("tempdir");
    let mut client = client(dir.path());
    let err = client
        .call_tool("read_file", args(json!({"path": "../../etc/passwd"})))
        .expect_err("escape");
    assert!(matches!(err, RpcError::Remote { .. }));
    assert!(err.to_string().contains("escapes"), "{err}");
    assert!(client.call_tool("list_files", Map::new()).is_ok());
}

#[test]
fn worker_binary_serves_resources_and_rejects_unknown_ones() {
    let dir = tempdir().expect("tempdir");
    fs::write(dir.path().join("README.md"), "# demo\n").expect("write");
    let mut client = client(dir.path());

    let resources = client.list_resources().expect("resources");
    assert_eq!(resources.len(), 4);
    let info = client.read_resource("workspace/info").expect("info");
    assert_eq!(info["uri"], "workspace/info");
    assert_eq!(info["content"]["files"], 1);

    let err = client.read_resource("secrets/all").expect_err("unknown");
    assert_eq!(err.to_string(), "unknown resource `secrets/all`");
}

#[test]
fn worker_binary_rejects_missing_workspace_directory() {
    let dir = tempdir().expect("tempdir");
    let status = std::process::Command::new(worker_binary())
        .arg("--workspace")
        .arg(dir.path().join("absent"))
        .status()
        .expect("run worker");
    assert!(!status.success());
}

#[test]
fn worker_binary_backs_a_full_run_with_the_rule_planner() {
    let dir = tempdir().expect("tempdir");
    fs::write(dir.path().join("README.md"), "# demo\n").expect("write");
    let mut settings = Settings::default();
    settings.use_llm = false;
    settings.worker.binary = Some(worker_binary());

    let mut orchestrator = connect(dir.path(), &settings).expect("connect");
    let planned = orchestrator.plan("list files").expect("plan");
    assert!(planned.errors.is_empty(), "{:?}", planned.errors);
    let plan = planned.plan.clone().expect("plan");
    assert_eq!(plan.steps[0].capability, "list_files");

    let outcome = orchestrator
        .execute(plan, &planned.run_id, false)
        .expect("execute");
    assert!(outcome.succeeded());
    let items = outcome.results[0]
        .result
        .as_ref()
        .and_then(|result| result.get("items"))
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    assert!(items.contains(&json!("README.md")));
    assert!(dir.path().join(".gitward/last_run_summary.json").is_file());
    orchestrator.close();
}

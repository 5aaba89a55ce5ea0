use crate::config::Settings;
use crate::orchestration::error::OrchestratorError;
use crate::orchestration::orchestrator::Orchestrator;
use crate::planner::{ChatPlanner, Planner, RulePlanner};
use crate::rpc::{LineChannel, LocalChannel, ProcessChannel, RpcClient, WorkerServer};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const WORKER_BINARY_NAME: &str = "gitward-worker";

/// Worker binary: configured path, else a sibling of the current
/// executable, else whatever `PATH` resolves.
pub fn resolve_worker_binary(settings: &Settings) -> PathBuf {
    if let Some(binary) = &settings.worker.binary {
        return binary.clone();
    }
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(WORKER_BINARY_NAME)))
        .filter(|candidate| candidate.is_file())
        .unwrap_or_else(|| PathBuf::from(WORKER_BINARY_NAME))
}

/// Spawns a worker process for `workspace` and wires the orchestrator to it.
pub fn connect(
    workspace: &Path,
    settings: &Settings,
) -> Result<Orchestrator<ProcessChannel>, OrchestratorError> {
    let channel = ProcessChannel::spawn(&resolve_worker_binary(settings), workspace)?;
    assemble(workspace, settings, channel)
}

/// Same wiring with the worker running on a thread in this process.
pub fn connect_local(
    workspace: &Path,
    settings: &Settings,
) -> Result<Orchestrator<LocalChannel>, OrchestratorError> {
    let server = WorkerServer::for_workspace(workspace)?;
    assemble(workspace, settings, LocalChannel::spawn(server))
}

fn assemble<C: LineChannel>(
    workspace: &Path,
    settings: &Settings,
    channel: C,
) -> Result<Orchestrator<C>, OrchestratorError> {
    let mut client = RpcClient::new(
        channel,
        Duration::from_millis(settings.worker.response_timeout_ms),
    );
    let planner: Box<dyn Planner> = if settings.use_llm {
        let catalog = client.list_tools()?;
        Box::new(ChatPlanner::new(&settings.planner, &catalog))
    } else {
        Box::new(RulePlanner::new())
    };
    Ok(Orchestrator::new(workspace, client, planner))
}

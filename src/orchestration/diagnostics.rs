use crate::config::event_log_dir;
use crate::shared::logging::append_json_line;
use crate::shared::time::now_local_iso;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunEvent {
    RunStart,
    UserInput,
    PlanGenerated,
    PlanValidated,
    StepDryRun,
    StepConfirmed,
    StepExecuted,
    StepRejected,
    RunSummary,
}

impl RunEvent {
    pub fn as_str(self) -> &'static str {
        match self {
            RunEvent::RunStart => "RUN_START",
            RunEvent::UserInput => "USER_INPUT",
            RunEvent::PlanGenerated => "PLAN_GENERATED",
            RunEvent::PlanValidated => "PLAN_VALIDATED",
            RunEvent::StepDryRun => "STEP_DRYRUN",
            RunEvent::StepConfirmed => "STEP_CONFIRMED",
            RunEvent::StepExecuted => "STEP_EXECUTED",
            RunEvent::StepRejected => "STEP_REJECTED",
            RunEvent::RunSummary => "RUN_SUMMARY",
        }
    }
}

impl std::fmt::Display for RunEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Append-only JSONL event log for one run.
#[derive(Debug, Clone)]
pub struct EventLog {
    run_id: String,
    path: PathBuf,
}

impl EventLog {
    pub fn new(workspace: &Path, run_id: &str) -> Self {
        Self {
            run_id: run_id.to_string(),
            path: event_log_dir(workspace).join(format!("{run_id}.jsonl")),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write failures are dropped; a run never fails because of its log.
    pub fn log(&self, event: RunEvent, payload: Value) {
        let record = json!({
            "time": now_local_iso(),
            "event": event.as_str(),
            "run_id": self.run_id,
            "payload": payload,
        });
        let _ = append_json_line(&self.path, &record);
    }
}

use crate::config::workspace_state_dir;
use crate::orchestration::error::OrchestratorError;
use crate::shared::fs_atomic::atomic_write_file;
use crate::shared::time::now_local_iso;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

pub const CHANGES_FILE_NAME: &str = "changes.md";
pub const LAST_RUN_SUMMARY_FILE_NAME: &str = "last_run_summary.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Planning,
    Validating,
    AwaitingConfirmation,
    Executing,
    Summarized,
}

impl RunPhase {
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (RunPhase::Planning, RunPhase::Validating)
                | (RunPhase::Validating, RunPhase::AwaitingConfirmation)
                | (RunPhase::Validating, RunPhase::Executing)
                | (RunPhase::AwaitingConfirmation, RunPhase::Executing)
                | (RunPhase::AwaitingConfirmation, RunPhase::Summarized)
                | (RunPhase::Executing, RunPhase::Summarized)
        )
    }

    pub fn is_terminal(self) -> bool {
        self == RunPhase::Summarized
    }
}

impl std::fmt::Display for RunPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunPhase::Planning => write!(f, "planning"),
            RunPhase::Validating => write!(f, "validating"),
            RunPhase::AwaitingConfirmation => write!(f, "awaiting_confirmation"),
            RunPhase::Executing => write!(f, "executing"),
            RunPhase::Summarized => write!(f, "summarized"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    #[serde(rename = "tool")]
    pub capability: String,
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StepResult {
    pub fn succeeded(capability: impl Into<String>, result: Value) -> Self {
        Self {
            capability: capability.into(),
            ok: true,
            result: Some(result),
            error: None,
        }
    }

    /// A failed step keeps the handler payload when there was one.
    pub fn failed(
        capability: impl Into<String>,
        error: impl Into<String>,
        result: Option<Value>,
    ) -> Self {
        Self {
            capability: capability.into(),
            ok: false,
            result,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: String,
    pub started_at: i64,
    pub phase: RunPhase,
    #[serde(default)]
    pub steps_executed: Vec<StepResult>,
}

impl RunRecord {
    pub fn new(run_id: impl Into<String>, started_at: i64) -> Self {
        Self {
            run_id: run_id.into(),
            started_at,
            phase: RunPhase::Planning,
            steps_executed: Vec::new(),
        }
    }

    pub fn transition(&mut self, next: RunPhase) -> Result<(), OrchestratorError> {
        if !self.phase.can_transition_to(next) {
            return Err(OrchestratorError::InvalidPhaseTransition {
                from: self.phase,
                to: next,
            });
        }
        self.phase = next;
        Ok(())
    }

    pub fn record(&mut self, result: StepResult) {
        self.steps_executed.push(result);
    }

    pub fn summary(&self) -> String {
        summarize_results(&self.steps_executed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutcome {
    pub run_id: String,
    pub summary: String,
    pub results: Vec<StepResult>,
}

impl RunOutcome {
    pub fn succeeded(&self) -> bool {
        self.results.iter().all(|result| result.ok)
    }
}

pub fn summarize_results(results: &[StepResult]) -> String {
    if results.is_empty() {
        return "no steps executed".to_string();
    }
    let succeeded = results.iter().filter(|result| result.ok).count();
    format!(
        "executed {} step(s), {succeeded} succeeded",
        results.len()
    )
}

/// Writes the per-workspace run report: a markdown digest plus the JSON
/// summary of the most recent run. Both files are replaced atomically.
#[derive(Debug, Clone)]
pub struct RunReportStore {
    state_dir: PathBuf,
}

impl RunReportStore {
    pub fn new(workspace: &Path) -> Self {
        Self {
            state_dir: workspace_state_dir(workspace),
        }
    }

    pub fn changes_path(&self) -> PathBuf {
        self.state_dir.join(CHANGES_FILE_NAME)
    }

    pub fn summary_path(&self) -> PathBuf {
        self.state_dir.join(LAST_RUN_SUMMARY_FILE_NAME)
    }

    pub fn write(&self, outcome: &RunOutcome) -> Result<(), OrchestratorError> {
        let time = now_local_iso();

        let mut changes = format!(
            "# Run summary\n\n- run_id: {}\n- time: {time}\n\n{}\n",
            outcome.run_id, outcome.summary
        );
        if !outcome.results.is_empty() {
            changes.push('\n');
            for result in &outcome.results {
                let status = if result.ok { "ok" } else { "failed" };
                match &result.error {
                    Some(error) => changes
                        .push_str(&format!("- `{}`: {status} ({error})\n", result.capability)),
                    None => changes.push_str(&format!("- `{}`: {status}\n", result.capability)),
                }
            }
        }
        let changes_path = self.changes_path();
        atomic_write_file(&changes_path, changes.as_bytes())
            .map_err(|e| io_error(&changes_path, e))?;

        let summary_path = self.summary_path();
        let summary = json!({
            "run_id": outcome.run_id,
            "summary": outcome.summary,
            "steps": outcome.results,
            "time": time,
        });
        let body = serde_json::to_vec_pretty(&summary).map_err(|e| json_error(&summary_path, e))?;
        atomic_write_file(&summary_path, &body).map_err(|e| io_error(&summary_path, e))
    }

    pub fn load_last(&self) -> Result<Option<RunOutcome>, OrchestratorError> {
        let path = self.summary_path();
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(io_error(&path, err)),
        };
        let value: Value = serde_json::from_str(&raw).map_err(|e| json_error(&path, e))?;
        let results = serde_json::from_value(value["steps"].clone())
            .map_err(|e| json_error(&path, e))?;
        Ok(Some(RunOutcome {
            run_id: value["run_id"].as_str().unwrap_or_default().to_string(),
            summary: value["summary"].as_str().unwrap_or_default().to_string(),
            results,
        }))
    }
}

fn io_error(path: &Path, source: std::io::Error) -> OrchestratorError {
    OrchestratorError::Io {
        path: path.display().to_string(),
        source,
    }
}

fn json_error(path: &Path, source: serde_json::Error) -> OrchestratorError {
    OrchestratorError::Json {
        path: path.display().to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_table_allows_skipping_confirmation_only_from_validating() {
        assert!(RunPhase::Validating.can_transition_to(RunPhase::Executing));
        assert!(RunPhase::AwaitingConfirmation.can_transition_to(RunPhase::Executing));
        assert!(!RunPhase::Planning.can_transition_to(RunPhase::Executing));
        assert!(!RunPhase::Summarized.can_transition_to(RunPhase::Planning));
        assert!(RunPhase::Summarized.is_terminal());
    }

    #[test]
    fn invalid_transition_is_rejected_and_phase_kept() {
        let mut record = RunRecord::new("run-1-0000", 1);
        let err = record
            .transition(RunPhase::Summarized)
            .expect_err("planning cannot summarize");
        assert!(matches!(err, OrchestratorError::InvalidPhaseTransition { .. }));
        assert_eq!(record.phase, RunPhase::Planning);
    }

    #[test]
    fn summaries_count_successes() {
        assert_eq!(summarize_results(&[]), "no steps executed");
        let results = vec![
            StepResult::succeeded("status", json!({"ok": true})),
            StepResult::failed("commit", "nothing staged", None),
        ];
        assert_eq!(summarize_results(&results), "executed 2 step(s), 1 succeeded");
    }

    #[test]
    fn report_files_round_trip_last_run() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = RunReportStore::new(dir.path());
        assert!(store.load_last().expect("load").is_none());
        let outcome = RunOutcome {
            run_id: "run-abc-0001".to_string(),
            summary: "executed 1 step(s), 0 succeeded".to_string(),
            results: vec![StepResult::failed("merge", "conflict", None)],
        };
        store.write(&outcome).expect("write");

        let changes = std::fs::read_to_string(store.changes_path()).expect("changes");
        assert!(changes.contains("- run_id: run-abc-0001"));
        assert!(changes.contains("- `merge`: failed (conflict)"));
        assert_eq!(store.load_last().expect("load"), Some(outcome));
    }
}

use crate::orchestration::diagnostics::{EventLog, RunEvent};
use crate::orchestration::error::OrchestratorError;
use crate::orchestration::plan::{Plan, PlanResult};
use crate::orchestration::run_store::{
    RunOutcome, RunPhase, RunRecord, RunReportStore, StepResult,
};
use crate::planner::{Planner, PlannerError, RulePlanner};
use crate::rpc::{LineChannel, RpcClient, RpcError};
use crate::safety::{apply_confirmation, preflight_policy, validate};
use crate::shared::ids::generate_run_id;
use crate::shared::time::now_secs;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

/// Drives one request from free text to executed steps: plan, assess,
/// validate, gate, then call capabilities strictly in order.
pub struct Orchestrator<C: LineChannel> {
    workspace: PathBuf,
    client: RpcClient<C>,
    planner: Box<dyn Planner>,
    fallback: RulePlanner,
    reports: RunReportStore,
}

impl<C: LineChannel> Orchestrator<C> {
    pub fn new(
        workspace: impl Into<PathBuf>,
        client: RpcClient<C>,
        planner: Box<dyn Planner>,
    ) -> Self {
        let workspace = workspace.into();
        let reports = RunReportStore::new(&workspace);
        Self {
            workspace,
            client,
            planner,
            fallback: RulePlanner::new(),
            reports,
        }
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    pub fn client(&self) -> &RpcClient<C> {
        &self.client
    }

    pub fn client_mut(&mut self) -> &mut RpcClient<C> {
        &mut self.client
    }

    pub fn reports(&self) -> &RunReportStore {
        &self.reports
    }

    pub fn plan(&mut self, text: &str) -> Result<PlanResult, OrchestratorError> {
        let run_id = generate_run_id(now_secs()).map_err(OrchestratorError::RunId)?;
        let log = EventLog::new(&self.workspace, &run_id);
        log.log(
            RunEvent::RunStart,
            json!({ "workspace": self.workspace.display().to_string() }),
        );
        log.log(RunEvent::UserInput, json!({ "text": text }));

        let mut result = PlanResult {
            run_id,
            ..PlanResult::default()
        };
        let Some(mut plan) = self.draft_plan(text, &mut result) else {
            log.log(RunEvent::PlanGenerated, json!({ "errors": result.errors }));
            return Ok(result);
        };

        for step in &mut plan.steps {
            step.reassess();
        }
        match self.client.tool_names() {
            Ok(registered) => result.errors.extend(validate(&plan, &registered)),
            Err(err) => result
                .errors
                .push(format!("capability listing failed: {err}")),
        }
        result
            .errors
            .extend(preflight_policy(&plan, &self.workspace));

        log.log(RunEvent::PlanGenerated, plan_payload(&plan));
        log.log(
            RunEvent::PlanValidated,
            json!({ "errors": result.errors, "warnings": result.warnings }),
        );
        result.plan = Some(plan);
        Ok(result)
    }

    fn draft_plan(&self, text: &str, result: &mut PlanResult) -> Option<Plan> {
        let (fallback_reason, clear_questions) = match self.planner.plan(text) {
            Ok(plan) => return Some(plan),
            Err(err @ PlannerError::Unavailable { .. }) => (err.to_string(), true),
            Err(err @ PlannerError::InvalidOutput(_)) => (err.to_string(), false),
            Err(err @ PlannerError::Failed(_)) => {
                result.errors.push(err.to_string());
                return None;
            }
        };

        result
            .warnings
            .push(format!("{fallback_reason}; falling back to rule planner"));
        match self.fallback.plan(text) {
            Ok(mut plan) => {
                if clear_questions && plan.all_steps_low_risk() {
                    plan.questions.clear();
                }
                Some(plan)
            }
            Err(err) => {
                result.errors.push(err.to_string());
                None
            }
        }
    }

    pub fn execute(
        &mut self,
        mut plan: Plan,
        run_id: &str,
        confirmed: bool,
    ) -> Result<RunOutcome, OrchestratorError> {
        let log = EventLog::new(&self.workspace, run_id);
        let mut record = RunRecord::new(run_id, now_secs());
        record.transition(RunPhase::Validating)?;
        let gated = plan.needs_confirmation
            || plan
                .steps
                .iter()
                .any(|step| step.risk_level.requires_confirmation());
        if gated {
            record.transition(RunPhase::AwaitingConfirmation)?;
        }
        apply_confirmation(&mut plan, confirmed);
        record.transition(RunPhase::Executing)?;

        for step in &plan.steps {
            let mut arguments = step.arguments.clone();
            arguments.insert("dry_run".to_string(), Value::Bool(step.simulate));
            if step.simulate {
                log.log(
                    RunEvent::StepDryRun,
                    json!({ "tool": step.capability, "args": arguments }),
                );
            } else {
                log.log(
                    RunEvent::StepConfirmed,
                    json!({ "tool": step.capability, "confirmed": confirmed }),
                );
            }

            let outcome = self.client.call_tool(&step.capability, arguments);
            let step_result = step_result(&step.capability, outcome);
            if step_result.ok {
                log.log(
                    RunEvent::StepExecuted,
                    json!({ "tool": step.capability, "result": step_result.result }),
                );
                record.record(step_result);
                continue;
            }
            log.log(
                RunEvent::StepRejected,
                json!({ "tool": step.capability, "error": step_result.error }),
            );
            record.record(step_result);
            break;
        }

        record.transition(RunPhase::Summarized)?;
        let outcome = RunOutcome {
            run_id: record.run_id.clone(),
            summary: record.summary(),
            results: record.steps_executed,
        };
        self.reports.write(&outcome)?;
        log.log(RunEvent::RunSummary, json!({ "summary": outcome.summary }));
        Ok(outcome)
    }

    pub fn close(&mut self) {
        self.client.close();
    }
}

fn step_result(capability: &str, outcome: Result<Value, RpcError>) -> StepResult {
    match outcome {
        Ok(value) if value.get("ok").and_then(Value::as_bool) == Some(false) => {
            let error = value
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("capability reported failure")
                .to_string();
            StepResult::failed(capability, error, Some(value))
        }
        Ok(value) => StepResult::succeeded(capability, value),
        Err(err) if err.is_transport_failure() => {
            StepResult::failed(capability, format!("transport failure: {err}"), None)
        }
        Err(err) => StepResult::failed(capability, err.to_string(), None),
    }
}

fn plan_payload(plan: &Plan) -> Value {
    serde_json::to_value(plan).unwrap_or_else(|err| json!({ "error": err.to_string() }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_false_results_become_failures_with_payload() {
        let result = step_result(
            "commit",
            Ok(json!({"ok": false, "error": "nothing staged"})),
        );
        assert!(!result.ok);
        assert_eq!(result.error.as_deref(), Some("nothing staged"));
        assert!(result.result.is_some());
    }

    #[test]
    fn results_without_ok_flag_count_as_success() {
        let result = step_result("status", Ok(json!({"branch": "main"})));
        assert!(result.ok);
    }

    #[test]
    fn transport_failures_are_labelled() {
        let result = step_result("status", Err(RpcError::ChannelClosed));
        assert!(result
            .error
            .as_deref()
            .is_some_and(|error| error.starts_with("transport failure")));
    }
}

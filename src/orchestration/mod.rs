pub mod bootstrap;
pub mod diagnostics;
pub mod error;
pub mod orchestrator;
pub mod plan;
pub mod run_store;

pub use bootstrap::{connect, connect_local, resolve_worker_binary, WORKER_BINARY_NAME};
pub use diagnostics::{EventLog, RunEvent};
pub use error::OrchestratorError;
pub use orchestrator::Orchestrator;
pub use plan::{Plan, PlanResult, RiskLevel, Step};
pub use run_store::{
    summarize_results, RunOutcome, RunPhase, RunRecord, RunReportStore, StepResult,
};

pub mod chat;
pub mod error;
pub mod output_parse;
pub mod prompt;
pub mod rule;

pub use chat::ChatPlanner;
pub use error::{PlannerError, UnavailableReason};
pub use output_parse::parse_plan;
pub use prompt::system_prompt;
pub use rule::RulePlanner;

use crate::orchestration::plan::Plan;

/// Turns free text into a plan. Risk fields in the returned plan are
/// advisory; the orchestrator re-assesses every step.
pub trait Planner: Send {
    fn plan(&self, text: &str) -> Result<Plan, PlannerError>;
}

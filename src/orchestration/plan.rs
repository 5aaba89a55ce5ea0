use crate::safety::risk;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    #[default]
    Medium,
    High,
}

impl RiskLevel {
    /// Medium and high steps stay simulated until a human confirms.
    pub fn requires_confirmation(self) -> bool {
        matches!(self, RiskLevel::Medium | RiskLevel::High)
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "low"),
            RiskLevel::Medium => write!(f, "medium"),
            RiskLevel::High => write!(f, "high"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    #[serde(rename = "tool")]
    pub capability: String,
    #[serde(rename = "args", default)]
    pub arguments: Map<String, Value>,
    #[serde(rename = "safety_level", default)]
    pub risk_level: RiskLevel,
    #[serde(rename = "safety_reason", default)]
    pub risk_reason: String,
    #[serde(rename = "dry_run", default = "default_simulate")]
    pub simulate: bool,
}

impl Step {
    /// Builds a simulated step with its risk taken from the assessor.
    pub fn assessed(capability: impl Into<String>, arguments: Map<String, Value>) -> Self {
        let mut step = Self {
            capability: capability.into(),
            arguments,
            risk_level: RiskLevel::Medium,
            risk_reason: String::new(),
            simulate: true,
        };
        step.reassess();
        step
    }

    /// Replaces planner-supplied risk with the assessor's verdict. Gated
    /// steps go back to simulation; only confirmation may lift it.
    pub fn reassess(&mut self) {
        let assessment = risk::assess(&self.capability, &self.arguments);
        self.risk_level = assessment.level;
        self.risk_reason = assessment.reason;
        if self.risk_level.requires_confirmation() {
            self.simulate = true;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    #[serde(default)]
    pub intent: String,
    #[serde(default)]
    pub assumptions: Vec<String>,
    #[serde(default)]
    pub questions: Vec<String>,
    #[serde(default)]
    pub needs_confirmation: bool,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Plan {
    pub fn clarification(intent: impl Into<String>, question: impl Into<String>) -> Self {
        Self {
            intent: intent.into(),
            questions: vec![question.into()],
            ..Self::default()
        }
    }

    pub fn all_steps_low_risk(&self) -> bool {
        !self.steps.is_empty()
            && self
                .steps
                .iter()
                .all(|step| step.risk_level == RiskLevel::Low)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanResult {
    pub plan: Option<Plan>,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
    pub run_id: String,
}

impl PlanResult {
    pub fn is_executable(&self) -> bool {
        self.errors.is_empty() && self.plan.as_ref().is_some_and(|plan| !plan.steps.is_empty())
    }
}

fn default_simulate() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wire_plan_fills_missing_fields_with_defaults() {
        let plan: Plan = serde_json::from_value(json!({
            "intent": "inspect",
            "steps": [{"tool": "status"}]
        }))
        .expect("parse plan");

        assert!(plan.assumptions.is_empty());
        assert!(!plan.needs_confirmation);
        let step = &plan.steps[0];
        assert_eq!(step.capability, "status");
        assert!(step.arguments.is_empty());
        assert_eq!(step.risk_level, RiskLevel::Medium);
        assert!(step.simulate);
    }

    #[test]
    fn step_serializes_with_wire_names() {
        let step = Step::assessed("write_file", Map::new());
        let encoded = serde_json::to_value(&step).expect("encode");
        assert_eq!(encoded["tool"], "write_file");
        assert_eq!(encoded["safety_level"], "high");
        assert_eq!(encoded["dry_run"], true);
        assert!(encoded.get("capability").is_none());
    }

    #[test]
    fn reassess_puts_gated_steps_back_into_simulation() {
        let mut step: Step = serde_json::from_value(json!({
            "tool": "write_file",
            "args": {"path": "a.txt", "content": "x"},
            "safety_level": "low",
            "dry_run": false
        }))
        .expect("parse step");
        step.reassess();
        assert_eq!(step.risk_level, RiskLevel::High);
        assert!(step.simulate);

        let mut read: Step =
            serde_json::from_value(json!({"tool": "status", "dry_run": false})).expect("parse");
        read.reassess();
        assert!(!read.simulate);
    }
}

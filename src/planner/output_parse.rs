use super::PlannerError;
use crate::orchestration::plan::Plan;

/// Parses model output into a plan. Accepts a bare object, a fenced block,
/// or an object surrounded by prose: everything from the first `{` to the
/// last `}` is decoded.
pub fn parse_plan(raw: &str) -> Result<Plan, PlannerError> {
    let start = raw
        .find('{')
        .ok_or_else(|| PlannerError::InvalidOutput("no JSON object in planner output".to_string()))?;
    let end = raw
        .rfind('}')
        .filter(|end| *end > start)
        .ok_or_else(|| PlannerError::InvalidOutput("unterminated JSON object".to_string()))?;
    serde_json::from_str::<Plan>(&raw[start..=end])
        .map_err(|err| PlannerError::InvalidOutput(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestration::plan::RiskLevel;

    #[test]
    fn parses_fenced_plan_with_defaults() {
        let raw = "Here is the plan:\n```json\n{\"intent\":\"inspect\",\"steps\":[{\"tool\":\"status\"}]}\n```";
        let plan = parse_plan(raw).expect("plan");
        assert_eq!(plan.intent, "inspect");
        assert_eq!(plan.steps.len(), 1);
        assert!(plan.steps[0].simulate);
        assert_eq!(plan.steps[0].risk_level, RiskLevel::Medium);
        assert!(plan.steps[0].arguments.is_empty());
        assert!(!plan.needs_confirmation);
    }

    #[test]
    fn rejects_output_without_an_object() {
        let err = parse_plan("I cannot help with that").expect_err("no json");
        assert!(matches!(err, PlannerError::InvalidOutput(_)));
    }

    #[test]
    fn rejects_malformed_object() {
        let err = parse_plan("{\"steps\": [}").expect_err("malformed");
        assert!(matches!(err, PlannerError::InvalidOutput(_)));
    }
}

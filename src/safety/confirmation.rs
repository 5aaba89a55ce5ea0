use crate::orchestration::plan::Plan;

/// Lifts medium and high risk steps out of simulation once a human has
/// confirmed the plan. Low risk steps and unconfirmed plans are left as is.
pub fn apply_confirmation(plan: &mut Plan, confirmed: bool) {
    if !confirmed {
        return;
    }
    for step in &mut plan.steps {
        if step.risk_level.requires_confirmation() {
            step.simulate = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestration::plan::{RiskLevel, Step};
    use serde_json::{json, Map};

    fn sample_plan() -> Plan {
        let mut read = Step::assessed("status", Map::new());
        read.simulate = true;
        let stage = Step::assessed(
            "stage",
            json!({"paths": ["a.txt"]}).as_object().cloned().unwrap_or_default(),
        );
        let write = Step::assessed(
            "write_file",
            json!({"path": "a.txt", "content": "x"})
                .as_object()
                .cloned()
                .unwrap_or_default(),
        );
        Plan {
            needs_confirmation: true,
            steps: vec![read, stage, write],
            ..Plan::default()
        }
    }

    #[test]
    fn confirmed_plan_unlocks_gated_steps_only() {
        let mut plan = sample_plan();
        apply_confirmation(&mut plan, true);
        for step in &plan.steps {
            match step.risk_level {
                RiskLevel::Low => assert!(step.simulate),
                RiskLevel::Medium | RiskLevel::High => assert!(!step.simulate),
            }
        }
    }

    #[test]
    fn unconfirmed_plan_is_unchanged() {
        let mut plan = sample_plan();
        let before = plan.clone();
        apply_confirmation(&mut plan, false);
        assert_eq!(plan, before);
    }
}

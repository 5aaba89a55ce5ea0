use serde_json::{Map, Value};

const PLAN_SCHEMA: &str = r#"{
  "intent": "...",
  "assumptions": ["..."],
  "questions": ["..."],
  "needs_confirmation": true,
  "steps": [
    {
      "tool": "capability_name",
      "args": {"key": "value"},
      "safety_level": "low|medium|high",
      "safety_reason": "...",
      "dry_run": true
    }
  ]
}"#;

/// System prompt for model planners, listing the capabilities the worker
/// advertises in `tools/list`.
pub fn system_prompt(capabilities: &Map<String, Value>) -> String {
    let mut prompt = String::from(
        "You plan git and workspace file operations. Reply with exactly one JSON object and \
         no other text.\n\nRules:\n\
         - The object must follow the plan schema below.\n\
         - Every `tool` must be one of the listed capabilities; free-form shell is not allowed.\n\
         - Any write operation requires `needs_confirmation: true`.\n\
         - When information is missing, leave `steps` empty and ask in `questions`.\n\
         - Every step carries `safety_level` and `safety_reason`.\n\
         - Write steps default to `dry_run: true`.\n\nCapabilities:\n",
    );
    for (name, entry) in capabilities {
        let description = entry
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or_default();
        prompt.push_str(&format!("- {name}: {description}\n"));
    }
    prompt.push_str("\nPlan schema:\n");
    prompt.push_str(PLAN_SCHEMA);
    prompt.push('\n');
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn prompt_lists_capabilities_in_order() {
        let catalog = json!({
            "status": {"description": "Show status."},
            "commit": {"description": "Commit."},
        });
        let prompt = system_prompt(catalog.as_object().expect("object"));
        let commit = prompt.find("- commit: Commit.").expect("commit listed");
        let status = prompt.find("- status: Show status.").expect("status listed");
        assert!(commit < status);
        assert!(prompt.contains("\"safety_level\""));
    }
}

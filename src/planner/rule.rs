use super::{Planner, PlannerError};
use crate::orchestration::plan::{Plan, Step};
use crate::safety::FORBIDDEN_FRAGMENTS;
use regex::Regex;
use serde_json::{json, Map, Value};
use std::sync::OnceLock;

const INTENT: &str = "interpret the request with keyword rules";
const DEFAULT_SEARCH_QUERY: &str = "project overview";

struct Rules {
    status: Regex,
    log: Regex,
    diff: Regex,
    branches: Regex,
    init: Regex,
    commit: Regex,
    commit_message: Regex,
    commit_quoted: Regex,
    stage: Regex,
    stage_all: Regex,
    stage_paths: Regex,
    switch: Regex,
    switch_target: Regex,
    create_branch: Regex,
    branch_name: Regex,
    delete_branch: Regex,
    force: Regex,
    list_files: Regex,
    read_file: Regex,
    index: Regex,
    build: Regex,
    search: Regex,
    summarize: Regex,
    organize: Regex,
}

impl Rules {
    fn compile() -> Result<Self, regex::Error> {
        Ok(Self {
            status: Regex::new(r"(?i)\bstatus\b")?,
            log: Regex::new(r"(?i)\b(log|history|recent commits)\b")?,
            diff: Regex::new(r"(?i)\bdiff\b")?,
            branches: Regex::new(r"(?i)\bbranch(es)?\b")?,
            init: Regex::new(
                r"(?i)\bgit\s+init\b|\binit(ialize)?\s+(a\s+)?(new\s+)?(git\s+)?repo(sitory)?\b",
            )?,
            commit: Regex::new(r"(?i)\bcommit\b")?,
            commit_message: Regex::new(r"(?i)\bcommit(?:\s+message)?\s*[:：]\s*(.+)$")?,
            commit_quoted: Regex::new(r#"(?i)\bcommit\b.*?["']([^"']+)["']"#)?,
            stage: Regex::new(r"(?i)\b(stage|add)\b")?,
            stage_all: Regex::new(r"(?i)\b(all|everything)\b")?,
            stage_paths: Regex::new(r"(?i)\b(?:stage|add)\s*[:：]\s*(.+)$")?,
            switch: Regex::new(r"(?i)\b(switch|checkout)\b")?,
            switch_target: Regex::new(
                r"(?i)\b(?:switch|checkout)\s+(?:to\s+)?(?:branch\s+)?[:：]?\s*([\w./-]+)",
            )?,
            create_branch: Regex::new(r"(?i)\b(create|new)\s+(a\s+)?branch\b")?,
            branch_name: Regex::new(r"(?i)\bbranch\b\s*[:：]?\s*([\w./-]+)")?,
            delete_branch: Regex::new(r"(?i)\b(delete|remove)\s+(the\s+)?branch\b")?,
            force: Regex::new(r"(?i)\bforce\b")?,
            list_files: Regex::new(r"(?i)\blist\s+(the\s+)?files\b")?,
            read_file: Regex::new(r"(?i)\b(?:read|open)\s+(?:the\s+)?file\s+([\w./-]+)")?,
            index: Regex::new(r"(?i)\b(index|search|summar\w*|overview|organi[sz]\w*)\b")?,
            build: Regex::new(r"(?i)\b(build|rebuild)\b")?,
            search: Regex::new(r#"(?i)\bsearch\s+(?:for\s+)?["']?([^"']+?)["']?\s*$"#)?,
            summarize: Regex::new(r"(?i)\b(summar\w*|overview)\b")?,
            organize: Regex::new(r"(?i)\borgani[sz]\w*\b")?,
        })
    }
}

fn rules() -> Result<&'static Rules, PlannerError> {
    static RULES: OnceLock<Result<Rules, regex::Error>> = OnceLock::new();
    RULES
        .get_or_init(Rules::compile)
        .as_ref()
        .map_err(|err| PlannerError::Failed(format!("rule pattern: {err}")))
}

/// Deterministic keyword planner. Used when no model is configured and as
/// the fallback when the model is unavailable.
#[derive(Debug, Clone, Copy, Default)]
pub struct RulePlanner;

impl RulePlanner {
    pub fn new() -> Self {
        Self
    }
}

impl Planner for RulePlanner {
    fn plan(&self, text: &str) -> Result<Plan, PlannerError> {
        let rules = rules()?;
        let text = text.trim();
        let lowered = text.to_lowercase();
        if let Some(fragment) = FORBIDDEN_FRAGMENTS
            .iter()
            .find(|fragment| lowered.contains(**fragment))
        {
            let mut plan = Plan::clarification(
                INTENT,
                format!("`{fragment}` is forbidden by policy; describe a safer alternative"),
            );
            plan.needs_confirmation = true;
            return Ok(plan);
        }

        let mut draft = Draft::default();
        let wants_log = rules.log.is_match(text);
        let wants_switch = rules.switch.is_match(text);
        let wants_create = rules.create_branch.is_match(text);
        let wants_delete = rules.delete_branch.is_match(text);

        if rules.status.is_match(text) {
            draft.step("status", json!({}));
        }
        if wants_log {
            draft.step("log", json!({ "n": 10 }));
        }
        if rules.diff.is_match(text) {
            draft.step("diff", json!({ "staged": false }));
        }
        if rules.branches.is_match(text) && !wants_switch && !wants_create && !wants_delete {
            draft.step("list_branches", json!({}));
        }
        if rules.list_files.is_match(text) {
            draft.step("list_files", json!({}));
        }
        if let Some(path) = capture(&rules.read_file, text) {
            draft.step("read_file", json!({ "path": path }));
        }

        if rules.init.is_match(text) {
            draft.step("init_repo", json!({}));
        }
        if rules.stage.is_match(text) {
            if let Some(paths) = capture(&rules.stage_paths, text) {
                let paths = paths
                    .split(|c: char| c.is_whitespace() || c == ',')
                    .filter(|path| !path.is_empty())
                    .collect::<Vec<_>>();
                draft.step("stage", json!({ "paths": paths }));
            } else if rules.stage_all.is_match(text) {
                draft.step("stage", json!({ "paths": ["."], "allow_all": true }));
            } else {
                draft.ask("Which files should be staged? List their paths.");
            }
        }
        if rules.commit.is_match(text) && !wants_log {
            let message = capture(&rules.commit_message, text)
                .or_else(|| capture(&rules.commit_quoted, text));
            match message {
                Some(message) => draft.step("commit", json!({ "message": message })),
                None => draft.ask("What should the commit message be? e.g. commit: fix login button"),
            }
        }
        if wants_create {
            match capture(&rules.branch_name, text) {
                Some(name) => draft.step("create_branch", json!({ "name": name, "from_ref": "HEAD" })),
                None => draft.ask("What should the new branch be called?"),
            }
        }
        if wants_switch {
            let target = capture(&rules.switch_target, text)
                .filter(|target| !matches!(target.to_lowercase().as_str(), "to" | "branch"));
            match target {
                Some(branch) => draft.step("switch_branch", json!({ "branch": branch, "create": false })),
                None => draft.ask("Which branch should be checked out?"),
            }
        }
        if wants_delete {
            match capture(&rules.branch_name, text) {
                Some(name) => draft.step(
                    "delete_branch",
                    json!({ "name": name, "force": rules.force.is_match(text) }),
                ),
                None => draft.ask("Which branch should be deleted?"),
            }
        }

        if rules.index.is_match(text) {
            draft.step("index_status", json!({}));
            if rules.build.is_match(text) {
                draft.step("build_index", json!({}));
            }
            if lowered.contains("search") {
                let query = capture(&rules.search, text)
                    .unwrap_or_else(|| DEFAULT_SEARCH_QUERY.to_string());
                draft.step("search_index", json!({ "query": query, "top_k": 5 }));
            }
            if rules.summarize.is_match(text) {
                draft.step("summarize_repo", json!({}));
            }
            if rules.organize.is_match(text) {
                draft.step("suggest_organization", json!({}));
            }
        }

        if draft.steps.is_empty() && draft.questions.is_empty() {
            draft.ask("Which git or file operation should run, and should it be a dry run?");
        }
        Ok(draft.finish())
    }
}

#[derive(Default)]
struct Draft {
    steps: Vec<Step>,
    questions: Vec<String>,
}

impl Draft {
    fn step(&mut self, capability: &str, arguments: Value) {
        let arguments = match arguments {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        let mut step = Step::assessed(capability, arguments);
        // Low-risk steps are never gated, so they run for real straight away.
        step.simulate = step.risk_level.requires_confirmation();
        self.steps.push(step);
    }

    fn ask(&mut self, question: &str) {
        self.questions.push(question.to_string());
    }

    fn finish(self) -> Plan {
        let needs_confirmation = self
            .steps
            .iter()
            .any(|step| step.risk_level.requires_confirmation());
        Plan {
            intent: INTENT.to_string(),
            assumptions: Vec::new(),
            questions: self.questions,
            needs_confirmation,
            steps: self.steps,
        }
    }
}

fn capture(pattern: &Regex, text: &str) -> Option<String> {
    pattern
        .captures(text)
        .and_then(|captures| captures.get(1))
        .map(|found| found.as_str().trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestration::plan::RiskLevel;

    fn capabilities(plan: &Plan) -> Vec<&str> {
        plan.steps.iter().map(|s| s.capability.as_str()).collect()
    }

    #[test]
    fn read_only_requests_plan_low_risk_live_steps() {
        let plan = RulePlanner::new()
            .plan("show me the status and the diff")
            .expect("plan");
        assert_eq!(capabilities(&plan), vec!["status", "diff"]);
        assert!(plan.steps.iter().all(|s| s.risk_level == RiskLevel::Low && !s.simulate));
        assert!(!plan.needs_confirmation);
    }

    #[test]
    fn commit_history_is_not_a_commit() {
        let plan = RulePlanner::new()
            .plan("show the commit history")
            .expect("plan");
        assert_eq!(capabilities(&plan), vec!["log"]);
        assert!(plan.questions.is_empty());
    }

    #[test]
    fn commit_without_message_asks_for_one() {
        let plan = RulePlanner::new().plan("please commit").expect("plan");
        assert!(plan.steps.is_empty());
        assert_eq!(plan.questions.len(), 1);
    }

    #[test]
    fn commit_with_message_is_a_gated_write() {
        let plan = RulePlanner::new()
            .plan("commit: fix login button")
            .expect("plan");
        assert_eq!(capabilities(&plan), vec!["commit"]);
        assert_eq!(plan.steps[0].arguments["message"], "fix login button");
        assert!(plan.steps[0].simulate);
        assert!(plan.needs_confirmation);
    }

    #[test]
    fn force_delete_branch_is_high_risk() {
        let plan = RulePlanner::new()
            .plan("force delete branch feature/old")
            .expect("plan");
        assert_eq!(capabilities(&plan), vec!["delete_branch"]);
        assert_eq!(plan.steps[0].arguments["name"], "feature/old");
        assert_eq!(plan.steps[0].risk_level, RiskLevel::High);
    }

    #[test]
    fn switch_without_target_asks() {
        let plan = RulePlanner::new().plan("switch to").expect("plan");
        assert!(plan.steps.is_empty());
        assert_eq!(plan.questions.len(), 1);
    }

    #[test]
    fn forbidden_fragment_yields_clarification_only() {
        let plan = RulePlanner::new()
            .plan("git reset --hard HEAD~3")
            .expect("plan");
        assert!(plan.steps.is_empty());
        assert!(plan.questions[0].contains("reset --hard"));
    }

    #[test]
    fn unmatched_text_asks_a_question() {
        let plan = RulePlanner::new().plan("hello there").expect("plan");
        assert!(plan.steps.is_empty());
        assert_eq!(plan.questions.len(), 1);
    }

    #[test]
    fn index_requests_expand_to_index_steps() {
        let plan = RulePlanner::new()
            .plan("build the index and summarize the repo")
            .expect("plan");
        assert_eq!(
            capabilities(&plan),
            vec!["index_status", "build_index", "summarize_repo"]
        );
    }
}

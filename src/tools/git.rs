use crate::capability::args::{
    dry_run, optional_bool, optional_i64, optional_revision, optional_str, optional_str_list,
    required_revision,
};
use crate::capability::CapabilityError;
use crate::safety::{confine, partition_sensitive, scan_forbidden_arguments};
use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

const SHOW_OUTPUT_LIMIT: usize = 4000;

pub struct GitTool {
    workspace: PathBuf,
}

impl GitTool {
    pub fn new(workspace: impl Into<PathBuf>) -> Self {
        Self {
            workspace: workspace.into(),
        }
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    fn run(&self, args: &[&str]) -> Result<Output, CapabilityError> {
        scan_forbidden_arguments(args)?;
        Command::new("git")
            .arg("-C")
            .arg(&self.workspace)
            .args(args)
            .output()
            .map_err(|source| CapabilityError::Spawn {
                program: "git".to_string(),
                source,
            })
    }

    fn run_completed(&self, args: &[&str]) -> Result<Value, CapabilityError> {
        Ok(completed(&self.run(args)?))
    }

    fn ensure_repo(&self) -> Result<Option<String>, CapabilityError> {
        let output = self.run(&["rev-parse", "--is-inside-work-tree"])?;
        if output.status.success() {
            return Ok(None);
        }
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        Ok(Some(if stderr.is_empty() {
            "workspace is not a git repository".to_string()
        } else {
            stderr
        }))
    }

    fn stdout_lines(&self, args: &[&str]) -> Result<Vec<String>, CapabilityError> {
        let output = self.run(args)?;
        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(str::to_string)
            .collect())
    }

    // Paths handed to git must stay inside the workspace too.
    fn confined_paths(&self, paths: &[String]) -> Result<(), CapabilityError> {
        for path in paths {
            confine(&self.workspace, Path::new(path))?;
        }
        Ok(())
    }

    pub fn status(&self, _args: &Map<String, Value>) -> Result<Value, CapabilityError> {
        if let Some(error) = self.ensure_repo()? {
            return Ok(failure(error));
        }
        self.run_completed(&["status", "-sb"])
    }

    pub fn diff(&self, args: &Map<String, Value>) -> Result<Value, CapabilityError> {
        if let Some(error) = self.ensure_repo()? {
            return Ok(failure(error));
        }
        let paths = optional_str_list(args, "paths")?.unwrap_or_default();
        self.confined_paths(&paths)?;
        let mut command = vec!["diff"];
        if optional_bool(args, "staged", false)? {
            command.push("--staged");
        }
        if !paths.is_empty() {
            command.push("--");
            command.extend(paths.iter().map(String::as_str));
        }
        self.run_completed(&command)
    }

    pub fn log(&self, args: &Map<String, Value>) -> Result<Value, CapabilityError> {
        if let Some(error) = self.ensure_repo()? {
            return Ok(failure(error));
        }
        let count = format!("-{}", limit_argument(args, 10)?.clamp(1, 50));
        self.run_completed(&[
            "log",
            count.as_str(),
            "--pretty=format:%h|%an|%ad|%s",
            "--date=short",
        ])
    }

    pub fn log_graph(&self, args: &Map<String, Value>) -> Result<Value, CapabilityError> {
        if let Some(error) = self.ensure_repo()? {
            return Ok(failure(error));
        }
        let count = format!("-{}", limit_argument(args, 30)?.clamp(1, 80));
        let branch = optional_revision(args, "branch")?
            .filter(|v| !v.is_empty())
            .map(|branch| format!("--branches={branch}"));
        let author = optional_revision(args, "author")?
            .filter(|v| !v.is_empty())
            .map(|author| format!("--author={author}"));
        let path = optional_str(args, "path")?.filter(|v| !v.is_empty());

        let mut command = vec!["log", count.as_str(), "--oneline", "--graph", "--decorate"];
        command.push(branch.as_deref().unwrap_or("--all"));
        if let Some(author) = author.as_deref() {
            command.push(author);
        }
        if let Some(path) = path {
            confine(&self.workspace, Path::new(path))?;
            command.extend(["--", path]);
        }
        self.run_completed(&command)
    }

    pub fn list_branches(&self, _args: &Map<String, Value>) -> Result<Value, CapabilityError> {
        if let Some(error) = self.ensure_repo()? {
            return Ok(failure(error));
        }
        self.run_completed(&["branch", "-a"])
    }

    pub fn list_remotes(&self, _args: &Map<String, Value>) -> Result<Value, CapabilityError> {
        if let Some(error) = self.ensure_repo()? {
            return Ok(failure(error));
        }
        self.run_completed(&["remote", "-v"])
    }

    pub fn show(&self, args: &Map<String, Value>) -> Result<Value, CapabilityError> {
        if let Some(error) = self.ensure_repo()? {
            return Ok(failure(error));
        }
        let reference = optional_revision(args, "ref")?
            .filter(|v| !v.is_empty())
            .unwrap_or("HEAD");
        let output = self.run(&["show", "--stat", "--oneline", reference])?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stdout = match stdout.char_indices().nth(SHOW_OUTPUT_LIMIT) {
            Some((cut, _)) => format!("{}\n...<output truncated>", &stdout[..cut]),
            None => stdout.to_string(),
        };
        Ok(json!({
            "ok": output.status.success(),
            "stdout": stdout,
            "stderr": String::from_utf8_lossy(&output.stderr),
        }))
    }

    pub fn init_repo(&self, args: &Map<String, Value>) -> Result<Value, CapabilityError> {
        if self.ensure_repo()?.is_none() {
            return Ok(failure("workspace is already a git repository"));
        }
        if dry_run(args)? {
            return Ok(would_run(&["init"]));
        }
        self.run_completed(&["init"])
    }

    pub fn stage(&self, args: &Map<String, Value>) -> Result<Value, CapabilityError> {
        if let Some(error) = self.ensure_repo()? {
            return Ok(failure(error));
        }
        let paths = optional_str_list(args, "paths")?.unwrap_or_default();
        if paths.is_empty() {
            return Ok(failure("no paths provided"));
        }
        if paths.iter().any(|path| path == ".") && !optional_bool(args, "allow_all", false)? {
            return Ok(failure("refusing to stage `.` without allow_all=true"));
        }
        self.confined_paths(&paths)?;
        let (allowed, denied) = partition_sensitive(&paths);
        if !denied.is_empty() {
            return Ok(json!({
                "ok": false,
                "error": "refusing to stage sensitive files",
                "denied": denied,
            }));
        }

        let files = self
            .stdout_lines(&["status", "--porcelain"])?
            .into_iter()
            .map(|line| line.get(3..).unwrap_or_default().to_string())
            .collect::<Vec<_>>();
        let mut command = vec!["add", "--"];
        command.extend(allowed.iter().map(String::as_str));
        if dry_run(args)? {
            let mut result = would_run(&command);
            result["files"] = json!(files);
            return Ok(result);
        }
        self.run_completed(&command)
    }

    pub fn commit(&self, args: &Map<String, Value>) -> Result<Value, CapabilityError> {
        if let Some(error) = self.ensure_repo()? {
            return Ok(failure(error));
        }
        let message = optional_str(args, "message")?.unwrap_or_default().trim();
        if message.is_empty() {
            return Ok(failure("commit message is required"));
        }
        let staged = self.stdout_lines(&["diff", "--cached", "--name-only"])?;
        if staged.is_empty() {
            return Ok(failure("staging area is empty, nothing to commit"));
        }
        if dry_run(args)? {
            return Ok(json!({
                "ok": true,
                "dry_run": true,
                "staged": staged,
                "message": message,
            }));
        }
        self.run_completed(&["commit", "-m", message])
    }

    pub fn switch_branch(&self, args: &Map<String, Value>) -> Result<Value, CapabilityError> {
        if let Some(error) = self.ensure_repo()? {
            return Ok(failure(error));
        }
        let branch = required_revision(args, "branch")?;
        if branch.is_empty() {
            return Ok(failure("branch name is required"));
        }
        let dirty = self.stdout_lines(&["status", "--porcelain"])?;
        if !dirty.is_empty() && !optional_bool(args, "allow_dirty", false)? {
            return Ok(json!({
                "ok": false,
                "error": "working tree has uncommitted changes; stash or commit them first",
                "dirty_files": dirty,
            }));
        }
        let command = if optional_bool(args, "create", false)? {
            vec!["switch", "-c", branch]
        } else {
            vec!["switch", branch]
        };
        if dry_run(args)? {
            return Ok(would_run(&command));
        }
        self.run_completed(&command)
    }

    pub fn create_branch(&self, args: &Map<String, Value>) -> Result<Value, CapabilityError> {
        if let Some(error) = self.ensure_repo()? {
            return Ok(failure(error));
        }
        let name = required_revision(args, "name")?;
        if name.is_empty() {
            return Ok(failure("branch name is required"));
        }
        let from_ref = optional_revision(args, "from_ref")?
            .filter(|v| !v.is_empty())
            .unwrap_or("HEAD");
        let command = ["branch", name, from_ref];
        if dry_run(args)? {
            return Ok(would_run(&command));
        }
        self.run_completed(&command)
    }

    pub fn delete_branch(&self, args: &Map<String, Value>) -> Result<Value, CapabilityError> {
        if let Some(error) = self.ensure_repo()? {
            return Ok(failure(error));
        }
        let name = required_revision(args, "name")?;
        if name.is_empty() {
            return Ok(failure("branch name is required"));
        }
        let flag = if optional_bool(args, "force", false)? {
            "-D"
        } else {
            "-d"
        };
        let command = ["branch", flag, name];
        if dry_run(args)? {
            return Ok(would_run(&command));
        }
        self.run_completed(&command)
    }

    pub fn stash_push(&self, args: &Map<String, Value>) -> Result<Value, CapabilityError> {
        if let Some(error) = self.ensure_repo()? {
            return Ok(failure(error));
        }
        let mut command = vec!["stash", "push"];
        if let Some(message) = optional_str(args, "message")?.filter(|v| !v.is_empty()) {
            command.extend(["-m", message]);
        }
        if dry_run(args)? {
            return Ok(would_run(&command));
        }
        self.run_completed(&command)
    }

    pub fn stash_pop(&self, args: &Map<String, Value>) -> Result<Value, CapabilityError> {
        if let Some(error) = self.ensure_repo()? {
            return Ok(failure(error));
        }
        let index = optional_i64(args, "index", 0)?;
        if index < 0 {
            return Err(CapabilityError::InvalidArgumentValue {
                arg: "index".to_string(),
                reason: "must be zero or greater".to_string(),
            });
        }
        let reference = format!("stash@{{{index}}}");
        let command = ["stash", "pop", reference.as_str()];
        if dry_run(args)? {
            return Ok(would_run(&command));
        }
        self.run_completed(&command)
    }

    pub fn merge(&self, args: &Map<String, Value>) -> Result<Value, CapabilityError> {
        if let Some(error) = self.ensure_repo()? {
            return Ok(failure(error));
        }
        let target = required_revision(args, "target_branch")?;
        if target.is_empty() {
            return Ok(failure("target branch is required"));
        }
        let command = ["merge", target];
        if dry_run(args)? {
            return Ok(would_run(&command));
        }
        let output = self.run(&command)?;
        if output.status.success() {
            return Ok(completed(&output));
        }
        let conflicts = self.stdout_lines(&["diff", "--name-only", "--diff-filter=U"])?;
        Ok(json!({
            "ok": false,
            "error": "merge stopped with conflicts",
            "conflicts": conflicts,
            "stderr": String::from_utf8_lossy(&output.stderr),
            "suggestion": "resolve the conflicts, then stage and commit the result",
        }))
    }
}

fn limit_argument(args: &Map<String, Value>, default: i64) -> Result<i64, CapabilityError> {
    match args.get("limit") {
        Some(value) if !value.is_null() => optional_i64(args, "limit", default),
        _ => optional_i64(args, "n", default),
    }
}

fn completed(output: &Output) -> Value {
    json!({
        "ok": output.status.success(),
        "stdout": String::from_utf8_lossy(&output.stdout),
        "stderr": String::from_utf8_lossy(&output.stderr),
    })
}

fn would_run(args: &[&str]) -> Value {
    json!({
        "ok": true,
        "dry_run": true,
        "cmd": format!("git {}", args.join(" ")),
    })
}

pub(crate) fn failure(error: impl Into<String>) -> Value {
    json!({ "ok": false, "error": error.into() })
}

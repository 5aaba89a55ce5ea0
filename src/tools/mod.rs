pub mod diff;
pub mod file;
pub mod git;
pub mod index;

use crate::capability::{CapabilityError, CapabilityRegistry, Handler};
use file::FileTool;
use git::GitTool;
use index::IndexTool;
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::Arc;

type ToolMethod<T> = fn(&T, &Map<String, Value>) -> Result<Value, CapabilityError>;

fn bind<T: Send + Sync + 'static>(
    tool: &Arc<T>,
    params: &'static [&'static str],
    method: ToolMethod<T>,
) -> Handler {
    let tool = Arc::clone(tool);
    Handler::fixed(params, move |args| method(&tool, args))
}

/// Every capability the worker exposes, bound to `workspace`.
pub fn default_registry(workspace: &Path) -> Result<CapabilityRegistry, CapabilityError> {
    let git = Arc::new(GitTool::new(workspace));
    let files = Arc::new(FileTool::new(workspace));
    let index = Arc::new(IndexTool::new(workspace));
    let mut builder = CapabilityRegistry::builder();

    builder
        .register(
            "status",
            "Show working tree status (porcelain).",
            bind(&git, &[], GitTool::status),
        )?
        .register(
            "diff",
            "Show unstaged or staged changes, optionally limited to paths.",
            bind(&git, &["staged", "paths"], GitTool::diff),
        )?
        .register(
            "log",
            "Show recent commits, one line each.",
            bind(&git, &["n", "limit"], GitTool::log),
        )?
        .register(
            "log_graph",
            "Show the commit graph with optional branch, author and path filters.",
            bind(
                &git,
                &["n", "limit", "branch", "author", "path"],
                GitTool::log_graph,
            ),
        )?
        .register(
            "list_branches",
            "List local branches and the current one.",
            bind(&git, &[], GitTool::list_branches),
        )?
        .register(
            "list_remotes",
            "List configured remotes.",
            bind(&git, &[], GitTool::list_remotes),
        )?
        .register(
            "show",
            "Show a commit or object.",
            bind(&git, &["ref"], GitTool::show),
        )?
        .register(
            "init_repo",
            "Initialize a git repository in the workspace.",
            bind(&git, &["dry_run"], GitTool::init_repo),
        )?
        .register(
            "stage",
            "Stage the given paths.",
            bind(&git, &["paths", "allow_all", "dry_run"], GitTool::stage),
        )?
        .register(
            "commit",
            "Commit staged changes with a message.",
            bind(&git, &["message", "dry_run"], GitTool::commit),
        )?
        .register(
            "switch_branch",
            "Switch to a branch, optionally creating it.",
            bind(
                &git,
                &["branch", "create", "allow_dirty", "dry_run"],
                GitTool::switch_branch,
            ),
        )?
        .register(
            "create_branch",
            "Create a branch without switching to it.",
            bind(&git, &["name", "from_ref", "dry_run"], GitTool::create_branch),
        )?
        .register(
            "delete_branch",
            "Delete a branch; force deletes unmerged work.",
            bind(&git, &["name", "force", "dry_run"], GitTool::delete_branch),
        )?
        .register(
            "stash_push",
            "Stash working tree changes.",
            bind(&git, &["message", "dry_run"], GitTool::stash_push),
        )?
        .register(
            "stash_pop",
            "Re-apply a stash entry.",
            bind(&git, &["index", "dry_run"], GitTool::stash_pop),
        )?
        .register(
            "merge",
            "Merge a branch into the current branch.",
            bind(&git, &["target_branch", "dry_run"], GitTool::merge),
        )?
        .register(
            "list_files",
            "List files and directories up to a depth.",
            bind(&files, &["dir", "max_depth"], FileTool::list_files),
        )?
        .register(
            "read_file",
            "Read a text file, truncated to max_chars.",
            bind(&files, &["path", "max_chars"], FileTool::read_file),
        )?
        .register(
            "search_files",
            "Search file contents for a literal pattern.",
            bind(
                &files,
                &["pattern", "dir", "max_results"],
                FileTool::search_files,
            ),
        )?
        .register(
            "write_file",
            "Write a file; dry run returns the diff.",
            bind(&files, &["path", "content", "dry_run"], FileTool::write_file),
        )?
        .register(
            "patch_file",
            "Apply a unified diff to a file.",
            bind(
                &files,
                &["path", "unified_diff", "dry_run"],
                FileTool::patch_file,
            ),
        )?
        .register(
            "build_index",
            "Chunk workspace text files into the local search index.",
            bind(
                &index,
                &[
                    "include_globs",
                    "exclude_globs",
                    "chunk_size",
                    "overlap",
                    "dry_run",
                ],
                IndexTool::build_index,
            ),
        )?
        .register(
            "index_status",
            "Report whether the index exists and its size.",
            bind(&index, &[], IndexTool::index_status),
        )?
        .register(
            "search_index",
            "Rank indexed chunks against a query.",
            bind(&index, &["query", "top_k"], IndexTool::search_index),
        )?
        .register(
            "summarize_repo",
            "Summarize the indexed repository.",
            bind(&index, &[], IndexTool::summarize_repo),
        )?
        .register(
            "suggest_organization",
            "Suggest layout improvements from the index.",
            bind(&index, &[], IndexTool::suggest_organization),
        )?;

    Ok(builder.build())
}

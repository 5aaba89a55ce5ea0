use super::diff::unified_diff;
use super::git::failure;
use crate::capability::args::{dry_run, optional_i64, optional_str, required_str};
use crate::capability::{io_error, CapabilityError};
use crate::safety::{confine, deny_if_sensitive};
use serde_json::{json, Map, Value};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

const SKIPPED_DIRS: &[&str] = &[".git"];

pub struct FileTool {
    workspace: PathBuf,
}

impl FileTool {
    pub fn new(workspace: impl Into<PathBuf>) -> Self {
        Self {
            workspace: workspace.into(),
        }
    }

    fn safe_path(&self, path: &str) -> Result<PathBuf, CapabilityError> {
        let target = confine(&self.workspace, Path::new(path))?;
        deny_if_sensitive(&target)?;
        Ok(target)
    }

    pub fn list_files(&self, args: &Map<String, Value>) -> Result<Value, CapabilityError> {
        let root = self.safe_path(optional_str(args, "dir")?.unwrap_or("."))?;
        let max_depth = optional_i64(args, "max_depth", 2)?.clamp(0, 10) as usize;
        if !root.is_dir() {
            return Ok(failure("directory not found"));
        }
        let mut items = Vec::new();
        list_into(&root, &root, 0, max_depth, &mut items)?;
        Ok(json!({ "ok": true, "items": items }))
    }

    pub fn read_file(&self, args: &Map<String, Value>) -> Result<Value, CapabilityError> {
        let target = self.safe_path(required_str(args, "path")?)?;
        let max_chars = optional_i64(args, "max_chars", 4000)?.max(1) as usize;
        if !target.is_file() {
            return Ok(failure("file not found"));
        }
        let mut content = read_lossy(&target)?;
        if let Some((cut, _)) = content.char_indices().nth(max_chars) {
            content.truncate(cut);
            content.push_str("\n...<content truncated>");
        }
        Ok(json!({ "ok": true, "content": content }))
    }

    pub fn write_file(&self, args: &Map<String, Value>) -> Result<Value, CapabilityError> {
        let path = required_str(args, "path")?;
        let content = required_str(args, "content")?;
        let target = self.safe_path(path)?;
        if target.is_dir() {
            return Ok(failure("path is a directory"));
        }
        if is_symlink(&self.workspace.join(path)) {
            return Ok(failure("refusing to write through a symlink"));
        }
        let old = if target.is_file() {
            read_lossy(&target)?
        } else {
            String::new()
        };
        let diff = unified_diff(&old, content, path);
        if dry_run(args)? {
            return Ok(json!({ "ok": true, "dry_run": true, "diff": diff }));
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
        }
        fs::write(&target, content).map_err(|e| io_error(&target, e))?;
        Ok(json!({ "ok": true, "diff": diff }))
    }

    pub fn patch_file(&self, args: &Map<String, Value>) -> Result<Value, CapabilityError> {
        let target = self.safe_path(required_str(args, "path")?)?;
        let patch = optional_str(args, "unified_diff")?.unwrap_or_default();
        if !target.is_file() {
            return Ok(failure("file not found"));
        }
        if patch.trim().is_empty() {
            return Ok(failure("unified_diff is empty"));
        }
        if dry_run(args)? {
            return Ok(json!({ "ok": true, "dry_run": true, "diff": patch }));
        }

        let mut child = Command::new("patch")
            .arg("-p0")
            .arg(&target)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| CapabilityError::Spawn {
                program: "patch".to_string(),
                source,
            })?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(patch.as_bytes())
                .map_err(|e| io_error(&target, e))?;
        }
        let output = child.wait_with_output().map_err(|e| io_error(&target, e))?;
        if !output.status.success() {
            return Ok(json!({
                "ok": false,
                "error": "diff could not be applied",
                "stderr": String::from_utf8_lossy(&output.stderr),
            }));
        }
        Ok(json!({
            "ok": true,
            "diff": patch,
            "stdout": String::from_utf8_lossy(&output.stdout),
        }))
    }

    pub fn search_files(&self, args: &Map<String, Value>) -> Result<Value, CapabilityError> {
        let pattern = required_str(args, "pattern")?;
        if pattern.is_empty() {
            return Ok(failure("pattern is required"));
        }
        let root = self.safe_path(optional_str(args, "dir")?.unwrap_or("."))?;
        let max_results = optional_i64(args, "max_results", 50)?.max(1) as usize;

        let mut hits = Vec::new();
        for path in walk_files(&root)? {
            if deny_if_sensitive(&path).is_err() {
                continue;
            }
            let Ok(bytes) = fs::read(&path) else {
                continue;
            };
            let text = String::from_utf8_lossy(&bytes);
            for (index, line) in text.lines().enumerate() {
                if !line.contains(pattern) {
                    continue;
                }
                hits.push(json!({
                    "file": relative_display(&root, &path),
                    "line": index + 1,
                    "text": line.trim(),
                }));
                if hits.len() >= max_results {
                    return Ok(json!({ "ok": true, "hits": hits, "truncated": true }));
                }
            }
        }
        Ok(json!({ "ok": true, "hits": hits }))
    }
}

/// Every regular file under `root`, sorted, skipping VCS metadata.
pub fn walk_files(root: &Path) -> Result<Vec<PathBuf>, CapabilityError> {
    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in sorted_entries(&dir)? {
            let file_type = entry.file_type().map_err(|e| io_error(&entry.path(), e))?;
            let path = entry.path();
            if file_type.is_dir() {
                if !is_skipped_dir(&path) {
                    pending.push(path);
                }
            } else if file_type.is_file() {
                files.push(path);
            }
        }
    }
    files.sort();
    Ok(files)
}

pub fn relative_display(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|part| part.as_os_str().to_string_lossy().to_string())
        .collect::<Vec<_>>()
        .join("/")
}

fn list_into(
    root: &Path,
    dir: &Path,
    depth: usize,
    max_depth: usize,
    items: &mut Vec<String>,
) -> Result<(), CapabilityError> {
    for entry in sorted_entries(dir)? {
        let path = entry.path();
        let file_type = entry.file_type().map_err(|e| io_error(&path, e))?;
        if file_type.is_dir() {
            if is_skipped_dir(&path) {
                continue;
            }
            items.push(format!("{}/", relative_display(root, &path)));
            if depth < max_depth {
                list_into(root, &path, depth + 1, max_depth, items)?;
            }
        } else {
            items.push(relative_display(root, &path));
        }
    }
    Ok(())
}

fn sorted_entries(dir: &Path) -> Result<Vec<fs::DirEntry>, CapabilityError> {
    let mut entries = fs::read_dir(dir)
        .map_err(|e| io_error(dir, e))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| io_error(dir, e))?;
    entries.sort_by_key(|entry| entry.file_name());
    Ok(entries)
}

fn is_skipped_dir(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| SKIPPED_DIRS.contains(&name))
}

fn is_symlink(path: &Path) -> bool {
    fs::symlink_metadata(path)
        .map(|meta| meta.file_type().is_symlink())
        .unwrap_or(false)
}

fn read_lossy(path: &Path) -> Result<String, CapabilityError> {
    let bytes = fs::read(path).map_err(|e| io_error(path, e))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

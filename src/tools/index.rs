use super::file::{relative_display, walk_files};
use super::git::failure;
use crate::capability::args::{dry_run, optional_i64, optional_str_list, required_str};
use crate::capability::{io_error, CapabilityError};
use crate::config::index_dir;
use crate::safety::deny_if_sensitive;
use crate::shared::fs_atomic::atomic_write_file;
use crate::shared::time::now_local_iso;
use globset::{Glob, GlobSet, GlobSetBuilder};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

const TEXT_EXTENSIONS: &[&str] = &[
    "py", "md", "txt", "yaml", "yml", "json", "toml", "ini", "cfg", "rs",
];
const DEFAULT_EXCLUDES: &[&str] = &[
    "**/.git/**",
    "**/.gitward/**",
    "**/node_modules/**",
    "**/target/**",
];
const CHUNKS_FILE: &str = "chunks.json";
const META_FILE: &str = "meta.json";
const PREVIEW_CHARS: usize = 200;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub source: String,
    pub offset: usize,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexMeta {
    pub docs: usize,
    pub chunks: usize,
    pub chunk_size: usize,
    pub overlap: usize,
    pub built_at: String,
}

pub struct IndexTool {
    workspace: PathBuf,
    index_dir: PathBuf,
}

impl IndexTool {
    pub fn new(workspace: impl Into<PathBuf>) -> Self {
        let workspace = workspace.into();
        let index_dir = index_dir(&workspace);
        Self {
            workspace,
            index_dir,
        }
    }

    pub fn build_index(&self, args: &Map<String, Value>) -> Result<Value, CapabilityError> {
        let include = optional_str_list(args, "include_globs")?
            .filter(|globs| !globs.is_empty())
            .unwrap_or_else(|| vec!["**/*".to_string()]);
        let exclude = optional_str_list(args, "exclude_globs")?
            .filter(|globs| !globs.is_empty())
            .unwrap_or_else(|| DEFAULT_EXCLUDES.iter().map(|v| v.to_string()).collect());
        let chunk_size = optional_i64(args, "chunk_size", 800)?;
        let overlap = optional_i64(args, "overlap", 100)?;
        if chunk_size <= 0 {
            return Err(invalid("chunk_size", "must be greater than zero"));
        }
        if overlap < 0 || overlap >= chunk_size {
            return Err(invalid("overlap", "must be between zero and chunk_size"));
        }
        let (chunk_size, overlap) = (chunk_size as usize, overlap as usize);

        let include = glob_set("include_globs", &include)?;
        let exclude = glob_set("exclude_globs", &exclude)?;
        let mut docs = 0;
        let mut chunks = Vec::new();
        for path in walk_files(&self.workspace)? {
            let relative = relative_display(&self.workspace, &path);
            if !include.is_match(&relative) || exclude.is_match(&relative) {
                continue;
            }
            if !is_text_file(&path) || deny_if_sensitive(&path).is_err() {
                continue;
            }
            let Ok(bytes) = fs::read(&path) else {
                continue;
            };
            let text = String::from_utf8_lossy(&bytes);
            if text.trim().is_empty() {
                continue;
            }
            docs += 1;
            chunks.extend(split_chunks(&relative, &text, chunk_size, overlap));
        }

        if dry_run(args)? {
            return Ok(json!({
                "ok": true,
                "dry_run": true,
                "docs": docs,
                "chunks": chunks.len(),
            }));
        }
        if chunks.is_empty() {
            return Ok(failure("no indexable text found"));
        }

        let meta = IndexMeta {
            docs,
            chunks: chunks.len(),
            chunk_size,
            overlap,
            built_at: now_local_iso(),
        };
        self.write_json(CHUNKS_FILE, &chunks)?;
        self.write_json(META_FILE, &meta)?;
        let mut result = json!({ "ok": true });
        merge_object(&mut result, to_value(&meta)?);
        Ok(result)
    }

    pub fn index_status(&self, _args: &Map<String, Value>) -> Result<Value, CapabilityError> {
        let Some(meta) = self.load_meta()? else {
            return Ok(failure("index not found"));
        };
        let mut result = json!({ "ok": true });
        merge_object(&mut result, to_value(&meta)?);
        Ok(result)
    }

    pub fn search_index(&self, args: &Map<String, Value>) -> Result<Value, CapabilityError> {
        let query = required_str(args, "query")?;
        let top_k = optional_i64(args, "top_k", 5)?.clamp(1, 50) as usize;
        let Some(chunks) = self.load_chunks()? else {
            return Ok(failure("index not found"));
        };
        let results = rank(&chunks, query, top_k)
            .into_iter()
            .map(|(score, chunk)| {
                json!({
                    "source": chunk.source,
                    "offset": chunk.offset,
                    "score": score,
                    "preview": preview(&chunk.text),
                })
            })
            .collect::<Vec<_>>();
        Ok(json!({ "ok": true, "results": results }))
    }

    pub fn summarize_repo(&self, _args: &Map<String, Value>) -> Result<Value, CapabilityError> {
        let Some(chunks) = self.load_chunks()? else {
            return Ok(failure("index not found"));
        };
        let sources = chunks
            .iter()
            .map(|chunk| chunk.source.as_str())
            .collect::<BTreeSet<_>>();
        let mut languages = BTreeMap::<String, usize>::new();
        for source in &sources {
            let extension = Path::new(source)
                .extension()
                .and_then(|v| v.to_str())
                .unwrap_or("(none)");
            *languages.entry(extension.to_string()).or_default() += 1;
        }
        let top_level = sources
            .iter()
            .filter_map(|source| source.split_once('/').map(|(dir, _)| dir))
            .collect::<BTreeSet<_>>();

        let mut summary = format!(
            "{} indexed file(s) in {} chunk(s)",
            sources.len(),
            chunks.len()
        );
        if !top_level.is_empty() {
            let dirs = top_level.iter().copied().collect::<Vec<_>>().join(", ");
            summary.push_str(&format!("; top-level directories: {dirs}"));
        }
        if let Some(headline) = readme_headline(&chunks) {
            summary.push_str(&format!("; readme: {headline}"));
        }
        Ok(json!({
            "ok": true,
            "summary": summary,
            "files": sources.len(),
            "languages": languages,
        }))
    }

    pub fn suggest_organization(
        &self,
        _args: &Map<String, Value>,
    ) -> Result<Value, CapabilityError> {
        let Some(chunks) = self.load_chunks()? else {
            return Ok(failure("index not found"));
        };
        let sources = chunks
            .iter()
            .map(|chunk| chunk.source.as_str())
            .collect::<BTreeSet<_>>();
        let root_files = sources.iter().filter(|s| !s.contains('/')).count();
        let root_markdown = sources
            .iter()
            .filter(|s| !s.contains('/') && s.ends_with(".md"))
            .count();
        let has_readme = sources
            .iter()
            .any(|s| s.to_ascii_lowercase().starts_with("readme"));
        let has_tests = sources
            .iter()
            .any(|s| s.starts_with("tests/") || s.starts_with("test/") || s.contains("/tests/"));

        let mut by_name = HashMap::<&str, usize>::new();
        for source in &sources {
            let name = source.rsplit('/').next().unwrap_or(source);
            *by_name.entry(name).or_default() += 1;
        }
        let mut duplicates = by_name
            .into_iter()
            .filter(|(_, count)| *count > 1)
            .map(|(name, _)| name.to_string())
            .collect::<Vec<_>>();
        duplicates.sort();

        let mut suggestions = Vec::new();
        if !has_readme {
            suggestions.push("add a README describing the project layout".to_string());
        }
        if root_files > 10 {
            suggestions.push(format!(
                "{root_files} files sit at the repository root; group them into directories by module"
            ));
        }
        if root_markdown > 3 {
            suggestions.push("move loose markdown documents into a docs/ directory".to_string());
        }
        if !has_tests {
            suggestions.push("add a tests/ directory for integration tests".to_string());
        }
        if !duplicates.is_empty() {
            suggestions.push(format!(
                "several directories share file names ({}); check for duplicated content",
                duplicates.join(", ")
            ));
        }
        if suggestions.is_empty() {
            suggestions.push("layout looks organized; no changes suggested".to_string());
        }
        Ok(json!({ "ok": true, "suggestions": suggestions }))
    }

    fn load_meta(&self) -> Result<Option<IndexMeta>, CapabilityError> {
        self.read_json(META_FILE)
    }

    fn load_chunks(&self) -> Result<Option<Vec<Chunk>>, CapabilityError> {
        self.read_json(CHUNKS_FILE)
    }

    fn read_json<T: for<'de> Deserialize<'de>>(
        &self,
        name: &str,
    ) -> Result<Option<T>, CapabilityError> {
        let path = self.index_dir.join(name);
        if !path.is_file() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&path).map_err(|e| io_error(&path, e))?;
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| io_error(&path, std::io::Error::other(e)))
    }

    fn write_json<T: Serialize>(&self, name: &str, value: &T) -> Result<(), CapabilityError> {
        let path = self.index_dir.join(name);
        let body = serde_json::to_vec_pretty(value)
            .map_err(|e| io_error(&path, std::io::Error::other(e)))?;
        atomic_write_file(&path, &body).map_err(|e| io_error(&path, e))
    }
}

fn split_chunks(source: &str, text: &str, chunk_size: usize, overlap: usize) -> Vec<Chunk> {
    let chars = text.chars().collect::<Vec<_>>();
    let step = chunk_size - overlap;
    let mut chunks = Vec::new();
    let mut offset = 0;
    while offset < chars.len() {
        let end = (offset + chunk_size).min(chars.len());
        let body = chars[offset..end].iter().collect::<String>();
        if !body.trim().is_empty() {
            chunks.push(Chunk {
                id: chunk_id(source, offset, &body),
                source: source.to_string(),
                offset,
                text: body,
            });
        }
        if end == chars.len() {
            break;
        }
        offset += step;
    }
    chunks
}

fn chunk_id(source: &str, offset: usize, body: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    hasher.update(offset.to_le_bytes());
    hasher.update(body.as_bytes());
    hasher
        .finalize()
        .iter()
        .take(8)
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

fn terms(text: &str) -> Vec<String> {
    static WORD: OnceLock<Option<Regex>> = OnceLock::new();
    let Some(word) = WORD.get_or_init(|| Regex::new(r"\w+").ok()) else {
        return Vec::new();
    };
    word.find_iter(text)
        .map(|found| found.as_str().to_lowercase())
        .collect()
}

/// Term frequency weighted by inverse document frequency over chunks.
fn rank<'a>(chunks: &'a [Chunk], query: &str, top_k: usize) -> Vec<(f64, &'a Chunk)> {
    let query_terms = terms(query).into_iter().collect::<BTreeSet<_>>();
    if query_terms.is_empty() {
        return Vec::new();
    }
    let chunk_terms = chunks
        .iter()
        .map(|chunk| {
            let mut counts = HashMap::<String, usize>::new();
            for term in terms(&chunk.text) {
                *counts.entry(term).or_default() += 1;
            }
            counts
        })
        .collect::<Vec<_>>();
    let total = chunks.len() as f64;

    let mut scored = Vec::new();
    for (chunk, counts) in chunks.iter().zip(&chunk_terms) {
        let mut score = 0.0;
        for term in &query_terms {
            let Some(tf) = counts.get(term) else {
                continue;
            };
            let df = chunk_terms
                .iter()
                .filter(|other| other.contains_key(term))
                .count() as f64;
            score += *tf as f64 * (1.0 + total / (1.0 + df)).ln();
        }
        if score > 0.0 {
            scored.push((score, chunk));
        }
    }
    scored.sort_by(|a, b| {
        b.0.total_cmp(&a.0)
            .then_with(|| a.1.source.cmp(&b.1.source))
            .then_with(|| a.1.offset.cmp(&b.1.offset))
    });
    scored.truncate(top_k);
    scored
}

fn readme_headline(chunks: &[Chunk]) -> Option<String> {
    chunks
        .iter()
        .filter(|chunk| chunk.offset == 0)
        .find(|chunk| chunk.source.to_ascii_lowercase().starts_with("readme"))
        .and_then(|chunk| {
            chunk
                .text
                .lines()
                .map(|line| line.trim_start_matches('#').trim())
                .find(|line| !line.is_empty())
                .map(str::to_string)
        })
}

fn preview(text: &str) -> String {
    text.chars().take(PREVIEW_CHARS).collect()
}

fn is_text_file(path: &Path) -> bool {
    match path.extension().and_then(|v| v.to_str()) {
        None => true,
        Some(extension) => TEXT_EXTENSIONS.contains(&extension.to_ascii_lowercase().as_str()),
    }
}

fn glob_set(arg: &str, patterns: &[String]) -> Result<GlobSet, CapabilityError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|err| invalid(arg, &err.to_string()))?;
        builder.add(glob);
    }
    builder.build().map_err(|err| invalid(arg, &err.to_string()))
}

fn invalid(arg: &str, reason: &str) -> CapabilityError {
    CapabilityError::InvalidArgumentValue {
        arg: arg.to_string(),
        reason: reason.to_string(),
    }
}

fn to_value<T: Serialize>(value: &T) -> Result<Value, CapabilityError> {
    serde_json::to_value(value).map_err(|e| CapabilityError::InvalidArgumentValue {
        arg: "result".to_string(),
        reason: e.to_string(),
    })
}

fn merge_object(target: &mut Value, extra: Value) {
    if let (Value::Object(target), Value::Object(extra)) = (target, extra) {
        target.extend(extra);
    }
}

use std::fs;
use std::path::{Component, Path, PathBuf};

pub const MAX_WRITE_STEPS: usize = 10;

pub const SENSITIVE_BASENAMES: &[&str] = &[
    ".env",
    ".env.local",
    "id_rsa",
    "id_ed25519",
    "secrets.json",
    "tokens.json",
];

pub const FORBIDDEN_FRAGMENTS: &[&str] = &[
    "reset --hard",
    "clean -fd",
    "push --force",
    "push -f",
    "checkout -- .",
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyViolation {
    #[error("path `{path}` escapes the workspace root")]
    PathEscape { path: String },
    #[error("access to sensitive file `{name}` is denied")]
    SensitiveFile { name: String },
    #[error("forbidden operation `{fragment}` in arguments")]
    ForbiddenOperation { fragment: String },
    #[error("plan has {count} write steps, exceeding the limit of {max}")]
    TooManyWrites { count: usize, max: usize },
    #[error("argument `{arg}` value `{value}` would be read as a command-line option")]
    OptionLikeArgument { arg: String, value: String },
    #[error("workspace root `{root}` cannot be resolved: {reason}")]
    UnresolvableRoot { root: String, reason: String },
}

/// Resolves `candidate` against `workspace_root` and returns the canonical
/// path when it is the root or lies beneath it.
pub fn confine(workspace_root: &Path, candidate: &Path) -> Result<PathBuf, PolicyViolation> {
    let root = fs::canonicalize(workspace_root).map_err(|err| {
        PolicyViolation::UnresolvableRoot {
            root: workspace_root.display().to_string(),
            reason: err.to_string(),
        }
    })?;
    let joined = if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        root.join(candidate)
    };
    let escape = || PolicyViolation::PathEscape {
        path: candidate.display().to_string(),
    };

    let resolved = resolve_with_missing_tail(&joined).ok_or_else(escape)?;
    if resolved == root || resolved.starts_with(&root) {
        Ok(resolved)
    } else {
        Err(escape())
    }
}

const MAX_LINK_HOPS: usize = 16;

// Canonicalizes the deepest existing ancestor and re-appends the rest.
// A `..` in the part that does not exist yet cannot be resolved safely.
// Dangling symlinks in the tail are followed to their target.
fn resolve_with_missing_tail(path: &Path) -> Option<PathBuf> {
    let mut current = path.to_path_buf();
    for _ in 0..=MAX_LINK_HOPS {
        match resolve_step(&current)? {
            Resolution::Resolved(resolved) => return Some(resolved),
            Resolution::Redirect(next) => current = next,
        }
    }
    None
}

enum Resolution {
    Resolved(PathBuf),
    Redirect(PathBuf),
}

fn resolve_step(path: &Path) -> Option<Resolution> {
    if let Ok(resolved) = fs::canonicalize(path) {
        return Some(Resolution::Resolved(resolved));
    }
    let components = path.components().collect::<Vec<_>>();
    for split in (0..components.len()).rev() {
        let prefix = components[..split].iter().collect::<PathBuf>();
        if prefix.as_os_str().is_empty() {
            continue;
        }
        let Ok(mut base) = fs::canonicalize(&prefix) else {
            continue;
        };
        for (offset, component) in components[split..].iter().enumerate() {
            match component {
                Component::Normal(part) => base.push(part),
                Component::CurDir => continue,
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
            }
            let is_link = fs::symlink_metadata(&base)
                .map(|meta| meta.file_type().is_symlink())
                .unwrap_or(false);
            if !is_link {
                continue;
            }
            let target = fs::read_link(&base).ok()?;
            let mut next = base.parent()?.join(target);
            next.extend(&components[split + offset + 1..]);
            return Some(Resolution::Redirect(next));
        }
        return Some(Resolution::Resolved(base));
    }
    None
}

pub fn deny_if_sensitive(path: &Path) -> Result<(), PolicyViolation> {
    let Some(name) = path.file_name().and_then(|v| v.to_str()) else {
        return Ok(());
    };
    if SENSITIVE_BASENAMES.contains(&name) {
        return Err(PolicyViolation::SensitiveFile {
            name: name.to_string(),
        });
    }
    Ok(())
}

/// Fragments may span tokens, so matching runs on the space-joined form.
pub fn scan_forbidden_arguments<I, S>(tokens: I) -> Result<(), PolicyViolation>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let joined = tokens
        .into_iter()
        .map(|token| token.as_ref().to_string())
        .collect::<Vec<_>>()
        .join(" ");
    match FORBIDDEN_FRAGMENTS
        .iter()
        .find(|fragment| joined.contains(*fragment))
    {
        Some(fragment) => Err(PolicyViolation::ForbiddenOperation {
            fragment: (*fragment).to_string(),
        }),
        None => Ok(()),
    }
}

/// Refs, branch names and similar values are forwarded as positional
/// arguments, so they may never start with `-`.
pub fn deny_option_like(arg: &str, value: &str) -> Result<(), PolicyViolation> {
    if value.trim_start().starts_with('-') {
        return Err(PolicyViolation::OptionLikeArgument {
            arg: arg.to_string(),
            value: value.to_string(),
        });
    }
    Ok(())
}

pub fn check_write_volume(write_step_count: usize) -> Result<(), PolicyViolation> {
    if write_step_count > MAX_WRITE_STEPS {
        return Err(PolicyViolation::TooManyWrites {
            count: write_step_count,
            max: MAX_WRITE_STEPS,
        });
    }
    Ok(())
}

pub fn partition_sensitive(paths: &[String]) -> (Vec<String>, Vec<String>) {
    paths
        .iter()
        .cloned()
        .partition(|path| deny_if_sensitive(Path::new(path)).is_ok())
}

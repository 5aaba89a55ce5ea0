use super::{global_config_path, workspace_config_paths, ConfigError, Settings};
use serde_yaml::{Mapping, Value};
use std::fs;
use std::path::{Path, PathBuf};

pub fn load_settings(workspace: &Path) -> Result<Settings, ConfigError> {
    let mut paths = Vec::new();
    if let Ok(global) = global_config_path() {
        paths.push(global);
    }
    paths.extend(workspace_config_paths(workspace));
    let settings = load_settings_from_paths(&paths)?;
    let settings = apply_env_overrides(settings, |key| std::env::var(key).ok());
    settings.validate()?;
    Ok(settings)
}

/// Later paths override earlier ones key by key; absent files are skipped.
pub fn load_settings_from_paths(paths: &[PathBuf]) -> Result<Settings, ConfigError> {
    let mut merged = Value::Mapping(Mapping::new());
    for path in paths {
        if !path.is_file() {
            continue;
        }
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let layer: Value = serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        if layer.is_null() {
            continue;
        }
        merge_yaml(&mut merged, layer);
    }
    serde_yaml::from_value(merged)
        .map_err(|err| ConfigError::Validation(format!("merged settings are invalid: {err}")))
}

pub fn apply_env_overrides<F>(mut settings: Settings, lookup: F) -> Settings
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
    if let Some(value) = non_empty("GITWARD_API_KEY") {
        settings.planner.api_key = value;
    }
    if let Some(value) = non_empty("GITWARD_BASE_URL") {
        settings.planner.base_url = value;
    }
    if let Some(value) = non_empty("GITWARD_MODEL") {
        settings.planner.model = value;
    }
    if let Some(value) = non_empty("GITWARD_WORKER_BIN") {
        settings.worker.binary = Some(PathBuf::from(value));
    }
    settings
}

fn merge_yaml(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Mapping(base_map), Value::Mapping(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge_yaml(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

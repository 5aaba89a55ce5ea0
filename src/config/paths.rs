use crate::config::ConfigError;
use std::path::{Path, PathBuf};

pub const STATE_DIR: &str = ".gitward";
pub const SETTINGS_FILE_NAME: &str = "config.yaml";
pub const WORKSPACE_SETTINGS_FILE_NAME: &str = "gitward.yaml";

pub fn global_config_path() -> Result<PathBuf, ConfigError> {
    let home = std::env::var_os("HOME").ok_or(ConfigError::HomeDirectoryUnavailable)?;
    Ok(PathBuf::from(home).join(STATE_DIR).join(SETTINGS_FILE_NAME))
}

pub fn workspace_state_dir(workspace: &Path) -> PathBuf {
    workspace.join(STATE_DIR)
}

/// Lowest precedence first.
pub fn workspace_config_paths(workspace: &Path) -> Vec<PathBuf> {
    vec![
        workspace_state_dir(workspace).join(SETTINGS_FILE_NAME),
        workspace.join(WORKSPACE_SETTINGS_FILE_NAME),
    ]
}

pub fn event_log_dir(workspace: &Path) -> PathBuf {
    workspace_state_dir(workspace).join("logs")
}

pub fn index_dir(workspace: &Path) -> PathBuf {
    workspace_state_dir(workspace).join("index")
}

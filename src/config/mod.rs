pub mod error;
pub mod load;
pub mod paths;
pub mod settings;

pub use error::ConfigError;
pub use load::{apply_env_overrides, load_settings, load_settings_from_paths};
pub use paths::{
    event_log_dir, global_config_path, index_dir, workspace_config_paths, workspace_state_dir,
    SETTINGS_FILE_NAME, STATE_DIR, WORKSPACE_SETTINGS_FILE_NAME,
};
pub use settings::{PlannerSettings, Settings, WorkerSettings};

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn workspace_file_overrides_global_file_per_field() {
        let dir = tempdir().expect("tempdir");
        let global = dir.path().join("global.yaml");
        let local = dir.path().join("local.yaml");
        fs::write(
            &global,
            r#"
planner:
  api_key: global-key
  model: global-model
worker:
  response_timeout_ms: 5000
"#,
        )
        .expect("write global");
        fs::write(
            &local,
            r#"
planner:
  model: local-model
"#,
        )
        .expect("write local");

        let settings = load_settings_from_paths(&[global, local]).expect("load");
        assert_eq!(settings.planner.api_key, "global-key");
        assert_eq!(settings.planner.model, "local-model");
        assert_eq!(settings.worker.response_timeout_ms, 5000);
        assert!(settings.use_llm);
    }

    #[test]
    fn missing_files_yield_defaults() {
        let dir = tempdir().expect("tempdir");
        let settings =
            load_settings_from_paths(&[dir.path().join("absent.yaml")]).expect("load defaults");
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn environment_overrides_win_over_files() {
        let settings = apply_env_overrides(Settings::default(), |key| match key {
            "GITWARD_API_KEY" => Some("env-key".to_string()),
            "GITWARD_WORKER_BIN" => Some("/opt/gitward-worker".to_string()),
            _ => None,
        });
        assert_eq!(settings.planner.api_key, "env-key");
        assert_eq!(
            settings.worker.binary.as_deref(),
            Some(std::path::Path::new("/opt/gitward-worker"))
        );
    }
}

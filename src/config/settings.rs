use super::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default = "default_true")]
    pub use_llm: bool,
    #[serde(default)]
    pub planner: PlannerSettings,
    #[serde(default)]
    pub worker: WorkerSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            use_llm: true,
            planner: PlannerSettings::default(),
            worker: WorkerSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PlannerSettings {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_planner_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for PlannerSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_base_url(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_planner_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct WorkerSettings {
    #[serde(default)]
    pub binary: Option<PathBuf>,
    #[serde(default = "default_response_timeout_ms")]
    pub response_timeout_ms: u64,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            binary: None,
            response_timeout_ms: default_response_timeout_ms(),
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.planner.base_url.trim().is_empty() {
            return Err(ConfigError::Validation(
                "planner.base_url must be non-empty".to_string(),
            ));
        }
        if self.planner.model.trim().is_empty() {
            return Err(ConfigError::Validation(
                "planner.model must be non-empty".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&self.planner.temperature) {
            return Err(ConfigError::Validation(
                "planner.temperature must be between 0 and 2".to_string(),
            ));
        }
        if self.planner.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "planner.timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.worker.response_timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "worker.response_timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_true() -> bool {
    true
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_temperature() -> f32 {
    0.2
}

fn default_max_tokens() -> u32 {
    2048
}

fn default_planner_timeout_secs() -> u64 {
    60
}

fn default_response_timeout_ms() -> u64 {
    120_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_worker_timeout_is_rejected() {
        let settings: Settings = serde_yaml::from_str(
            r#"
worker:
  response_timeout_ms: 0
"#,
        )
        .expect("parse settings");
        let err = settings.validate().expect_err("validation should fail");
        assert!(err.to_string().contains("response_timeout_ms"));
    }

    #[test]
    fn empty_document_fields_take_defaults() {
        let settings: Settings = serde_yaml::from_str("use_llm: false").expect("parse");
        assert!(!settings.use_llm);
        assert_eq!(settings.planner.base_url, DEFAULT_BASE_URL);
        assert_eq!(settings.worker.response_timeout_ms, 120_000);
        settings.validate().expect("defaults are valid");
    }
}

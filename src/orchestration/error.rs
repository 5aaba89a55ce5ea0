use crate::capability::CapabilityError;
use crate::config::ConfigError;
use crate::orchestration::run_store::RunPhase;
use crate::rpc::RpcError;

#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("run phase transition `{from}` -> `{to}` is invalid")]
    InvalidPhaseTransition { from: RunPhase, to: RunPhase },
    #[error(transparent)]
    Rpc(#[from] RpcError),
    #[error("worker setup failed: {0}")]
    Capability(#[from] CapabilityError),
    #[error("run id generation failed: {0}")]
    RunId(String),
    #[error("config error: {0}")]
    Config(String),
    #[error("io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("json error at {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl From<ConfigError> for OrchestratorError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value.to_string())
    }
}

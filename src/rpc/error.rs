#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("worker channel closed")]
    ChannelClosed,
    #[error("worker did not respond within {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    #[error("worker sent unparseable output `{line}`: {source}")]
    Unparseable {
        line: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("malformed `{method}` result: {reason}")]
    MalformedResult { method: String, reason: String },
    #[error("worker channel io error during {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to spawn worker `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("client is closed after an earlier transport failure")]
    Closed,
    #[error("{message}")]
    Remote { message: String },
}

impl RpcError {
    /// Transport failures end the session; remote errors only fail one call.
    pub fn is_transport_failure(&self) -> bool {
        matches!(
            self,
            RpcError::ChannelClosed
                | RpcError::Timeout { .. }
                | RpcError::Unparseable { .. }
                | RpcError::Io { .. }
                | RpcError::Spawn { .. }
                | RpcError::Closed
        )
    }
}

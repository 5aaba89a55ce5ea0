use super::RpcError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const JSONRPC_VERSION: &str = "2.0";

/// The closed set of methods a worker answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    ToolsList,
    ToolsCall,
    ResourcesList,
    ResourcesRead,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::ToolsList => "tools/list",
            Method::ToolsCall => "tools/call",
            Method::ResourcesList => "resources/list",
            Method::ResourcesRead => "resources/read",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "tools/list" => Some(Method::ToolsList),
            "tools/call" => Some(Method::ToolsCall),
            "resources/list" => Some(Method::ResourcesList),
            "resources/read" => Some(Method::ResourcesRead),
            _ => None,
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub jsonrpc: String,
    pub id: u64,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl Request {
    pub fn new(id: u64, method: Method, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            method: method.as_str().to_string(),
            params,
        }
    }

    pub fn encode(&self) -> Result<String, RpcError> {
        serde_json::to_string(self).map_err(RpcError::Encode)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorObject {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    #[serde(default = "default_version")]
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorObject>,
}

impl Response {
    pub fn success(id: u64, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: Some(id),
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: u64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: Some(id),
            result: None,
            error: Some(ErrorObject {
                message: message.into(),
            }),
        }
    }

    pub fn encode(&self) -> Result<String, RpcError> {
        serde_json::to_string(self).map_err(RpcError::Encode)
    }

    pub fn into_outcome(self) -> Result<Value, RpcError> {
        match self.error {
            Some(error) => Err(RpcError::Remote {
                message: error.message,
            }),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallParams {
    pub name: String,
    #[serde(default)]
    pub args: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceReadParams {
    pub uri: String,
}

fn default_version() -> String {
    JSONRPC_VERSION.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_omits_absent_params() {
        let line = Request::new(3, Method::ToolsList, None)
            .encode()
            .expect("encode");
        assert_eq!(line, r#"{"jsonrpc":"2.0","id":3,"method":"tools/list"}"#);
    }

    #[test]
    fn error_response_becomes_remote_error() {
        let response: Response =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":4,"error":{"message":"boom"}}"#)
                .expect("decode");
        let err = response.into_outcome().expect_err("remote error");
        assert!(matches!(err, RpcError::Remote { ref message } if message == "boom"));
        assert!(!err.is_transport_failure());
    }

    #[test]
    fn method_names_round_trip() {
        for method in [
            Method::ToolsList,
            Method::ToolsCall,
            Method::ResourcesList,
            Method::ResourcesRead,
        ] {
            assert_eq!(Method::parse(method.as_str()), Some(method));
        }
        assert_eq!(Method::parse("shell/exec"), None);
        let params: ToolCallParams =
            serde_json::from_value(json!({"name": "status"})).expect("params");
        assert!(params.args.is_empty());
    }
}

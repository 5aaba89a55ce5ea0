use super::protocol::{Method, Request, ResourceReadParams, Response, ToolCallParams};
use crate::capability::{CapabilityError, CapabilityRegistry};
use crate::config::event_log_dir;
use crate::tools::default_registry;
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use std::fs;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

const RECENT_LOG_LIMIT: usize = 5;

const RESOURCES: &[(&str, &str)] = &[
    ("workspace/info", "workspace root and top-level entry count"),
    ("index/status", "lexical index status"),
    ("logs/recent", "most recent run event logs"),
    ("dir/summary", "top-level directory listing"),
];

/// Owns one workspace's registry and answers protocol requests against it.
pub struct WorkerServer {
    workspace: PathBuf,
    registry: CapabilityRegistry,
}

impl WorkerServer {
    pub fn new(workspace: impl Into<PathBuf>, registry: CapabilityRegistry) -> Self {
        Self {
            workspace: workspace.into(),
            registry,
        }
    }

    pub fn for_workspace(workspace: &Path) -> Result<Self, CapabilityError> {
        Ok(Self::new(workspace, default_registry(workspace)?))
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    pub fn handle(&self, request: &Request) -> Response {
        match self.dispatch(request) {
            Ok(result) => Response::success(request.id, result),
            Err(message) => Response::failure(request.id, message),
        }
    }

    /// Returns `None` for blank or unparseable lines; those get no reply.
    pub fn handle_line(&self, line: &str) -> Option<String> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return None;
        }
        let request = serde_json::from_str::<Request>(trimmed).ok()?;
        let response = self.handle(&request);
        match response.encode() {
            Ok(encoded) => Some(encoded),
            Err(err) => Response::failure(request.id, err.to_string()).encode().ok(),
        }
    }

    pub fn serve<R: BufRead, W: Write>(&self, reader: R, mut writer: W) -> std::io::Result<()> {
        for line in reader.lines() {
            let line = line?;
            match self.handle_line(&line) {
                Some(response) => {
                    writeln!(writer, "{response}")?;
                    writer.flush()?;
                }
                None if !line.trim().is_empty() => {
                    eprintln!("gitward-worker: ignoring unparseable request line");
                }
                None => {}
            }
        }
        Ok(())
    }

    fn dispatch(&self, request: &Request) -> Result<Value, String> {
        let Some(method) = Method::parse(&request.method) else {
            return Err(format!("unknown method `{}`", request.method));
        };
        match method {
            Method::ToolsList => Ok(json!({ "tools": self.registry.describe() })),
            Method::ToolsCall => {
                let params = parse_params::<ToolCallParams>(method, request.params.as_ref())?;
                self.registry
                    .invoke(&params.name, &params.args)
                    .map_err(|err| err.to_string())
            }
            Method::ResourcesList => {
                let resources = RESOURCES
                    .iter()
                    .map(|(uri, description)| json!({ "uri": uri, "description": description }))
                    .collect::<Vec<_>>();
                Ok(json!({ "resources": resources }))
            }
            Method::ResourcesRead => {
                let params =
                    parse_params::<ResourceReadParams>(method, request.params.as_ref())?;
                let content = self.read_resource(&params.uri)?;
                Ok(json!({ "uri": params.uri, "content": content }))
            }
        }
    }

    fn read_resource(&self, uri: &str) -> Result<Value, String> {
        match uri {
            "workspace/info" => {
                let entries = fs::read_dir(&self.workspace)
                    .map(|entries| entries.filter_map(Result::ok).count())
                    .unwrap_or(0);
                Ok(json!({
                    "workspace": self.workspace.display().to_string(),
                    "files": entries,
                }))
            }
            "index/status" => self.invoke_resource("index_status", Map::new()),
            "dir/summary" => self.invoke_resource(
                "list_files",
                Map::from_iter([
                    ("dir".to_string(), json!(".")),
                    ("max_depth".to_string(), json!(1)),
                ]),
            ),
            "logs/recent" => {
                let mut files = fs::read_dir(event_log_dir(&self.workspace))
                    .map(|entries| {
                        entries
                            .filter_map(Result::ok)
                            .map(|entry| entry.file_name().to_string_lossy().to_string())
                            .collect::<Vec<_>>()
                    })
                    .unwrap_or_default();
                files.sort();
                let skip = files.len().saturating_sub(RECENT_LOG_LIMIT);
                Ok(json!({ "files": files.split_off(skip) }))
            }
            other => Err(format!("unknown resource `{other}`")),
        }
    }

    fn invoke_resource(&self, capability: &str, args: Map<String, Value>) -> Result<Value, String> {
        self.registry
            .invoke(capability, &args)
            .map_err(|err| err.to_string())
    }
}

fn parse_params<T: DeserializeOwned>(method: Method, params: Option<&Value>) -> Result<T, String> {
    let params = params.cloned().unwrap_or_else(|| Value::Object(Map::new()));
    serde_json::from_value(params).map_err(|err| format!("invalid params for `{method}`: {err}"))
}

use super::channel::LineChannel;
use super::protocol::{Method, Request, ResourceReadParams, Response, ToolCallParams};
use super::RpcError;
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Connected,
    AwaitingResponse { id: u64 },
    Closed,
}

pub struct RpcClient<C: LineChannel> {
    channel: C,
    state: ClientState,
    next_id: u64,
    timeout: Duration,
    skipped_responses: u64,
}

impl<C: LineChannel> RpcClient<C> {
    pub fn new(channel: C, timeout: Duration) -> Self {
        Self::with_starting_id(channel, timeout, 1)
    }

    pub fn with_starting_id(channel: C, timeout: Duration, first_id: u64) -> Self {
        Self {
            channel,
            state: ClientState::Connected,
            next_id: first_id,
            timeout,
            skipped_responses: 0,
        }
    }

    pub fn state(&self) -> ClientState {
        self.state
    }

    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    /// Responses discarded because their id did not match the pending request.
    pub fn skipped_responses(&self) -> u64 {
        self.skipped_responses
    }

    pub fn request(&mut self, method: Method, params: Option<Value>) -> Result<Value, RpcError> {
        if self.state == ClientState::Closed {
            return Err(RpcError::Closed);
        }
        let id = self.next_id;
        self.next_id += 1;
        let line = Request::new(id, method, params).encode()?;

        self.state = ClientState::AwaitingResponse { id };
        if let Err(err) = self.channel.send_line(&line) {
            return Err(self.fail(err));
        }

        let deadline = Instant::now() + self.timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(self.fail(self.timeout_error()));
            }
            let line = match self.channel.recv_line(remaining) {
                Ok(Some(line)) => line,
                Ok(None) => return Err(self.fail(RpcError::ChannelClosed)),
                Err(RpcError::Timeout { .. }) => return Err(self.fail(self.timeout_error())),
                Err(err) => return Err(self.fail(err)),
            };
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let response = match serde_json::from_str::<Response>(trimmed) {
                Ok(response) => response,
                Err(source) => {
                    return Err(self.fail(RpcError::Unparseable {
                        line: trimmed.to_string(),
                        source,
                    }))
                }
            };
            if response.id != Some(id) {
                self.skipped_responses += 1;
                continue;
            }
            self.state = ClientState::Connected;
            return response.into_outcome();
        }
    }

    pub fn list_tools(&mut self) -> Result<Map<String, Value>, RpcError> {
        let result = self.request(Method::ToolsList, None)?;
        match result.get("tools") {
            Some(Value::Object(tools)) => Ok(tools.clone()),
            _ => Err(RpcError::MalformedResult {
                method: Method::ToolsList.to_string(),
                reason: "missing `tools` object".to_string(),
            }),
        }
    }

    pub fn tool_names(&mut self) -> Result<BTreeSet<String>, RpcError> {
        Ok(self.list_tools()?.keys().cloned().collect())
    }

    pub fn call_tool(&mut self, name: &str, args: Map<String, Value>) -> Result<Value, RpcError> {
        let params = ToolCallParams {
            name: name.to_string(),
            args,
        };
        let params = serde_json::to_value(params).map_err(RpcError::Encode)?;
        self.request(Method::ToolsCall, Some(params))
    }

    pub fn list_resources(&mut self) -> Result<Vec<Value>, RpcError> {
        let result = self.request(Method::ResourcesList, None)?;
        match result.get("resources") {
            Some(Value::Array(resources)) => Ok(resources.clone()),
            _ => Err(RpcError::MalformedResult {
                method: Method::ResourcesList.to_string(),
                reason: "missing `resources` array".to_string(),
            }),
        }
    }

    pub fn read_resource(&mut self, uri: &str) -> Result<Value, RpcError> {
        let params = serde_json::to_value(ResourceReadParams {
            uri: uri.to_string(),
        })
        .map_err(RpcError::Encode)?;
        self.request(Method::ResourcesRead, Some(params))
    }

    pub fn close(&mut self) {
        if self.state != ClientState::Closed {
            self.state = ClientState::Closed;
            self.channel.close();
        }
    }

    fn timeout_error(&self) -> RpcError {
        RpcError::Timeout {
            timeout_ms: self.timeout.as_millis() as u64,
        }
    }

    fn fail(&mut self, err: RpcError) -> RpcError {
        self.close();
        err
    }
}

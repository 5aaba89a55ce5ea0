use gitward::rpc::{ClientState, LineChannel, Request, RpcClient, RpcError};
use serde_json::{json, Map};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Replays canned worker lines and records everything the client sends.
struct ScriptedChannel {
    sent: Arc<Mutex<Vec<String>>>,
    replies: VecDeque<Option<String>>,
    closed: Arc<Mutex<bool>>,
}

impl ScriptedChannel {
    fn new(replies: Vec<Option<&str>>) -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            replies: replies
                .into_iter()
                .map(|reply| reply.map(str::to_string))
                .collect(),
            closed: Arc::new(Mutex::new(false)),
        }
    }
}

impl LineChannel for ScriptedChannel {
    fn send_line(&mut self, line: &str) -> Result<(), RpcError> {
        self.sent.lock().expect("lock").push(line.to_string());
        Ok(())
    }

    fn recv_line(&mut self, timeout: Duration) -> Result<Option<String>, RpcError> {
        match self.replies.pop_front() {
            Some(reply) => Ok(reply),
            None => Err(RpcError::Timeout {
                timeout_ms: timeout.as_millis() as u64,
            }),
        }
    }

    fn close(&mut self) {
        *self.closed.lock().expect("lock") = true;
    }
}

fn timeout() -> Duration {
    Duration::from_millis(200)
}

#[test]
fn client_module_discards_stray_response_ids() {
    let channel = ScriptedChannel::new(vec![
        Some(r#"{"jsonrpc":"2.0","id":6,"result":{"ok":true,"stale":true}}"#),
        Some(""),
        Some(r#"{"jsonrpc":"2.0","id":7,"result":{"ok":true,"branch":"main"}}"#),
    ]);
    let sent = Arc::clone(&channel.sent);
    let mut client = RpcClient::with_starting_id(channel, timeout(), 7);

    let result = client.call_tool("status", Map::new()).expect("call");
    assert_eq!(result, json!({"ok": true, "branch": "main"}));
    assert_eq!(client.state(), ClientState::Connected);
    assert_eq!(client.skipped_responses(), 1);
    assert_eq!(client.next_id(), 8);

    let sent = sent.lock().expect("lock");
    let request: Request = serde_json::from_str(&sent[0]).expect("request");
    assert_eq!(request.id, 7);
    assert_eq!(request.method, "tools/call");
    assert_eq!(request.params, Some(json!({"name": "status", "args": {}})));
}

#[test]
fn client_module_ids_increase_from_one() {
    let channel = ScriptedChannel::new(vec![
        Some(r#"{"jsonrpc":"2.0","id":1,"result":{"tools":{"status":{"description":"s"}}}}"#),
        Some(r#"{"jsonrpc":"2.0","id":2,"result":{"resources":[]}}"#),
    ]);
    let mut client = RpcClient::new(channel, timeout());
    let names = client.tool_names().expect("tools");
    assert!(names.contains("status"));
    assert!(client.list_resources().expect("resources").is_empty());
    assert_eq!(client.next_id(), 3);
}

#[test]
fn client_module_remote_errors_keep_the_session_open() {
    let channel = ScriptedChannel::new(vec![
        Some(r#"{"jsonrpc":"2.0","id":1,"error":{"message":"unregistered capability: rebase"}}"#),
        Some(r#"{"jsonrpc":"2.0","id":2,"result":{"ok":true}}"#),
    ]);
    let mut client = RpcClient::new(channel, timeout());

    let err = client.call_tool("rebase", Map::new()).expect_err("remote");
    assert!(!err.is_transport_failure());
    assert_eq!(err.to_string(), "unregistered capability: rebase");
    assert_eq!(client.state(), ClientState::Connected);
    assert!(client.call_tool("status", Map::new()).is_ok());
}

#[test]
fn client_module_closes_on_channel_closure() {
    let channel = ScriptedChannel::new(vec![None]);
    let closed = Arc::clone(&channel.closed);
    let mut client = RpcClient::new(channel, timeout());

    let err = client.call_tool("status", Map::new()).expect_err("closed");
    assert!(matches!(err, RpcError::ChannelClosed));
    assert_eq!(client.state(), ClientState::Closed);
    assert!(*closed.lock().expect("lock"));

    let again = client.call_tool("status", Map::new()).expect_err("still closed");
    assert!(matches!(again, RpcError::Closed));
}

#[test]
fn client_module_treats_garbage_and_silence_as_transport_failures() {
    let mut garbage = RpcClient::new(ScriptedChannel::new(vec![Some("not json")]), timeout());
    let err = garbage.call_tool("status", Map::new()).expect_err("garbage");
    assert!(matches!(err, RpcError::Unparseable { .. }));
    assert!(err.is_transport_failure());
    assert_eq!(garbage.state(), ClientState::Closed);

    let mut silent = RpcClient::new(ScriptedChannel::new(Vec::new()), timeout());
    let err = silent.call_tool("status", Map::new()).expect_err("silence");
    assert!(matches!(err, RpcError::Timeout { .. }));
    assert_eq!(silent.state(), ClientState::Closed);
}

#[test]
fn client_module_rejects_malformed_tool_listing() {
    let channel = ScriptedChannel::new(vec![Some(r#"{"jsonrpc":"2.0","id":1,"result":{"tools":[]}}"#)]);
    let mut client = RpcClient::new(channel, timeout());
    let err = client.list_tools().expect_err("malformed");
    assert!(matches!(err, RpcError::MalformedResult { .. }));
    assert_eq!(client.state(), ClientState::Connected);
}

pub mod channel;
pub mod client;
pub mod error;
pub mod protocol;
pub mod server;

pub use channel::{LineChannel, LocalChannel, ProcessChannel};
pub use client::{ClientState, RpcClient};
pub use error::RpcError;
pub use protocol::{
    ErrorObject, Method, Request, ResourceReadParams, Response, ToolCallParams, JSONRPC_VERSION,
};
pub use server::WorkerServer;

//! Server-to-server invocation over HTTP
//!
//! The outbound side ([`HttpRemoteInvoker`]) posts an [`RpcMessage`](lobby_core::RpcMessage)
//! to a peer's [`RPC_PATH`]; the inbound side ([`rpc_handler`]) hands it to the
//! local push handler.

mod handler;
mod invoker;

pub use handler::{rpc_handler, RpcError};
pub use invoker::HttpRemoteInvoker;

/// Path of the inbound invocation endpoint
pub const RPC_PATH: &str = "/rpc";

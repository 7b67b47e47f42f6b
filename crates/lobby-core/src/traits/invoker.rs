//! Remote invocation

use async_trait::async_trait;
use serde_json::Value;

use crate::remote::RpcMessage;
use crate::LobbyResult;

/// Moves an [`RpcMessage`] to another server and returns its reply.
///
/// Timeouts and cancellation belong here; the fan-out protocol waits for
/// whatever this returns.
#[async_trait]
pub trait RemoteInvoker: Send + Sync {
    async fn invoke(&self, server_id: &str, message: RpcMessage) -> LobbyResult<Value>;
}

//! HTTP remote invoker

use async_trait::async_trait;
use lobby_core::{LobbyError, LobbyResult, RemoteInvoker, RpcMessage, ServerDirectory};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use super::RPC_PATH;

/// [`RemoteInvoker`] that resolves peers through a [`ServerDirectory`] and
/// posts to their invocation endpoint. The request timeout bounds every call.
pub struct HttpRemoteInvoker {
    client: reqwest::Client,
    directory: Arc<dyn ServerDirectory>,
}

impl HttpRemoteInvoker {
    pub fn new(directory: Arc<dyn ServerDirectory>, timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, directory })
    }
}

#[async_trait]
impl RemoteInvoker for HttpRemoteInvoker {
    async fn invoke(&self, server_id: &str, message: RpcMessage) -> LobbyResult<Value> {
        let server = self
            .directory
            .server(server_id)
            .ok_or_else(|| LobbyError::ServerNotFound(server_id.to_string()))?;
        let url = format!("{}{RPC_PATH}", server.endpoint);

        tracing::trace!(server_id = %server_id, url = %url, method = %message.method, "Invoking peer");

        let response = self
            .client
            .post(&url)
            .json(&message)
            .send()
            .await
            .map_err(|e| LobbyError::Rpc(format!("{server_id}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LobbyError::Rpc(format!("{server_id} replied {status}: {body}")));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| LobbyError::Rpc(format!("{server_id}: invalid reply: {e}")))
    }
}

impl std::fmt::Debug for HttpRemoteInvoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpRemoteInvoker").finish()
    }
}

//! Per-server dispatch
//!
//! Sends one push per owning server: a direct call when the server is this
//! process, a `sys.channelRemote` invocation otherwise.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use super::{fan_out, FanoutTarget};
use crate::remote::{PushHandler, PushOptions, RpcMessage};
use crate::traits::RemoteInvoker;
use crate::{LobbyError, LobbyResult, ServerId, Uid};

/// Dispatches grouped pushes and broadcasts across the cluster
#[derive(Clone)]
pub struct GroupDispatcher {
    server_id: ServerId,
    local: Option<Arc<PushHandler>>,
    invoker: Option<Arc<dyn RemoteInvoker>>,
}

impl GroupDispatcher {
    #[must_use]
    pub fn new(server_id: impl Into<ServerId>) -> Self {
        Self {
            server_id: server_id.into(),
            local: None,
            invoker: None,
        }
    }

    /// Handle pushes addressed to this server without going through the invoker
    #[must_use]
    pub fn with_local(mut self, handler: Arc<PushHandler>) -> Self {
        self.local = Some(handler);
        self
    }

    #[must_use]
    pub fn with_invoker(mut self, invoker: Arc<dyn RemoteInvoker>) -> Self {
        self.invoker = Some(invoker);
        self
    }

    pub fn server_id(&self) -> &str {
        &self.server_id
    }

    /// Push to uids grouped by owning server. Returns failed server ids and undelivered uids.
    pub async fn push_by_group(
        &self,
        route: &str,
        msg: &Value,
        groups: HashMap<ServerId, Vec<Uid>>,
        opts: &PushOptions,
    ) -> LobbyResult<Vec<String>> {
        let targets: Vec<FanoutTarget<Vec<Uid>>> = groups
            .into_iter()
            .map(|(id, uids)| {
                if uids.is_empty() {
                    FanoutTarget::Empty { id }
                } else {
                    FanoutTarget::Dispatch { id, payload: uids }
                }
            })
            .collect();

        fan_out(targets, |server_id, uids| async move {
            self.push_to_server(&server_id, route, msg, &uids, opts)
                .await
        })
        .await
    }

    /// Broadcast to every listed server
    pub async fn broadcast(
        &self,
        servers: Vec<ServerId>,
        route: &str,
        msg: &Value,
        opts: &PushOptions,
    ) -> LobbyResult<Vec<String>> {
        let targets: Vec<FanoutTarget<()>> = servers
            .into_iter()
            .map(|id| FanoutTarget::Dispatch { id, payload: () })
            .collect();

        fan_out(targets, |server_id, ()| async move {
            self.broadcast_to_server(&server_id, route, msg, opts)
                .await
                .map(|()| Vec::new())
        })
        .await
    }

    async fn push_to_server(
        &self,
        server_id: &str,
        route: &str,
        msg: &Value,
        uids: &[Uid],
        opts: &PushOptions,
    ) -> LobbyResult<Vec<Uid>> {
        if let Some(local) = self.local_handler(server_id) {
            return local.push_message(route, msg, uids, opts).await;
        }

        let reply = self
            .invoke(server_id, RpcMessage::push_message(route, msg, uids, opts)?)
            .await?;
        let failed: Option<Vec<Uid>> = serde_json::from_value(reply)?;
        Ok(failed.unwrap_or_default())
    }

    async fn broadcast_to_server(
        &self,
        server_id: &str,
        route: &str,
        msg: &Value,
        opts: &PushOptions,
    ) -> LobbyResult<()> {
        if let Some(local) = self.local_handler(server_id) {
            return local.broadcast(route, msg, opts).await;
        }

        self.invoke(server_id, RpcMessage::broadcast(route, msg, opts)?)
            .await
            .map(|_| ())
    }

    fn local_handler(&self, server_id: &str) -> Option<&Arc<PushHandler>> {
        if server_id == self.server_id {
            self.local.as_ref()
        } else {
            None
        }
    }

    async fn invoke(&self, server_id: &str, message: RpcMessage) -> LobbyResult<Value> {
        let invoker = self.invoker.as_ref().ok_or_else(|| {
            LobbyError::Rpc(format!("no remote invoker configured for {server_id}"))
        })?;

        tracing::debug!(
            server_id = %server_id,
            method = %message.method,
            "Invoking remote push"
        );
        invoker.invoke(server_id, message).await
    }
}

impl std::fmt::Debug for GroupDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupDispatcher")
            .field("server_id", &self.server_id)
            .field("local", &self.local.is_some())
            .field("invoker", &self.invoker.is_some())
            .finish()
    }
}

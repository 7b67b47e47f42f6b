//! Bind and unbind handlers

use lobby_core::SessionId;

use super::HandlerResult;
use crate::server::GatewayState;

/// Handles identity changes requested by the client
pub struct BindHandler;

impl BindHandler {
    /// Bind the connection's session to `uid`
    pub async fn bind(state: &GatewayState, sid: SessionId, uid: String) -> HandlerResult<()> {
        state.sessions().bind(sid, uid.clone()).await?;
        tracing::info!(session_id = sid, uid = %uid, "Client bound");
        Ok(())
    }

    /// Release the binding to `uid`
    pub async fn unbind(state: &GatewayState, sid: SessionId, uid: String) -> HandlerResult<()> {
        state.sessions().unbind(sid, uid.clone()).await?;
        tracing::info!(session_id = sid, uid = %uid, "Client unbound");
        Ok(())
    }
}

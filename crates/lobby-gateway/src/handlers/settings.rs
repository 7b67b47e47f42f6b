//! Session settings handler

use lobby_core::SessionId;
use serde_json::Value;

use super::HandlerResult;
use crate::server::GatewayState;

pub struct SettingsHandler;

impl SettingsHandler {
    pub async fn set(
        state: &GatewayState,
        sid: SessionId,
        key: String,
        value: Value,
    ) -> HandlerResult<()> {
        state.sessions().import(sid, &key, value).await?;
        tracing::debug!(session_id = sid, key = %key, "Session setting stored");
        Ok(())
    }
}

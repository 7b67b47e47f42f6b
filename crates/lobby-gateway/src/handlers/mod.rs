//! Client op handlers
//!
//! Handles incoming WebSocket frames based on their `op`.

mod bind;
mod error;
mod settings;

pub use bind::BindHandler;
pub use error::{HandlerError, HandlerResult};
pub use settings::SettingsHandler;

use lobby_core::SessionId;

use crate::protocol::ClientMessage;
use crate::server::GatewayState;

/// Dispatch incoming client messages to the matching handler
pub struct MessageDispatcher;

impl MessageDispatcher {
    /// Handle one client message. Returns whether the op was recognized.
    pub async fn dispatch(
        state: &GatewayState,
        sid: SessionId,
        message: ClientMessage,
    ) -> HandlerResult<bool> {
        match message {
            ClientMessage::Bind { uid } => BindHandler::bind(state, sid, uid).await?,
            ClientMessage::Unbind { uid } => BindHandler::unbind(state, sid, uid).await?,
            ClientMessage::Set { key, value } => {
                SettingsHandler::set(state, sid, key, value).await?;
            }
            ClientMessage::Unknown => {
                tracing::debug!(session_id = sid, "Ignoring unknown client op");
                return Ok(false);
            }
        }
        Ok(true)
    }
}

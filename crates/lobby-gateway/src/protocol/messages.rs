//! Gateway message formats

use bytes::Bytes;
use lobby_core::{encode_push, LobbyResult};
use serde::Deserialize;
use serde_json::{json, Value};

/// Route of the reply sent after a client op succeeds
pub const ACK_ROUTE: &str = "onAck";

/// Route of the reply sent after a client op fails
pub const ERROR_ROUTE: &str = "onError";

/// Frame sent by a client
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum ClientMessage {
    /// Bind this connection's session to a user id
    Bind { uid: String },
    /// Release the binding
    Unbind { uid: String },
    /// Store one session setting
    Set { key: String, value: Value },
    /// Any other op
    #[serde(other)]
    Unknown,
}

impl ClientMessage {
    /// Parse a client frame from JSON text
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Op name, for logs and replies
    #[must_use]
    pub fn op(&self) -> &'static str {
        match self {
            Self::Bind { .. } => "bind",
            Self::Unbind { .. } => "unbind",
            Self::Set { .. } => "set",
            Self::Unknown => "unknown",
        }
    }
}

/// Replies the gateway writes back to a client
pub struct ServerReply;

impl ServerReply {
    /// `{"route":"onAck","body":{"op":..}}`
    pub fn ack(op: &str) -> LobbyResult<Bytes> {
        encode_push(ACK_ROUTE, &json!({ "op": op }))
    }

    /// `{"route":"onError","body":{"op":..,"code":..,"message":..}}`
    pub fn error(op: &str, code: &str, message: &str) -> LobbyResult<Bytes> {
        encode_push(
            ERROR_ROUTE,
            &json!({ "op": op, "code": code, "message": message }),
        )
    }
}

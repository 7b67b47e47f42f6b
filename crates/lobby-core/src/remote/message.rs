//! Remote invocation payloads
//!
//! Wire shapes for `sys.channelRemote.*` calls and the encoded push envelope.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{LobbyError, LobbyResult, Uid};

/// Namespace of framework-level remote services
pub const SYS_NAMESPACE: &str = "sys";
/// Service that delivers pushes on front-end servers
pub const CHANNEL_REMOTE_SERVICE: &str = "channelRemote";
/// Push to a list of uids on the target server
pub const METHOD_PUSH_MESSAGE: &str = "pushMessage";
/// Push to every session on the target server
pub const METHOD_BROADCAST: &str = "broadcast";

/// Kind of push being delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PushKind {
    #[default]
    Push,
    Broadcast,
}

/// Options travelling with a push
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushOptions {
    #[serde(rename = "type", default)]
    pub kind: PushKind,
    /// Options supplied by application code, passed through untouched
    #[serde(default)]
    pub user_options: Map<String, Value>,
    /// Broadcast only to sessions bound to a uid
    #[serde(default)]
    pub binded: bool,
    /// Parameter for the broadcast filter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_param: Option<Value>,
}

impl PushOptions {
    /// Options for a grouped uid push
    #[must_use]
    pub fn push(user_options: Map<String, Value>) -> Self {
        Self {
            kind: PushKind::Push,
            user_options,
            binded: false,
            filter_param: None,
        }
    }

    /// Options for a broadcast; lifts `binded` and `filterParam` out of the user options
    #[must_use]
    pub fn broadcast(user_options: Map<String, Value>) -> Self {
        let binded = user_options
            .get("binded")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let filter_param = user_options.get("filterParam").cloned();
        Self {
            kind: PushKind::Broadcast,
            user_options,
            binded,
            filter_param,
        }
    }

    pub fn is_broadcast(&self) -> bool {
        self.kind == PushKind::Broadcast
    }
}

/// A remote invocation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcMessage {
    pub namespace: String,
    pub service: String,
    pub method: String,
    #[serde(default)]
    pub args: Vec<Value>,
}

/// A decoded `sys.channelRemote` call
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelRemoteCall {
    PushMessage {
        route: String,
        msg: Value,
        uids: Vec<Uid>,
        opts: PushOptions,
    },
    Broadcast {
        route: String,
        msg: Value,
        opts: PushOptions,
    },
}

impl RpcMessage {
    /// Build a `sys.channelRemote.pushMessage` call
    pub fn push_message(
        route: &str,
        msg: &Value,
        uids: &[Uid],
        opts: &PushOptions,
    ) -> LobbyResult<Self> {
        Ok(Self::channel_remote(
            METHOD_PUSH_MESSAGE,
            vec![
                Value::from(route),
                msg.clone(),
                serde_json::to_value(uids)?,
                serde_json::to_value(opts)?,
            ],
        ))
    }

    /// Build a `sys.channelRemote.broadcast` call
    pub fn broadcast(route: &str, msg: &Value, opts: &PushOptions) -> LobbyResult<Self> {
        Ok(Self::channel_remote(
            METHOD_BROADCAST,
            vec![Value::from(route), msg.clone(), serde_json::to_value(opts)?],
        ))
    }

    fn channel_remote(method: &str, args: Vec<Value>) -> Self {
        Self {
            namespace: SYS_NAMESPACE.to_string(),
            service: CHANNEL_REMOTE_SERVICE.to_string(),
            method: method.to_string(),
            args,
        }
    }

    /// Decode into a channel remote call
    pub fn into_channel_call(self) -> LobbyResult<ChannelRemoteCall> {
        if self.namespace != SYS_NAMESPACE || self.service != CHANNEL_REMOTE_SERVICE {
            return Err(LobbyError::Validation(format!(
                "unknown remote service: {}.{}",
                self.namespace, self.service
            )));
        }

        let method = self.method;
        let mut args = self.args.into_iter();
        let mut next = |name: &str| {
            args.next().ok_or_else(|| {
                LobbyError::Validation(format!("{method}: missing argument `{name}`"))
            })
        };

        match method.as_str() {
            METHOD_PUSH_MESSAGE => {
                let route = serde_json::from_value(next("route")?)?;
                let msg = next("msg")?;
                let uids = serde_json::from_value(next("uids")?)?;
                let opts = serde_json::from_value(next("opts")?)?;
                Ok(ChannelRemoteCall::PushMessage {
                    route,
                    msg,
                    uids,
                    opts,
                })
            }
            METHOD_BROADCAST => {
                let route = serde_json::from_value(next("route")?)?;
                let msg = next("msg")?;
                let opts = serde_json::from_value(next("opts")?)?;
                Ok(ChannelRemoteCall::Broadcast { route, msg, opts })
            }
            other => Err(LobbyError::Validation(format!(
                "unknown channelRemote method: {other}"
            ))),
        }
    }
}

/// Encode a push into the bytes handed to transports
pub fn encode_push(route: &str, msg: &Value) -> LobbyResult<Bytes> {
    let envelope = serde_json::json!({ "route": route, "body": msg });
    Ok(Bytes::from(serde_json::to_vec(&envelope)?))
}

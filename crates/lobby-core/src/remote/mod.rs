//! Front-end side of cluster pushes
//!
//! Payload types for `sys.channelRemote` invocations and the local handler that
//! resolves them into sessions and hands them to the push scheduler.

mod message;
mod push_handler;

pub use message::{
    encode_push, ChannelRemoteCall, PushKind, PushOptions, RpcMessage, CHANNEL_REMOTE_SERVICE,
    METHOD_BROADCAST, METHOD_PUSH_MESSAGE, SYS_NAMESPACE,
};
pub use push_handler::{BroadcastFilter, PushHandler};

//! # lobby-core
//!
//! Connection identity and group messaging for a cluster of front-end servers.
//!
//! - [`SessionRegistry`] tracks which user owns which live connection in this process.
//! - [`ChannelService`] groups users into named channels that span many front-end servers.
//! - The fan-out protocol ([`fanout`]) dispatches one push per owning server and aggregates
//!   the outcomes into a single result.
//! - [`PushScheduler`] decides how and when resolved sessions actually receive bytes.
//!
//! Transport framing, remote invocation mechanics, and persistence are collaborators
//! expressed as traits in [`traits`].

pub mod channel;
pub mod defer;
pub mod error;
pub mod fanout;
pub mod remote;
pub mod scheduler;
pub mod session;
pub mod store;
pub mod traits;

#[cfg(test)]
mod testing;

/// Connection-scoped session identifier, unique per process.
pub type SessionId = u64;

/// Application-level user identifier.
pub type Uid = String;

/// Identifier of a server process in the cluster.
pub type ServerId = String;

pub use channel::{
    Channel, ChannelService, ChannelServiceBuilder, ChannelState, Member, RestoreFailure,
    RestoreReport,
};
pub use error::{LobbyError, LobbyResult};
pub use fanout::{fan_out, FanoutLatch, FanoutTarget, GroupDispatcher};
pub use remote::{
    encode_push, BroadcastFilter, ChannelRemoteCall, PushHandler, PushKind, PushOptions,
    RpcMessage, CHANNEL_REMOTE_SERVICE, METHOD_BROADCAST, METHOD_PUSH_MESSAGE, SYS_NAMESPACE,
};
pub use scheduler::{
    BufferedConfig, BufferedScheduler, DirectScheduler, PushBatch, PushScheduler,
    SchedulerSelector, SelectableScheduler,
};
pub use session::{
    ExportedSession, FrontendSessionView, Session, SessionEvent, SessionRegistry,
    SessionRegistryConfig, SessionState,
};
pub use store::MemoryStore;
pub use traits::{ChannelStore, RemoteInvoker, ServerDirectory, ServerInfo, StaticDirectory, Transport};

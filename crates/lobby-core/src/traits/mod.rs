//! Collaborator traits (ports)
//!
//! The core defines what it needs from the outside world; the gateway and cache
//! crates provide the implementations.

mod directory;
mod invoker;
mod store;
mod transport;

pub use directory::{ServerDirectory, ServerInfo, StaticDirectory};
pub use invoker::RemoteInvoker;
pub use store::ChannelStore;
pub use transport::Transport;

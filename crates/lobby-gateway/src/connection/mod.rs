//! Per-connection plumbing

mod transport;

pub use transport::{WsTransport, MESSAGE_BUFFER_SIZE};

//! Per-connection transport

use bytes::Bytes;
use std::net::SocketAddr;

/// The byte pipe behind one session.
///
/// Owned by the connection handler; a [`Session`](crate::Session) only keeps a
/// shared reference to it. All methods are fire-and-forget.
pub trait Transport: Send + Sync {
    /// Queue one encoded message for the client
    fn send(&self, message: Bytes);

    /// Queue several encoded messages as one write
    fn send_batch(&self, messages: Vec<Bytes>);

    /// Close the underlying connection
    fn disconnect(&self);

    /// Remote address of the client, if known
    fn remote_addr(&self) -> Option<SocketAddr> {
        None
    }
}

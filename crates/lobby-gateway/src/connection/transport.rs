//! WebSocket-backed transport
//!
//! Bridges the synchronous [`Transport`] calls made by sessions and schedulers
//! to the task that owns the socket's write half.

use bytes::Bytes;
use lobby_core::Transport;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::Notify;

/// Channel buffer size for outgoing writes
pub const MESSAGE_BUFFER_SIZE: usize = 256;

/// Outbound half of one WebSocket connection
///
/// Each queued item is one write: a single message or a whole batch.
#[derive(Debug)]
pub struct WsTransport {
    sender: mpsc::Sender<Vec<Bytes>>,
    close: Arc<Notify>,
    remote_addr: Option<SocketAddr>,
}

impl WsTransport {
    /// Create a transport and the receiving ends the socket task drives
    pub fn channel(
        remote_addr: Option<SocketAddr>,
    ) -> (Self, mpsc::Receiver<Vec<Bytes>>, Arc<Notify>) {
        let (sender, receiver) = mpsc::channel(MESSAGE_BUFFER_SIZE);
        let close = Arc::new(Notify::new());
        let transport = Self {
            sender,
            close: close.clone(),
            remote_addr,
        };
        (transport, receiver, close)
    }

    fn enqueue(&self, messages: Vec<Bytes>) {
        match self.sender.try_send(messages) {
            Ok(()) => {}
            Err(TrySendError::Full(dropped)) => {
                tracing::warn!(
                    dropped = dropped.len(),
                    remote_addr = ?self.remote_addr,
                    "Outbound buffer full, dropping messages"
                );
            }
            Err(TrySendError::Closed(_)) => {
                tracing::trace!(remote_addr = ?self.remote_addr, "Write to closed connection");
            }
        }
    }
}

impl Transport for WsTransport {
    fn send(&self, message: Bytes) {
        self.enqueue(vec![message]);
    }

    fn send_batch(&self, messages: Vec<Bytes>) {
        if !messages.is_empty() {
            self.enqueue(messages);
        }
    }

    fn disconnect(&self) {
        // notify_one keeps a permit if the writer is not waiting yet
        self.close.notify_one();
    }

    fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }
}

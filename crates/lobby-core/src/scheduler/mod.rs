//! Push scheduling
//!
//! The boundary between "these sessions should receive this encoded message"
//! and "how and when the bytes leave the process".

mod buffered;
mod direct;
mod selectable;

pub use buffered::{BufferedConfig, BufferedScheduler};
pub use direct::DirectScheduler;
pub use selectable::{SchedulerSelector, SelectableScheduler};

use async_trait::async_trait;
use bytes::Bytes;

use crate::remote::PushOptions;
use crate::{LobbyResult, SessionId};

/// One resolved push waiting for delivery
#[derive(Debug, Clone)]
pub struct PushBatch {
    /// Request id for tracing; 0 for server-initiated pushes
    pub request_id: u64,
    /// Route the message was pushed on
    pub route: String,
    /// Encoded message, shared by every recipient
    pub message: Bytes,
    /// Recipient sessions
    pub session_ids: Vec<SessionId>,
    /// Push options
    pub options: PushOptions,
}

/// Delivery policy for resolved pushes
///
/// `schedule` resolves once the batch has been handed off, not once it has
/// reached the network. Sessions that no longer exist are skipped.
#[async_trait]
pub trait PushScheduler: Send + Sync {
    async fn schedule(&self, batch: PushBatch) -> LobbyResult<()>;

    /// Start background work (flush loops)
    async fn start(&self) {}

    /// Stop background work and hand off anything pending
    async fn stop(&self) {}
}

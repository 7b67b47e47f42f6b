//! Direct scheduler: every recipient is written immediately

use async_trait::async_trait;

use super::{PushBatch, PushScheduler};
use crate::defer::next_tick;
use crate::session::SessionRegistry;
use crate::LobbyResult;

/// Sends each message straight to each session's transport
#[derive(Debug, Clone)]
pub struct DirectScheduler {
    sessions: SessionRegistry,
}

impl DirectScheduler {
    #[must_use]
    pub fn new(sessions: SessionRegistry) -> Self {
        Self { sessions }
    }
}

#[async_trait]
impl PushScheduler for DirectScheduler {
    async fn schedule(&self, batch: PushBatch) -> LobbyResult<()> {
        let mut delivered = 0usize;
        for sid in &batch.session_ids {
            if self.sessions.send_message(*sid, batch.message.clone()) {
                delivered += 1;
            }
        }

        tracing::trace!(
            request_id = batch.request_id,
            route = %batch.route,
            delivered,
            "Direct push handed off"
        );

        next_tick().await;
        Ok(())
    }
}

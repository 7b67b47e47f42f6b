//! Gateway state
//!
//! Application state for the gateway server.

use lobby_common::{AppConfig, AppResult};
use lobby_core::{ChannelService, PushHandler, PushScheduler, RestoreReport, SessionId, SessionRegistry};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Gateway application state
///
/// Holds all shared dependencies for the gateway server.
#[derive(Clone)]
pub struct GatewayState {
    /// Sessions of this process
    sessions: SessionRegistry,
    /// Channels owned by this server
    channels: ChannelService,
    /// Target of local and inbound pushes
    push_handler: Arc<PushHandler>,
    /// Delivery policy shared by every push
    scheduler: Arc<dyn PushScheduler>,
    /// Application configuration
    config: Arc<AppConfig>,
    /// Last allocated session id
    session_seq: Arc<AtomicU64>,
}

impl GatewayState {
    /// Create a new gateway state
    pub fn new(
        sessions: SessionRegistry,
        channels: ChannelService,
        push_handler: Arc<PushHandler>,
        scheduler: Arc<dyn PushScheduler>,
        config: AppConfig,
    ) -> Self {
        Self {
            sessions,
            channels,
            push_handler,
            scheduler,
            config: Arc::new(config),
            session_seq: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Get the session registry
    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    /// Get the channel service
    pub fn channels(&self) -> &ChannelService {
        &self.channels
    }

    /// Get the local push handler
    pub fn push_handler(&self) -> &PushHandler {
        &self.push_handler
    }

    /// Get the push scheduler
    pub fn scheduler(&self) -> &Arc<dyn PushScheduler> {
        &self.scheduler
    }

    /// Get the application configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Allocate the id for a new connection. Ids start at 1 and only grow.
    pub fn next_session_id(&self) -> SessionId {
        self.session_seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Restore persisted channels, then start the scheduler
    pub async fn start(&self) -> AppResult<RestoreReport> {
        let report = self.channels.start().await?;
        for failure in &report.failed {
            tracing::warn!(
                channel = %failure.channel,
                error = %failure.error,
                "Channel restored without members"
            );
        }

        self.scheduler.start().await;
        Ok(report)
    }

    /// Stop the scheduler (flushing pending pushes) and drain queued store writes
    pub async fn shutdown(&self) {
        self.scheduler.stop().await;
        self.channels.sync_store().await;
        tracing::info!(
            sessions = self.sessions.sessions_count(),
            channels = self.channels.channel_count(),
            "Gateway state shut down"
        );
    }
}

impl std::fmt::Debug for GatewayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayState")
            .field("sessions", &self.sessions)
            .field("channels", &self.channels)
            .field("config", &"AppConfig")
            .finish()
    }
}

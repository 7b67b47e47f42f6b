//! Local push handler
//!
//! Target of every fan-out dispatch that lands on this front-end server,
//! whether called directly or through an inbound remote invocation.

use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::{encode_push, ChannelRemoteCall, PushOptions, RpcMessage};
use crate::defer::next_tick;
use crate::scheduler::{PushBatch, PushScheduler};
use crate::session::{Session, SessionRegistry};
use crate::{LobbyError, LobbyResult, SessionId, Uid};

/// Decides whether a session receives a broadcast, given the caller's filter parameter
pub type BroadcastFilter = Arc<dyn Fn(&Session, Option<&Value>) -> bool + Send + Sync>;

/// Resolves uids and broadcasts into session ids and schedules delivery
pub struct PushHandler {
    sessions: SessionRegistry,
    scheduler: Arc<dyn PushScheduler>,
    broadcast_filter: Option<BroadcastFilter>,
    request_seq: AtomicU64,
}

impl PushHandler {
    #[must_use]
    pub fn new(sessions: SessionRegistry, scheduler: Arc<dyn PushScheduler>) -> Self {
        Self {
            sessions,
            scheduler,
            broadcast_filter: None,
            request_seq: AtomicU64::new(0),
        }
    }

    /// Install a filter applied to every broadcast recipient
    #[must_use]
    pub fn with_broadcast_filter(mut self, filter: BroadcastFilter) -> Self {
        self.broadcast_filter = Some(filter);
        self
    }

    /// The session registry this handler resolves against
    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    fn next_request_id(&self) -> u64 {
        self.request_seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Push to the sessions of the given uids. Returns uids with no live session.
    pub async fn push_message(
        &self,
        route: &str,
        msg: &Value,
        uids: &[Uid],
        opts: &PushOptions,
    ) -> LobbyResult<Vec<Uid>> {
        if msg.is_null() {
            next_tick().await;
            return Err(LobbyError::Validation("can not send empty message".to_string()));
        }

        let mut failed = Vec::new();
        let mut session_ids = Vec::new();
        for uid in uids {
            let sessions = self.sessions.get_by_uid(uid);
            if sessions.is_empty() {
                failed.push(uid.clone());
            } else {
                session_ids.extend(sessions.iter().map(|s| s.id()));
            }
        }

        if !failed.is_empty() {
            tracing::debug!(route = %route, failed = failed.len(), "Some uids are not online");
        }

        self.schedule(route, msg, session_ids, opts).await?;

        Ok(failed)
    }

    /// Push to every session here, or only bound sessions when `opts.binded`
    pub async fn broadcast(&self, route: &str, msg: &Value, opts: &PushOptions) -> LobbyResult<()> {
        if msg.is_null() {
            next_tick().await;
            return Err(LobbyError::Validation("can not send empty message".to_string()));
        }

        let candidates = if opts.binded {
            self.sessions.bound_sessions()
        } else {
            self.sessions.sessions()
        };

        let session_ids: Vec<SessionId> = candidates
            .iter()
            .filter(|session| {
                self.broadcast_filter
                    .as_ref()
                    .is_none_or(|filter| filter(session, opts.filter_param.as_ref()))
            })
            .map(|session| session.id())
            .collect();

        self.schedule(route, msg, session_ids, opts).await
    }

    async fn schedule(
        &self,
        route: &str,
        msg: &Value,
        session_ids: Vec<SessionId>,
        opts: &PushOptions,
    ) -> LobbyResult<()> {
        let batch = PushBatch {
            request_id: self.next_request_id(),
            route: route.to_string(),
            message: encode_push(route, msg)?,
            session_ids,
            options: opts.clone(),
        };

        tracing::trace!(
            request_id = batch.request_id,
            route = %route,
            recipients = batch.session_ids.len(),
            "Scheduling push"
        );

        self.scheduler.schedule(batch).await
    }

    /// Serve an inbound remote invocation. The reply is the list of failed uids.
    pub async fn handle(&self, message: RpcMessage) -> LobbyResult<Value> {
        let call = match message.into_channel_call() {
            Ok(call) => call,
            Err(e) => {
                next_tick().await;
                return Err(e);
            }
        };

        match call {
            ChannelRemoteCall::PushMessage {
                route,
                msg,
                uids,
                opts,
            } => {
                let failed = self.push_message(&route, &msg, &uids, &opts).await?;
                Ok(serde_json::to_value(failed)?)
            }
            ChannelRemoteCall::Broadcast { route, msg, opts } => {
                self.broadcast(&route, &msg, &opts).await?;
                Ok(Value::Array(Vec::new()))
            }
        }
    }
}

impl std::fmt::Debug for PushHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushHandler")
            .field("sessions", &self.sessions)
            .field("broadcast_filter", &self.broadcast_filter.is_some())
            .finish()
    }
}

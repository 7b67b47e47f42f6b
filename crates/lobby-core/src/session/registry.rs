//! Session registry
//!
//! Owns every session in this process and the uid → sessions index.
//!
//! Both maps live behind one lock so that bind, unbind, remove and close are
//! each applied as a single step. A close always wins over a bind that is
//! still in flight: the bind re-checks the session under the lock after its
//! deferral point and fails once the session is gone or closed.

use bytes::Bytes;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::broadcast;

use super::{ExportedSession, FrontendSessionView, Session};
use crate::defer::{defer, next_tick};
use crate::traits::Transport;
use crate::{LobbyError, LobbyResult, SessionId, Uid};

/// Default capacity of the session event channel
const EVENT_BUFFER: usize = 1024;

/// Reason recorded when a session is kicked by id
const KICK_REASON: &str = "kick";

/// Notifications emitted by the registry
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A session was bound to a uid
    Bound { sid: SessionId, uid: Uid },
    /// A session was unbound from a uid
    Unbound { sid: SessionId, uid: Uid },
    /// A session reached its terminal state
    Closed {
        session: ExportedSession,
        reason: String,
    },
}

/// Session registry configuration
#[derive(Debug, Clone)]
pub struct SessionRegistryConfig {
    /// Allow at most one bound session per uid
    pub single_session: bool,
    /// Capacity of the event channel
    pub event_buffer: usize,
}

impl Default for SessionRegistryConfig {
    fn default() -> Self {
        Self {
            single_session: false,
            event_buffer: EVENT_BUFFER,
        }
    }
}

#[derive(Default)]
struct RegistryState {
    sessions: HashMap<SessionId, Arc<Session>>,
    uid_map: HashMap<Uid, Vec<Arc<Session>>>,
}

impl RegistryState {
    fn detach_uid(&mut self, uid: &str, sid: SessionId) {
        if let Some(sessions) = self.uid_map.get_mut(uid) {
            sessions.retain(|s| s.id() != sid);
            if sessions.is_empty() {
                self.uid_map.remove(uid);
            }
        }
    }
}

struct RegistryInner {
    single_session: bool,
    state: Mutex<RegistryState>,
    events: broadcast::Sender<SessionEvent>,
}

/// Registry of all sessions in this process
///
/// Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct SessionRegistry {
    inner: Arc<RegistryInner>,
}

impl SessionRegistry {
    /// Create a new registry
    #[must_use]
    pub fn new(config: SessionRegistryConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_buffer.max(1));
        Self {
            inner: Arc::new(RegistryInner {
                single_session: config.single_session,
                state: Mutex::new(RegistryState::default()),
                events,
            }),
        }
    }

    /// Check if single-session mode is enabled
    pub fn is_single_session(&self) -> bool {
        self.inner.single_session
    }

    /// Register observers for bind, unbind and close notifications
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    fn emit(&self, event: SessionEvent) {
        // No receivers is fine
        let _ = self.inner.events.send(event);
    }

    /// Create and register a session for a new connection
    ///
    /// The caller guarantees `sid` uniqueness; an existing entry is overwritten.
    pub fn create(
        &self,
        sid: SessionId,
        frontend_id: impl Into<String>,
        transport: Arc<dyn Transport>,
    ) -> Arc<Session> {
        let session = Session::new(sid, frontend_id.into(), transport);
        let replaced = self
            .inner
            .state
            .lock()
            .sessions
            .insert(sid, session.clone());

        if replaced.is_some() {
            tracing::warn!(session_id = sid, "Session id reused, previous entry overwritten");
        }
        tracing::debug!(session_id = sid, "Session created");

        session
    }

    /// Get a session by id
    pub fn get(&self, sid: SessionId) -> Option<Arc<Session>> {
        self.inner.state.lock().sessions.get(&sid).cloned()
    }

    /// Get all sessions bound to a uid (empty if none)
    pub fn get_by_uid(&self, uid: &str) -> Vec<Arc<Session>> {
        self.inner
            .state
            .lock()
            .uid_map
            .get(uid)
            .cloned()
            .unwrap_or_default()
    }

    /// Export a detached view of a session for handler code
    pub fn frontend_session(&self, sid: SessionId) -> Option<FrontendSessionView> {
        self.get(sid)
            .map(|session| FrontendSessionView::new(&session, self.clone()))
    }

    /// Bind a session to a user id
    pub async fn bind(&self, sid: SessionId, uid: impl Into<Uid>) -> LobbyResult<()> {
        let uid = uid.into();
        next_tick().await;

        {
            let mut state = self.inner.state.lock();
            let session = state
                .sessions
                .get(&sid)
                .cloned()
                .ok_or(LobbyError::SessionNotFound(sid))?;

            if session.is_closed() {
                return Err(LobbyError::SessionClosed(sid));
            }

            match session.uid() {
                Some(current) if current == uid => return Ok(()),
                Some(current) => {
                    return Err(LobbyError::AlreadyBound { sid, uid: current });
                }
                None => {}
            }

            if self.inner.single_session
                && state.uid_map.get(&uid).is_some_and(|s| !s.is_empty())
            {
                return Err(LobbyError::SingleSessionConflict(uid));
            }

            state
                .uid_map
                .entry(uid.clone())
                .or_default()
                .push(session.clone());
            session.set_uid(Some(uid.clone()));
        }

        tracing::debug!(session_id = sid, uid = %uid, "Session bound");
        self.emit(SessionEvent::Bound { sid, uid });

        Ok(())
    }

    /// Unbind a session from a user id
    pub async fn unbind(&self, sid: SessionId, uid: impl Into<Uid>) -> LobbyResult<()> {
        let uid = uid.into();
        next_tick().await;

        {
            let mut state = self.inner.state.lock();
            let session = state
                .sessions
                .get(&sid)
                .cloned()
                .ok_or(LobbyError::SessionNotFound(sid))?;

            if session.uid().as_deref() != Some(uid.as_str()) {
                return Err(LobbyError::NotBound { sid, uid });
            }

            state.detach_uid(&uid, sid);
            session.set_uid(None);
        }

        tracing::debug!(session_id = sid, uid = %uid, "Session unbound");
        self.emit(SessionEvent::Unbound { sid, uid });

        Ok(())
    }

    /// Deregister a session from both maps (no-op if absent)
    pub fn remove(&self, sid: SessionId) {
        let mut state = self.inner.state.lock();
        if let Some(session) = state.sessions.remove(&sid) {
            if let Some(uid) = session.uid() {
                state.detach_uid(&uid, sid);
            }
            tracing::debug!(session_id = sid, "Session removed");
        }
    }

    /// Write one setting into a session
    pub async fn import(&self, sid: SessionId, key: &str, value: Value) -> LobbyResult<()> {
        next_tick().await;
        let session = self.get(sid).ok_or(LobbyError::SessionNotFound(sid))?;
        session.set(key, value);
        Ok(())
    }

    /// Write many settings into a session
    pub async fn import_all(
        &self,
        sid: SessionId,
        settings: HashMap<String, Value>,
    ) -> LobbyResult<()> {
        next_tick().await;
        let session = self.get(sid).ok_or(LobbyError::SessionNotFound(sid))?;
        for (key, value) in settings {
            session.set(key, value);
        }
        Ok(())
    }

    /// Close every session bound to `uid`. Returns how many were closed.
    pub async fn kick(&self, uid: &str, reason: &str) -> usize {
        next_tick().await;

        let sessions = self.get_by_uid(uid);
        let closed = sessions
            .iter()
            .filter(|session| self.close_session(session, reason))
            .count();

        if closed > 0 {
            tracing::info!(uid = %uid, reason = %reason, closed, "Kicked user sessions");
        }

        closed
    }

    /// Close one session by id. Returns false if it does not exist.
    pub async fn kick_by_session_id(&self, sid: SessionId) -> bool {
        next_tick().await;

        match self.get(sid) {
            Some(session) => self.close_session(&session, KICK_REASON),
            None => false,
        }
    }

    /// Close a session because its connection went away
    pub fn close(&self, sid: SessionId, reason: &str) -> bool {
        match self.get(sid) {
            Some(session) => self.close_session(&session, reason),
            None => false,
        }
    }

    /// Single terminal transition: deregister, notify, then disconnect on a later step
    fn close_session(&self, session: &Arc<Session>, reason: &str) -> bool {
        if !session.mark_closed() {
            return false;
        }

        let snapshot = session.export();
        self.remove(session.id());

        tracing::debug!(
            session_id = session.id(),
            frontend_id = %session.frontend_id(),
            reason = %reason,
            "Session closed"
        );

        self.emit(SessionEvent::Closed {
            session: snapshot,
            reason: reason.to_string(),
        });

        // Let in-flight sends flush before the socket goes away
        let transport = session.transport();
        defer(move || transport.disconnect());

        true
    }

    /// Hand a message to one session's transport. Returns whether the session exists.
    pub fn send_message(&self, sid: SessionId, message: Bytes) -> bool {
        match self.get(sid) {
            Some(session) => {
                session.send(message);
                true
            }
            None => {
                tracing::debug!(session_id = sid, "Fail to send message for non-existing session");
                false
            }
        }
    }

    /// Hand a message to every session of a uid. Returns whether any exists.
    pub fn send_message_by_uid(&self, uid: &str, message: Bytes) -> bool {
        let sessions = self.get_by_uid(uid);
        if sessions.is_empty() {
            tracing::debug!(uid = %uid, "Fail to send message by uid for non-existing session");
            return false;
        }

        for session in sessions {
            session.send(message.clone());
        }
        true
    }

    /// Remote address of the client behind a session
    pub fn get_client_address(&self, sid: SessionId) -> Option<SocketAddr> {
        self.get(sid).and_then(|session| session.remote_addr())
    }

    /// Snapshot of all sessions
    pub fn sessions(&self) -> Vec<Arc<Session>> {
        self.inner.state.lock().sessions.values().cloned().collect()
    }

    /// Snapshot of all sessions bound to some uid
    pub fn bound_sessions(&self) -> Vec<Arc<Session>> {
        self.inner
            .state
            .lock()
            .uid_map
            .values()
            .flatten()
            .cloned()
            .collect()
    }

    /// Number of sessions in this process
    pub fn sessions_count(&self) -> usize {
        self.inner.state.lock().sessions.len()
    }

    /// Number of distinct bound uids
    pub fn uid_count(&self) -> usize {
        self.inner.state.lock().uid_map.len()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(SessionRegistryConfig::default())
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("SessionRegistry")
            .field("single_session", &self.inner.single_session)
            .field("sessions", &state.sessions.len())
            .field("uids", &state.uid_map.len())
            .finish()
    }
}

//! Individual session
//!
//! Server-side record of one live client connection and its bound user.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use super::ExportedSession;
use crate::traits::Transport;
use crate::{ServerId, SessionId, Uid};

/// Session lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// Connection is live
    Inited,
    /// Terminal: kicked, timed out or disconnected
    Closed,
}

struct SessionInner {
    uid: Option<Uid>,
    settings: HashMap<String, Value>,
    state: SessionState,
}

/// A single client session
///
/// Created and owned by the [`SessionRegistry`](super::SessionRegistry); all
/// identity mutations go through the registry.
pub struct Session {
    id: SessionId,
    frontend_id: ServerId,
    transport: Arc<dyn Transport>,
    inner: Mutex<SessionInner>,
    created_at: DateTime<Utc>,
}

impl Session {
    pub(crate) fn new(
        id: SessionId,
        frontend_id: ServerId,
        transport: Arc<dyn Transport>,
    ) -> Arc<Self> {
        Arc::new(Self {
            id,
            frontend_id,
            transport,
            inner: Mutex::new(SessionInner {
                uid: None,
                settings: HashMap::new(),
                state: SessionState::Inited,
            }),
            created_at: Utc::now(),
        })
    }

    /// Get the session ID
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Get the front-end server that owns the connection
    pub fn frontend_id(&self) -> &str {
        &self.frontend_id
    }

    /// Get the bound user ID
    pub fn uid(&self) -> Option<Uid> {
        self.inner.lock().uid.clone()
    }

    /// Get the current state
    pub fn state(&self) -> SessionState {
        self.inner.lock().state
    }

    /// Check if the session reached its terminal state
    pub fn is_closed(&self) -> bool {
        self.state() == SessionState::Closed
    }

    /// Get a setting value
    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner.lock().settings.get(key).cloned()
    }

    /// Copy of all settings
    pub fn settings(&self) -> HashMap<String, Value> {
        self.inner.lock().settings.clone()
    }

    /// Session creation time
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Remote address of the client
    pub fn remote_addr(&self) -> Option<std::net::SocketAddr> {
        self.transport.remote_addr()
    }

    /// Snapshot of the exported fields, with settings copied by value
    pub fn export(&self) -> ExportedSession {
        let inner = self.inner.lock();
        ExportedSession {
            id: self.id,
            frontend_id: self.frontend_id.clone(),
            uid: inner.uid.clone(),
            settings: inner.settings.clone(),
        }
    }

    /// Send one message to the client
    pub fn send(&self, message: Bytes) {
        self.transport.send(message);
    }

    /// Send several messages to the client in one write
    pub fn send_batch(&self, messages: Vec<Bytes>) {
        self.transport.send_batch(messages);
    }

    pub(crate) fn set(&self, key: impl Into<String>, value: Value) {
        self.inner.lock().settings.insert(key.into(), value);
    }

    pub(crate) fn set_uid(&self, uid: Option<Uid>) {
        self.inner.lock().uid = uid;
    }

    /// Move to `Closed`. Returns false if it was already closed.
    pub(crate) fn mark_closed(&self) -> bool {
        let mut inner = self.inner.lock();
        if inner.state == SessionState::Closed {
            return false;
        }
        inner.state = SessionState::Closed;
        true
    }

    pub(crate) fn transport(&self) -> Arc<dyn Transport> {
        self.transport.clone()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("frontend_id", &self.frontend_id)
            .field("uid", &inner.uid)
            .field("state", &inner.state)
            .field("created_at", &self.created_at)
            .finish()
    }
}

//! Frontend session view
//!
//! Detached copy of a session handed to handler code. Local edits stay in the
//! copy until they are written back through the registry.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use super::{Session, SessionRegistry};
use crate::{LobbyResult, SessionId, Uid};

/// Serializable export of a session's public fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedSession {
    pub id: SessionId,
    pub frontend_id: String,
    pub uid: Option<Uid>,
    #[serde(default)]
    pub settings: HashMap<String, Value>,
}

/// Snapshot of a [`Session`] with write-back operations
pub struct FrontendSessionView {
    id: SessionId,
    frontend_id: String,
    uid: Option<Uid>,
    settings: HashMap<String, Value>,
    registry: SessionRegistry,
}

impl FrontendSessionView {
    pub(crate) fn new(session: &Session, registry: SessionRegistry) -> Self {
        let exported = session.export();
        Self {
            id: exported.id,
            frontend_id: exported.frontend_id,
            uid: exported.uid,
            settings: exported.settings,
            registry,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn frontend_id(&self) -> &str {
        &self.frontend_id
    }

    pub fn uid(&self) -> Option<&str> {
        self.uid.as_deref()
    }

    /// Read a setting from the local copy
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.settings.get(key)
    }

    /// Write a setting into the local copy only
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.settings.insert(key.into(), value);
    }

    /// Bind the underlying session, then record the uid locally
    pub async fn bind(&mut self, uid: impl Into<Uid>) -> LobbyResult<()> {
        let uid = uid.into();
        self.registry.bind(self.id, uid.clone()).await?;
        self.uid = Some(uid);
        Ok(())
    }

    /// Unbind the underlying session, then clear the uid locally
    pub async fn unbind(&mut self, uid: impl Into<Uid>) -> LobbyResult<()> {
        self.registry.unbind(self.id, uid).await?;
        self.uid = None;
        Ok(())
    }

    /// Write one local setting back to the session
    pub async fn push(&self, key: &str) -> LobbyResult<()> {
        let value = self.settings.get(key).cloned().unwrap_or(Value::Null);
        self.registry.import(self.id, key, value).await
    }

    /// Write every local setting back to the session
    pub async fn push_all(&self) -> LobbyResult<()> {
        self.registry
            .import_all(self.id, self.settings.clone())
            .await
    }

    /// Serializable export of this view
    pub fn export(&self) -> ExportedSession {
        ExportedSession {
            id: self.id,
            frontend_id: self.frontend_id.clone(),
            uid: self.uid.clone(),
            settings: self.settings.clone(),
        }
    }
}

impl std::fmt::Debug for FrontendSessionView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrontendSessionView")
            .field("id", &self.id)
            .field("frontend_id", &self.frontend_id)
            .field("uid", &self.uid)
            .field("settings", &self.settings.len())
            .finish()
    }
}

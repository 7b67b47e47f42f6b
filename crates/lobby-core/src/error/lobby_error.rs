//! Lobby errors - the failure taxonomy shared by sessions, channels and fan-out

use thiserror::Error;

use crate::{ServerId, SessionId, Uid};

/// Result type for lobby operations
pub type LobbyResult<T> = Result<T, LobbyError>;

/// Lobby core errors
#[derive(Debug, Error)]
pub enum LobbyError {
    // =========================================================================
    // Validation Errors
    // =========================================================================
    #[error("Validation error: {0}")]
    Validation(String),

    // =========================================================================
    // State Errors
    // =========================================================================
    #[error("Session {sid} has already bound with {uid}")]
    AlreadyBound { sid: SessionId, uid: Uid },

    #[error("Single session is enabled and uid {0} is already bound")]
    SingleSessionConflict(Uid),

    #[error("Session {sid} is not bound with {uid}")]
    NotBound { sid: SessionId, uid: Uid },

    #[error("Session is closed: {0}")]
    SessionClosed(SessionId),

    #[error("Channel is not running: {0}")]
    ChannelDestroyed(String),

    // =========================================================================
    // Not Found Errors
    // =========================================================================
    #[error("Session does not exist: {0}")]
    SessionNotFound(SessionId),

    #[error("Channel not found: {0}")]
    ChannelNotFound(String),

    #[error("Server not found: {0}")]
    ServerNotFound(ServerId),

    // =========================================================================
    // Aggregate Errors
    // =========================================================================
    #[error("All {attempted} push targets failed")]
    AllTargetsFailed { attempted: usize },

    // =========================================================================
    // Transport Errors (opaque, from collaborators)
    // =========================================================================
    #[error("Remote invocation failed: {0}")]
    Rpc(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Encoding error: {0}")]
    Encode(#[from] serde_json::Error),
}

impl LobbyError {
    /// Get an error code string for logs and RPC responses
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION",
            Self::AlreadyBound { .. } => "ALREADY_BOUND",
            Self::SingleSessionConflict(_) => "SINGLE_SESSION_CONFLICT",
            Self::NotBound { .. } => "NOT_BOUND",
            Self::SessionClosed(_) => "SESSION_CLOSED",
            Self::ChannelDestroyed(_) => "CHANNEL_DESTROYED",
            Self::SessionNotFound(_) => "UNKNOWN_SESSION",
            Self::ChannelNotFound(_) => "UNKNOWN_CHANNEL",
            Self::ServerNotFound(_) => "UNKNOWN_SERVER",
            Self::AllTargetsFailed { .. } => "ALL_TARGETS_FAILED",
            Self::Rpc(_) => "RPC_ERROR",
            Self::Store(_) => "STORE_ERROR",
            Self::Encode(_) => "ENCODE_ERROR",
        }
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Check if this is a state error (conflicting bind, closed session, destroyed channel)
    pub fn is_state(&self) -> bool {
        matches!(
            self,
            Self::AlreadyBound { .. }
                | Self::SingleSessionConflict(_)
                | Self::NotBound { .. }
                | Self::SessionClosed(_)
                | Self::ChannelDestroyed(_)
        )
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::SessionNotFound(_) | Self::ChannelNotFound(_) | Self::ServerNotFound(_)
        )
    }

    /// Check if this error came from a collaborator (RPC, store, encoding)
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Rpc(_) | Self::Store(_) | Self::Encode(_))
    }
}

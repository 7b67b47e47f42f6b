//! Handler error types

use lobby_core::LobbyError;
use thiserror::Error;

/// Handler error type
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Frame could not be parsed
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// Session registry rejected the operation
    #[error(transparent)]
    Lobby(#[from] LobbyError),
}

impl HandlerError {
    /// Stable code sent back to the client
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidPayload(_) => "INVALID_PAYLOAD",
            Self::Lobby(e) => e.code(),
        }
    }

    /// Whether the connection can no longer be used
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Lobby(LobbyError::SessionClosed(_) | LobbyError::SessionNotFound(_))
        )
    }
}

/// Handler result type
pub type HandlerResult<T> = Result<T, HandlerError>;

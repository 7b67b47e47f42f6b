//! Process-level errors
//!
//! Everything a gateway can fail with outside the lobby core itself, plus the
//! mapping of core failures onto HTTP replies for peers.

use lobby_core::LobbyError;
use serde::Serialize;

use crate::config::ConfigError;

/// Gateway process error
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Missing or malformed settings
    #[error("Configuration error: {0}")]
    Config(String),

    /// Redis pool could not be created
    #[error("Cache error: {0}")]
    Cache(String),

    /// Listener or HTTP client setup failed
    #[error("Server error: {0}")]
    Server(String),

    #[error(transparent)]
    Lobby(#[from] LobbyError),
}

impl AppError {
    /// HTTP status used when this error answers a peer's invocation
    #[must_use]
    pub fn status_code(&self) -> u16 {
        let Self::Lobby(e) = self else {
            return 500;
        };

        if e.is_validation() {
            400
        } else if e.is_not_found() {
            404
        } else if e.is_state() {
            409
        } else if matches!(e, LobbyError::Rpc(_) | LobbyError::AllTargetsFailed { .. }) {
            502
        } else {
            500
        }
    }

    /// Stable code for replies and logs
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG_ERROR",
            Self::Cache(_) => "CACHE_ERROR",
            Self::Server(_) => "SERVER_ERROR",
            Self::Lobby(e) => e.code(),
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

/// JSON body of a failed invocation
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl From<&AppError> for ErrorResponse {
    fn from(err: &AppError) -> Self {
        Self {
            code: err.error_code().to_string(),
            message: err.to_string(),
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;

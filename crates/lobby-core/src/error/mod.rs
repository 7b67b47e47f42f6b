//! Error types for the lobby core

mod lobby_error;

pub use lobby_error::{LobbyError, LobbyResult};

//! Channel membership persistence

use async_trait::async_trait;

use crate::LobbyResult;

/// String-keyed multi-map used to persist and restore channel membership.
///
/// Keys follow `{prefix}:{serverId}[:{channelName}]`, membership values follow
/// `{sid}:{uid}`.
#[async_trait]
pub trait ChannelStore: Send + Sync {
    /// Add `value` under `key`
    async fn add(&self, key: &str, value: &str) -> LobbyResult<()>;

    /// Remove one `value` from `key`
    async fn remove(&self, key: &str, value: &str) -> LobbyResult<()>;

    /// Remove `key` and every value under it
    async fn remove_all(&self, key: &str) -> LobbyResult<()>;

    /// Load every value under `key` (empty when the key is unknown)
    async fn load(&self, key: &str) -> LobbyResult<Vec<String>>;
}

//! Redis channel store
//!
//! Each persisted key is a Redis set: `add` is `SADD`, `remove` is `SREM`,
//! `remove_all` is `DEL` and `load` is `SMEMBERS`.

use async_trait::async_trait;
use lobby_core::{ChannelStore, LobbyError, LobbyResult};

use crate::pool::{RedisPool, RedisPoolError};

fn store_error(err: RedisPoolError) -> LobbyError {
    LobbyError::Store(err.to_string())
}

/// [`ChannelStore`] backed by Redis sets
#[derive(Debug, Clone)]
pub struct RedisChannelStore {
    pool: RedisPool,
}

impl RedisChannelStore {
    #[must_use]
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &RedisPool {
        &self.pool
    }
}

#[async_trait]
impl ChannelStore for RedisChannelStore {
    async fn add(&self, key: &str, value: &str) -> LobbyResult<()> {
        self.pool
            .set_add(key, value)
            .await
            .map(|_| ())
            .map_err(store_error)
    }

    async fn remove(&self, key: &str, value: &str) -> LobbyResult<()> {
        self.pool
            .set_remove(key, value)
            .await
            .map(|_| ())
            .map_err(store_error)
    }

    async fn remove_all(&self, key: &str) -> LobbyResult<()> {
        self.pool.delete(key).await.map(|_| ()).map_err(store_error)
    }

    async fn load(&self, key: &str) -> LobbyResult<Vec<String>> {
        self.pool.set_members(key).await.map_err(store_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::RedisPoolConfig;

    #[tokio::test]
    async fn test_unreachable_redis_maps_to_store_error() {
        let pool = RedisPool::new(RedisPoolConfig {
            url: "redis://127.0.0.1:1".to_string(),
            max_connections: 1,
        })
        .unwrap();
        let store = RedisChannelStore::new(pool);

        let err = store.load("channel:chat-1").await.unwrap_err();
        assert!(err.is_transport());
        assert_eq!(err.code(), "STORE_ERROR");
    }
}

//! deadpool-backed Redis pool
//!
//! Wraps a [`deadpool_redis::Pool`] and exposes the handful of set commands
//! channel persistence is built on.

use deadpool_redis::{Config, Pool, PoolConfig, Runtime};
use redis::AsyncCommands;

/// Where to connect and how many connections to keep
#[derive(Debug, Clone)]
pub struct RedisPoolConfig {
    pub url: String,
    pub max_connections: usize,
}

impl Default for RedisPoolConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            max_connections: 16,
        }
    }
}

impl From<&lobby_common::RedisConfig> for RedisPoolConfig {
    fn from(config: &lobby_common::RedisConfig) -> Self {
        Self {
            url: config.url.clone(),
            max_connections: config.max_connections as usize,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RedisPoolError {
    #[error("Failed to create Redis pool: {0}")]
    CreatePool(#[from] deadpool_redis::CreatePoolError),

    #[error("No Redis connection available: {0}")]
    GetConnection(#[from] deadpool_redis::PoolError),

    #[error("Redis command failed: {0}")]
    Redis(#[from] redis::RedisError),
}

pub type RedisResult<T> = Result<T, RedisPoolError>;

/// Shared handle to the pool; clones use the same connections
#[derive(Clone)]
pub struct RedisPool {
    pool: Pool,
}

impl std::fmt::Debug for RedisPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = self.pool.status();
        f.debug_struct("RedisPool")
            .field("size", &status.size)
            .field("available", &status.available)
            .finish()
    }
}

impl RedisPool {
    /// Build the pool. No connection is opened until first use.
    pub fn new(config: RedisPoolConfig) -> RedisResult<Self> {
        let mut cfg = Config::from_url(config.url.as_str());
        cfg.pool = Some(PoolConfig::new(config.max_connections));
        let pool = cfg.create_pool(Some(Runtime::Tokio1))?;

        // Never log credentials
        let host = config.url.rsplit('@').next().unwrap_or_default();
        tracing::info!(
            host = %host,
            max_connections = config.max_connections,
            "Redis pool created"
        );

        Ok(Self { pool })
    }

    pub fn from_config(config: &lobby_common::RedisConfig) -> RedisResult<Self> {
        Self::new(config.into())
    }

    async fn connection(&self) -> RedisResult<deadpool_redis::Connection> {
        Ok(self.pool.get().await?)
    }

    /// Round-trip a `PING`
    pub async fn health_check(&self) -> RedisResult<()> {
        let mut conn = self.connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    /// `SADD`; true when `member` was new
    pub async fn set_add(&self, key: &str, member: &str) -> RedisResult<bool> {
        let mut conn = self.connection().await?;
        let added: usize = conn.sadd(key, member).await?;
        Ok(added > 0)
    }

    /// `SREM`; true when `member` was present
    pub async fn set_remove(&self, key: &str, member: &str) -> RedisResult<bool> {
        let mut conn = self.connection().await?;
        let removed: usize = conn.srem(key, member).await?;
        Ok(removed > 0)
    }

    /// `SMEMBERS`; a missing key reads as empty
    pub async fn set_members(&self, key: &str) -> RedisResult<Vec<String>> {
        let mut conn = self.connection().await?;
        Ok(conn.smembers(key).await?)
    }

    /// `DEL`; true when the key existed
    pub async fn delete(&self, key: &str) -> RedisResult<bool> {
        let mut conn = self.connection().await?;
        let deleted: usize = conn.del(key).await?;
        Ok(deleted > 0)
    }
}

//! # lobby-cache
//!
//! Redis-backed persistence for channel membership.
//!
//! ## Example
//!
//! ```ignore
//! use lobby_cache::{RedisChannelStore, RedisPool, RedisPoolConfig};
//! use lobby_core::ChannelService;
//!
//! let pool = RedisPool::new(RedisPoolConfig::default())?;
//! let store = Arc::new(RedisChannelStore::new(pool));
//!
//! let channels = ChannelService::builder("chat-1").store(store).build();
//! let report = channels.start().await?;
//! ```

pub mod pool;
pub mod store;

// Re-export pool types
pub use pool::{RedisPool, RedisPoolConfig, RedisPoolError, RedisResult};

// Re-export store types
pub use store::RedisChannelStore;

//! Channel membership store backed by Redis sets

mod redis_store;

pub use redis_store::RedisChannelStore;

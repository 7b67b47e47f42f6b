//! Configuration structs

mod app_config;

pub use app_config::{
    AppConfig, AppSettings, ChannelConfig, ClusterConfig, ConfigError, Environment, PushConfig,
    RedisConfig, RpcConfig, SchedulerKind, ServerConfig, SessionConfig, StoreBackend,
};

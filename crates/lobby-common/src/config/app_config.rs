//! Application configuration structs
//!
//! Loads configuration from environment variables (and a `.env` file when present).

use lobby_core::ServerInfo;
use serde::Deserialize;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub app: AppSettings,
    pub server: ServerConfig,
    pub cluster: ClusterConfig,
    pub session: SessionConfig,
    pub channel: ChannelConfig,
    pub push: PushConfig,
    pub rpc: RpcConfig,
    pub redis: Option<RedisConfig>,
}

/// General application settings
#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default = "default_env")]
    pub env: Environment,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }
}

/// This server process
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub id: String,
    pub server_type: String,
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Base URL peers use to reach this server
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("http://{}", self.address())
    }

    /// Directory entry for this server
    #[must_use]
    pub fn server_info(&self) -> ServerInfo {
        ServerInfo::new(&self.id, &self.server_type, self.endpoint())
    }
}

/// Known servers of the cluster
#[derive(Debug, Clone, Default)]
pub struct ClusterConfig {
    pub servers: Vec<ServerInfo>,
}

impl ClusterConfig {
    /// Parse `id@type@http://host:port` entries separated by commas
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let servers = raw
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(|entry| {
                let mut parts = entry.splitn(3, '@');
                match (parts.next(), parts.next(), parts.next()) {
                    (Some(id), Some(server_type), Some(endpoint))
                        if !id.is_empty() && !server_type.is_empty() && !endpoint.is_empty() =>
                    {
                        Ok(ServerInfo::new(id, server_type, endpoint.trim_end_matches('/')))
                    }
                    _ => Err(ConfigError::InvalidValue(
                        "CLUSTER_SERVERS",
                        entry.to_string(),
                    )),
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { servers })
    }

    /// Every known server, including `local` when it is not listed
    #[must_use]
    pub fn with_local(&self, local: ServerInfo) -> Vec<ServerInfo> {
        let mut servers = self.servers.clone();
        if !servers.iter().any(|s| s.id == local.id) {
            servers.push(local);
        }
        servers
    }
}

/// Session registry configuration
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    /// At most one session per uid
    pub single_session: bool,
}

/// Channel membership persistence backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreBackend {
    #[default]
    None,
    Memory,
    Redis,
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" | "" => Ok(Self::None),
            "memory" => Ok(Self::Memory),
            "redis" => Ok(Self::Redis),
            other => Err(ConfigError::InvalidValue("CHANNEL_STORE", other.to_string())),
        }
    }
}

/// Channel service configuration
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    pub prefix: String,
    pub store: StoreBackend,
}

/// Push scheduling policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchedulerKind {
    #[default]
    Direct,
    Buffered,
}

impl FromStr for SchedulerKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "direct" | "" => Ok(Self::Direct),
            "buffered" => Ok(Self::Buffered),
            other => Err(ConfigError::InvalidValue("PUSH_SCHEDULER", other.to_string())),
        }
    }
}

/// Push scheduler configuration
#[derive(Debug, Clone)]
pub struct PushConfig {
    pub scheduler: SchedulerKind,
    pub flush_interval_ms: u64,
    pub max_batch: usize,
}

impl PushConfig {
    #[must_use]
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }
}

/// Remote invocation configuration
#[derive(Debug, Clone)]
pub struct RpcConfig {
    pub timeout_ms: u64,
}

impl RpcConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Redis configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
    #[serde(default = "default_redis_max_connections")]
    pub max_connections: u32,
}

// Default value functions
fn default_app_name() -> String {
    "lobby".to_string()
}

fn default_env() -> Environment {
    Environment::Development
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_server_type() -> String {
    "connector".to_string()
}

fn default_channel_prefix() -> String {
    lobby_core::channel::DEFAULT_CHANNEL_PREFIX.to_string()
}

fn default_flush_interval_ms() -> u64 {
    20
}

fn default_max_batch() -> usize {
    64
}

fn default_rpc_timeout_ms() -> u64 {
    5000
}

fn default_redis_max_connections() -> u32 {
    10
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if required environment variables are missing or malformed
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from any variable source
    pub fn from_lookup<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let parsed = |key: &'static str| -> Option<String> {
            var(key)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };
        let number = |key: &'static str| -> Result<Option<u64>, ConfigError> {
            parsed(key)
                .map(|s| {
                    s.parse()
                        .map_err(|_| ConfigError::InvalidValue(key, s.clone()))
                })
                .transpose()
        };

        let server = ServerConfig {
            id: parsed("SERVER_ID").ok_or(ConfigError::MissingVar("SERVER_ID"))?,
            server_type: parsed("SERVER_TYPE").unwrap_or_else(default_server_type),
            host: parsed("SERVER_HOST").unwrap_or_else(default_host),
            port: parsed("SERVER_PORT")
                .ok_or(ConfigError::MissingVar("SERVER_PORT"))
                .and_then(|s| {
                    s.parse()
                        .map_err(|_| ConfigError::InvalidValue("SERVER_PORT", s.clone()))
                })?,
        };

        let channel = ChannelConfig {
            prefix: parsed("CHANNEL_PREFIX").unwrap_or_else(default_channel_prefix),
            store: parsed("CHANNEL_STORE")
                .map(|s| s.parse::<StoreBackend>())
                .transpose()?
                .unwrap_or_default(),
        };

        let redis = match parsed("REDIS_URL") {
            Some(url) => Some(RedisConfig {
                url,
                max_connections: number("REDIS_MAX_CONNECTIONS")?
                    .map_or_else(default_redis_max_connections, |n| n as u32),
            }),
            None if channel.store == StoreBackend::Redis => {
                return Err(ConfigError::MissingVar("REDIS_URL"));
            }
            None => None,
        };

        Ok(Self {
            app: AppSettings {
                name: parsed("APP_NAME").unwrap_or_else(default_app_name),
                env: parsed("APP_ENV")
                    .and_then(|s| match s.to_lowercase().as_str() {
                        "production" => Some(Environment::Production),
                        "staging" => Some(Environment::Staging),
                        "development" => Some(Environment::Development),
                        _ => None,
                    })
                    .unwrap_or_default(),
            },
            server,
            cluster: parsed("CLUSTER_SERVERS")
                .map(|s| ClusterConfig::parse(&s))
                .transpose()?
                .unwrap_or_default(),
            session: SessionConfig {
                single_session: parsed("SESSION_SINGLE")
                    .map(|s| parse_bool(&s).ok_or(ConfigError::InvalidValue("SESSION_SINGLE", s)))
                    .transpose()?
                    .unwrap_or(false),
            },
            channel,
            push: PushConfig {
                scheduler: parsed("PUSH_SCHEDULER")
                    .map(|s| s.parse::<SchedulerKind>())
                    .transpose()?
                    .unwrap_or_default(),
                flush_interval_ms: number("PUSH_FLUSH_INTERVAL_MS")?
                    .unwrap_or_else(default_flush_interval_ms),
                max_batch: number("PUSH_MAX_BATCH")?
                    .map_or_else(default_max_batch, |n| n as usize),
            },
            rpc: RpcConfig {
                timeout_ms: number("RPC_TIMEOUT_MS")?.unwrap_or_else(default_rpc_timeout_ms),
            },
            redis,
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}

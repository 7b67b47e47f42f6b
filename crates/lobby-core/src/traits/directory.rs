//! Cluster server directory

use serde::{Deserialize, Serialize};

/// A server process known to the cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInfo {
    /// Unique server ID
    pub id: String,
    /// Server type (e.g. "connector")
    pub server_type: String,
    /// Base URL for remote invocation
    pub endpoint: String,
}

impl ServerInfo {
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        server_type: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            server_type: server_type.into(),
            endpoint: endpoint.into(),
        }
    }
}

/// Lookup of servers by id and by type
pub trait ServerDirectory: Send + Sync {
    /// All servers of the given type
    fn servers_by_type(&self, server_type: &str) -> Vec<ServerInfo>;

    /// A server by id
    fn server(&self, server_id: &str) -> Option<ServerInfo>;
}

/// Directory built from a fixed server list
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    servers: Vec<ServerInfo>,
}

impl StaticDirectory {
    #[must_use]
    pub fn new(servers: Vec<ServerInfo>) -> Self {
        Self { servers }
    }

    /// All known servers
    pub fn servers(&self) -> &[ServerInfo] {
        &self.servers
    }
}

impl ServerDirectory for StaticDirectory {
    fn servers_by_type(&self, server_type: &str) -> Vec<ServerInfo> {
        self.servers
            .iter()
            .filter(|s| s.server_type == server_type)
            .cloned()
            .collect()
    }

    fn server(&self, server_id: &str) -> Option<ServerInfo> {
        self.servers.iter().find(|s| s.id == server_id).cloned()
    }
}

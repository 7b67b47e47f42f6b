//! Test helpers for integration tests
//!
//! Provides utilities for spawning a cluster of gateway servers, attaching
//! clients to them, and waiting on asynchronous outcomes.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use lobby_common::AppConfig;
use lobby_core::{ChannelStore, SessionId};
use lobby_gateway::{assemble_state, create_app, GatewayState};
use reqwest::{Client, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::fixtures::TestClient;

/// Endpoint nothing listens on; invocations to it fail fast
pub const DEAD_ENDPOINT: &str = "http://127.0.0.1:1";

/// One gateway server running in this process
pub struct TestServer {
    pub id: String,
    pub addr: SocketAddr,
    pub state: GatewayState,
    pub client: Client,
    _handle: JoinHandle<()>,
}

impl TestServer {
    /// Get base URL for the server
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Attach a new connection to this server
    pub fn connect(&self) -> (SessionId, Arc<TestClient>) {
        let client = TestClient::new();
        let sid = self.state.next_session_id();
        self.state
            .sessions()
            .create(sid, self.id.clone(), client.clone());
        (sid, client)
    }

    /// Attach a new connection and bind it to `uid`
    pub async fn connect_as(&self, uid: &str) -> Result<(SessionId, Arc<TestClient>)> {
        let (sid, client) = self.connect();
        self.state.sessions().bind(sid, uid).await?;
        Ok((sid, client))
    }

    /// Make a GET request
    pub async fn get(&self, path: &str) -> Result<Response> {
        Ok(self
            .client
            .get(format!("{}{}", self.base_url(), path))
            .send()
            .await?)
    }

    /// Make a POST request with JSON body
    pub async fn post<T: Serialize>(&self, path: &str, body: &T) -> Result<Response> {
        Ok(self
            .client
            .post(format!("{}{}", self.base_url(), path))
            .json(body)
            .send()
            .await?)
    }
}

/// Cluster definition used by [`TestCluster::start_with`]
#[derive(Default)]
pub struct ClusterSpec {
    /// Servers to run
    pub servers: Vec<String>,
    /// Servers listed in the directory but never started
    pub dead: Vec<String>,
    /// Extra environment-style variables applied to every server
    pub vars: Vec<(String, String)>,
    /// Channel store per server id
    pub stores: HashMap<String, Arc<dyn ChannelStore>>,
}

impl ClusterSpec {
    pub fn new(servers: &[&str]) -> Self {
        Self {
            servers: servers.iter().map(ToString::to_string).collect(),
            ..Self::default()
        }
    }

    /// List a server that never answers
    #[must_use]
    pub fn dead(mut self, id: &str) -> Self {
        self.dead.push(id.to_string());
        self
    }

    #[must_use]
    pub fn var(mut self, key: &str, value: &str) -> Self {
        self.vars.push((key.to_string(), value.to_string()));
        self
    }

    #[must_use]
    pub fn store(mut self, id: &str, store: Arc<dyn ChannelStore>) -> Self {
        self.stores.insert(id.to_string(), store);
        self
    }
}

/// Several gateway servers that know each other
pub struct TestCluster {
    pub servers: Vec<TestServer>,
}

impl TestCluster {
    /// Start connector servers with the given ids
    pub async fn start(ids: &[&str]) -> Result<Self> {
        Self::start_with(ClusterSpec::new(ids)).await
    }

    /// Start a cluster described by a [`ClusterSpec`]
    pub async fn start_with(spec: ClusterSpec) -> Result<Self> {
        // Bind first so every server's address is known before configuring any
        let mut listeners = Vec::with_capacity(spec.servers.len());
        for id in &spec.servers {
            let listener = TcpListener::bind("127.0.0.1:0").await?;
            listeners.push((id.clone(), listener.local_addr()?, listener));
        }

        let cluster_servers = listeners
            .iter()
            .map(|(id, addr, _)| format!("{id}@connector@http://{addr}"))
            .chain(
                spec.dead
                    .iter()
                    .map(|id| format!("{id}@connector@{DEAD_ENDPOINT}")),
            )
            .collect::<Vec<_>>()
            .join(",");

        let mut servers = Vec::with_capacity(listeners.len());
        for (id, addr, listener) in listeners {
            let mut vars: HashMap<String, String> = spec.vars.iter().cloned().collect();
            vars.insert("SERVER_ID".into(), id.clone());
            vars.insert("SERVER_HOST".into(), addr.ip().to_string());
            vars.insert("SERVER_PORT".into(), addr.port().to_string());
            vars.insert("CLUSTER_SERVERS".into(), cluster_servers.clone());
            vars.insert("RPC_TIMEOUT_MS".into(), "2000".into());
            let config = AppConfig::from_lookup(|key| vars.get(key).cloned())?;

            let state = assemble_state(config, spec.stores.get(&id).cloned())?;
            state.start().await?;

            let app = create_app(state.clone());
            let handle = tokio::spawn(async move {
                axum::serve(listener, app).await.ok();
            });

            let client = Client::builder().timeout(Duration::from_secs(10)).build()?;

            servers.push(TestServer {
                id,
                addr,
                state,
                client,
                _handle: handle,
            });
        }

        Ok(Self { servers })
    }

    /// Look up a server by id
    ///
    /// # Panics
    /// Panics if the id is not part of the cluster.
    pub fn server(&self, id: &str) -> &TestServer {
        self.servers
            .iter()
            .find(|s| s.id == id)
            .unwrap_or_else(|| panic!("no server {id} in cluster"))
    }

    /// Stop every server's scheduler
    pub async fn shutdown(&self) {
        for server in &self.servers {
            server.state.shutdown().await;
        }
    }
}

/// Poll `condition` until it holds or `timeout` elapses
pub async fn wait_until<F>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Helper to check if a Redis instance is available for store tests
pub fn redis_url() -> Option<String> {
    dotenvy::dotenv().ok();
    match std::env::var("REDIS_URL") {
        Ok(url) => Some(url),
        Err(_) => {
            eprintln!("Skipping test: REDIS_URL not set");
            None
        }
    }
}

/// Assert response status and parse JSON body
pub async fn assert_json<T: DeserializeOwned>(
    response: Response,
    expected_status: StatusCode,
) -> Result<T> {
    let status = response.status();
    if status != expected_status {
        let body = response.text().await?;
        anyhow::bail!(
            "Expected status {}, got {}. Body: {}",
            expected_status,
            status,
            body
        );
    }
    Ok(response.json().await?)
}

//! Test fixtures and data generators
//!
//! Provides reusable test data for integration tests.

use bytes::Bytes;
use lobby_core::Transport;
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Counter for unique test data
static COUNTER: AtomicU64 = AtomicU64::new(1);

/// Get a unique suffix for test data
pub fn unique_suffix() -> u64 {
    COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// A unique channel name
pub fn unique_channel() -> String {
    format!("room{}", unique_suffix())
}

/// Empty push options
pub fn no_opts() -> Map<String, Value> {
    Map::new()
}

/// Push options with `binded` set
pub fn binded_opts() -> Map<String, Value> {
    let mut opts = Map::new();
    opts.insert("binded".to_string(), Value::Bool(true));
    opts
}

/// Decoded `{"route", "body"}` envelope received by a client
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Received {
    pub route: String,
    pub body: Value,
}

/// Client-side view of a connection: records every write
#[derive(Debug, Default)]
pub struct TestClient {
    writes: Mutex<Vec<Vec<Bytes>>>,
    disconnected: AtomicBool,
}

impl TestClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Every message received, in order
    pub fn received(&self) -> Vec<Received> {
        self.writes
            .lock()
            .iter()
            .flatten()
            .filter_map(|bytes| serde_json::from_slice(bytes).ok())
            .collect()
    }

    /// Messages received on one route
    pub fn received_on(&self, route: &str) -> Vec<Value> {
        self.received()
            .into_iter()
            .filter(|m| m.route == route)
            .map(|m| m.body)
            .collect()
    }

    /// Number of transport writes (a batch counts once)
    pub fn write_count(&self) -> usize {
        self.writes.lock().len()
    }

    pub fn is_disconnected(&self) -> bool {
        self.disconnected.load(Ordering::SeqCst)
    }
}

impl Transport for TestClient {
    fn send(&self, message: Bytes) {
        self.writes.lock().push(vec![message]);
    }

    fn send_batch(&self, messages: Vec<Bytes>) {
        self.writes.lock().push(messages);
    }

    fn disconnect(&self) {
        self.disconnected.store(true, Ordering::SeqCst);
    }
}

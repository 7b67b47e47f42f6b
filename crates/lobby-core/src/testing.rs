//! Test doubles shared by unit tests

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::defer::next_tick;
use crate::remote::RpcMessage;
use crate::traits::{RemoteInvoker, Transport};
use crate::{LobbyError, LobbyResult};

/// Transport that records everything handed to it
#[derive(Debug, Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<Bytes>>,
    batches: Mutex<Vec<Vec<Bytes>>>,
    disconnected: AtomicBool,
}

impl RecordingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn sent(&self) -> Vec<Bytes> {
        self.sent.lock().clone()
    }

    pub fn batches(&self) -> Vec<Vec<Bytes>> {
        self.batches.lock().clone()
    }

    /// Every message received, single sends and batches flattened
    pub fn delivered(&self) -> usize {
        self.sent.lock().len() + self.batches.lock().iter().map(Vec::len).sum::<usize>()
    }

    pub fn is_disconnected(&self) -> bool {
        self.disconnected.load(Ordering::SeqCst)
    }
}

impl Transport for RecordingTransport {
    fn send(&self, message: Bytes) {
        self.sent.lock().push(message);
    }

    fn send_batch(&self, messages: Vec<Bytes>) {
        self.batches.lock().push(messages);
    }

    fn disconnect(&self) {
        self.disconnected.store(true, Ordering::SeqCst);
    }
}

/// Let spawned and deferred work run to completion
pub async fn settle() {
    for _ in 0..16 {
        next_tick().await;
    }
}

/// Invoker that records every call and answers from a script
#[derive(Default)]
pub struct ScriptedInvoker {
    calls: Mutex<Vec<(String, RpcMessage)>>,
    failing: Mutex<HashSet<String>>,
    replies: Mutex<HashMap<String, Value>>,
}

impl ScriptedInvoker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make every call to `server_id` fail
    pub fn fail(&self, server_id: &str) {
        self.failing.lock().insert(server_id.to_string());
    }

    /// Reply `value` to calls to `server_id`
    pub fn reply(&self, server_id: &str, value: Value) {
        self.replies.lock().insert(server_id.to_string(), value);
    }

    pub fn calls(&self) -> Vec<(String, RpcMessage)> {
        self.calls.lock().clone()
    }

    pub fn called_servers(&self) -> Vec<String> {
        let mut servers: Vec<String> = self.calls.lock().iter().map(|(id, _)| id.clone()).collect();
        servers.sort();
        servers
    }
}

#[async_trait]
impl RemoteInvoker for ScriptedInvoker {
    async fn invoke(&self, server_id: &str, message: RpcMessage) -> LobbyResult<Value> {
        self.calls.lock().push((server_id.to_string(), message));
        next_tick().await;

        if self.failing.lock().contains(server_id) {
            return Err(LobbyError::Rpc(format!("{server_id} unreachable")));
        }
        Ok(self
            .replies
            .lock()
            .get(server_id)
            .cloned()
            .unwrap_or(Value::Array(Vec::new())))
    }
}

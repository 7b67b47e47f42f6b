//! Channel service
//!
//! Owns every channel of this process and mirrors membership into an optional
//! [`ChannelStore`]. Store writes go through a single ordered queue so a
//! leave can never overtake the add it undoes; write failures are logged and
//! never reach the caller.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::join_all;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

use super::{Channel, Member};
use crate::defer::next_tick;
use crate::fanout::GroupDispatcher;
use crate::remote::{PushHandler, PushOptions};
use crate::traits::{ChannelStore, RemoteInvoker, ServerDirectory, StaticDirectory};
use crate::{LobbyError, LobbyResult, ServerId, Uid};

/// Default prefix for persisted channel keys
pub const DEFAULT_CHANNEL_PREFIX: &str = "channel";

/// A queued store write
#[derive(Debug)]
pub(crate) enum StoreOp {
    Add { key: String, value: String },
    Remove { key: String, value: String },
    RemoveAll { key: String },
    Barrier(oneshot::Sender<()>),
}

/// A channel whose membership could not be loaded during restore
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreFailure {
    pub channel: String,
    pub error: String,
}

/// Outcome of [`ChannelService::start`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreReport {
    /// Channels whose membership was loaded
    pub restored: Vec<String>,
    /// Channels registered empty because their membership failed to load
    pub failed: Vec<RestoreFailure>,
}

impl RestoreReport {
    /// True when every listed channel was loaded
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

pub(crate) fn member_value(sid: &str, uid: &str) -> String {
    format!("{sid}:{uid}")
}

fn parse_member(value: &str) -> Option<(&str, &str)> {
    value
        .split_once(':')
        .filter(|(sid, uid)| !sid.is_empty() && !uid.is_empty())
}

pub(crate) struct ServiceInner {
    server_id: ServerId,
    prefix: String,
    channels: DashMap<String, Arc<Channel>>,
    store: Option<Arc<dyn ChannelStore>>,
    store_tx: Option<mpsc::UnboundedSender<StoreOp>>,
    directory: Arc<dyn ServerDirectory>,
    pub(crate) dispatcher: GroupDispatcher,
}

impl ServiceInner {
    /// `{prefix}:{server_id}`
    fn index_key(&self) -> String {
        format!("{}:{}", self.prefix, self.server_id)
    }

    /// `{prefix}:{server_id}:{name}`
    pub(crate) fn channel_key(&self, name: &str) -> String {
        format!("{}:{}:{}", self.prefix, self.server_id, name)
    }

    pub(crate) fn persist(&self, op: StoreOp) {
        if let Some(tx) = &self.store_tx {
            if tx.send(op).is_err() {
                tracing::warn!(server_id = %self.server_id, "Channel store writer has stopped");
            }
        }
    }

    fn create_channel(self: &Arc<Self>, name: &str) -> Arc<Channel> {
        match self.channels.entry(name.to_string()) {
            Entry::Occupied(entry) => entry.get().clone(),
            Entry::Vacant(entry) => {
                let channel = Arc::new(Channel::new(name, Arc::downgrade(self)));
                entry.insert(channel.clone());
                self.persist(StoreOp::Add {
                    key: self.index_key(),
                    value: self.channel_key(name),
                });
                tracing::debug!(channel = %name, "Channel created");
                channel
            }
        }
    }

    fn restore_channel(self: &Arc<Self>, name: &str) -> Arc<Channel> {
        self.channels
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Channel::new(name, Arc::downgrade(self))))
            .clone()
    }

    pub(crate) fn destroy_channel(&self, name: &str) {
        if let Some((_, channel)) = self.channels.remove(name) {
            channel.mark_destroyed();
            tracing::debug!(channel = %name, "Channel destroyed");
        }
        self.forget_channel(name);
    }

    /// Deregister `channel` only while it is still the one registered under its name
    pub(crate) fn release_channel(&self, channel: &Channel) {
        let name = channel.name();
        let released = self
            .channels
            .remove_if(name, |_, registered| std::ptr::eq(registered.as_ref(), channel))
            .is_some();

        if released {
            tracing::debug!(channel = %name, "Channel destroyed");
            self.forget_channel(name);
        } else {
            tracing::debug!(channel = %name, "Destroyed channel was no longer registered");
        }
    }

    fn forget_channel(&self, name: &str) {
        let key = self.channel_key(name);
        self.persist(StoreOp::Remove {
            key: self.index_key(),
            value: key.clone(),
        });
        self.persist(StoreOp::RemoveAll { key });
    }
}

async fn run_store_writer(store: Arc<dyn ChannelStore>, mut rx: mpsc::UnboundedReceiver<StoreOp>) {
    while let Some(op) = rx.recv().await {
        match op {
            StoreOp::Add { key, value } => {
                if let Err(e) = store.add(&key, &value).await {
                    tracing::error!(key = %key, value = %value, error = %e, "Failed to add to channel store");
                }
            }
            StoreOp::Remove { key, value } => {
                if let Err(e) = store.remove(&key, &value).await {
                    tracing::error!(key = %key, value = %value, error = %e, "Failed to remove from channel store");
                }
            }
            StoreOp::RemoveAll { key } => {
                if let Err(e) = store.remove_all(&key).await {
                    tracing::error!(key = %key, error = %e, "Failed to remove all members from channel store");
                }
            }
            StoreOp::Barrier(done) => {
                let _ = done.send(());
            }
        }
    }

    tracing::debug!("Channel store writer stopped");
}

/// Builder for [`ChannelService`]
pub struct ChannelServiceBuilder {
    server_id: ServerId,
    prefix: String,
    store: Option<Arc<dyn ChannelStore>>,
    directory: Option<Arc<dyn ServerDirectory>>,
    local: Option<Arc<PushHandler>>,
    invoker: Option<Arc<dyn RemoteInvoker>>,
}

impl ChannelServiceBuilder {
    pub fn new(server_id: impl Into<ServerId>) -> Self {
        Self {
            server_id: server_id.into(),
            prefix: DEFAULT_CHANNEL_PREFIX.to_string(),
            store: None,
            directory: None,
            local: None,
            invoker: None,
        }
    }

    /// Key prefix for persisted membership
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn store(mut self, store: Arc<dyn ChannelStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn directory(mut self, directory: Arc<dyn ServerDirectory>) -> Self {
        self.directory = Some(directory);
        self
    }

    /// Push handler for groups owned by this server
    pub fn local_handler(mut self, handler: Arc<PushHandler>) -> Self {
        self.local = Some(handler);
        self
    }

    pub fn invoker(mut self, invoker: Arc<dyn RemoteInvoker>) -> Self {
        self.invoker = Some(invoker);
        self
    }

    /// Build the service. Must be called within a Tokio runtime when a store is set.
    pub fn build(self) -> ChannelService {
        let mut dispatcher = GroupDispatcher::new(self.server_id.clone());
        if let Some(local) = self.local {
            dispatcher = dispatcher.with_local(local);
        }
        if let Some(invoker) = self.invoker {
            dispatcher = dispatcher.with_invoker(invoker);
        }

        let store_tx = self.store.clone().map(|store| {
            let (tx, rx) = mpsc::unbounded_channel();
            tokio::spawn(run_store_writer(store, rx));
            tx
        });

        ChannelService {
            inner: Arc::new(ServiceInner {
                server_id: self.server_id,
                prefix: self.prefix,
                channels: DashMap::new(),
                store: self.store,
                store_tx,
                directory: self
                    .directory
                    .unwrap_or_else(|| Arc::new(StaticDirectory::default())),
                dispatcher,
            }),
        }
    }
}

/// Registry of the channels owned by this process
#[derive(Clone)]
pub struct ChannelService {
    inner: Arc<ServiceInner>,
}

impl ChannelService {
    pub fn builder(server_id: impl Into<ServerId>) -> ChannelServiceBuilder {
        ChannelServiceBuilder::new(server_id)
    }

    pub fn server_id(&self) -> &str {
        &self.inner.server_id
    }

    pub fn prefix(&self) -> &str {
        &self.inner.prefix
    }

    /// Create a channel, or return the existing one with that name
    pub fn create_channel(&self, name: &str) -> Arc<Channel> {
        self.inner.create_channel(name)
    }

    /// Look up a channel, creating it on a miss when `create` is set
    pub fn get_channel(&self, name: &str, create: bool) -> Option<Arc<Channel>> {
        if create {
            return Some(self.create_channel(name));
        }
        self.inner.channels.get(name).map(|entry| entry.value().clone())
    }

    /// Destroy a channel and drop its membership from the store
    pub fn destroy_channel(&self, name: &str) {
        self.inner.destroy_channel(name);
    }

    pub fn channel_names(&self) -> Vec<String> {
        self.inner
            .channels
            .iter()
            .map(|entry| entry.key().clone())
            .collect()
    }

    pub fn channel_count(&self) -> usize {
        self.inner.channels.len()
    }

    /// Push to explicit members, one dispatch per owning server.
    ///
    /// Members without a server id are skipped. Returns failed server ids and
    /// undelivered uids.
    pub async fn push_message_by_uids(
        &self,
        route: &str,
        msg: &Value,
        members: &[Member],
        opts: Map<String, Value>,
    ) -> LobbyResult<Vec<String>> {
        if members.is_empty() {
            next_tick().await;
            return Err(LobbyError::Validation("uids should not be empty".to_string()));
        }

        let mut groups: HashMap<ServerId, Vec<Uid>> = HashMap::new();
        for member in members {
            if member.sid.is_empty() {
                tracing::warn!(uid = %member.uid, route = %route, "Skipping uid without server id");
                continue;
            }
            groups
                .entry(member.sid.clone())
                .or_default()
                .push(member.uid.clone());
        }

        self.inner
            .dispatcher
            .push_by_group(route, msg, groups, &PushOptions::push(opts))
            .await
    }

    /// Broadcast to every server of `server_type`
    pub async fn broadcast(
        &self,
        server_type: &str,
        route: &str,
        msg: &Value,
        opts: Map<String, Value>,
    ) -> LobbyResult<Vec<String>> {
        let servers: Vec<ServerId> = self
            .inner
            .directory
            .servers_by_type(server_type)
            .into_iter()
            .map(|server| server.id)
            .collect();

        if servers.is_empty() {
            tracing::debug!(server_type = %server_type, "No servers to broadcast to");
        }

        self.inner
            .dispatcher
            .broadcast(servers, route, msg, &PushOptions::broadcast(opts))
            .await
    }

    /// Restore channels and membership from the store.
    ///
    /// Fails only when the channel index cannot be listed. Channels whose
    /// membership fails to load stay registered empty and are listed in the
    /// report.
    pub async fn start(&self) -> LobbyResult<RestoreReport> {
        let mut report = RestoreReport::default();
        let Some(store) = self.inner.store.clone() else {
            next_tick().await;
            return Ok(report);
        };

        let index_key = self.inner.index_key();
        let keys = store.load(&index_key).await.inspect_err(|e| {
            tracing::error!(key = %index_key, error = %e, "Failed to list channels from store");
        })?;

        let key_prefix = format!("{index_key}:");
        let mut pending = Vec::with_capacity(keys.len());
        for key in keys {
            let name = key
                .strip_prefix(&key_prefix)
                .filter(|name| !name.is_empty())
                .map(str::to_string);
            match name {
                Some(name) => {
                    let channel = self.inner.restore_channel(&name);
                    pending.push((name, key, channel));
                }
                None => {
                    tracing::warn!(key = %key, "Ignoring unexpected channel key");
                    report.failed.push(RestoreFailure {
                        channel: key,
                        error: "unexpected channel key".to_string(),
                    });
                }
            }
        }

        let loads = pending.into_iter().map(|(name, key, channel)| {
            let store = store.clone();
            async move {
                let result = store.load(&key).await;
                (name, channel, result)
            }
        });

        for (name, channel, result) in join_all(loads).await {
            match result {
                Ok(items) => {
                    for item in &items {
                        match parse_member(item) {
                            Some((sid, uid)) => {
                                if !channel.restore_member(uid, sid) {
                                    tracing::debug!(channel = %name, uid = %uid, sid = %sid, "Member already present");
                                }
                            }
                            None => {
                                tracing::warn!(channel = %name, value = %item, "Ignoring malformed member");
                            }
                        }
                    }
                    report.restored.push(name);
                }
                Err(e) => {
                    tracing::error!(channel = %name, error = %e, "Failed to load channel members");
                    report.failed.push(RestoreFailure {
                        channel: name,
                        error: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            server_id = %self.inner.server_id,
            restored = report.restored.len(),
            failed = report.failed.len(),
            "Channels restored"
        );

        Ok(report)
    }

    /// Wait until every store write queued so far has been applied
    pub async fn sync_store(&self) {
        let Some(tx) = &self.inner.store_tx else {
            return;
        };
        let (done_tx, done_rx) = oneshot::channel();
        if tx.send(StoreOp::Barrier(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
    }
}

impl std::fmt::Debug for ChannelService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelService")
            .field("server_id", &self.inner.server_id)
            .field("prefix", &self.inner.prefix)
            .field("channels", &self.inner.channels.len())
            .field("store", &self.inner.store.is_some())
            .finish()
    }
}

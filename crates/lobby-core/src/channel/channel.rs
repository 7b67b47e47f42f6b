use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Weak;

use super::service::{member_value, ServiceInner, StoreOp};
use crate::defer::next_tick;
use crate::remote::PushOptions;
use crate::{LobbyError, LobbyResult, ServerId, Uid};

/// Channel lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Inited,
    Destroyed,
}

/// A channel member and the front-end server it is connected through
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub uid: Uid,
    pub sid: ServerId,
}

impl Member {
    #[must_use]
    pub fn new(uid: impl Into<Uid>, sid: impl Into<ServerId>) -> Self {
        Self {
            uid: uid.into(),
            sid: sid.into(),
        }
    }
}

#[derive(Debug)]
struct ChannelInner {
    groups: HashMap<ServerId, Vec<Uid>>,
    records: HashMap<Uid, Member>,
    user_amount: usize,
    state: ChannelState,
}

impl ChannelInner {
    fn insert(&mut self, uid: &str, sid: &str) {
        self.groups
            .entry(sid.to_string())
            .or_default()
            .push(uid.to_string());
        self.records.insert(uid.to_string(), Member::new(uid, sid));
        self.user_amount += 1;
    }
}

/// Named set of users grouped by owning front-end server
pub struct Channel {
    name: String,
    service: Weak<ServiceInner>,
    inner: Mutex<ChannelInner>,
}

impl Channel {
    pub(crate) fn new(name: impl Into<String>, service: Weak<ServiceInner>) -> Self {
        Self {
            name: name.into(),
            service,
            inner: Mutex::new(ChannelInner {
                groups: HashMap::new(),
                records: HashMap::new(),
                user_amount: 0,
                state: ChannelState::Inited,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> ChannelState {
        self.inner.lock().state
    }

    pub fn is_destroyed(&self) -> bool {
        self.state() == ChannelState::Destroyed
    }

    /// Add a member connected through front-end server `sid`.
    ///
    /// Returns false without changes when the channel is destroyed or `sid`
    /// is empty. Adding the same uid under a second `sid` keeps both group
    /// entries.
    pub fn add(&self, uid: &str, sid: &str) -> bool {
        {
            let mut inner = self.inner.lock();
            if inner.state != ChannelState::Inited {
                return false;
            }
            if sid.is_empty() {
                tracing::warn!(channel = %self.name, uid = %uid, "Ignoring channel add without server id");
                return false;
            }
            inner.insert(uid, sid);
        }

        self.persist(|service| StoreOp::Add {
            key: service.channel_key(&self.name),
            value: member_value(sid, uid),
        });
        true
    }

    /// Remove a member. Returns false when `uid` is not in the `sid` group.
    pub fn leave(&self, uid: &str, sid: &str) -> bool {
        if uid.is_empty() || sid.is_empty() {
            return false;
        }

        {
            let mut inner = self.inner.lock();
            let Some(group) = inner.groups.get_mut(sid) else {
                return false;
            };
            let Some(pos) = group.iter().position(|member| member == uid) else {
                return false;
            };

            group.remove(pos);
            if group.is_empty() {
                inner.groups.remove(sid);
            }
            if inner.records.get(uid).is_some_and(|record| record.sid == sid) {
                inner.records.remove(uid);
            }
            inner.user_amount = inner.user_amount.saturating_sub(1);
        }

        self.persist(|service| StoreOp::Remove {
            key: service.channel_key(&self.name),
            value: member_value(sid, uid),
        });
        true
    }

    /// Every member uid across all groups.
    ///
    /// Builds a fresh list on each call; avoid it on hot paths.
    pub fn get_members(&self) -> Vec<Uid> {
        self.inner
            .lock()
            .groups
            .values()
            .flat_map(|uids| uids.iter().cloned())
            .collect()
    }

    pub fn get_member(&self, uid: &str) -> Option<Member> {
        self.inner.lock().records.get(uid).cloned()
    }

    pub fn get_user_amount(&self) -> usize {
        self.inner.lock().user_amount
    }

    /// Snapshot of the per-server groups
    pub fn groups(&self) -> HashMap<ServerId, Vec<Uid>> {
        self.inner.lock().groups.clone()
    }

    /// Push `msg` to every member, one dispatch per owning server.
    ///
    /// Returns failed server ids and undelivered uids.
    pub async fn push_message(
        &self,
        route: &str,
        msg: &Value,
        opts: Map<String, Value>,
    ) -> LobbyResult<Vec<String>> {
        let groups = {
            let inner = self.inner.lock();
            (inner.state == ChannelState::Inited).then(|| inner.groups.clone())
        };

        let (Some(groups), Some(service)) = (groups, self.service.upgrade()) else {
            next_tick().await;
            return Err(LobbyError::ChannelDestroyed(self.name.clone()));
        };

        service
            .dispatcher
            .push_by_group(route, msg, groups, &PushOptions::push(opts))
            .await
    }

    /// Destroy this channel and drop it from its service and the store
    ///
    /// A second call, or a call on a handle whose name has since been reused
    /// by a new channel, leaves the registered channel alone.
    pub fn destroy(&self) {
        if !self.mark_destroyed() {
            return;
        }
        if let Some(service) = self.service.upgrade() {
            service.release_channel(self);
        }
    }

    /// Returns true on the first transition to destroyed
    pub(crate) fn mark_destroyed(&self) -> bool {
        let mut inner = self.inner.lock();
        let first = inner.state != ChannelState::Destroyed;
        inner.state = ChannelState::Destroyed;
        first
    }

    /// Insert a member loaded from the store without writing it back.
    ///
    /// Skipped when `uid` is already in the `sid` group.
    pub(crate) fn restore_member(&self, uid: &str, sid: &str) -> bool {
        let mut inner = self.inner.lock();
        if inner.state != ChannelState::Inited {
            return false;
        }
        if inner
            .groups
            .get(sid)
            .is_some_and(|group| group.iter().any(|member| member == uid))
        {
            return false;
        }
        inner.insert(uid, sid);
        true
    }

    fn persist(&self, op: impl FnOnce(&ServiceInner) -> StoreOp) {
        if let Some(service) = self.service.upgrade() {
            service.persist(op(service.as_ref()));
        }
    }
}

impl std::fmt::Debug for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("Channel")
            .field("name", &self.name)
            .field("state", &inner.state)
            .field("groups", &inner.groups.len())
            .field("user_amount", &inner.user_amount)
            .finish()
    }
}

//! Channel registry: which live connections are subscribed to which channel.
//!
//! A connection holds membership in at most one channel at a time. All state
//! lives behind a single mutex so join/leave/publish are serialized, the
//! in-process equivalent of the event-loop scheduling this design assumes.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use log::{debug, warn};
use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

use crate::error_handling::types::DeliveryError;

/// Identifies one live dashboard connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Default)]
struct RegistryInner {
    /// Outbound frame sender per live connection.
    senders: HashMap<ConnectionId, UnboundedSender<String>>,
    /// Member sets per channel.
    members: HashMap<String, HashSet<ConnectionId>>,
    /// Current channel per connection, at most one.
    current: HashMap<ConnectionId, String>,
}

impl RegistryInner {
    fn remove_membership(&mut self, id: ConnectionId) {
        if let Some(channel) = self.current.remove(&id) {
            if let Some(set) = self.members.get_mut(&channel) {
                set.remove(&id);
                if set.is_empty() {
                    self.members.remove(&channel);
                }
            }
        }
    }
}

/// Transient, in-memory channel membership. Not persisted; a reconnecting
/// dashboard must re-join its channel explicitly.
#[derive(Default)]
pub struct ChannelRegistry {
    inner: Mutex<RegistryInner>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new live connection in the Unsubscribed state and returns
    /// its id. `sender` receives the serialized frames published to whichever
    /// channel the connection later joins.
    pub fn connect(&self, sender: UnboundedSender<String>) -> ConnectionId {
        let id = ConnectionId::new();
        let mut inner = self.inner.lock().unwrap();
        inner.senders.insert(id, sender);
        debug!("connection {} registered", id);
        id
    }

    /// Moves the connection into `channel`, atomically dropping any previous
    /// membership. Joining the channel already held is a no-op. Returns false
    /// for a connection the registry does not know (already disconnected).
    pub fn join(&self, id: ConnectionId, channel: &str) -> bool {
        let mut inner = self.inner.lock().unwrap();
        if !inner.senders.contains_key(&id) {
            warn!("join for unknown connection {}", id);
            return false;
        }
        if inner.current.get(&id).map(String::as_str) == Some(channel) {
            return true;
        }
        inner.remove_membership(id);
        inner
            .members
            .entry(channel.to_string())
            .or_default()
            .insert(id);
        inner.current.insert(id, channel.to_string());
        debug!("connection {} joined channel {}", id, channel);
        true
    }

    /// Removes the connection's current membership, if any, leaving it
    /// connected but unsubscribed.
    pub fn leave(&self, id: ConnectionId) {
        let mut inner = self.inner.lock().unwrap();
        inner.remove_membership(id);
    }

    /// Drops the connection entirely. Implicit on socket close.
    pub fn disconnect(&self, id: ConnectionId) {
        let mut inner = self.inner.lock().unwrap();
        inner.remove_membership(id);
        inner.senders.remove(&id);
        debug!("connection {} disconnected", id);
    }

    /// Delivers `frame` to every current member of `channel`. A channel with
    /// no members is a silent no-op. Delivery failures are logged and the
    /// failed connection pruned, without aborting delivery to the rest.
    /// Returns the number of successful deliveries.
    pub fn publish(&self, channel: &str, frame: &str) -> usize {
        let mut inner = self.inner.lock().unwrap();
        let ids: Vec<ConnectionId> = match inner.members.get(channel) {
            Some(set) => set.iter().copied().collect(),
            None => return 0,
        };
        let mut delivered = 0;
        let mut dead = Vec::new();
        for id in ids {
            match inner.senders.get(&id) {
                Some(sender) if sender.send(frame.to_string()).is_ok() => delivered += 1,
                _ => {
                    let err = DeliveryError {
                        connection_id: id.0,
                        channel: channel.to_string(),
                    };
                    warn!("{}", err);
                    dead.push(id);
                }
            }
        }
        for id in dead {
            inner.remove_membership(id);
            inner.senders.remove(&id);
        }
        delivered
    }

    /// Current member count of a channel.
    pub fn member_count(&self, channel: &str) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.members.get(channel).map_or(0, HashSet::len)
    }
}

//! Live subscriber set and channel memberships.

use axum::extract::ws::Message;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::RwLock;

/// Process-unique identifier for one live connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One connected client: its outbound frame queue and joined channels.
#[derive(Debug)]
struct Subscriber {
    tx: UnboundedSender<Message>,
    channels: HashSet<String>,
    connected_at: DateTime<Utc>,
}

/// Owns the live subscriber set. Cheap to clone; all clones share state.
///
/// Mutated by connect/disconnect/join events, read by the broadcaster. The
/// lock keeps the single-writer discipline intact now that events arrive
/// from multiple runtime threads.
#[derive(Clone)]
pub struct SubscriberRegistry {
    subscribers: Arc<RwLock<HashMap<SubscriberId, Subscriber>>>,
    next_id: Arc<AtomicU64>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self {
            subscribers: Arc::new(RwLock::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Register a new connection with no channel memberships.
    pub async fn connect(&self, tx: UnboundedSender<Message>) -> SubscriberId {
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let subscriber = Subscriber {
            tx,
            channels: HashSet::new(),
            connected_at: Utc::now(),
        };
        self.subscribers.write().await.insert(id, subscriber);
        id
    }

    /// Remove a subscriber and all its memberships. Idempotent: removing an
    /// unknown or already-removed id is a no-op.
    pub async fn disconnect(&self, id: SubscriberId) {
        if let Some(subscriber) = self.subscribers.write().await.remove(&id) {
            let session = Utc::now() - subscriber.connected_at;
            tracing::debug!(
                subscriber = %id,
                session_secs = session.num_seconds(),
                "removed subscriber"
            );
        }
    }

    /// Add a channel membership. Idempotent. Channel names come from the
    /// remote peer; any non-empty string is accepted, nothing is pre-declared.
    /// Returns false for an unknown subscriber or an empty name.
    pub async fn join(&self, id: SubscriberId, channel: &str) -> bool {
        if channel.is_empty() {
            tracing::warn!(subscriber = %id, "rejected join with empty channel name");
            return false;
        }
        match self.subscribers.write().await.get_mut(&id) {
            Some(subscriber) => {
                subscriber.channels.insert(channel.to_string());
                true
            },
            None => false,
        }
    }

    /// Queue a text frame to every connected subscriber. Best-effort: a send
    /// failure means the peer's forwarding task is gone, and the disconnect
    /// path will clean it up.
    pub async fn broadcast(&self, text: &str) {
        let subscribers = self.subscribers.read().await;
        for subscriber in subscribers.values() {
            let _ = subscriber.tx.send(Message::Text(text.to_string()));
        }
    }

    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.read().await.len()
    }

    /// Channels the subscriber has joined, if it is still connected.
    pub async fn channels_of(&self, id: SubscriberId) -> Option<HashSet<String>> {
        self.subscribers
            .read()
            .await
            .get(&id)
            .map(|subscriber| subscriber.channels.clone())
    }

    /// Subscribers currently joined to a channel.
    pub async fn channel_members(&self, channel: &str) -> Vec<SubscriberId> {
        self.subscribers
            .read()
            .await
            .iter()
            .filter(|(_, subscriber)| subscriber.channels.contains(channel))
            .map(|(id, _)| *id)
            .collect()
    }
}

impl Default for SubscriberRegistry {
    fn default() -> Self {
        Self::new()
    }
}

//! Score fan-out and the subscriber wire protocol.
//!
//! Every frame is a JSON envelope `{"event": <name>, "data": <payload>}`.

use crate::error::Result;
use crate::tally::VoteTally;
use crate::web::registry::SubscriberRegistry;
use serde::{Deserialize, Serialize};

const WELCOME_TEXT: &str = "Welcome!";

/// Server → client events.
#[derive(Debug, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "lowercase")]
pub enum ServerEvent {
    /// One-off greeting unicast at connection time.
    Message { text: String },
    /// The periodic global score feed.
    Scores(VoteTally),
}

/// Client → server events.
#[derive(Debug, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "lowercase")]
pub enum ClientEvent {
    /// Join a named channel. Membership only; the score feed stays global.
    Subscribe { channel: String },
}

/// Delivers tallies to every connected subscriber. Fire-and-forget: no
/// acknowledgment, no retry, no queuing for the slow — a missed tick is
/// superseded by the next one a second later.
#[derive(Clone)]
pub struct Broadcaster {
    registry: SubscriberRegistry,
}

impl Broadcaster {
    pub fn new(registry: SubscriberRegistry) -> Self {
        Self { registry }
    }

    /// Send a tally to all subscribers, regardless of channel membership.
    pub async fn broadcast_scores(&self, tally: &VoteTally) -> Result<()> {
        let payload = serde_json::to_string(&ServerEvent::Scores(tally.clone()))?;
        self.registry.broadcast(&payload).await;
        Ok(())
    }

    /// The serialized welcome greeting.
    pub fn welcome_payload() -> String {
        serde_json::to_string(&ServerEvent::Message {
            text: WELCOME_TEXT.to_string(),
        })
        .unwrap()
    }
}

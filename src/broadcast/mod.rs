//! Subscriber registry and batch broadcaster.
//!
//! Tracks the currently connected live subscribers and pushes each enriched
//! batch to all of them. Delivery is best-effort, latest-state-wins: a failed
//! send is logged per subscriber and never aborts the loop or reaches the
//! caller.

use std::collections::HashMap;

use tokio::sync::{mpsc, RwLock};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::models::{EnrichedAvatar, LiveUpdate};

pub type SubscriberId = Uuid;

pub struct Broadcaster {
    subscribers: RwLock<HashMap<SubscriberId, mpsc::UnboundedSender<String>>>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
        }
    }

    /// Register a new live connection. The returned receiver yields the
    /// serialized messages to forward into the connection.
    pub async fn subscribe(&self) -> (SubscriberId, mpsc::UnboundedReceiver<String>) {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();

        let count = {
            let mut subscribers = self.subscribers.write().await;
            subscribers.insert(id, tx);
            subscribers.len()
        };
        info!("Subscriber {} connected ({} active)", id, count);

        (id, rx)
    }

    pub async fn unsubscribe(&self, id: SubscriberId) {
        let count = {
            let mut subscribers = self.subscribers.write().await;
            subscribers.remove(&id);
            subscribers.len()
        };
        info!("Subscriber {} disconnected ({} active)", id, count);
    }

    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.read().await.len()
    }

    /// Push a batch to a single subscriber, used to replay the last known
    /// state to a new connection
    pub async fn send_batch_to(&self, id: SubscriberId, batch: &[EnrichedAvatar]) {
        let Some(message) = encode_batch(batch) else {
            return;
        };

        let sender = { self.subscribers.read().await.get(&id).cloned() };
        if let Some(sender) = sender {
            if sender.send(message).is_err() {
                warn!("Failed to send to subscriber {}", id);
            }
        }
    }

    /// Serialize the batch once and push it to every registered subscriber.
    /// Membership is snapshotted, so connects and disconnects during the
    /// broadcast are tolerated.
    pub async fn broadcast(&self, batch: &[EnrichedAvatar]) {
        let Some(message) = encode_batch(batch) else {
            return;
        };

        let subscribers: Vec<(SubscriberId, mpsc::UnboundedSender<String>)> = {
            let subscribers = self.subscribers.read().await;
            subscribers
                .iter()
                .map(|(id, tx)| (*id, tx.clone()))
                .collect()
        };

        for (id, sender) in subscribers {
            if sender.send(message.clone()).is_err() {
                warn!("Failed to send to subscriber {}", id);
            }
        }
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new()
    }
}

fn encode_batch(batch: &[EnrichedAvatar]) -> Option<String> {
    match serde_json::to_string(&LiveUpdate {
        data: batch.to_vec(),
    }) {
        Ok(message) => Some(message),
        Err(e) => {
            error!("Failed to serialize avatar batch: {}", e);
            None
        }
    }
}

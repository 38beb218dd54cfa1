// src/realtime.rs

use std::{collections::HashMap, sync::Arc};

use serde::Serialize;
use tokio::sync::{RwLock, broadcast};

/// Per-room buffer. A subscriber that falls further behind loses the
/// oldest events (broadcast semantics), not the connection.
const ROOM_CAPACITY: usize = 64;

/// An event fanned out to everyone subscribed to a content room.
#[derive(Debug, Clone, Serialize)]
pub struct ContentEvent {
    /// Room name, `<kind>:<id>` (e.g. "articles:42").
    pub room: String,
    /// Event kind (e.g. "comment.created", "rating.updated").
    pub event: String,
    pub payload: serde_json::Value,
}

/// Registry of content rooms backed by `tokio::sync::broadcast` channels.
///
/// Rooms are created lazily on first subscribe and pruned once the last
/// subscriber is gone. Publishing to an empty room is a no-op.
#[derive(Clone, Default)]
pub struct NotificationHub {
    rooms: Arc<RwLock<HashMap<String, broadcast::Sender<ContentEvent>>>>,
}

impl NotificationHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to a room, creating it if needed.
    pub async fn subscribe(&self, room: &str) -> broadcast::Receiver<ContentEvent> {
        let mut rooms = self.rooms.write().await;
        rooms
            .entry(room.to_string())
            .or_insert_with(|| broadcast::channel(ROOM_CAPACITY).0)
            .subscribe()
    }

    /// Publish an event to a room. Empty rooms are pruned here rather than
    /// on unsubscribe, which keeps the subscriber path lock-free on drop.
    pub async fn publish(&self, event: ContentEvent) {
        let stale = {
            let rooms = self.rooms.read().await;
            match rooms.get(&event.room) {
                Some(tx) => tx.send(event.clone()).is_err(),
                None => return,
            }
        };

        if stale {
            let mut rooms = self.rooms.write().await;
            // Re-check under the write lock: someone may have re-subscribed.
            if let Some(tx) = rooms.get(&event.room) {
                if tx.receiver_count() == 0 {
                    rooms.remove(&event.room);
                }
            }
        }
    }

    #[cfg(test)]
    async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }
}

/// Builds the event published after a comment, rating or job update.
pub fn content_event(room: String, event: &str, payload: serde_json::Value) -> ContentEvent {
    ContentEvent {
        room,
        event: event.to_string(),
        payload,
    }
}

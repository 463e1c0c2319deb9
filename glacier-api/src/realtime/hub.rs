/// Team rooms over `tokio::sync::broadcast`
///
/// Each team has at most one broadcast channel. The channel is created by
/// the first subscriber and removed once the last receiver is gone, either
/// by [`ChatHub::release`] or by a publish that finds no receivers left.
///
/// Events carry the id of the connection that caused them. Typing
/// indicators are not echoed back to their origin; chat events go to
/// everyone in the room, the sender included.

use glacier_shared::models::chat_message::ChatMessage;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Per-room channel capacity; slower receivers skip ahead
pub const ROOM_CAPACITY: usize = 256;

/// Server to client frame, `{"event": ..., "data": ...}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    NewMessage(ChatMessage),
    MessageEdited(ChatMessage),
    MessageDeleted { id: i32 },
    UserTyping { user: serde_json::Value },
    UserStopTyping { user: serde_json::Value },
    Error { message: String },
}

impl ServerEvent {
    /// Typing indicators are only for the other people in the room
    pub fn excludes_origin(&self) -> bool {
        matches!(self, ServerEvent::UserTyping { .. } | ServerEvent::UserStopTyping { .. })
    }
}

/// An event published to a room
#[derive(Debug, Clone)]
pub struct RoomEvent {
    /// Connection that caused the event; `None` for REST-originated events
    pub origin: Option<Uuid>,
    pub event: ServerEvent,
}

impl RoomEvent {
    pub fn visible_to(&self, connection: Uuid) -> bool {
        !(self.event.excludes_origin() && self.origin == Some(connection))
    }
}

/// Registry of team rooms
#[derive(Debug)]
pub struct ChatHub {
    rooms: Mutex<HashMap<i32, broadcast::Sender<RoomEvent>>>,
    capacity: usize,
}

impl Default for ChatHub {
    fn default() -> Self {
        Self::new(ROOM_CAPACITY)
    }
}

impl ChatHub {
    pub fn new(capacity: usize) -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
            capacity,
        }
    }

    fn rooms(&self) -> std::sync::MutexGuard<'_, HashMap<i32, broadcast::Sender<RoomEvent>>> {
        self.rooms.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Joins a team room, creating it if needed
    pub fn subscribe(&self, team_id: i32) -> broadcast::Receiver<RoomEvent> {
        self.rooms()
            .entry(team_id)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Drops the room when nobody listens any more
    ///
    /// Call after the receiver returned by [`subscribe`](Self::subscribe)
    /// has been dropped.
    pub fn release(&self, team_id: i32) {
        let mut rooms = self.rooms();
        if rooms.get(&team_id).is_some_and(|tx| tx.receiver_count() == 0) {
            rooms.remove(&team_id);
            tracing::debug!(team_id, "Chat room closed");
        }
    }

    /// Publishes a server-originated event; returns the receiver count
    pub fn publish(&self, team_id: i32, event: ServerEvent) -> usize {
        self.publish_from(team_id, None, event)
    }

    /// Publishes an event caused by `origin`
    pub fn publish_from(&self, team_id: i32, origin: Option<Uuid>, event: ServerEvent) -> usize {
        let mut rooms = self.rooms();
        let Some(tx) = rooms.get(&team_id) else {
            return 0;
        };

        match tx.send(RoomEvent { origin, event }) {
            Ok(receivers) => receivers,
            Err(_) => {
                rooms.remove(&team_id);
                0
            }
        }
    }

    pub fn room_count(&self) -> usize {
        self.rooms().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn typing(name: &str) -> ServerEvent {
        ServerEvent::UserTyping {
            user: json!({ "name": name }),
        }
    }

    #[test]
    fn test_event_wire_format() {
        let frame = serde_json::to_value(ServerEvent::MessageDeleted { id: 7 }).unwrap();
        assert_eq!(frame, json!({ "event": "message_deleted", "data": { "id": 7 } }));

        let frame = serde_json::to_value(typing("Ada")).unwrap();
        assert_eq!(frame["event"], "user_typing");
        assert_eq!(frame["data"]["user"]["name"], "Ada");
    }

    #[test]
    fn test_typing_is_hidden_from_origin_only() {
        let me = Uuid::new_v4();
        let other = Uuid::new_v4();

        let event = RoomEvent {
            origin: Some(me),
            event: typing("Ada"),
        };
        assert!(!event.visible_to(me));
        assert!(event.visible_to(other));

        let deleted = RoomEvent {
            origin: Some(me),
            event: ServerEvent::MessageDeleted { id: 1 },
        };
        assert!(deleted.visible_to(me));
    }

    #[tokio::test]
    async fn test_publish_reaches_every_subscriber() {
        let hub = ChatHub::default();
        let mut a = hub.subscribe(1);
        let mut b = hub.subscribe(1);
        let mut elsewhere = hub.subscribe(2);

        assert_eq!(hub.publish(1, ServerEvent::MessageDeleted { id: 9 }), 2);

        assert_eq!(a.recv().await.unwrap().event, ServerEvent::MessageDeleted { id: 9 });
        assert_eq!(b.recv().await.unwrap().event, ServerEvent::MessageDeleted { id: 9 });
        assert!(elsewhere.try_recv().is_err());
    }

    #[test]
    fn test_rooms_are_created_lazily_and_released() {
        let hub = ChatHub::default();
        assert_eq!(hub.publish(5, ServerEvent::MessageDeleted { id: 1 }), 0);
        assert_eq!(hub.room_count(), 0);

        let rx = hub.subscribe(5);
        assert_eq!(hub.room_count(), 1);

        hub.release(5);
        assert_eq!(hub.room_count(), 1);

        drop(rx);
        hub.release(5);
        assert_eq!(hub.room_count(), 0);
    }

    #[test]
    fn test_publish_drops_abandoned_room() {
        let hub = ChatHub::default();
        drop(hub.subscribe(3));

        assert_eq!(hub.publish(3, ServerEvent::MessageDeleted { id: 1 }), 0);
        assert_eq!(hub.room_count(), 0);
    }

    #[tokio::test]
    async fn test_lagging_receiver_skips_ahead() {
        let hub = ChatHub::new(2);
        let mut rx = hub.subscribe(1);

        for id in 0..4 {
            hub.publish(1, ServerEvent::MessageDeleted { id });
        }

        assert!(matches!(rx.recv().await, Err(broadcast::error::RecvError::Lagged(2))));
        assert_eq!(rx.recv().await.unwrap().event, ServerEvent::MessageDeleted { id: 2 });
    }
}

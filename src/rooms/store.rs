use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use super::ids::RoomId;
use super::room::Room;
use crate::config::RoomConfig;

pub type RoomSlot = Arc<Mutex<Room>>;

/// Room id → room. The map lock is only held to look up, insert or remove;
/// all room mutation happens under the room's own lock.
pub struct RoomStore {
    rooms: RwLock<HashMap<RoomId, RoomSlot>>,
    history_limit: usize,
}

impl RoomStore {
    pub fn new(config: &RoomConfig) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            history_limit: config.chat_history_limit,
        }
    }

    pub async fn get(&self, room_id: &RoomId) -> Option<RoomSlot> {
        let rooms = self.rooms.read().await;
        rooms.get(room_id).cloned()
    }

    pub async fn get_or_create(&self, room_id: &RoomId) -> RoomSlot {
        {
            let rooms = self.rooms.read().await;
            if let Some(slot) = rooms.get(room_id) {
                return slot.clone();
            }
        }

        let mut rooms = self.rooms.write().await;
        rooms
            .entry(room_id.clone())
            .or_insert_with(|| {
                tracing::info!(room_id = %room_id, "Room created");
                Arc::new(Mutex::new(Room::new(room_id.clone(), self.history_limit)))
            })
            .clone()
    }

    /// Remove `slot` if it is still the room stored under `room_id`.
    pub async fn remove(&self, room_id: &RoomId, slot: &RoomSlot) -> bool {
        let mut rooms = self.rooms.write().await;
        match rooms.get(room_id) {
            Some(current) if Arc::ptr_eq(current, slot) => {
                rooms.remove(room_id);
                true
            }
            _ => false,
        }
    }

    pub async fn contains(&self, room_id: &RoomId) -> bool {
        self.rooms.read().await.contains_key(room_id)
    }

    pub async fn len(&self) -> usize {
        self.rooms.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rooms.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room(id: &str) -> RoomId {
        RoomId::parse(Some(id)).unwrap()
    }

    #[tokio::test]
    async fn test_get_or_create_returns_same_slot() {
        let store = RoomStore::new(&RoomConfig::default());
        let first = store.get_or_create(&room("r1")).await;
        let second = store.get_or_create(&room("r1")).await;

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(store.len().await, 1);
        assert!(store.get(&room("r2")).await.is_none());
    }

    #[tokio::test]
    async fn test_remove_ignores_stale_slot() {
        let store = RoomStore::new(&RoomConfig::default());
        let old = store.get_or_create(&room("r1")).await;
        assert!(store.remove(&room("r1"), &old).await);

        let fresh = store.get_or_create(&room("r1")).await;
        assert!(!store.remove(&room("r1"), &old).await);
        assert!(store.contains(&room("r1")).await);
        assert!(!Arc::ptr_eq(&old, &fresh));
    }

    #[tokio::test]
    async fn test_new_room_uses_configured_history_limit() {
        let store = RoomStore::new(&RoomConfig {
            chat_history_limit: 1,
            ..RoomConfig::default()
        });
        let slot = store.get_or_create(&room("r1")).await;
        let mut room = slot.lock().await;
        room.push_message(crate::rooms::ChatMessage { sender: "a".into(), message: "1".into() });
        room.push_message(crate::rooms::ChatMessage { sender: "a".into(), message: "2".into() });
        assert_eq!(room.history().len(), 1);
    }
}

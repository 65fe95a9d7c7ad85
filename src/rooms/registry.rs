use std::collections::HashMap;

use tokio::sync::RwLock;

use super::ids::{ConnectionId, RoomId};

/// Open connections and the room each one currently sits in.
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<ConnectionId, Option<RoomId>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    pub async fn register(&self, connection: ConnectionId) {
        let mut connections = self.connections.write().await;
        connections.entry(connection).or_insert(None);
    }

    /// Forget a connection, returning the room it was in.
    pub async fn unregister(&self, connection: &ConnectionId) -> Option<RoomId> {
        let mut connections = self.connections.write().await;
        connections.remove(connection).flatten()
    }

    pub async fn room_of(&self, connection: &ConnectionId) -> Option<RoomId> {
        let connections = self.connections.read().await;
        connections.get(connection).cloned().flatten()
    }

    /// Record that `connection` sits in `room_id`. Returns the previous room.
    pub async fn assign(&self, connection: ConnectionId, room_id: RoomId) -> Option<RoomId> {
        let mut connections = self.connections.write().await;
        connections.insert(connection, Some(room_id)).flatten()
    }

    /// Clear the membership only if it still points at `room_id`.
    pub async fn clear_if(&self, connection: &ConnectionId, room_id: &RoomId) -> bool {
        let mut connections = self.connections.write().await;
        match connections.get_mut(connection) {
            Some(slot) if slot.as_ref() == Some(room_id) => {
                *slot = None;
                true
            }
            _ => false,
        }
    }

    pub async fn len(&self) -> usize {
        self.connections.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.connections.read().await.is_empty()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room(id: &str) -> RoomId {
        RoomId::parse(Some(id)).unwrap()
    }

    #[tokio::test]
    async fn test_register_and_assign() {
        let registry = ConnectionRegistry::new();
        let conn = ConnectionId::from("c1");

        registry.register(conn.clone()).await;
        assert_eq!(registry.room_of(&conn).await, None);
        assert_eq!(registry.len().await, 1);

        assert_eq!(registry.assign(conn.clone(), room("r1")).await, None);
        assert_eq!(registry.room_of(&conn).await, Some(room("r1")));
        assert_eq!(registry.assign(conn.clone(), room("r2")).await, Some(room("r1")));
    }

    #[tokio::test]
    async fn test_clear_if_only_matches_current_room() {
        let registry = ConnectionRegistry::new();
        let conn = ConnectionId::from("c1");
        registry.assign(conn.clone(), room("r2")).await;

        assert!(!registry.clear_if(&conn, &room("r1")).await);
        assert_eq!(registry.room_of(&conn).await, Some(room("r2")));

        assert!(registry.clear_if(&conn, &room("r2")).await);
        assert_eq!(registry.room_of(&conn).await, None);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_unregister_returns_room() {
        let registry = ConnectionRegistry::new();
        let conn = ConnectionId::from("c1");
        registry.assign(conn.clone(), room("r1")).await;

        assert_eq!(registry.unregister(&conn).await, Some(room("r1")));
        assert_eq!(registry.unregister(&conn).await, None);
        assert!(registry.is_empty().await);
    }
}

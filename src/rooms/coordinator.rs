use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;

use super::broadcast::Outbox;
use super::events::ServerEvent;
use super::ids::{ConnectionId, RoomId};
use super::registry::ConnectionRegistry;
use super::room::RoomSnapshot;
use super::store::RoomStore;
use crate::config::RoomConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CoordinatorStats {
    pub rooms: usize,
    pub connections: usize,
}

/// Process-wide owner of all room state. Created at startup and shared with
/// every connection; lifecycle operations live in `lifecycle.rs`, code and
/// chat fan-out in `broadcast.rs`.
pub struct RoomCoordinator {
    store: RoomStore,
    registry: ConnectionRegistry,
    outbox_capacity: usize,
}

impl RoomCoordinator {
    pub fn new(config: &RoomConfig) -> Arc<Self> {
        Arc::new(Self {
            store: RoomStore::new(config),
            registry: ConnectionRegistry::new(),
            outbox_capacity: config.outbox_capacity,
        })
    }

    pub(crate) fn store(&self) -> &RoomStore {
        &self.store
    }

    pub(crate) fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Outbound queue for a new connection, sized from the room config.
    pub fn outbox(&self, connection: ConnectionId) -> (Outbox, mpsc::Receiver<ServerEvent>) {
        Outbox::with_capacity(connection, self.outbox_capacity)
    }

    /// Track a freshly opened transport connection.
    pub async fn connect(&self, connection: ConnectionId) {
        tracing::debug!(connection_id = %connection, "Connection registered");
        self.registry.register(connection).await;
    }

    pub async fn room_of(&self, connection: &ConnectionId) -> Option<RoomId> {
        self.registry.room_of(connection).await
    }

    pub async fn room_exists(&self, room_id: &RoomId) -> bool {
        self.store.contains(room_id).await
    }

    pub async fn snapshot(&self, room_id: &RoomId) -> Option<RoomSnapshot> {
        let slot = self.store.get(room_id).await?;
        let room = slot.lock().await;
        if room.is_closed() {
            return None;
        }
        Some(room.snapshot())
    }

    pub async fn stats(&self) -> CoordinatorStats {
        CoordinatorStats {
            rooms: self.store.len().await,
            connections: self.registry.len().await,
        }
    }
}

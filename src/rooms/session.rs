use std::sync::Arc;

use super::broadcast::Outbox;
use super::coordinator::RoomCoordinator;
use super::events::{ClientEvent, ServerEvent};
use super::ids::{ConnectionId, RoomId};
use crate::error::{Result, RoomError};

/// Gateway state for one transport connection: decodes client events and
/// turns them into coordinator calls.
pub struct RoomSession {
    coordinator: Arc<RoomCoordinator>,
    outbox: Outbox,
}

impl RoomSession {
    pub async fn open(coordinator: Arc<RoomCoordinator>, outbox: Outbox) -> Self {
        coordinator.connect(outbox.connection().clone()).await;
        Self { coordinator, outbox }
    }

    pub fn connection_id(&self) -> &ConnectionId {
        self.outbox.connection()
    }

    pub async fn handle_text(&self, text: &str) -> Result<()> {
        let event = serde_json::from_str::<ClientEvent>(text)
            .map_err(|e| RoomError::InvalidMessage(e.to_string()))?;
        self.handle_event(event).await
    }

    pub async fn handle_event(&self, event: ClientEvent) -> Result<()> {
        let connection = self.connection_id();

        match event {
            ClientEvent::JoinRoom(target) => {
                let room_id = RoomId::parse(target.room_id.as_deref())?;
                self.coordinator.join(&self.outbox, &room_id).await?;
            }
            ClientEvent::LeaveRoom(target) => {
                let Ok(room_id) = RoomId::parse(target.room_id.as_deref()) else {
                    tracing::debug!(connection_id = %connection, "Ignoring leave without roomId");
                    return Ok(());
                };
                if let Err(e) = self.coordinator.leave(connection, &room_id).await {
                    tracing::debug!(
                        connection_id = %connection,
                        room_id = %room_id,
                        error = %e,
                        "Ignoring redundant leave"
                    );
                }
            }
            ClientEvent::CodeChange(change) => {
                let room_id = require_room(change.room_id.as_deref())?;
                self.coordinator.set_code(connection, &room_id, change.code).await;
            }
            ClientEvent::SendMessage(chat) => {
                let room_id = require_room(chat.room_id.as_deref())?;
                self.coordinator
                    .post_message(&room_id, chat.sender, chat.message)
                    .await?;
            }
        }
        Ok(())
    }

    /// Resolves once this connection's outbound queue has overflowed.
    pub async fn stalled(&self) {
        self.outbox.stalled().await
    }

    /// Tell the client about a failed request.
    pub fn report(&self, error: &RoomError) {
        self.outbox.send(ServerEvent::Error {
            message: error.to_string(),
        });
    }

    /// Transport closed: implicit leave of the current room.
    pub async fn close(self) {
        let connection = self.outbox.connection().clone();
        self.coordinator.disconnect(&connection).await;
    }
}

// Only a join without a room is fatal; elsewhere it is a bad frame.
fn require_room(raw: Option<&str>) -> Result<RoomId> {
    RoomId::parse(raw).map_err(|_| RoomError::InvalidMessage("roomId is required".to_string()))
}

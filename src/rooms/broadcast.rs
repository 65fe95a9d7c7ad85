//! Outbound queues and room fan-out.
//!
//! Each connection owns a bounded queue drained by its socket writer task.
//! Sends never await, so a room can fan out while holding its lock. A queue
//! that fills up marks its connection as stalled; the gateway then drops
//! that connection instead of buffering for it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, Notify};

use super::coordinator::RoomCoordinator;
use super::events::{ChatMessage, ServerEvent};
use super::ids::{ConnectionId, RoomId};
use crate::config::DEFAULT_OUTBOX_CAPACITY;
use crate::error::{Result, RoomError};

#[derive(Debug, Default)]
struct Stall {
    flagged: AtomicBool,
    notify: Notify,
}

/// Sending half of one connection's outbound queue.
#[derive(Debug, Clone)]
pub struct Outbox {
    connection: ConnectionId,
    sender: mpsc::Sender<ServerEvent>,
    stall: Arc<Stall>,
}

impl Outbox {
    pub fn channel(connection: ConnectionId) -> (Self, mpsc::Receiver<ServerEvent>) {
        Self::with_capacity(connection, DEFAULT_OUTBOX_CAPACITY)
    }

    pub fn with_capacity(
        connection: ConnectionId,
        capacity: usize,
    ) -> (Self, mpsc::Receiver<ServerEvent>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let outbox = Self {
            connection,
            sender,
            stall: Arc::new(Stall::default()),
        };
        (outbox, receiver)
    }

    pub fn connection(&self) -> &ConnectionId {
        &self.connection
    }

    /// Queue an event. Returns false if the connection is gone or stalled.
    pub fn send(&self, event: ServerEvent) -> bool {
        if self.is_stalled() {
            return false;
        }
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(
                    connection_id = %self.connection,
                    "Outbound queue full, marking connection as stalled"
                );
                self.stall.flagged.store(true, Ordering::Release);
                self.stall.notify.notify_one();
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::trace!(
                    connection_id = %self.connection,
                    "Outbound queue closed, dropping event"
                );
                false
            }
        }
    }

    pub fn is_stalled(&self) -> bool {
        self.stall.flagged.load(Ordering::Acquire)
    }

    /// Resolves once the queue has overflowed.
    pub async fn stalled(&self) {
        while !self.is_stalled() {
            self.stall.notify.notified().await;
        }
    }
}

/// Deliver `event` to every recipient except `except`.
/// Returns the number of queues that accepted it.
pub fn fan_out<'a>(
    recipients: impl IntoIterator<Item = &'a Outbox>,
    event: &ServerEvent,
    except: Option<&ConnectionId>,
) -> usize {
    recipients
        .into_iter()
        .filter(|outbox| Some(outbox.connection()) != except)
        .filter(|outbox| outbox.send(event.clone()))
        .count()
}

impl RoomCoordinator {
    /// Replace the room's code and echo it to everyone but the author.
    /// Edits for a room that no longer exists are dropped silently.
    pub async fn set_code(&self, connection: &ConnectionId, room_id: &RoomId, code: String) {
        let Some(slot) = self.store().get(room_id).await else {
            tracing::debug!(room_id = %room_id, connection_id = %connection, "Dropping code change for unknown room");
            return;
        };

        let mut room = slot.lock().await;
        if room.is_closed() {
            tracing::debug!(room_id = %room_id, connection_id = %connection, "Dropping code change for closed room");
            return;
        }

        let event = ServerEvent::CodeUpdate(code.clone());
        room.set_code(code);
        let delivered = room.broadcast(&event, Some(connection));

        tracing::debug!(
            room_id = %room_id,
            connection_id = %connection,
            delivered,
            "Code updated"
        );
    }

    /// Append a chat message and echo it to the whole room, sender included.
    pub async fn post_message(
        &self,
        room_id: &RoomId,
        sender: String,
        message: String,
    ) -> Result<ChatMessage> {
        let slot = self
            .store()
            .get(room_id)
            .await
            .ok_or_else(|| RoomError::RoomNotFound(room_id.to_string()))?;

        let mut room = slot.lock().await;
        if room.is_closed() {
            return Err(RoomError::RoomNotFound(room_id.to_string()));
        }

        let entry = ChatMessage { sender, message };
        room.push_message(entry.clone());
        let delivered = room.broadcast(&ServerEvent::ReceiveMessage(entry.clone()), None);

        tracing::debug!(
            room_id = %room_id,
            sender = %entry.sender,
            delivered,
            "Chat message posted"
        );
        Ok(entry)
    }
}

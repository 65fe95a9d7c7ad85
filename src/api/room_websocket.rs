use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use warp::ws::{Message, WebSocket};

use crate::error::RoomError;
use crate::rooms::{ConnectionId, RoomCoordinator, RoomSession};

/// How long queued events may take to reach the client once the reader stops.
const FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn handle_room_websocket(websocket: WebSocket, coordinator: Arc<RoomCoordinator>) {
    let connection_id = ConnectionId::generate();
    tracing::info!(connection_id = %connection_id, "New room WebSocket connection established");

    let (mut ws_sender, mut ws_receiver) = websocket.split();
    let (outbox, mut rx) = coordinator.outbox(connection_id.clone());
    let session = RoomSession::open(coordinator, outbox).await;

    // Ends once every outbox clone is dropped, i.e. after disconnect.
    let mut sender_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let text = match serde_json::to_string(&event).map_err(RoomError::from) {
                Ok(text) => text,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to serialize server event");
                    continue;
                }
            };
            if let Err(e) = ws_sender.send(Message::text(text)).await {
                tracing::error!(error = %e, "Failed to send WebSocket message");
                break;
            }
        }
        let _ = ws_sender.close().await;
    });

    let mut stalled = false;
    loop {
        let result = tokio::select! {
            next = ws_receiver.next() => match next {
                Some(result) => result,
                None => break,
            },
            _ = session.stalled() => {
                tracing::warn!(connection_id = %connection_id, "Client is not reading, dropping connection");
                stalled = true;
                break;
            }
        };
        let message = match result {
            Ok(message) => message,
            Err(e) => {
                tracing::error!(connection_id = %connection_id, error = %e, "WebSocket error");
                break;
            }
        };

        if message.is_close() {
            break;
        }
        let Ok(text) = message.to_str() else {
            continue;
        };
        tracing::debug!(connection_id = %connection_id, "Received room message: {}", text);

        if let Err(e) = session.handle_text(text).await {
            session.report(&e);
            if e.is_fatal() {
                tracing::warn!(connection_id = %connection_id, error = %e, "Rejecting connection");
                break;
            }
            tracing::debug!(connection_id = %connection_id, error = %e, "Request failed");
        }
    }

    session.close().await;
    if stalled {
        sender_task.abort();
    } else if tokio::time::timeout(FLUSH_TIMEOUT, &mut sender_task).await.is_err() {
        tracing::warn!(connection_id = %connection_id, "Outbound queue did not drain, aborting");
        sender_task.abort();
    }
    tracing::info!(connection_id = %connection_id, "Room WebSocket connection closed");
}

//! Wire events exchanged over the room WebSocket.
//!
//! Every frame is a JSON object `{"event": <name>, "data": <payload>}`.

use serde::{Deserialize, Serialize};

/// One chat log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub sender: String,
    pub message: String,
}

/// Events sent by clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientEvent {
    JoinRoom(RoomRef),
    LeaveRoom(RoomRef),
    CodeChange(CodeChange),
    SendMessage(SendMessage),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomRef {
    #[serde(default)]
    pub room_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeChange {
    #[serde(default)]
    pub room_id: Option<String>,
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessage {
    #[serde(default)]
    pub room_id: Option<String>,
    pub message: String,
    pub sender: String,
}

/// Events sent by the server, either to one connection or to a whole room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    /// `"mentor"` or `"Student N"`
    AssignRole(String),
    CodeUpdate(String),
    StudentCount(usize),
    ChatHistory(Vec<ChatMessage>),
    ReceiveMessage(ChatMessage),
    /// Terminal: the room is gone.
    MentorLeft,
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_join() {
        let event: ClientEvent =
            serde_json::from_value(json!({"event": "joinRoom", "data": {"roomId": "r1"}})).unwrap();
        match event {
            ClientEvent::JoinRoom(r) => assert_eq!(r.room_id.as_deref(), Some("r1")),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_decode_join_without_room_id() {
        let event: ClientEvent =
            serde_json::from_value(json!({"event": "joinRoom", "data": {}})).unwrap();
        assert!(matches!(event, ClientEvent::JoinRoom(RoomRef { room_id: None })));
    }

    #[test]
    fn test_decode_send_message() {
        let event: ClientEvent = serde_json::from_value(json!({
            "event": "sendMessage",
            "data": {"roomId": "r1", "message": "hi", "sender": "Student 1"}
        }))
        .unwrap();
        match event {
            ClientEvent::SendMessage(m) => {
                assert_eq!(m.room_id.as_deref(), Some("r1"));
                assert_eq!(m.message, "hi");
                assert_eq!(m.sender, "Student 1");
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_unknown_event_is_rejected() {
        let result = serde_json::from_value::<ClientEvent>(json!({"event": "deleteRoom", "data": {}}));
        assert!(result.is_err());
    }

    #[test]
    fn test_server_event_shapes() {
        assert_eq!(
            serde_json::to_value(ServerEvent::AssignRole("Student 2".into())).unwrap(),
            json!({"event": "assignRole", "data": "Student 2"})
        );
        assert_eq!(
            serde_json::to_value(ServerEvent::StudentCount(3)).unwrap(),
            json!({"event": "studentCount", "data": 3})
        );
        assert_eq!(
            serde_json::to_value(ServerEvent::MentorLeft).unwrap(),
            json!({"event": "mentorLeft"})
        );
        assert_eq!(
            serde_json::to_value(ServerEvent::ReceiveMessage(ChatMessage {
                sender: "mentor".into(),
                message: "hello".into(),
            }))
            .unwrap(),
            json!({"event": "receiveMessage", "data": {"sender": "mentor", "message": "hello"}})
        );
    }
}

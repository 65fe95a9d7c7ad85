use thiserror::Error;

/// Error types for the room coordinator
#[derive(Debug, Error)]
pub enum RoomError {
    /// Request errors
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Room {0} does not exist")]
    RoomNotFound(String),

    #[error("Connection {connection} is not a member of room {room}")]
    NotAMember { connection: String, room: String },

    /// Wire errors
    #[error("Invalid client message: {0}")]
    InvalidMessage(String),

    #[error("Failed to serialize message: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// Convenience type alias for Results using RoomError
pub type Result<T> = std::result::Result<T, RoomError>;

impl RoomError {
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        RoomError::InvalidRequest(msg.into())
    }

    /// Whether the gateway must drop the connection after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, RoomError::InvalidRequest(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RoomError::RoomNotFound("r1".to_string());
        assert_eq!(err.to_string(), "Room r1 does not exist");

        let err = RoomError::NotAMember {
            connection: "c1".to_string(),
            room: "r1".to_string(),
        };
        assert_eq!(err.to_string(), "Connection c1 is not a member of room r1");
    }

    #[test]
    fn test_error_helpers() {
        let err = RoomError::invalid_request("roomId is required");
        assert!(matches!(err, RoomError::InvalidRequest(_)));
    }

    #[test]
    fn test_only_invalid_request_is_fatal() {
        assert!(RoomError::invalid_request("x").is_fatal());
        assert!(!RoomError::InvalidConfiguration("x".into()).is_fatal());
        assert!(!RoomError::RoomNotFound("r1".into()).is_fatal());
        assert!(!RoomError::InvalidMessage("bad".into()).is_fatal());
    }

    #[test]
    fn test_serde_error_converts() {
        let parse = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: RoomError = parse.into();
        assert!(matches!(err, RoomError::SerializationFailed(_)));
    }
}

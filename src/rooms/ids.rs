use std::fmt;

use rand::Rng;
use serde::Serialize;

use crate::error::{Result, RoomError};

/// Caller-supplied room identifier. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    /// Validate a raw room id taken from a client event.
    pub fn parse(raw: Option<&str>) -> Result<Self> {
        match raw {
            Some(id) if !id.trim().is_empty() => Ok(Self(id.to_owned())),
            _ => Err(RoomError::invalid_request("roomId is required")),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque identity of one transport connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ConnectionId(String);

impl ConnectionId {
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        Self(format!("conn-{:016x}", rng.gen::<u64>()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ConnectionId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

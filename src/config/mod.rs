use std::env;
use std::net::{IpAddr, Ipv4Addr};

use crate::error::{Result, RoomError};

pub const DEFAULT_CHAT_HISTORY_LIMIT: usize = 500;
pub const DEFAULT_OUTBOX_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub rooms: RoomConfig,
    pub log_format: LogFormat,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: Ipv4Addr,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct RoomConfig {
    /// Chat messages kept per room; older ones are dropped first.
    pub chat_history_limit: usize,
    /// Events buffered per connection before it is dropped as stalled.
    pub outbox_capacity: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            chat_history_limit: DEFAULT_CHAT_HISTORY_LIMIT,
            outbox_capacity: DEFAULT_OUTBOX_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let host = match env::var("SERVER_HOST") {
            Ok(raw) => parse_host(&raw)?,
            Err(_) => Ipv4Addr::UNSPECIFIED,
        };

        let port = env::var("SERVER_PORT").unwrap_or_else(|_| "5000".to_string());
        let port: u16 = port
            .parse()
            .map_err(|_| RoomError::InvalidConfiguration(format!("SERVER_PORT={}", port)))?;

        let chat_history_limit = match env::var("CHAT_HISTORY_LIMIT") {
            Ok(raw) => parse_positive("CHAT_HISTORY_LIMIT", &raw)?,
            Err(_) => DEFAULT_CHAT_HISTORY_LIMIT,
        };

        let outbox_capacity = match env::var("OUTBOX_CAPACITY") {
            Ok(raw) => parse_positive("OUTBOX_CAPACITY", &raw)?,
            Err(_) => DEFAULT_OUTBOX_CAPACITY,
        };

        let log_format = match env::var("LOG_FORMAT") {
            Ok(raw) => parse_log_format(&raw)?,
            Err(_) => LogFormat::Pretty,
        };

        Ok(Self {
            server: ServerConfig { host, port },
            rooms: RoomConfig {
                chat_history_limit,
                outbox_capacity,
            },
            log_format,
        })
    }

    pub fn bind_address(&self) -> ([u8; 4], u16) {
        (self.server.host.octets(), self.server.port)
    }
}

fn parse_host(raw: &str) -> Result<Ipv4Addr> {
    match raw.trim() {
        "localhost" => return Ok(Ipv4Addr::LOCALHOST),
        "" => return Ok(Ipv4Addr::UNSPECIFIED),
        _ => {}
    }

    match raw.trim().parse::<IpAddr>() {
        Ok(IpAddr::V4(ipv4)) => Ok(ipv4),
        Ok(IpAddr::V6(_)) => Err(RoomError::InvalidConfiguration(format!(
            "SERVER_HOST must be an IPv4 address, got IPv6 {:?}",
            raw
        ))),
        Err(_) => Err(RoomError::InvalidConfiguration(format!(
            "SERVER_HOST must be an IPv4 address or 'localhost', got {:?}",
            raw
        ))),
    }
}

fn parse_positive(name: &str, raw: &str) -> Result<usize> {
    match raw.trim().parse::<usize>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(RoomError::InvalidConfiguration(format!(
            "{} must be a positive integer, got {:?}",
            name, raw
        ))),
    }
}

fn parse_log_format(raw: &str) -> Result<LogFormat> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "pretty" | "" => Ok(LogFormat::Pretty),
        "json" => Ok(LogFormat::Json),
        other => Err(RoomError::InvalidConfiguration(format!(
            "LOG_FORMAT must be 'pretty' or 'json', got {:?}",
            other
        ))),
    }
}

// Tunables for the relay server and client.
//
// Every value that used to be a module-level constant lives here so that
// several servers/clients with different tuning can share one process.
// Both structs are JSON-loadable; missing keys fall back to `Default`, and
// durations are written as integer milliseconds (`*_ms` keys).
//
// Example server config:
//
//   { "port": 50010, "staleness_threshold_ms": 5000 }

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use shattered_fates_protocol::MAX_DATAGRAM_SIZE;

use crate::error::RelayError;

/// Default UDP port the game uses for the relay.
pub const DEFAULT_PORT: u16 = 50000;

/// Relay server configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Address to bind. `0.0.0.0` accepts LAN peers.
    pub host: String,
    /// Port to bind. `0` asks the OS for an ephemeral port, readable from
    /// `RelayServer::local_addr()` after binding.
    pub port: u16,
    /// Receive buffer size in bytes; longer datagrams are truncated. Must be
    /// non-zero in JSON; a zero set in code falls back to the default.
    #[serde(deserialize_with = "nonzero_size")]
    pub buffer_size: usize,
    /// A peer silent for longer than this stops receiving fan-out and is
    /// evicted from the registry.
    #[serde(rename = "staleness_threshold_ms", with = "duration_ms")]
    pub staleness_threshold: Duration,
    /// Socket read timeout; bounds how long the loop can sit in `recv`
    /// before re-checking its running flag.
    #[serde(rename = "poll_interval_ms", with = "duration_ms")]
    pub poll_interval: Duration,
    /// How long `stop()` waits for the worker before abandoning it.
    #[serde(rename = "join_timeout_ms", with = "duration_ms")]
    pub join_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: DEFAULT_PORT,
            buffer_size: MAX_DATAGRAM_SIZE,
            staleness_threshold: Duration::from_secs(30),
            poll_interval: Duration::from_millis(100),
            join_timeout: Duration::from_secs(1),
        }
    }
}

impl ServerConfig {
    /// Server config bound to `host:port` with every other value defaulted.
    pub fn bind_to(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self, RelayError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, RelayError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

/// Relay client configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    #[serde(deserialize_with = "nonzero_size")]
    pub buffer_size: usize,
    #[serde(rename = "poll_interval_ms", with = "duration_ms")]
    pub poll_interval: Duration,
    #[serde(rename = "join_timeout_ms", with = "duration_ms")]
    pub join_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            buffer_size: MAX_DATAGRAM_SIZE,
            poll_interval: Duration::from_millis(100),
            join_timeout: Duration::from_millis(500),
        }
    }
}

impl ClientConfig {
    pub fn from_json(json: &str) -> Result<Self, RelayError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Socket read timeouts must be non-zero.
pub(crate) fn read_timeout(poll_interval: Duration) -> Duration {
    poll_interval.max(Duration::from_millis(1))
}

/// Receive buffer length actually allocated for a configured size.
pub(crate) fn recv_buffer_len(buffer_size: usize) -> usize {
    if buffer_size == 0 {
        MAX_DATAGRAM_SIZE
    } else {
        buffer_size
    }
}

fn nonzero_size<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<usize, D::Error> {
    match usize::deserialize(deserializer)? {
        0 => Err(serde::de::Error::custom("buffer_size must be at least 1")),
        size => Ok(size),
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

// shattered_fates_relay: UDP position relay for Shattered Fates.
//
// A running game instance sends its player's position to a relay server,
// which forwards each datagram to every other instance it has heard from.
// There is no session, no handshake and no reliability layer: peers exist
// because they sent something, and disappear after a quiet period.
//
// Module overview:
// - `server.rs`:    `RelayServer`: bind, receive loop, fan-out, eviction.
// - `client.rs`:    `RelayClient`: best-effort send, receive loop that
//                   calls a handler per datagram.
// - `registry.rs`:  `PeerRegistry`: address -> last-seen, staleness rules.
// - `peers.rs`:     `PeerTable` / `SharedPeerTable`: remote players'
//                   positions, fed from a client handler.
// - `worker.rs`:    Shared lifecycle state and shutdown helpers.
// - `stats.rs`:     Counters that make swallowed transport errors visible.
// - `config.rs`:    `ServerConfig` / `ClientConfig` with JSON loading.
// - `error.rs`:     `RelayError` for setup failures.
//
// Dependencies: `shattered_fates_protocol` for datagram decoding and frame
// parsing. The server itself never parses frames.
//
// The relay runs standalone (`main.rs`, binary `relay`) or embedded in a
// game process via the library API.

pub mod client;
pub mod config;
pub mod error;
pub mod peers;
pub mod registry;
pub mod server;
pub mod stats;
mod worker;

pub use client::{MessageHandler, RelayClient};
pub use config::{ClientConfig, DEFAULT_PORT, ServerConfig};
pub use error::RelayError;
pub use peers::{PeerTable, SharedPeerTable};
pub use server::RelayServer;
pub use stats::{ClientStats, ServerStats};
pub use worker::RelayState;

// Error type for the relay crate.
//
// Only setup can fail from the caller's point of view: resolving the server
// address, binding a socket, spawning the worker, loading a config file.
// Once running, transport errors are handled inside the receive loops and
// never reach the caller (see `server.rs` / `client.rs`).

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("socket error: {0}")]
    Io(#[from] io::Error),
    #[error("could not resolve {host}:{port}")]
    Resolve { host: String, port: u16 },
    #[error("relay endpoint was stopped and cannot be restarted")]
    Stopped,
    #[error("invalid relay config: {0}")]
    Config(#[from] serde_json::Error),
}

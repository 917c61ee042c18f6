// UDP fan-out relay server.
//
// Architecture: one socket, one worker thread.
//
// - `start()` binds (unless `bind()` already did) and spawns the worker.
// - The worker loops on `recv_from`. For each datagram it refreshes the
//   sender in the `PeerRegistry`, forwards the raw bytes to every other
//   live peer, then sweeps stale peers out of the registry.
// - `stop()` clears the running flag, wakes the worker, joins it with a
//   deadline and drops the socket.
//
// The server never looks inside a payload. Frames, garbage and empty
// datagrams are forwarded alike; see `shattered_fates_protocol` for what
// the game actually sends.
//
// Error policy: a failed forward to one peer is counted and skipped so the
// remaining peers still get the datagram. A receive error other than a
// read timeout ends the loop; the server then stays inert until dropped.
//
// The registry sits behind a mutex only so callers can inspect it while the
// loop runs. All mutation happens on the worker.

use std::net::{SocketAddr, UdpSocket};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use log::{debug, info, trace, warn};
use parking_lot::Mutex;

use crate::config::{ServerConfig, read_timeout, recv_buffer_len};
use crate::error::RelayError;
use crate::registry::PeerRegistry;
use crate::stats::{ServerCounters, ServerStats, add, bump};
use crate::worker::{RecvOutcome, RelayState, classify_recv_error, join_with_timeout, wake};

/// Relay server handle. Dropping it stops the server.
pub struct RelayServer {
    config: ServerConfig,
    state: RelayState,
    socket: Option<Arc<UdpSocket>>,
    local_addr: Option<SocketAddr>,
    keep_running: Arc<AtomicBool>,
    registry: Arc<Mutex<PeerRegistry>>,
    counters: Arc<ServerCounters>,
    thread: Option<JoinHandle<()>>,
}

impl RelayServer {
    pub fn new(config: ServerConfig) -> Self {
        let registry = PeerRegistry::new(config.staleness_threshold);
        Self {
            config,
            state: RelayState::Unstarted,
            socket: None,
            local_addr: None,
            keep_running: Arc::new(AtomicBool::new(false)),
            registry: Arc::new(Mutex::new(registry)),
            counters: Arc::new(ServerCounters::default()),
            thread: None,
        }
    }

    /// Bind the socket without starting the loop. Returns the bound
    /// address, which is how callers learn an OS-assigned port.
    pub fn bind(&mut self) -> Result<SocketAddr, RelayError> {
        self.bound_socket().map(|(_, addr)| addr)
    }

    fn bound_socket(&mut self) -> Result<(Arc<UdpSocket>, SocketAddr), RelayError> {
        if self.state == RelayState::Stopped {
            return Err(RelayError::Stopped);
        }
        if let (Some(socket), Some(addr)) = (&self.socket, self.local_addr) {
            return Ok((Arc::clone(socket), addr));
        }
        let socket = UdpSocket::bind((self.config.host.as_str(), self.config.port))?;
        socket.set_read_timeout(Some(read_timeout(self.config.poll_interval)))?;
        let addr = socket.local_addr()?;
        info!("relay server bound to {addr}");
        let socket = Arc::new(socket);
        self.socket = Some(Arc::clone(&socket));
        self.local_addr = Some(addr);
        Ok((socket, addr))
    }

    /// Bind if needed and start the receive loop. Calling it again while
    /// running is a no-op. Fails with `RelayError::Stopped` after `stop()`.
    pub fn start(&mut self) -> Result<SocketAddr, RelayError> {
        let (socket, addr) = self.bound_socket()?;
        if self.state == RelayState::Running {
            return Ok(addr);
        }

        self.keep_running.store(true, Ordering::SeqCst);
        let worker = ServerWorker {
            socket,
            registry: Arc::clone(&self.registry),
            counters: Arc::clone(&self.counters),
            keep_running: Arc::clone(&self.keep_running),
            buffer_size: recv_buffer_len(self.config.buffer_size),
        };
        let thread = thread::Builder::new()
            .name("relay-server".into())
            .spawn(move || worker.run())
            .inspect_err(|_| self.keep_running.store(false, Ordering::SeqCst))?;

        self.thread = Some(thread);
        self.state = RelayState::Running;
        info!("relay server running on {addr}");
        Ok(addr)
    }

    /// Stop the loop and release the socket. Safe to call repeatedly and
    /// on a server that never started.
    pub fn stop(&mut self) {
        if self.state == RelayState::Stopped {
            return;
        }
        let was_running = self.state == RelayState::Running;
        self.keep_running.store(false, Ordering::SeqCst);
        if let Some(socket) = &self.socket {
            wake(socket);
        }
        if let Some(handle) = self.thread.take() {
            join_with_timeout(handle, self.config.join_timeout, "relay server");
        }
        self.socket = None;
        self.local_addr = None;
        self.state = RelayState::Stopped;
        if was_running {
            info!("relay server stopped");
        }
    }

    pub fn state(&self) -> RelayState {
        self.state
    }

    /// `true` while this handle holds an open socket.
    pub fn is_bound(&self) -> bool {
        self.socket.is_some()
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Addresses currently in the registry.
    pub fn peers(&self) -> Vec<SocketAddr> {
        self.registry.lock().addresses()
    }

    pub fn peer_count(&self) -> usize {
        self.registry.lock().len()
    }

    pub fn stats(&self) -> ServerStats {
        self.counters.snapshot()
    }
}

impl Drop for RelayServer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Everything the worker thread owns.
struct ServerWorker {
    socket: Arc<UdpSocket>,
    registry: Arc<Mutex<PeerRegistry>>,
    counters: Arc<ServerCounters>,
    keep_running: Arc<AtomicBool>,
    buffer_size: usize,
}

impl ServerWorker {
    fn run(self) {
        let mut buf = vec![0u8; self.buffer_size];
        loop {
            let received = self.socket.recv_from(&mut buf);
            if !self.keep_running.load(Ordering::SeqCst) {
                break;
            }
            match received {
                Ok((len, sender)) => self.relay(&buf[..len], sender),
                Err(e) => match classify_recv_error(&e) {
                    RecvOutcome::Retry => continue,
                    RecvOutcome::Fatal => {
                        warn!("relay server receive failed, loop exiting: {e}");
                        break;
                    }
                },
            }
        }
        debug!("relay server worker exited");
    }

    /// Register the sender, forward to everyone else, sweep stale peers.
    fn relay(&self, payload: &[u8], sender: SocketAddr) {
        bump(&self.counters.datagrams_received);
        let now = Instant::now();

        let targets = {
            let mut registry = self.registry.lock();
            if registry.touch(sender, now) {
                debug!("peer registered: {sender}");
            }
            registry.fan_out_targets(sender, now)
        };

        trace!(
            "forwarding {} bytes from {sender} to {} peer(s)",
            payload.len(),
            targets.len()
        );
        for target in targets {
            match self.socket.send_to(payload, target) {
                Ok(_) => bump(&self.counters.datagrams_forwarded),
                Err(e) => {
                    bump(&self.counters.forward_failures);
                    debug!("forward to {target} failed: {e}");
                }
            }
        }

        let evicted = self.registry.lock().evict_stale(now);
        if !evicted.is_empty() {
            add(&self.counters.peers_evicted, evicted.len() as u64);
            for addr in &evicted {
                debug!("peer evicted after inactivity: {addr}");
            }
        }
    }
}

// UDP client for talking to the relay server.
//
// The client sends text to one fixed server address and hands every
// datagram it receives to a caller-supplied handler. Received datagrams may
// originate from any other game instance; the server forwards them
// verbatim.
//
// Architecture mirrors `server.rs`: `start()` binds an ephemeral socket and
// spawns a receiver thread that blocks in `recv_from` and decodes the
// payload (dropping invalid UTF-8 sequences). Decoded text goes over an
// `mpsc` channel to a dispatcher thread, which calls the handler. Only the
// receiver touches the socket, so a handler that blocks cannot keep the
// port open: `stop()` clears the running flag, wakes the receiver, joins
// it, releases the socket, and only then waits (with a deadline) for the
// dispatcher. Text still queued when the flag clears is discarded.
//
// `send()` is best-effort: no acknowledgement, no retry, no ordering. A
// failed send is counted and logged, never returned. Position updates are
// superseded by the next one anyway.
//
// A panicking handler is caught, logged and counted; the loop carries on
// with the next datagram. One buggy frame must not silence every later one.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, ToSocketAddrs, UdpSocket};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use log::{debug, error, info, trace, warn};
use shattered_fates_protocol::datagram;

use crate::config::{ClientConfig, read_timeout, recv_buffer_len};
use crate::error::RelayError;
use crate::stats::{ClientCounters, ClientStats, bump};
use crate::worker::{RecvOutcome, RelayState, classify_recv_error, join_with_timeout, wake};

/// Callback invoked on the dispatcher thread with each decoded payload.
pub type MessageHandler = Box<dyn FnMut(&str) + Send + 'static>;

/// Relay client handle. Dropping it stops the client.
pub struct RelayClient {
    server_addr: SocketAddr,
    config: ClientConfig,
    state: RelayState,
    handler: Option<MessageHandler>,
    socket: Option<Arc<UdpSocket>>,
    keep_running: Arc<AtomicBool>,
    counters: Arc<ClientCounters>,
    receiver: Option<JoinHandle<()>>,
    dispatcher: Option<JoinHandle<()>>,
}

impl RelayClient {
    /// Create a client for the server at `host:port` with default tuning.
    /// Fails only if the address cannot be resolved.
    pub fn new(
        host: &str,
        port: u16,
        handler: impl FnMut(&str) + Send + 'static,
    ) -> Result<Self, RelayError> {
        Self::with_config(host, port, ClientConfig::default(), handler)
    }

    pub fn with_config(
        host: &str,
        port: u16,
        config: ClientConfig,
        handler: impl FnMut(&str) + Send + 'static,
    ) -> Result<Self, RelayError> {
        let server_addr = (host, port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| RelayError::Resolve {
                host: host.to_string(),
                port,
            })?;
        Ok(Self {
            server_addr,
            config,
            state: RelayState::Unstarted,
            handler: Some(Box::new(handler)),
            socket: None,
            keep_running: Arc::new(AtomicBool::new(false)),
            counters: Arc::new(ClientCounters::default()),
            receiver: None,
            dispatcher: None,
        })
    }

    /// Bind an ephemeral local socket and start the receive loop. Returns
    /// the local address. Idempotent while running; fails after `stop()`.
    pub fn start(&mut self) -> Result<SocketAddr, RelayError> {
        match self.state {
            RelayState::Running => {
                if let Some(addr) = self.local_addr() {
                    return Ok(addr);
                }
            }
            RelayState::Stopped => return Err(RelayError::Stopped),
            RelayState::Unstarted => {}
        }
        let Some(mut handler) = self.handler.take() else {
            return Err(RelayError::Stopped);
        };

        let bind_addr = if self.server_addr.is_ipv4() {
            SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0))
        } else {
            SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0))
        };
        let (socket, local) = match bind_client_socket(bind_addr, &self.config) {
            Ok((socket, local)) => (Arc::new(socket), local),
            Err(e) => {
                self.handler = Some(handler);
                return Err(e.into());
            }
        };

        self.keep_running.store(true, Ordering::SeqCst);
        let (outbox, inbox) = mpsc::channel();

        let counters = Arc::clone(&self.counters);
        let keep_running = Arc::clone(&self.keep_running);
        let dispatcher = thread::Builder::new()
            .name("relay-client-dispatch".into())
            .spawn(move || dispatch_loop(&inbox, &mut handler, &counters, &keep_running))
            .inspect_err(|_| {
                // The handler went down with the closure; this client is done.
                self.keep_running.store(false, Ordering::SeqCst);
                self.state = RelayState::Stopped;
            })?;

        let worker_socket = Arc::clone(&socket);
        let counters = Arc::clone(&self.counters);
        let keep_running = Arc::clone(&self.keep_running);
        let buffer_size = recv_buffer_len(self.config.buffer_size);
        // On failure the outbox is dropped with the closure, which ends the
        // dispatcher.
        let receiver = thread::Builder::new()
            .name("relay-client".into())
            .spawn(move || {
                receive_loop(&worker_socket, &outbox, &counters, &keep_running, buffer_size);
            })
            .inspect_err(|_| {
                self.keep_running.store(false, Ordering::SeqCst);
                self.state = RelayState::Stopped;
            })?;

        self.socket = Some(socket);
        self.receiver = Some(receiver);
        self.dispatcher = Some(dispatcher);
        self.state = RelayState::Running;
        info!("relay client {local} talking to {}", self.server_addr);
        Ok(local)
    }

    /// Stop the loop and release the socket. Safe to call repeatedly and
    /// on a client that never started.
    pub fn stop(&mut self) {
        if self.state == RelayState::Stopped {
            return;
        }
        self.keep_running.store(false, Ordering::SeqCst);
        if let Some(socket) = &self.socket {
            wake(socket);
        }
        if let Some(handle) = self.receiver.take() {
            join_with_timeout(handle, self.config.join_timeout, "relay client receiver");
        }
        self.socket = None;
        if let Some(handle) = self.dispatcher.take() {
            join_with_timeout(handle, self.config.join_timeout, "relay client dispatcher");
        }
        self.handler = None;
        if self.state == RelayState::Running {
            debug!("relay client stopped");
        }
        self.state = RelayState::Stopped;
    }

    /// Send `text` to the server as UTF-8. Best-effort: failures (including
    /// sending before `start()`) are counted in `stats()` and logged.
    pub fn send(&self, text: &str) {
        let Some(socket) = &self.socket else {
            bump(&self.counters.send_failures);
            debug!("send dropped, client not running: {text:?}");
            return;
        };
        match socket.send_to(&datagram::encode(text), self.server_addr) {
            Ok(_) => bump(&self.counters.datagrams_sent),
            Err(e) => {
                bump(&self.counters.send_failures);
                debug!("send to {} failed: {e}", self.server_addr);
            }
        }
    }

    pub fn server_addr(&self) -> SocketAddr {
        self.server_addr
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.as_ref().and_then(|s| s.local_addr().ok())
    }

    pub fn state(&self) -> RelayState {
        self.state
    }

    pub fn is_bound(&self) -> bool {
        self.socket.is_some()
    }

    pub fn stats(&self) -> ClientStats {
        self.counters.snapshot()
    }
}

impl Drop for RelayClient {
    fn drop(&mut self) {
        self.stop();
    }
}

fn bind_client_socket(
    addr: SocketAddr,
    config: &ClientConfig,
) -> std::io::Result<(UdpSocket, SocketAddr)> {
    let socket = UdpSocket::bind(addr)?;
    socket.set_read_timeout(Some(read_timeout(config.poll_interval)))?;
    let local = socket.local_addr()?;
    Ok((socket, local))
}

fn receive_loop(
    socket: &UdpSocket,
    outbox: &Sender<String>,
    counters: &ClientCounters,
    keep_running: &AtomicBool,
    buffer_size: usize,
) {
    let mut buf = vec![0u8; buffer_size];
    loop {
        let received = socket.recv_from(&mut buf);
        if !keep_running.load(Ordering::SeqCst) {
            break;
        }
        match received {
            Ok((len, from)) => {
                bump(&counters.datagrams_received);
                trace!("received {len} bytes from {from}");
                if outbox.send(datagram::decode(&buf[..len])).is_err() {
                    warn!("relay client dispatcher gone, receiver exiting");
                    break;
                }
            }
            Err(e) => match classify_recv_error(&e) {
                RecvOutcome::Retry => continue,
                RecvOutcome::Fatal => {
                    warn!("relay client receive failed, loop exiting: {e}");
                    break;
                }
            },
        }
    }
    debug!("relay client receiver exited");
}

/// Runs until the receiver drops its end of the channel or the client is
/// stopped.
fn dispatch_loop(
    inbox: &Receiver<String>,
    handler: &mut MessageHandler,
    counters: &ClientCounters,
    keep_running: &AtomicBool,
) {
    for text in inbox.iter() {
        if !keep_running.load(Ordering::SeqCst) {
            break;
        }
        if panic::catch_unwind(AssertUnwindSafe(|| handler(&text))).is_err() {
            bump(&counters.handler_panics);
            error!("message handler panicked on {text:?}; continuing");
        }
    }
    debug!("relay client dispatcher exited");
}

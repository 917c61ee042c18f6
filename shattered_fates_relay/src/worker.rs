// Background receive-loop plumbing shared by `server.rs` and `client.rs`.
//
// Both endpoints own exactly one worker thread that blocks in `recv_from`.
// Shutdown is cooperative: clear the running flag, poke the socket with an
// empty datagram so a blocked `recv_from` returns at once, then wait for the
// thread with a deadline. The socket also carries a read timeout, so a
// worker whose wake-up datagram got lost still notices the flag within one
// poll interval.
//
// `JoinHandle` has no timed join, so `join_with_timeout` polls
// `is_finished()`. A worker still running at the deadline is abandoned;
// it exits on its own at its next read timeout, releasing its socket clone.

use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::warn;

const JOIN_POLL: Duration = Duration::from_millis(5);

/// Lifecycle of a relay endpoint. Only `Running` processes datagrams.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RelayState {
    Unstarted,
    Running,
    Stopped,
}

/// What the receive loop should do after `recv_from` returned an error.
pub(crate) enum RecvOutcome {
    /// Read timeout (or a spurious ICMP report); go around again.
    Retry,
    /// Anything else ends the loop.
    Fatal,
}

pub(crate) fn classify_recv_error(err: &io::Error) -> RecvOutcome {
    match err.kind() {
        io::ErrorKind::WouldBlock
        | io::ErrorKind::TimedOut
        | io::ErrorKind::Interrupted
        // Windows reports an earlier send's ICMP port-unreachable on the
        // next recv. It says nothing about this socket's health.
        | io::ErrorKind::ConnectionReset => RecvOutcome::Retry,
        _ => RecvOutcome::Fatal,
    }
}

/// Address a socket can send to in order to reach itself.
pub(crate) fn loopback_of(local: SocketAddr) -> SocketAddr {
    let ip = match local.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
        IpAddr::V6(ip) if ip.is_unspecified() => IpAddr::V6(Ipv6Addr::LOCALHOST),
        ip => ip,
    };
    SocketAddr::new(ip, local.port())
}

/// Unblock a worker sitting in `recv_from` on `socket`.
pub(crate) fn wake(socket: &UdpSocket) {
    if let Ok(local) = socket.local_addr() {
        let _ = socket.send_to(&[], loopback_of(local));
    }
}

/// Join `handle`, giving up after `timeout`. Returns `true` if the worker
/// was joined.
pub(crate) fn join_with_timeout(handle: JoinHandle<()>, timeout: Duration, name: &str) -> bool {
    let deadline = Instant::now() + timeout;
    while !handle.is_finished() {
        if Instant::now() >= deadline {
            warn!("{name} worker still running after {timeout:?}; abandoning it");
            return false;
        }
        thread::sleep(JOIN_POLL);
    }
    if handle.join().is_err() {
        warn!("{name} worker panicked");
    }
    true
}

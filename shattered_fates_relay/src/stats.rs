// Traffic counters for the relay endpoints.
//
// The receive loops and `send()` swallow transport errors, so
// these counters are the only way to notice that datagrams are being lost.
// Workers bump the atomics; callers read a plain snapshot via `stats()`.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Snapshot of a server's counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ServerStats {
    pub datagrams_received: u64,
    pub datagrams_forwarded: u64,
    pub forward_failures: u64,
    pub peers_evicted: u64,
}

/// Snapshot of a client's counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ClientStats {
    pub datagrams_sent: u64,
    pub send_failures: u64,
    pub datagrams_received: u64,
    pub handler_panics: u64,
}

#[derive(Debug, Default)]
pub(crate) struct ServerCounters {
    pub datagrams_received: AtomicU64,
    pub datagrams_forwarded: AtomicU64,
    pub forward_failures: AtomicU64,
    pub peers_evicted: AtomicU64,
}

impl ServerCounters {
    pub fn snapshot(&self) -> ServerStats {
        ServerStats {
            datagrams_received: self.datagrams_received.load(Ordering::Relaxed),
            datagrams_forwarded: self.datagrams_forwarded.load(Ordering::Relaxed),
            forward_failures: self.forward_failures.load(Ordering::Relaxed),
            peers_evicted: self.peers_evicted.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct ClientCounters {
    pub datagrams_sent: AtomicU64,
    pub send_failures: AtomicU64,
    pub datagrams_received: AtomicU64,
    pub handler_panics: AtomicU64,
}

impl ClientCounters {
    pub fn snapshot(&self) -> ClientStats {
        ClientStats {
            datagrams_sent: self.datagrams_sent.load(Ordering::Relaxed),
            send_failures: self.send_failures.load(Ordering::Relaxed),
            datagrams_received: self.datagrams_received.load(Ordering::Relaxed),
            handler_panics: self.handler_panics.load(Ordering::Relaxed),
        }
    }
}

pub(crate) fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

pub(crate) fn add(counter: &AtomicU64, n: u64) {
    counter.fetch_add(n, Ordering::Relaxed);
}

// Server-side peer registry: UDP address -> last-seen instant.
//
// A peer exists only because it sent us something. Every datagram refreshes
// its sender's entry; entries older than the staleness threshold are both
// excluded from fan-out and swept out after each datagram.
//
// Callers pass `now` explicitly instead of the registry reading the clock,
// which keeps the eviction rules testable without sleeping.
//
// Storage is a `BTreeMap` so fan-out order is the address order, not hash
// order. Nothing depends on that order, but it makes logs comparable.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

#[derive(Clone, Debug)]
pub struct PeerRegistry {
    peers: BTreeMap<SocketAddr, Instant>,
    staleness_threshold: Duration,
}

impl PeerRegistry {
    pub fn new(staleness_threshold: Duration) -> Self {
        Self {
            peers: BTreeMap::new(),
            staleness_threshold,
        }
    }

    pub fn staleness_threshold(&self) -> Duration {
        self.staleness_threshold
    }

    /// Record traffic from `addr`. Returns `true` if the peer is new.
    pub fn touch(&mut self, addr: SocketAddr, now: Instant) -> bool {
        self.peers.insert(addr, now).is_none()
    }

    fn is_stale(&self, last_seen: Instant, now: Instant) -> bool {
        now.saturating_duration_since(last_seen) > self.staleness_threshold
    }

    /// Every live peer except `sender`.
    pub fn fan_out_targets(&self, sender: SocketAddr, now: Instant) -> Vec<SocketAddr> {
        self.peers
            .iter()
            .filter(|&(&addr, &last_seen)| addr != sender && !self.is_stale(last_seen, now))
            .map(|(&addr, _)| addr)
            .collect()
    }

    /// Remove every peer whose last-seen age exceeds the threshold and
    /// return their addresses.
    pub fn evict_stale(&mut self, now: Instant) -> Vec<SocketAddr> {
        let stale: Vec<SocketAddr> = self
            .peers
            .iter()
            .filter(|&(_, &last_seen)| self.is_stale(last_seen, now))
            .map(|(&addr, _)| addr)
            .collect();
        for addr in &stale {
            self.peers.remove(addr);
        }
        stale
    }

    pub fn last_seen(&self, addr: &SocketAddr) -> Option<Instant> {
        self.peers.get(addr).copied()
    }

    pub fn contains(&self, addr: &SocketAddr) -> bool {
        self.peers.contains_key(addr)
    }

    pub fn addresses(&self) -> Vec<SocketAddr> {
        self.peers.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

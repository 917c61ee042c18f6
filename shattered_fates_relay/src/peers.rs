// Table of remote players' last reported positions.
//
// Fed by a `RelayClient` handler: each received datagram is parsed as a
// `Frame`, and `POS` frames from anyone other than the local player update
// that peer's entry. Last write wins; UDP gives no ordering, so the latest
// datagram to arrive is the truth.
//
// Keys are application-level `PeerId`s, never socket addresses. The relay
// server's registry and this table describe different things and are not
// reconciled.
//
// `SharedPeerTable` wraps the table in a mutex so the client's worker can
// write while the game loop reads.

use std::collections::BTreeMap;
use std::sync::Arc;

use log::trace;
use parking_lot::Mutex;
use shattered_fates_protocol::{Frame, PeerId, Position};

#[derive(Clone, Debug)]
pub struct PeerTable {
    local_id: PeerId,
    peers: BTreeMap<PeerId, Position>,
}

impl PeerTable {
    pub fn new(local_id: PeerId) -> Self {
        Self {
            local_id,
            peers: BTreeMap::new(),
        }
    }

    pub fn local_id(&self) -> &PeerId {
        &self.local_id
    }

    /// Apply one received payload. Returns the peer whose position changed,
    /// if any. Malformed text, `HELLO` frames and our own echoes are
    /// ignored.
    pub fn apply(&mut self, text: &str) -> Option<PeerId> {
        match Frame::parse(text) {
            Ok(frame) => self.apply_frame(frame),
            Err(e) => {
                trace!("ignoring payload {text:?}: {e}");
                None
            }
        }
    }

    pub fn apply_frame(&mut self, frame: Frame) -> Option<PeerId> {
        match frame {
            Frame::Pos { peer_id, position } if peer_id != self.local_id => {
                self.peers.insert(peer_id.clone(), position);
                Some(peer_id)
            }
            Frame::Pos { .. } | Frame::Hello { .. } => None,
        }
    }

    pub fn get(&self, peer_id: &PeerId) -> Option<Position> {
        self.peers.get(peer_id).copied()
    }

    pub fn remove(&mut self, peer_id: &PeerId) -> Option<Position> {
        self.peers.remove(peer_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PeerId, &Position)> {
        self.peers.iter()
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

/// A `PeerTable` shared between a relay client's worker and the game loop.
#[derive(Clone, Debug)]
pub struct SharedPeerTable(Arc<Mutex<PeerTable>>);

impl SharedPeerTable {
    pub fn new(local_id: PeerId) -> Self {
        Self(Arc::new(Mutex::new(PeerTable::new(local_id))))
    }

    /// A message handler for `RelayClient::new` that feeds this table.
    pub fn handler(&self) -> impl FnMut(&str) + Send + 'static + use<> {
        let table = Arc::clone(&self.0);
        move |text: &str| {
            table.lock().apply(text);
        }
    }

    pub fn get(&self, peer_id: &PeerId) -> Option<Position> {
        self.0.lock().get(peer_id)
    }

    /// Copy of every known peer's position.
    pub fn snapshot(&self) -> BTreeMap<PeerId, Position> {
        self.0.lock().peers.clone()
    }

    pub fn len(&self) -> usize {
        self.0.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> PeerId {
        PeerId::new(s).unwrap()
    }

    #[test]
    fn pos_from_remote_peer_is_recorded() {
        let mut table = PeerTable::new(id("me"));
        assert_eq!(table.apply("POS|A|10|20"), Some(id("A")));
        assert_eq!(table.get(&id("A")), Some(Position::new(10.0, 20.0)));
    }

    #[test]
    fn own_pos_is_ignored() {
        let mut table = PeerTable::new(id("me"));
        assert_eq!(table.apply("POS|me|1|1"), None);
        assert!(table.is_empty());
    }

    #[test]
    fn latest_update_wins() {
        let mut table = PeerTable::new(id("me"));
        table.apply("POS|A|10|20");
        table.apply("POS|A|11.5|19");
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(&id("A")), Some(Position::new(11.5, 19.0)));
    }

    #[test]
    fn hello_and_garbage_do_not_create_entries() {
        let mut table = PeerTable::new(id("me"));
        assert_eq!(table.apply("HELLO|A"), None);
        assert_eq!(table.apply("POS|A|x|y"), None);
        assert_eq!(table.apply(""), None);
        assert_eq!(table.apply("\u{0}\u{1}"), None);
        assert!(table.is_empty());
    }

    #[test]
    fn shared_handler_feeds_table() {
        let shared = SharedPeerTable::new(id("me"));
        let mut handler = shared.handler();
        handler("POS|B|300|400");
        handler("POS|me|0|0");
        assert_eq!(shared.len(), 1);
        assert_eq!(shared.get(&id("B")), Some(Position::new(300.0, 400.0)));
        assert_eq!(
            shared.snapshot().into_iter().collect::<Vec<_>>(),
            vec![(id("B"), Position::new(300.0, 400.0))]
        );
    }
}

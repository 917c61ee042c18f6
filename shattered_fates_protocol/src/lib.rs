// shattered_fates_protocol: wire format for the position relay.
//
// Shared between the relay server/client (`shattered_fates_relay`) and the
// game instances that speak through it. Has no networking code of its own.
//
// Module overview:
// - `types.rs`:     `PeerId` (application-level identity) and `Position`.
// - `message.rs`:   `Frame`: the `HELLO` / `POS` text grammar, parse and
//                   encode.
// - `datagram.rs`:  UTF-8 payload encode/decode and the receive buffer size.
//
// The relay is payload-agnostic: it forwards bytes unchanged and never calls
// into `message.rs`. Only the endpoints interpret frames.

pub mod datagram;
pub mod message;
pub mod types;

pub use datagram::MAX_DATAGRAM_SIZE;
pub use message::{Frame, FrameError};
pub use types::{PeerId, Position};

// Core value types for the position relay protocol.
//
// `PeerId` is the application-level identity a game instance announces in
// its frames. It is deliberately unrelated to the UDP address the relay
// server sees: several application peers may sit behind one address, and
// one peer may change address between sessions. The relay keys on
// addresses, the game keys on `PeerId`, and nothing here maps one to the
// other.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::message::{FIELD_SEPARATOR, FrameError};

/// Application-level peer identifier carried in `HELLO` and `POS` frames.
///
/// Never empty and never contains the field separator, so it always
/// survives an encode/parse cycle.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PeerId(String);

impl PeerId {
    pub fn new(id: impl Into<String>) -> Result<Self, FrameError> {
        let id = id.into();
        if id.is_empty() {
            return Err(FrameError::EmptyPeerId);
        }
        if id.contains(FIELD_SEPARATOR) {
            return Err(FrameError::SeparatorInPeerId(id));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PeerId {
    type Error = FrameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PeerId> for String {
    fn from(id: PeerId) -> Self {
        id.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A continuous world position, in the same units as the tile grid's cell
/// size (pixels in the game).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

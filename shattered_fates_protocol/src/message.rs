// Text frames exchanged between game instances through the relay.
//
// Frames are pipe-delimited ASCII with no length prefix and no checksum:
//
//   HELLO|<peer-id>          registration / keepalive
//   POS|<peer-id>|<x>|<y>    position broadcast
//
// The relay itself never parses frames; it forwards whatever bytes arrive.
// Parsing happens on the receiving game instance (see `peers.rs` in the
// relay crate), and encoding on the sending one.
//
// Parsing is lenient about trailing fields on `POS` (older builds appended
// extra data) but strict about everything it actually reads.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::types::{PeerId, Position};

/// Separator between fields of a frame.
pub const FIELD_SEPARATOR: char = '|';

pub const HELLO_TAG: &str = "HELLO";
pub const POS_TAG: &str = "POS";

/// A decoded protocol frame.
#[derive(Clone, Debug, PartialEq)]
pub enum Frame {
    /// Makes the relay learn the sender's address. No payload semantics.
    Hello { peer_id: PeerId },
    /// The sender's latest position.
    Pos { peer_id: PeerId, position: Position },
}

#[derive(Debug, Error, PartialEq)]
pub enum FrameError {
    #[error("empty frame")]
    Empty,
    #[error("unknown frame tag `{0}`")]
    UnknownTag(String),
    #[error("{tag} frame needs {expected} fields, got {found}")]
    MissingFields {
        tag: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("peer id must not be empty")]
    EmptyPeerId,
    #[error("peer id `{0}` contains the field separator")]
    SeparatorInPeerId(String),
    #[error("invalid coordinate `{0}`")]
    InvalidCoordinate(String),
}

impl Frame {
    pub fn hello(peer_id: PeerId) -> Self {
        Self::Hello { peer_id }
    }

    pub fn pos(peer_id: PeerId, position: Position) -> Self {
        Self::Pos { peer_id, position }
    }

    /// The peer that sent this frame.
    pub fn peer_id(&self) -> &PeerId {
        match self {
            Self::Hello { peer_id } | Self::Pos { peer_id, .. } => peer_id,
        }
    }

    /// Parse a frame from decoded datagram text.
    pub fn parse(text: &str) -> Result<Self, FrameError> {
        if text.is_empty() {
            return Err(FrameError::Empty);
        }
        let fields: Vec<&str> = text.split(FIELD_SEPARATOR).collect();
        match fields[0] {
            HELLO_TAG => {
                let id = fields.get(1).ok_or(FrameError::MissingFields {
                    tag: HELLO_TAG,
                    expected: 2,
                    found: fields.len(),
                })?;
                Ok(Self::Hello {
                    peer_id: PeerId::new(*id)?,
                })
            }
            POS_TAG => {
                if fields.len() < 4 {
                    return Err(FrameError::MissingFields {
                        tag: POS_TAG,
                        expected: 4,
                        found: fields.len(),
                    });
                }
                let peer_id = PeerId::new(fields[1])?;
                let x = parse_coordinate(fields[2])?;
                let y = parse_coordinate(fields[3])?;
                Ok(Self::Pos {
                    peer_id,
                    position: Position::new(x, y),
                })
            }
            other => Err(FrameError::UnknownTag(other.to_string())),
        }
    }
}

fn parse_coordinate(field: &str) -> Result<f32, FrameError> {
    let value: f32 = field
        .trim()
        .parse()
        .map_err(|_| FrameError::InvalidCoordinate(field.to_string()))?;
    // `f32::from_str` accepts "inf" and "NaN"; neither is a position.
    if !value.is_finite() {
        return Err(FrameError::InvalidCoordinate(field.to_string()));
    }
    Ok(value)
}

impl FromStr for Frame {
    type Err = FrameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sep = FIELD_SEPARATOR;
        match self {
            Self::Hello { peer_id } => write!(f, "{HELLO_TAG}{sep}{peer_id}"),
            Self::Pos { peer_id, position } => write!(
                f,
                "{POS_TAG}{sep}{peer_id}{sep}{}{sep}{}",
                position.x, position.y
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> PeerId {
        PeerId::new(s).unwrap()
    }

    #[test]
    fn parse_hello() {
        assert_eq!(Frame::parse("HELLO|A").unwrap(), Frame::hello(id("A")));
    }

    #[test]
    fn parse_pos_integer_literals() {
        let frame = Frame::parse("POS|A|10|20").unwrap();
        assert_eq!(frame, Frame::pos(id("A"), Position::new(10.0, 20.0)));
    }

    #[test]
    fn parse_pos_decimal_and_negative() {
        let frame = Frame::parse("POS|npc-7|-3.5|128.25").unwrap();
        assert_eq!(frame, Frame::pos(id("npc-7"), Position::new(-3.5, 128.25)));
    }

    #[test]
    fn parse_pos_ignores_trailing_fields() {
        let frame = Frame::parse("POS|B|1|2|extra|stuff").unwrap();
        assert_eq!(frame, Frame::pos(id("B"), Position::new(1.0, 2.0)));
    }

    #[test]
    fn encode_matches_wire_shape() {
        assert_eq!(Frame::hello(id("A")).to_string(), "HELLO|A");
        assert_eq!(
            Frame::pos(id("A"), Position::new(10.0, 20.0)).to_string(),
            "POS|A|10|20"
        );
        assert_eq!(
            Frame::pos(id("A"), Position::new(100.5, -2.25)).to_string(),
            "POS|A|100.5|-2.25"
        );
    }

    #[test]
    fn encoded_pos_parses_back() {
        let frame = Frame::pos(id("4f1c"), Position::new(313.75, 0.5));
        let parsed: Frame = frame.to_string().parse().unwrap();
        assert_eq!(parsed, frame);
    }

    #[test]
    fn rejects_short_pos() {
        assert_eq!(
            Frame::parse("POS|A|10"),
            Err(FrameError::MissingFields {
                tag: POS_TAG,
                expected: 4,
                found: 3
            })
        );
    }

    #[test]
    fn rejects_hello_without_id() {
        assert!(matches!(
            Frame::parse("HELLO"),
            Err(FrameError::MissingFields { tag: HELLO_TAG, .. })
        ));
        assert_eq!(Frame::parse("HELLO|"), Err(FrameError::EmptyPeerId));
    }

    #[test]
    fn rejects_bad_coordinates() {
        assert!(matches!(
            Frame::parse("POS|A|ten|20"),
            Err(FrameError::InvalidCoordinate(_))
        ));
        assert!(matches!(
            Frame::parse("POS|A|inf|20"),
            Err(FrameError::InvalidCoordinate(_))
        ));
        assert!(matches!(
            Frame::parse("POS|A|1|NaN"),
            Err(FrameError::InvalidCoordinate(_))
        ));
    }

    #[test]
    fn rejects_unknown_and_empty() {
        assert_eq!(
            Frame::parse("CHAT|A|hi"),
            Err(FrameError::UnknownTag("CHAT".into()))
        );
        assert_eq!(Frame::parse(""), Err(FrameError::Empty));
    }

    #[test]
    fn tags_are_case_sensitive() {
        assert!(matches!(
            Frame::parse("pos|A|1|2"),
            Err(FrameError::UnknownTag(_))
        ));
    }
}

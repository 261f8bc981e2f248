//! Protocol error
use std::fmt;

/// An error when translating buffer from or into mysql wire format.
pub enum ProtocolError {
    /// Envelope sequence number is not the expected one.
    SequenceMismatch {
        expect: u8,
        found: u8,
    },
    /// Stream ended in the middle of an envelope.
    Truncated {
        remaining: usize,
    },
    /// Envelope payload does not fit in 3 bytes length header.
    PayloadTooLarge {
        len: usize,
    },
    /// Incoming envelope is larger than the envelope size.
    EnvelopeTooLarge {
        len: usize,
        max: usize,
    },
    /// Packet content does not match its declared layout.
    Malformed {
        packet: &'static str,
    },
    /// Packet header is not the one expected in current phase.
    Unexpected {
        found: u8,
        phase: &'static str,
    },
}

impl ProtocolError {
    pub(crate) fn malformed(packet: &'static str) -> ProtocolError {
        Self::Malformed { packet }
    }

    pub(crate) fn unexpected(found: u8, phase: &'static str) -> ProtocolError {
        Self::Unexpected { found, phase }
    }
}

impl std::error::Error for ProtocolError { }

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SequenceMismatch { expect, found } => {
                write!(f, "envelope sequence mismatch, expected {expect} found {found}")
            }
            Self::Truncated { remaining } => {
                write!(f, "stream ended with {remaining} bytes of incomplete envelope")
            }
            Self::PayloadTooLarge { len } => {
                write!(f, "envelope payload of {len} bytes exceed 3 bytes length header")
            }
            Self::EnvelopeTooLarge { len, max } => {
                write!(f, "incoming envelope of {len} bytes exceed envelope size of {max} bytes")
            }
            Self::Malformed { packet } => write!(f, "malformed `{packet}` packet"),
            Self::Unexpected { found, phase } => {
                write!(f, "unexpected packet header 0x{found:02X} in `{phase}`")
            }
        }
    }
}

impl fmt::Debug for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

//! Error types for wire format operations.

use std::fmt;

use bytestream::ByteError;

use crate::command::CommandKind;

/// Result type for wire format operations.
pub type WireResult<T> = Result<T, DecodeError>;

/// High-level decode errors for command framing.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DecodeError {
    /// Payload is too small to contain the required header.
    PacketTooSmall { actual: usize, required: usize },

    /// Packet body is encrypted and cannot be framed.
    EncryptedPacket,

    /// Limits exceeded.
    LimitsExceeded {
        kind: LimitKind,
        limit: usize,
        actual: usize,
    },

    /// Command framing error.
    CommandFraming(CommandFramingError),

    /// A fragment view was requested for a non-fragment command.
    NotAFragment { kind: CommandKind },

    /// Reliable message body does not start with the message signature.
    InvalidSignature { found: u8 },

    /// Reliable message body is encrypted.
    EncryptedMessage,

    /// Message type byte is not an event, request, or response.
    UnsupportedMessageType { raw: u8 },

    /// Low-level read failure inside a fixed-size structure.
    Bytes(ByteError),
}

/// Specific wire limits that can be exceeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitKind {
    PacketBytes,
    CommandCount,
    CommandLength,
}

/// Errors that can occur while framing commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandFramingError {
    /// Declared length is smaller than the command header.
    LengthBelowHeader { length: u32 },
    /// Declared length runs past the end of the payload.
    Truncated { needed: usize, available: usize },
    /// Unreliable body is too short to hold its sequence prefix.
    MissingUnreliablePrefix { body_len: usize },
}

/// Errors that can occur while building fixtures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    LengthOverflow { length: usize },
}

impl From<ByteError> for DecodeError {
    fn from(err: ByteError) -> Self {
        Self::Bytes(err)
    }
}

impl From<CommandFramingError> for DecodeError {
    fn from(err: CommandFramingError) -> Self {
        Self::CommandFraming(err)
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PacketTooSmall { actual, required } => {
                write!(
                    f,
                    "packet too small: {actual} bytes, need at least {required}"
                )
            }
            Self::EncryptedPacket => write!(f, "packet is encrypted"),
            Self::LimitsExceeded {
                kind,
                limit,
                actual,
            } => {
                write!(f, "{kind} limit exceeded: {actual} > {limit}")
            }
            Self::CommandFraming(err) => write!(f, "command framing error: {err}"),
            Self::NotAFragment { kind } => {
                write!(f, "command {kind:?} is not a reliable fragment")
            }
            Self::InvalidSignature { found } => {
                write!(f, "invalid message signature: 0x{found:02X}")
            }
            Self::EncryptedMessage => write!(f, "message is encrypted"),
            Self::UnsupportedMessageType { raw } => {
                write!(f, "unsupported message type: {raw}")
            }
            Self::Bytes(err) => write!(f, "read error: {err}"),
        }
    }
}

impl fmt::Display for LimitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::PacketBytes => "packet bytes",
            Self::CommandCount => "command count",
            Self::CommandLength => "command length",
        };
        write!(f, "{name}")
    }
}

impl fmt::Display for CommandFramingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LengthBelowHeader { length } => {
                write!(f, "declared length {length} is below the command header")
            }
            Self::Truncated { needed, available } => {
                write!(
                    f,
                    "truncated command: need {needed} bytes, have {available}"
                )
            }
            Self::MissingUnreliablePrefix { body_len } => {
                write!(
                    f,
                    "unreliable body of {body_len} bytes has no sequence prefix"
                )
            }
        }
    }
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LengthOverflow { length } => {
                write!(f, "length overflow: {length}")
            }
        }
    }
}

impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Bytes(err) => Some(err),
            _ => None,
        }
    }
}

impl std::error::Error for EncodeError {}

//! Command kinds and the framed command view.

/// Kind tag carried in the first byte of every command header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum CommandKind {
    Acknowledge,
    Connect,
    VerifyConnect,
    Disconnect,
    Ping,
    SendReliable,
    SendUnreliable,
    SendReliableFragment,
    /// A kind this decoder does not interpret. Framed, then skipped.
    Other(u8),
}

impl CommandKind {
    /// Parses a command kind from a raw byte.
    ///
    /// Unknown kinds are preserved as [`CommandKind::Other`] so a packet
    /// carrying them still frames correctly.
    #[must_use]
    pub const fn parse(raw: u8) -> Self {
        match raw {
            1 => Self::Acknowledge,
            2 => Self::Connect,
            3 => Self::VerifyConnect,
            4 => Self::Disconnect,
            5 => Self::Ping,
            6 => Self::SendReliable,
            7 => Self::SendUnreliable,
            8 => Self::SendReliableFragment,
            other => Self::Other(other),
        }
    }

    /// Returns the raw kind byte.
    #[must_use]
    pub const fn raw(self) -> u8 {
        match self {
            Self::Acknowledge => 1,
            Self::Connect => 2,
            Self::VerifyConnect => 3,
            Self::Disconnect => 4,
            Self::Ping => 5,
            Self::SendReliable => 6,
            Self::SendUnreliable => 7,
            Self::SendReliableFragment => 8,
            Self::Other(raw) => raw,
        }
    }

    /// Returns `true` if the command body is a whole reliable-style message.
    #[must_use]
    pub const fn carries_message(self) -> bool {
        matches!(self, Self::SendReliable | Self::SendUnreliable)
    }
}

/// One framed command borrowed from a captured payload.
///
/// For [`CommandKind::SendUnreliable`] the four-byte sequence prefix has
/// already been stripped from `data` and subtracted from `length`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command<'a> {
    pub kind: CommandKind,
    pub channel_id: u8,
    pub flags: u8,
    pub reliable_sequence_number: u32,
    /// Declared length, header included.
    pub length: u32,
    pub data: &'a [u8],
}

//! Packet header types and constants.

/// Packet header size in bytes (12 total).
pub const PACKET_HEADER_SIZE: usize = 2 + 1 + 1 + 4 + 4;

/// Size of the CRC trailer that follows the header when CRC is enabled.
pub const CRC_SIZE: usize = 4;

/// Command header size in bytes (12 total).
pub const COMMAND_HEADER_SIZE: usize = 1 + 1 + 1 + 1 + 4 + 4;

/// Sequence prefix carried at the start of unreliable command bodies.
pub const UNRELIABLE_PREFIX_SIZE: usize = 4;

/// Packet flags byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PacketFlags(u8);

impl PacketFlags {
    /// Flag value for an encrypted packet.
    pub const ENCRYPTED: u8 = 0x01;

    /// Flag value for a packet carrying a CRC after the header.
    pub const CRC_ENABLED: u8 = 0xCC;

    /// Creates new flags from a raw value.
    #[must_use]
    pub const fn from_raw(raw: u8) -> Self {
        Self(raw)
    }

    /// Returns the raw flag byte.
    #[must_use]
    pub const fn raw(self) -> u8 {
        self.0
    }

    /// Returns `true` if the packet body is encrypted.
    #[must_use]
    pub const fn is_encrypted(self) -> bool {
        self.0 == Self::ENCRYPTED
    }

    /// Returns `true` if a CRC follows the header.
    #[must_use]
    pub const fn is_crc_enabled(self) -> bool {
        self.0 == Self::CRC_ENABLED
    }
}

/// Packet header preceding the command list.
///
/// `command_count` is informational: the parser reads commands until the
/// payload is exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    pub peer_id: u16,
    pub flags: PacketFlags,
    pub command_count: u8,
    pub timestamp: u32,
    pub challenge: i32,
}

impl PacketHeader {
    /// Creates a plain (no CRC, unencrypted) header.
    #[must_use]
    pub const fn new(peer_id: u16, command_count: u8) -> Self {
        Self {
            peer_id,
            flags: PacketFlags::from_raw(0),
            command_count,
            timestamp: 0,
            challenge: 0,
        }
    }

    /// Number of bytes that precede the first command.
    #[must_use]
    pub const fn encoded_len(&self) -> usize {
        if self.flags.is_crc_enabled() {
            PACKET_HEADER_SIZE + CRC_SIZE
        } else {
            PACKET_HEADER_SIZE
        }
    }
}

//! Packet decoding and command framing.

use bytestream::ByteReader;

use crate::command::{Command, CommandKind};
use crate::error::{CommandFramingError, DecodeError, EncodeError, LimitKind, WireResult};
use crate::header::{
    PacketFlags, PacketHeader, COMMAND_HEADER_SIZE, CRC_SIZE, PACKET_HEADER_SIZE,
    UNRELIABLE_PREFIX_SIZE,
};
use crate::limits::Limits;

/// A decoded packet: header plus commands in wire order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WirePacket<'a> {
    pub header: PacketHeader,
    pub commands: Vec<Command<'a>>,
}

/// Decodes a captured transport payload into header + command slices.
///
/// Any structural failure rejects the whole payload: no partial command list
/// is returned, so callers either see every command or none.
pub fn decode_packet<'a>(buf: &'a [u8], limits: &Limits) -> WireResult<WirePacket<'a>> {
    if buf.len() < PACKET_HEADER_SIZE {
        return Err(DecodeError::PacketTooSmall {
            actual: buf.len(),
            required: PACKET_HEADER_SIZE,
        });
    }
    if buf.len() > limits.max_packet_bytes {
        return Err(DecodeError::LimitsExceeded {
            kind: LimitKind::PacketBytes,
            limit: limits.max_packet_bytes,
            actual: buf.len(),
        });
    }

    let mut reader = ByteReader::new(buf);
    let header = PacketHeader {
        peer_id: reader.read_u16()?,
        flags: PacketFlags::from_raw(reader.read_u8()?),
        command_count: reader.read_u8()?,
        timestamp: reader.read_u32()?,
        challenge: reader.read_i32()?,
    };

    if header.flags.is_encrypted() {
        return Err(DecodeError::EncryptedPacket);
    }
    let header_len = header.encoded_len();
    if buf.len() < header_len {
        return Err(DecodeError::PacketTooSmall {
            actual: buf.len(),
            required: header_len,
        });
    }
    reader.skip(header_len - PACKET_HEADER_SIZE)?;

    let commands = decode_commands(reader.rest(), limits)?;
    Ok(WirePacket { header, commands })
}

/// Frames commands from the bytes following the packet header.
pub fn decode_commands<'a>(payload: &'a [u8], limits: &Limits) -> WireResult<Vec<Command<'a>>> {
    let mut reader = ByteReader::new(payload);
    let mut commands = Vec::new();

    while !reader.is_empty() {
        if commands.len() >= limits.max_commands {
            return Err(DecodeError::LimitsExceeded {
                kind: LimitKind::CommandCount,
                limit: limits.max_commands,
                actual: commands.len() + 1,
            });
        }
        if reader.remaining() < COMMAND_HEADER_SIZE {
            return Err(CommandFramingError::Truncated {
                needed: COMMAND_HEADER_SIZE,
                available: reader.remaining(),
            }
            .into());
        }

        let kind = CommandKind::parse(reader.read_u8()?);
        let channel_id = reader.read_u8()?;
        let flags = reader.read_u8()?;
        let _reserved = reader.read_u8()?;
        let length = reader.read_u32()?;
        let reliable_sequence_number = reader.read_u32()?;

        let declared = length as usize;
        if declared < COMMAND_HEADER_SIZE {
            return Err(CommandFramingError::LengthBelowHeader { length }.into());
        }
        if declared > limits.max_command_len {
            return Err(DecodeError::LimitsExceeded {
                kind: LimitKind::CommandLength,
                limit: limits.max_command_len,
                actual: declared,
            });
        }
        let body_len = declared - COMMAND_HEADER_SIZE;
        if body_len > reader.remaining() {
            return Err(CommandFramingError::Truncated {
                needed: body_len,
                available: reader.remaining(),
            }
            .into());
        }
        let body = reader.read_bytes(body_len)?;

        let command = if kind == CommandKind::SendUnreliable {
            if body.len() < UNRELIABLE_PREFIX_SIZE {
                return Err(CommandFramingError::MissingUnreliablePrefix {
                    body_len: body.len(),
                }
                .into());
            }
            Command {
                kind,
                channel_id,
                flags,
                reliable_sequence_number,
                length: length - UNRELIABLE_PREFIX_SIZE as u32,
                data: &body[UNRELIABLE_PREFIX_SIZE..],
            }
        } else {
            Command {
                kind,
                channel_id,
                flags,
                reliable_sequence_number,
                length,
                data: body,
            }
        };
        commands.push(command);
    }

    Ok(commands)
}

/// Encodes a packet header into `out`, including a zeroed CRC when enabled.
///
/// Used to build fixtures; the decoder never emits traffic.
pub fn encode_packet_header(header: &PacketHeader, out: &mut Vec<u8>) {
    out.reserve(header.encoded_len());
    out.extend_from_slice(&header.peer_id.to_be_bytes());
    out.push(header.flags.raw());
    out.push(header.command_count);
    out.extend_from_slice(&header.timestamp.to_be_bytes());
    out.extend_from_slice(&header.challenge.to_be_bytes());
    if header.flags.is_crc_enabled() {
        out.extend_from_slice(&[0u8; CRC_SIZE]);
    }
}

/// Encodes one command with its header into `out`.
///
/// `body` is written verbatim, so unreliable fixtures must include their
/// four-byte sequence prefix.
pub fn encode_command(
    kind: CommandKind,
    channel_id: u8,
    reliable_sequence_number: u32,
    body: &[u8],
    out: &mut Vec<u8>,
) -> Result<usize, EncodeError> {
    let total = COMMAND_HEADER_SIZE + body.len();
    let length = u32::try_from(total).map_err(|_| EncodeError::LengthOverflow { length: total })?;

    out.push(kind.raw());
    out.push(channel_id);
    out.push(0);
    out.push(0);
    out.extend_from_slice(&length.to_be_bytes());
    out.extend_from_slice(&reliable_sequence_number.to_be_bytes());
    out.extend_from_slice(body);
    Ok(total)
}

//! Reliable fragment view over a framed command.

use bytestream::ByteReader;

use crate::command::{Command, CommandKind};
use crate::error::{DecodeError, EncodeError, WireResult};

/// Fragment header size in bytes (five big-endian `u32` fields).
pub const FRAGMENT_HEADER_SIZE: usize = 5 * 4;

/// One chunk of a fragmented reliable message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FragmentChunk<'a> {
    pub channel_id: u8,
    pub reliable_sequence_number: u32,
    /// Sequence number of the command that started the group.
    pub fragment_group_id: u32,
    pub fragment_count: u32,
    pub fragment_index: u32,
    /// Length of the fully assembled message.
    pub total_length: u32,
    /// Byte offset of `data` within the assembled message.
    pub chunk_offset: u32,
    pub data: &'a [u8],
}

impl<'a> FragmentChunk<'a> {
    /// Reads the fragment header from a `SendReliableFragment` command.
    pub fn parse(command: &Command<'a>) -> WireResult<Self> {
        if command.kind != CommandKind::SendReliableFragment {
            return Err(DecodeError::NotAFragment { kind: command.kind });
        }
        let mut reader = ByteReader::new(command.data);
        let fragment_group_id = reader.read_u32()?;
        let fragment_count = reader.read_u32()?;
        let fragment_index = reader.read_u32()?;
        let total_length = reader.read_u32()?;
        let chunk_offset = reader.read_u32()?;

        Ok(Self {
            channel_id: command.channel_id,
            reliable_sequence_number: command.reliable_sequence_number,
            fragment_group_id,
            fragment_count,
            fragment_index,
            total_length,
            chunk_offset,
            data: reader.rest(),
        })
    }
}

/// Encodes a fragment command body (header + chunk bytes) into `out`.
pub fn encode_fragment_body(
    fragment_group_id: u32,
    fragment_count: u32,
    fragment_index: u32,
    total_length: u32,
    chunk_offset: u32,
    data: &[u8],
    out: &mut Vec<u8>,
) {
    out.extend_from_slice(&fragment_group_id.to_be_bytes());
    out.extend_from_slice(&fragment_count.to_be_bytes());
    out.extend_from_slice(&fragment_index.to_be_bytes());
    out.extend_from_slice(&total_length.to_be_bytes());
    out.extend_from_slice(&chunk_offset.to_be_bytes());
    out.extend_from_slice(data);
}

/// Splits a message into fragment command bodies of at most `chunk_len`
/// data bytes each, in index order.
///
/// Used to build fixtures for reassembly tests.
pub fn split_into_fragment_bodies(
    fragment_group_id: u32,
    message: &[u8],
    chunk_len: usize,
) -> Result<Vec<Vec<u8>>, EncodeError> {
    let chunk_len = chunk_len.max(1);
    let total_length = u32::try_from(message.len()).map_err(|_| EncodeError::LengthOverflow {
        length: message.len(),
    })?;
    let chunks: Vec<&[u8]> = if message.is_empty() {
        vec![&[][..]]
    } else {
        message.chunks(chunk_len).collect()
    };
    let count = u32::try_from(chunks.len())
        .map_err(|_| EncodeError::LengthOverflow { length: chunks.len() })?;

    let mut bodies = Vec::with_capacity(chunks.len());
    let mut offset = 0u32;
    for (index, chunk) in (0u32..).zip(chunks) {
        let mut body = Vec::with_capacity(FRAGMENT_HEADER_SIZE + chunk.len());
        encode_fragment_body(
            fragment_group_id,
            count,
            index,
            total_length,
            offset,
            chunk,
            &mut body,
        );
        // chunk.len() <= message.len() which fits in u32
        offset += chunk.len() as u32;
        bodies.push(body);
    }
    Ok(bodies)
}

//! Command framing for captured reliable/unreliable UDP traffic.
//!
//! This crate handles the binary transport layout: the packet header, the
//! command list, reliable fragment headers, and the reliable message header.
//! It does not decode message bodies; that belongs to the codec.
//!
//! # Design Principles
//!
//! - **All or nothing** - A payload with any framing fault yields no commands.
//! - **Bounded decoding** - Every declared length is validated before slicing.
//! - **Borrowed views** - Commands and fragments borrow from the capture buffer.

mod command;
mod error;
mod fragment;
mod header;
mod limits;
mod message;
mod packet;

pub use command::{Command, CommandKind};
pub use error::{CommandFramingError, DecodeError, EncodeError, LimitKind, WireResult};
pub use fragment::{
    encode_fragment_body, split_into_fragment_bodies, FragmentChunk, FRAGMENT_HEADER_SIZE,
};
pub use header::{
    PacketFlags, PacketHeader, COMMAND_HEADER_SIZE, CRC_SIZE, PACKET_HEADER_SIZE,
    UNRELIABLE_PREFIX_SIZE,
};
pub use limits::Limits;
pub use message::{
    encode_message_header, MessageType, ReliableMessage, ENCRYPTED_MESSAGE_BIT,
    MESSAGE_HEADER_SIZE, MESSAGE_SIGNATURE,
};
pub use packet::{decode_commands, decode_packet, encode_command, encode_packet_header, WirePacket};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_api_exports() {
        let _ = PACKET_HEADER_SIZE;
        let _ = COMMAND_HEADER_SIZE;
        let _ = FRAGMENT_HEADER_SIZE;
        let _ = MESSAGE_SIGNATURE;
        let _ = Limits::default();
        let _ = CommandKind::SendReliable;
        let _ = MessageType::EventData;

        let _: WireResult<()> = Ok(());
    }

    #[test]
    fn fragmented_message_through_packet() {
        let mut message = Vec::new();
        encode_message_header(MessageType::EventData, 1, &mut message);
        message.extend_from_slice(&[0, 0]);

        let bodies = split_into_fragment_bodies(40, &message, 2).unwrap();
        let mut buf = Vec::new();
        encode_packet_header(&PacketHeader::new(1, 3), &mut buf);
        for (seq, body) in (40u32..).zip(&bodies) {
            encode_command(CommandKind::SendReliableFragment, 0, seq, body, &mut buf).unwrap();
        }

        let packet = decode_packet(&buf, &Limits::default()).unwrap();
        assert_eq!(packet.commands.len(), bodies.len());
        let mut assembled = vec![0u8; message.len()];
        for command in &packet.commands {
            let chunk = FragmentChunk::parse(command).unwrap();
            assert_eq!(chunk.fragment_group_id, 40);
            let start = chunk.chunk_offset as usize;
            assembled[start..start + chunk.data.len()].copy_from_slice(chunk.data);
        }
        let parsed = ReliableMessage::parse(&assembled).unwrap();
        assert_eq!(parsed.message_type, MessageType::EventData);
        assert_eq!(parsed.payload, vec![0, 0]);
    }
}

//! Reliable message header: signature, message type, and code.

use crate::error::{DecodeError, WireResult};

/// Signature byte that opens every reliable message body.
pub const MESSAGE_SIGNATURE: u8 = 0xF3;

/// Message header size: signature + type + code.
pub const MESSAGE_HEADER_SIZE: usize = 3;

/// Bit set in the type byte when the message body is encrypted.
pub const ENCRYPTED_MESSAGE_BIT: u8 = 0x80;

/// Semantic kind of a reliable message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    EventData,
    OperationRequest,
    OperationResponse,
}

impl MessageType {
    /// Parses the message type byte.
    pub fn parse(raw: u8) -> WireResult<Self> {
        if raw & ENCRYPTED_MESSAGE_BIT != 0 {
            return Err(DecodeError::EncryptedMessage);
        }
        match raw {
            2 | 6 => Ok(Self::OperationRequest),
            3 | 7 => Ok(Self::OperationResponse),
            4 => Ok(Self::EventData),
            _ => Err(DecodeError::UnsupportedMessageType { raw }),
        }
    }

    /// Canonical wire byte for this type.
    #[must_use]
    pub const fn raw(self) -> u8 {
        match self {
            Self::OperationRequest => 2,
            Self::OperationResponse => 3,
            Self::EventData => 4,
        }
    }
}

/// A complete reliable message: header fields plus the serialized body that
/// follows the code byte.
///
/// Owned so that messages assembled from fragments and messages framed
/// directly from a packet share one type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReliableMessage {
    pub message_type: MessageType,
    /// Type byte as seen on the wire (distinguishes internal variants).
    pub raw_type: u8,
    /// Event code or operation code from the message header.
    pub code: u8,
    pub payload: Vec<u8>,
}

impl ReliableMessage {
    /// Parses a command body into a reliable message.
    pub fn parse(body: &[u8]) -> WireResult<Self> {
        if body.len() < MESSAGE_HEADER_SIZE {
            return Err(DecodeError::PacketTooSmall {
                actual: body.len(),
                required: MESSAGE_HEADER_SIZE,
            });
        }
        if body[0] != MESSAGE_SIGNATURE {
            return Err(DecodeError::InvalidSignature { found: body[0] });
        }
        let raw_type = body[1];
        let message_type = MessageType::parse(raw_type)?;
        Ok(Self {
            message_type,
            raw_type,
            code: body[2],
            payload: body[MESSAGE_HEADER_SIZE..].to_vec(),
        })
    }
}

/// Encodes a message header into `out`. The serialized body follows.
pub fn encode_message_header(message_type: MessageType, code: u8, out: &mut Vec<u8>) {
    out.push(MESSAGE_SIGNATURE);
    out.push(message_type.raw());
    out.push(code);
}

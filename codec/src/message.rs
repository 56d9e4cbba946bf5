//! Parameter tables and reliable message bodies.

use std::collections::BTreeMap;

use bytestream::ByteReader;
use tracing::trace;
use wire::{MessageType, ReliableMessage};

use crate::decode::{read_parameter_table, Decoder};
use crate::error::CodecResult;
use crate::limits::CodecLimits;
use crate::value::Value;

/// Parameter code carrying the event code of an event.
pub const EVENT_CODE_PARAMETER: u8 = 252;

/// Parameter code carrying the operation code of a request or response.
pub const OPERATION_CODE_PARAMETER: u8 = 253;

/// Ordered map from parameter code to value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterTable(BTreeMap<u8, Value>);

impl ParameterTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, code: u8) -> Option<&Value> {
        self.0.get(&code)
    }

    /// Inserts a parameter, returning the previous value for `code`.
    pub fn insert(&mut self, code: u8, value: Value) -> Option<Value> {
        self.0.insert(code, value)
    }

    #[must_use]
    pub fn contains(&self, code: u8) -> bool {
        self.0.contains_key(&code)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates parameters in ascending code order.
    pub fn iter(&self) -> impl Iterator<Item = (u8, &Value)> {
        self.0.iter().map(|(code, value)| (*code, value))
    }

    /// Converts to a [`Value::Map`] keyed by decimal parameter codes.
    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Map(
            self.0
                .into_iter()
                .map(|(code, value)| (code.to_string(), value))
                .collect(),
        )
    }
}

impl FromIterator<(u8, Value)> for ParameterTable {
    fn from_iter<I: IntoIterator<Item = (u8, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for ParameterTable {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(code, value)| (code.to_string(), value)))
    }
}

/// The decoded body of a reliable message.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedMessage {
    pub message_type: MessageType,
    /// Event or operation code from the message header.
    pub code: u8,
    /// Present for operation responses only.
    pub return_code: Option<i16>,
    /// Present for operation responses only.
    pub debug_message: Option<Value>,
    pub parameters: ParameterTable,
}

impl DecodedMessage {
    /// Creates an event with the given parameters.
    #[must_use]
    pub fn event(code: u8, parameters: ParameterTable) -> Self {
        Self {
            message_type: MessageType::EventData,
            code,
            return_code: None,
            debug_message: None,
            parameters,
        }
    }

    /// Creates an operation request with the given parameters.
    #[must_use]
    pub fn request(code: u8, parameters: ParameterTable) -> Self {
        Self {
            message_type: MessageType::OperationRequest,
            code,
            return_code: None,
            debug_message: None,
            parameters,
        }
    }

    /// Creates an operation response with the given parameters.
    #[must_use]
    pub fn response(
        code: u8,
        return_code: i16,
        debug_message: Value,
        parameters: ParameterTable,
    ) -> Self {
        Self {
            message_type: MessageType::OperationResponse,
            code,
            return_code: Some(return_code),
            debug_message: Some(debug_message),
            parameters,
        }
    }
}

/// Decodes a parameter table from the front of `bytes`.
pub fn decode_parameter_table(bytes: &[u8], limits: &CodecLimits) -> CodecResult<ParameterTable> {
    read_parameter_table(&mut ByteReader::new(bytes), limits)
}

/// Decodes the body of a complete reliable message.
///
/// Responses carry a return code and a tagged debug message ahead of the
/// parameter table. Bytes after the table are ignored.
pub fn decode_message(
    message: &ReliableMessage,
    limits: &CodecLimits,
) -> CodecResult<DecodedMessage> {
    let mut reader = ByteReader::new(&message.payload);
    let mut decoder = Decoder::new(limits);

    let (return_code, debug_message) = if message.message_type == MessageType::OperationResponse
    {
        let return_code = reader.read_i16()?;
        let debug_message = decoder.tagged(&mut reader, 0)?;
        (Some(return_code), Some(debug_message))
    } else {
        (None, None)
    };

    let parameters = decoder.parameter_table(&mut reader, 0)?;
    if !reader.is_empty() {
        trace!(
            code = message.code,
            trailing = reader.remaining(),
            "ignoring bytes after parameter table"
        );
    }

    Ok(DecodedMessage {
        message_type: message.message_type,
        code: message.code,
        return_code,
        debug_message,
        parameters,
    })
}

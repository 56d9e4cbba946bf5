//! Protocol16 encoder for fixtures and fuzz seeds.
//!
//! The encoder picks one canonical tag per [`Value`] variant, so decoding its
//! output yields the input back. Nothing on the capture path encodes.

use bytestream::ByteWriter;
use wire::{encode_message_header, MessageType};

use crate::error::CodecResult;
use crate::message::{DecodedMessage, ParameterTable};
use crate::types::TypeCode;
use crate::value::Value;

/// Encodes one tagged value.
///
/// Integers that fit in `i32` use the integer tag, others the long tag.
/// Floats use the double tag. Arrays are object arrays and maps are
/// hashtables with string keys.
pub fn encode_value(value: &Value, writer: &mut ByteWriter) -> CodecResult<()> {
    match value {
        Value::Null => writer.write_u8(TypeCode::Null.raw()),
        Value::Bool(v) => {
            writer.write_u8(TypeCode::Boolean.raw());
            writer.write_u8(u8::from(*v));
        }
        Value::Int(v) => {
            if let Ok(narrow) = i32::try_from(*v) {
                writer.write_u8(TypeCode::Integer.raw());
                writer.write_i32(narrow);
            } else {
                writer.write_u8(TypeCode::Long.raw());
                writer.write_i64(*v);
            }
        }
        Value::Float(v) => {
            writer.write_u8(TypeCode::Double.raw());
            writer.write_f64(*v);
        }
        Value::String(v) => {
            writer.write_u8(TypeCode::String.raw());
            write_string(v, writer)?;
        }
        Value::Bytes(v) => {
            writer.write_u8(TypeCode::ByteArray.raw());
            writer.write_len_u32(v.len())?;
            writer.write_bytes(v);
        }
        Value::Array(items) => {
            writer.write_u8(TypeCode::ObjectArray.raw());
            writer.write_len_u16(items.len())?;
            for item in items {
                encode_value(item, writer)?;
            }
        }
        Value::Map(map) => {
            writer.write_u8(TypeCode::Hashtable.raw());
            writer.write_len_u16(map.len())?;
            for (key, item) in map {
                writer.write_u8(TypeCode::String.raw());
                write_string(key, writer)?;
                encode_value(item, writer)?;
            }
        }
    }
    Ok(())
}

/// Encodes a parameter table: `u16` count then `(code, tagged value)` pairs.
pub fn encode_parameter_table(table: &ParameterTable, writer: &mut ByteWriter) -> CodecResult<()> {
    writer.write_len_u16(table.len())?;
    for (code, value) in table.iter() {
        writer.write_u8(code);
        encode_value(value, writer)?;
    }
    Ok(())
}

/// Encodes a complete reliable message body (header included) into `out`.
pub fn encode_message(message: &DecodedMessage, out: &mut Vec<u8>) -> CodecResult<()> {
    encode_message_header(message.message_type, message.code, out);
    let mut writer = ByteWriter::new();
    if message.message_type == MessageType::OperationResponse {
        writer.write_i16(message.return_code.unwrap_or_default());
        encode_value(message.debug_message.as_ref().unwrap_or(&Value::Null), &mut writer)?;
    }
    encode_parameter_table(&message.parameters, &mut writer)?;
    writer.finish_into(out);
    Ok(())
}

fn write_string(value: &str, writer: &mut ByteWriter) -> CodecResult<()> {
    writer.write_len_u16(value.len())?;
    writer.write_bytes(value.as_bytes());
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use wire::ReliableMessage;

    use super::*;
    use crate::decode::decode_value;
    use crate::limits::CodecLimits;
    use crate::message::decode_message;

    fn roundtrip(value: &Value) -> Value {
        let mut writer = ByteWriter::new();
        encode_value(value, &mut writer).unwrap();
        decode_value(&writer.finish(), &CodecLimits::default()).unwrap()
    }

    #[test]
    fn int_width_selection() {
        let mut writer = ByteWriter::new();
        encode_value(&Value::Int(5), &mut writer).unwrap();
        assert_eq!(writer.finish(), vec![b'i', 0, 0, 0, 5]);

        let mut writer = ByteWriter::new();
        encode_value(&Value::Int(i64::MAX), &mut writer).unwrap();
        assert_eq!(writer.finish()[0], b'l');
        assert_eq!(roundtrip(&Value::Int(i64::MAX)), Value::Int(i64::MAX));
    }

    #[test]
    fn nested_roundtrip() {
        let mut inner = BTreeMap::new();
        inner.insert("k".to_owned(), Value::Bytes(vec![1, 2]));
        let value = Value::Array(vec![Value::Map(inner), Value::Null, Value::Float(2.5)]);
        assert_eq!(roundtrip(&value), value);
    }

    #[test]
    fn oversized_string_rejected() {
        let long = "a".repeat(usize::from(u16::MAX) + 1);
        let mut writer = ByteWriter::new();
        assert!(encode_value(&Value::String(long), &mut writer).is_err());
    }

    #[test]
    fn message_roundtrip() {
        let parameters: ParameterTable = [(253, Value::Int(4)), (0, Value::from("name"))]
            .into_iter()
            .collect();
        let original = DecodedMessage::response(4, -2, Value::from("denied"), parameters);
        let mut body = Vec::new();
        encode_message(&original, &mut body).unwrap();

        let reliable = ReliableMessage::parse(&body).unwrap();
        let decoded = decode_message(&reliable, &CodecLimits::default()).unwrap();
        assert_eq!(decoded, original);
    }
}

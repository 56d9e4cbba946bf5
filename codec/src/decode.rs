//! Recursive Protocol16 value decoder.

use std::collections::BTreeMap;

use bytestream::ByteReader;

use crate::error::{CodecError, CodecResult, LimitKind};
use crate::limits::CodecLimits;
use crate::message::ParameterTable;
use crate::types::TypeCode;
use crate::value::Value;

/// Decodes one tagged value from the front of `bytes`.
///
/// Bytes after the value are ignored.
pub fn decode_value(bytes: &[u8], limits: &CodecLimits) -> CodecResult<Value> {
    read_value(&mut ByteReader::new(bytes), limits)
}

/// Reads one tagged value, advancing `reader` past it.
pub fn read_value(reader: &mut ByteReader<'_>, limits: &CodecLimits) -> CodecResult<Value> {
    Decoder::new(limits).tagged(reader, 0)
}

/// Reads a parameter table: a `u16` count of `(u8 code, tagged value)` pairs.
pub fn read_parameter_table(
    reader: &mut ByteReader<'_>,
    limits: &CodecLimits,
) -> CodecResult<ParameterTable> {
    Decoder::new(limits).parameter_table(reader, 0)
}

/// Decoder state for one call. Every produced value, nested or not, is
/// charged against `limits.max_values`.
pub(crate) struct Decoder<'l> {
    limits: &'l CodecLimits,
    produced: usize,
}

impl<'l> Decoder<'l> {
    pub(crate) const fn new(limits: &'l CodecLimits) -> Self {
        Self {
            limits,
            produced: 0,
        }
    }

    pub(crate) fn tagged(
        &mut self,
        reader: &mut ByteReader<'_>,
        depth: usize,
    ) -> CodecResult<Value> {
        let tag = reader.read_u8()?;
        self.untagged(reader, tag, depth)
    }

    fn untagged(
        &mut self,
        reader: &mut ByteReader<'_>,
        tag: u8,
        depth: usize,
    ) -> CodecResult<Value> {
        let code = TypeCode::from_raw(tag).ok_or(CodecError::UnknownTypeCode { tag })?;
        self.produce(1)?;
        let value = match code {
            TypeCode::Null => Value::Null,
            TypeCode::Byte => Value::Int(i64::from(reader.read_u8()?)),
            TypeCode::Short => Value::Int(i64::from(reader.read_i16()?)),
            TypeCode::Integer => Value::Int(i64::from(reader.read_i32()?)),
            TypeCode::Long => Value::Int(reader.read_i64()?),
            TypeCode::Float => Value::Float(widen_f32(reader.read_f32()?)),
            TypeCode::Double => Value::Float(reader.read_f64()?),
            TypeCode::Boolean => Value::Bool(reader.read_u8()? != 0),
            TypeCode::String => Value::String(self.string(reader)?),
            TypeCode::StringArray => {
                let count = self.collection_len(usize::from(reader.read_u16()?))?;
                self.produce(count)?;
                let mut items = Vec::with_capacity(count.min(reader.remaining()));
                for _ in 0..count {
                    items.push(Value::String(self.string(reader)?));
                }
                Value::Array(items)
            }
            TypeCode::ByteArray => {
                let len = self.bytes_len(reader.read_u32()? as usize)?;
                Value::Bytes(reader.read_bytes(len)?.to_vec())
            }
            TypeCode::IntegerArray => {
                let count = self.collection_len(reader.read_u32()? as usize)?;
                self.produce(count)?;
                let mut items = Vec::with_capacity(count.min(reader.remaining() / 4));
                for _ in 0..count {
                    items.push(Value::Int(i64::from(reader.read_i32()?)));
                }
                Value::Array(items)
            }
            TypeCode::Array => self.typed_array(reader, depth)?,
            TypeCode::ObjectArray => {
                let depth = self.enter(depth)?;
                let count = self.collection_len(usize::from(reader.read_u16()?))?;
                let mut items = Vec::with_capacity(count.min(reader.remaining()));
                for _ in 0..count {
                    items.push(self.tagged(reader, depth)?);
                }
                Value::Array(items)
            }
            TypeCode::Hashtable => {
                let depth = self.enter(depth)?;
                let count = self.collection_len(usize::from(reader.read_u16()?))?;
                let mut map = BTreeMap::new();
                for _ in 0..count {
                    let key = self.tagged(reader, depth)?;
                    let value = self.tagged(reader, depth)?;
                    map.insert(map_key(&key)?, value);
                }
                Value::Map(map)
            }
            TypeCode::Dictionary => {
                let depth = self.enter(depth)?;
                let key_tag = reader.read_u8()?;
                let value_tag = reader.read_u8()?;
                let count = self.collection_len(usize::from(reader.read_u16()?))?;
                let mut map = BTreeMap::new();
                for _ in 0..count {
                    let key = self.entry(reader, key_tag, depth)?;
                    let value = self.entry(reader, value_tag, depth)?;
                    map.insert(map_key(&key)?, value);
                }
                Value::Map(map)
            }
            TypeCode::Custom => {
                let _custom_type = reader.read_u8()?;
                let len = self.bytes_len(usize::from(reader.read_u16()?))?;
                Value::Bytes(reader.read_bytes(len)?.to_vec())
            }
            TypeCode::EventData => {
                let depth = self.enter(depth)?;
                let event_code = reader.read_u8()?;
                let parameters = self.parameter_table(reader, depth)?;
                let mut map = BTreeMap::new();
                map.insert("code".to_owned(), Value::Int(i64::from(event_code)));
                map.insert("parameters".to_owned(), parameters.into_value());
                Value::Map(map)
            }
            TypeCode::OperationRequest => {
                let depth = self.enter(depth)?;
                let operation_code = reader.read_u8()?;
                let parameters = self.parameter_table(reader, depth)?;
                let mut map = BTreeMap::new();
                map.insert(
                    "operationCode".to_owned(),
                    Value::Int(i64::from(operation_code)),
                );
                map.insert("parameters".to_owned(), parameters.into_value());
                Value::Map(map)
            }
            TypeCode::OperationResponse => {
                let depth = self.enter(depth)?;
                let operation_code = reader.read_u8()?;
                let return_code = reader.read_i16()?;
                let debug_message = self.tagged(reader, depth)?;
                let parameters = self.parameter_table(reader, depth)?;
                let mut map = BTreeMap::new();
                map.insert(
                    "operationCode".to_owned(),
                    Value::Int(i64::from(operation_code)),
                );
                map.insert("returnCode".to_owned(), Value::Int(i64::from(return_code)));
                map.insert("debugMessage".to_owned(), debug_message);
                map.insert("parameters".to_owned(), parameters.into_value());
                Value::Map(map)
            }
        };
        Ok(value)
    }

    fn typed_array(&mut self, reader: &mut ByteReader<'_>, depth: usize) -> CodecResult<Value> {
        let depth = self.enter(depth)?;
        let count = self.collection_len(usize::from(reader.read_u16()?))?;
        let element_tag = reader.read_u8()?;
        // Null elements occupy no bytes.
        if TypeCode::is_dynamic(element_tag) {
            return Err(CodecError::ZeroWidthElement { tag: element_tag });
        }
        let mut items = Vec::with_capacity(count.min(reader.remaining()));

        // Custom elements share one type code and carry only a length prefix.
        if TypeCode::from_raw(element_tag) == Some(TypeCode::Custom) {
            let _custom_type = reader.read_u8()?;
            self.produce(count)?;
            for _ in 0..count {
                let len = self.bytes_len(usize::from(reader.read_u16()?))?;
                items.push(Value::Bytes(reader.read_bytes(len)?.to_vec()));
            }
        } else {
            for _ in 0..count {
                items.push(self.untagged(reader, element_tag, depth)?);
            }
        }
        Ok(Value::Array(items))
    }

    pub(crate) fn parameter_table(
        &mut self,
        reader: &mut ByteReader<'_>,
        depth: usize,
    ) -> CodecResult<ParameterTable> {
        let count = self.collection_len(usize::from(reader.read_u16()?))?;
        let mut table = ParameterTable::new();
        for _ in 0..count {
            let code = reader.read_u8()?;
            let value = self.tagged(reader, depth)?;
            table.insert(code, value);
        }
        Ok(table)
    }

    fn entry(&mut self, reader: &mut ByteReader<'_>, tag: u8, depth: usize) -> CodecResult<Value> {
        if TypeCode::is_dynamic(tag) {
            self.tagged(reader, depth)
        } else {
            self.untagged(reader, tag, depth)
        }
    }

    fn string(&self, reader: &mut ByteReader<'_>) -> CodecResult<String> {
        let len = usize::from(reader.read_u16()?);
        check(LimitKind::StringLength, self.limits.max_string_len, len)?;
        let bytes = reader.read_bytes(len)?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    fn enter(&self, depth: usize) -> CodecResult<usize> {
        let next = depth.saturating_add(1);
        check(LimitKind::Depth, self.limits.max_depth, next)?;
        Ok(next)
    }

    fn collection_len(&self, count: usize) -> CodecResult<usize> {
        check(
            LimitKind::CollectionLength,
            self.limits.max_collection_len,
            count,
        )?;
        Ok(count)
    }

    fn bytes_len(&self, len: usize) -> CodecResult<usize> {
        check(LimitKind::BytesLength, self.limits.max_bytes_len, len)?;
        Ok(len)
    }

    fn produce(&mut self, count: usize) -> CodecResult<()> {
        self.produced = self.produced.saturating_add(count);
        check(LimitKind::Values, self.limits.max_values, self.produced)
    }
}

fn check(kind: LimitKind, limit: usize, actual: usize) -> CodecResult<()> {
    if actual > limit {
        return Err(CodecError::LimitsExceeded {
            kind,
            limit,
            actual,
        });
    }
    Ok(())
}

// Rounds through the shortest decimal form of the `f32`, so 1.1f32 widens to
// 1.1 rather than 1.100000023841858.
fn widen_f32(value: f32) -> f64 {
    value
        .to_string()
        .parse()
        .unwrap_or_else(|_| f64::from(value))
}

fn map_key(key: &Value) -> CodecResult<String> {
    key.key_string().ok_or(CodecError::InvalidKey {
        found: key.type_name(),
    })
}

#[cfg(test)]
mod tests {
    use bytestream::ByteError;

    use super::*;

    fn decode(bytes: &[u8]) -> CodecResult<Value> {
        decode_value(bytes, &CodecLimits::default())
    }

    #[test]
    fn scalars() {
        assert_eq!(decode(&[b'b', 200]).unwrap(), Value::Int(200));
        assert_eq!(decode(&[b'k', 0xFF, 0xFE]).unwrap(), Value::Int(-2));
        assert_eq!(decode(&[b'i', 0, 0, 1, 0]).unwrap(), Value::Int(256));
        assert_eq!(
            decode(&[b'l', 0x80, 0, 0, 0, 0, 0, 0, 0]).unwrap(),
            Value::Int(i64::MIN)
        );
        assert_eq!(decode(&[b'o', 1]).unwrap(), Value::Bool(true));
        assert_eq!(decode(&[b'o', 0]).unwrap(), Value::Bool(false));
        assert_eq!(decode(&[0]).unwrap(), Value::Null);
        assert_eq!(decode(&[b'*']).unwrap(), Value::Null);
    }

    #[test]
    fn floats_widen() {
        let mut bytes = vec![b'f'];
        bytes.extend_from_slice(&1.5f32.to_be_bytes());
        assert_eq!(decode(&bytes).unwrap(), Value::Float(1.5));

        let mut bytes = vec![b'd'];
        bytes.extend_from_slice(&(-0.25f64).to_be_bytes());
        assert_eq!(decode(&bytes).unwrap(), Value::Float(-0.25));
    }

    #[test]
    fn string_is_lossy_utf8() {
        assert_eq!(decode(&[b's', 0, 2, b'h', b'i']).unwrap(), Value::from("hi"));
        let value = decode(&[b's', 0, 2, 0xFF, b'a']).unwrap();
        assert_eq!(value, Value::from("\u{FFFD}a"));
    }

    #[test]
    fn byte_and_int_arrays() {
        assert_eq!(
            decode(&[b'x', 0, 0, 0, 3, 1, 2, 3]).unwrap(),
            Value::Bytes(vec![1, 2, 3])
        );
        assert_eq!(
            decode(&[b'n', 0, 0, 0, 2, 0, 0, 0, 7, 0xFF, 0xFF, 0xFF, 0xFF]).unwrap(),
            Value::Array(vec![Value::Int(7), Value::Int(-1)])
        );
    }

    #[test]
    fn string_array() {
        let value = decode(&[b'a', 0, 2, 0, 1, b'a', 0, 2, b'b', b'c']).unwrap();
        assert_eq!(value, Value::Array(vec![Value::from("a"), Value::from("bc")]));
    }

    #[test]
    fn typed_array_uses_one_element_tag() {
        let value = decode(&[b'y', 0, 3, b'b', 1, 2, 3]).unwrap();
        assert_eq!(
            value,
            Value::Array(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
        );
    }

    #[test]
    fn typed_array_of_custom() {
        let value = decode(&[b'y', 0, 2, b'c', 9, 0, 1, 0xAA, 0, 0]).unwrap();
        assert_eq!(
            value,
            Value::Array(vec![Value::Bytes(vec![0xAA]), Value::Bytes(vec![])])
        );
    }

    #[test]
    fn nested_typed_arrays() {
        let value = decode(&[b'y', 0, 1, b'y', 0, 2, b'o', 1, 0]).unwrap();
        assert_eq!(
            value,
            Value::Array(vec![Value::Array(vec![
                Value::Bool(true),
                Value::Bool(false)
            ])])
        );
    }

    #[test]
    fn object_array() {
        let value = decode(&[b'z', 0, 2, b'b', 5, b's', 0, 1, b'q']).unwrap();
        assert_eq!(value, Value::Array(vec![Value::Int(5), Value::from("q")]));
    }

    #[test]
    fn hashtable_keys_are_canonicalized() {
        let value = decode(&[b'h', 0, 2, b'b', 1, b'o', 1, b'o', 1, b's', 0, 1, b'x']).unwrap();
        let map = value.as_map().unwrap();
        assert_eq!(map.get("1"), Some(&Value::Bool(true)));
        assert_eq!(map.get("true"), Some(&Value::from("x")));
    }

    #[test]
    fn dictionary_with_fixed_tags() {
        let value = decode(&[b'D', b'i', b's', 0, 1, 0, 0, 0, 9, 0, 2, b'o', b'k']).unwrap();
        let map = value.as_map().unwrap();
        assert_eq!(map.get("9"), Some(&Value::from("ok")));
    }

    #[test]
    fn dictionary_with_dynamic_tags() {
        let value = decode(&[b'D', 0, b'*', 0, 1, b'k', 0, 3, b'b', 4]).unwrap();
        let map = value.as_map().unwrap();
        assert_eq!(map.get("3"), Some(&Value::Int(4)));
    }

    #[test]
    fn composite_key_rejected() {
        let err = decode(&[b'h', 0, 1, b'z', 0, 0, b'b', 1]).unwrap_err();
        assert_eq!(err, CodecError::InvalidKey { found: "array" });
    }

    #[test]
    fn custom_value_is_bytes() {
        assert_eq!(
            decode(&[b'c', 7, 0, 2, 0xDE, 0xAD]).unwrap(),
            Value::Bytes(vec![0xDE, 0xAD])
        );
    }

    #[test]
    fn nested_event_data() {
        let value = decode(&[b'e', 3, 0, 1, 252, b'k', 0, 1]).unwrap();
        let map = value.as_map().unwrap();
        assert_eq!(map.get("code"), Some(&Value::Int(3)));
        let params = map.get("parameters").and_then(Value::as_map).unwrap();
        assert_eq!(params.get("252"), Some(&Value::Int(1)));
    }

    #[test]
    fn nested_operation_response() {
        let value = decode(&[b'p', 2, 0xFF, 0xFF, b's', 0, 2, b'n', b'o', 0, 0]).unwrap();
        let map = value.as_map().unwrap();
        assert_eq!(map.get("operationCode"), Some(&Value::Int(2)));
        assert_eq!(map.get("returnCode"), Some(&Value::Int(-1)));
        assert_eq!(map.get("debugMessage"), Some(&Value::from("no")));
        assert_eq!(map.get("parameters"), Some(&Value::Map(BTreeMap::new())));
    }

    #[test]
    fn nested_operation_request() {
        let value = decode(&[b'q', 9, 0, 1, 253, b'b', 9]).unwrap();
        let map = value.as_map().unwrap();
        assert_eq!(map.get("operationCode"), Some(&Value::Int(9)));
    }

    #[test]
    fn unknown_tag_rejected() {
        assert_eq!(
            decode(&[b'Q']).unwrap_err(),
            CodecError::UnknownTypeCode { tag: b'Q' }
        );
    }

    #[test]
    fn truncated_value_fails() {
        let err = decode(&[b'i', 0, 0]).unwrap_err();
        assert!(matches!(
            err,
            CodecError::Bytes(ByteError::UnexpectedEof { .. })
        ));
        assert!(decode(&[b's', 0, 10, b'a']).is_err());
        assert!(decode(&[]).is_err());
    }

    #[test]
    fn declared_count_past_end_fails_without_huge_allocation() {
        let err = decode(&[b'z', 0xFF, 0xFF]).unwrap_err();
        assert!(matches!(err, CodecError::Bytes(_)));
    }

    #[test]
    fn depth_limit_enforced() {
        let limits = CodecLimits::for_testing();
        let mut bytes = Vec::new();
        for _ in 0..=limits.max_depth {
            bytes.extend_from_slice(&[b'z', 0, 1]);
        }
        bytes.push(b'*');
        let err = decode_value(&bytes, &limits).unwrap_err();
        assert_eq!(
            err,
            CodecError::LimitsExceeded {
                kind: LimitKind::Depth,
                limit: limits.max_depth,
                actual: limits.max_depth + 1,
            }
        );

        bytes.drain(..3);
        assert!(decode_value(&bytes, &limits).is_ok());
    }

    #[test]
    fn collection_limit_enforced() {
        let limits = CodecLimits::for_testing();
        let err = decode_value(&[b'n', 0, 0, 0x10, 0], &limits).unwrap_err();
        assert!(matches!(
            err,
            CodecError::LimitsExceeded {
                kind: LimitKind::CollectionLength,
                ..
            }
        ));
    }

    #[test]
    fn bytes_limit_enforced() {
        let limits = CodecLimits::for_testing();
        let err = decode_value(&[b'x', 0, 1, 0, 0], &limits).unwrap_err();
        assert!(matches!(
            err,
            CodecError::LimitsExceeded {
                kind: LimitKind::BytesLength,
                ..
            }
        ));
    }

    #[test]
    fn single_precision_keeps_short_form() {
        let mut bytes = vec![b'f'];
        bytes.extend_from_slice(&1.1f32.to_be_bytes());
        assert_eq!(decode(&bytes).unwrap(), Value::Float(1.1));

        let mut bytes = vec![b'h', 0, 1, b'f'];
        bytes.extend_from_slice(&1.1f32.to_be_bytes());
        bytes.extend_from_slice(&[b'b', 7]);
        let value = decode(&bytes).unwrap();
        assert_eq!(value.as_map().unwrap().get("1.1"), Some(&Value::Int(7)));
    }

    #[test]
    fn null_element_tag_rejected() {
        assert_eq!(
            decode(&[b'y', 0xFF, 0xFF, 0]).unwrap_err(),
            CodecError::ZeroWidthElement { tag: 0 }
        );
        assert_eq!(
            decode(&[b'y', 0, 1, b'*']).unwrap_err(),
            CodecError::ZeroWidthElement { tag: b'*' }
        );
    }

    #[test]
    fn nested_typed_arrays_charge_every_element() {
        // 200 arrays of 255 one-byte elements each.
        let mut bytes = vec![b'y', 0, 200, b'y'];
        for _ in 0..200 {
            bytes.extend_from_slice(&[0, 255, b'b']);
            bytes.extend_from_slice(&[7; 255]);
        }
        let limits = CodecLimits::for_testing();
        let err = decode_value(&bytes, &limits).unwrap_err();
        assert_eq!(
            err,
            CodecError::LimitsExceeded {
                kind: LimitKind::Values,
                limit: limits.max_values,
                actual: limits.max_values + 1,
            }
        );
        assert!(decode_value(&bytes, &CodecLimits::default()).is_ok());
    }

    #[test]
    fn bulk_arrays_charged_up_front() {
        let limits = CodecLimits {
            max_values: 3,
            ..CodecLimits::for_testing()
        };
        let err = decode_value(&[b'n', 0, 0, 0, 3, 0xFF], &limits).unwrap_err();
        assert!(matches!(
            err,
            CodecError::LimitsExceeded {
                kind: LimitKind::Values,
                ..
            }
        ));
        let value = decode_value(&[b'n', 0, 0, 0, 2, 0, 0, 0, 1, 0, 0, 0, 2], &limits).unwrap();
        assert_eq!(value, Value::Array(vec![Value::Int(1), Value::Int(2)]));
    }

    #[test]
    fn parameter_table_reads_pairs() {
        let mut reader = ByteReader::new(&[0, 2, 1, b'b', 42, 252, b'k', 0, 1, 0xEE]);
        let table = read_parameter_table(&mut reader, &CodecLimits::default()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(1), Some(&Value::Int(42)));
        assert_eq!(table.get(252), Some(&Value::Int(1)));
        assert_eq!(reader.remaining(), 1);
    }
}

use std::collections::BTreeMap;

use bytestream::ByteWriter;
use codec::{
    decode_parameter_table, decode_value, encode_parameter_table, encode_value, CodecLimits,
    ParameterTable, Value,
};
use proptest::prelude::*;

fn scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Int),
        (-1.0e12f64..1.0e12).prop_map(Value::Float),
        "[a-zA-Z0-9 _-]{0,24}".prop_map(Value::String),
        prop::collection::vec(any::<u8>(), 0..32).prop_map(Value::Bytes),
    ]
}

fn value() -> impl Strategy<Value = Value> {
    scalar().prop_recursive(4, 64, 8, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..8).prop_map(Value::Array),
            prop::collection::btree_map("[a-z0-9]{0,8}", inner, 0..8).prop_map(Value::Map),
        ]
    })
}

fn encode(value: &Value) -> Vec<u8> {
    let mut writer = ByteWriter::new();
    encode_value(value, &mut writer).unwrap();
    writer.finish()
}

proptest! {
    #[test]
    fn value_roundtrip(value in value()) {
        let decoded = decode_value(&encode(&value), &CodecLimits::default()).unwrap();
        prop_assert_eq!(decoded, value);
    }

    #[test]
    fn parameter_table_roundtrip(
        entries in prop::collection::btree_map(any::<u8>(), value(), 0..12)
    ) {
        let table: ParameterTable = entries.into_iter().collect();
        let mut writer = ByteWriter::new();
        encode_parameter_table(&table, &mut writer).unwrap();
        let decoded = decode_parameter_table(&writer.finish(), &CodecLimits::default()).unwrap();
        prop_assert_eq!(decoded, table);
    }

    #[test]
    fn arbitrary_bytes_never_panic(data in prop::collection::vec(any::<u8>(), 0..256)) {
        let _ = decode_value(&data, &CodecLimits::for_testing());
        let _ = decode_parameter_table(&data, &CodecLimits::for_testing());
    }

    #[test]
    fn truncated_encoding_fails(value in value(), cut in 1usize..16) {
        let bytes = encode(&value);
        let cut = cut.min(bytes.len());
        let truncated = &bytes[..bytes.len() - cut];
        prop_assert!(decode_value(truncated, &CodecLimits::default()).is_err());
    }
}

#[test]
fn three_level_nesting_roundtrip() {
    let mut leaf = BTreeMap::new();
    leaf.insert("hp".to_owned(), Value::Int(100));
    leaf.insert("tag".to_owned(), Value::Bytes(vec![1, 2, 3]));

    let mut middle = BTreeMap::new();
    middle.insert(
        "items".to_owned(),
        Value::Array(vec![Value::Map(leaf), Value::Float(0.5), Value::Null]),
    );

    let mut root = BTreeMap::new();
    root.insert("player".to_owned(), Value::Map(middle));
    root.insert("alive".to_owned(), Value::Bool(true));
    let value = Value::Map(root);

    let decoded = decode_value(&encode(&value), &CodecLimits::default()).unwrap();
    assert_eq!(decoded, value);
}

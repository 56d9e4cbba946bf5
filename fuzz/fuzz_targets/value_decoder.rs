#![no_main]

use bytestream::ByteWriter;
use codec::{decode_parameter_table, decode_value, encode_value, CodecLimits};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let limits = CodecLimits::for_testing();
    let _ = decode_parameter_table(data, &limits);

    // Anything that decodes must survive a canonical re-encode.
    if let Ok(value) = decode_value(data, &limits) {
        let mut writer = ByteWriter::new();
        if encode_value(&value, &mut writer).is_ok() {
            let bytes = writer.finish();
            let again = decode_value(&bytes, &CodecLimits::unlimited());
            assert!(again.is_ok(), "re-encoded value failed to decode");
        }
    }
});

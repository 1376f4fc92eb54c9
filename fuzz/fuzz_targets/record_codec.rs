#![no_main]

use bytes::BytesMut;
use libfuzzer_sys::fuzz_target;
use logship_core::varint::{decode_uvarint, decode_varint};
use logship_core::{decode_record, encode_record, WalRecord};

fuzz_target!(|data: &[u8]| {
    // Feed arbitrary bytes to the record decoder. It must reject malformed
    // input with an error, never panic or over-allocate:
    // - Invalid varint sequences
    // - Length fields pointing past the payload
    // - Non-UTF-8 label bytes
    // - Trailing garbage
    let mut record = WalRecord::default();
    if decode_record(data, &mut record).is_ok() {
        // Anything that decodes must re-encode to a payload that decodes to
        // the same record.
        let mut buf = BytesMut::new();
        encode_record(&record, &mut buf);

        let mut roundtripped = WalRecord::default();
        decode_record(&buf, &mut roundtripped).expect("re-encoded record must decode");
        assert_eq!(record, roundtripped);
    }

    // Varint decoding on its own (critical for every field above).
    let _ = decode_uvarint(&mut &data[..]);
    let _ = decode_varint(&mut &data[..]);
});

#![no_main]

use libfuzzer_sys::fuzz_target;
use relift_core::{ByteReader, WordCodec};

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes must never panic the decoder: well-formed records
    // come back as expressions, recognizably malformed ones are skipped,
    // truncation is a hard error. Whatever decodes must survive the rest
    // of the protocol.
    let mut r = ByteReader::new(data);
    while r.remaining() > 0 {
        match relift_core::serialize::deserialize(&mut r, &WordCodec) {
            Ok(Some(e)) => {
                // Round-trip whatever was readable.
                let bytes = e.to_bytes();
                let mut r2 = ByteReader::new(&bytes);
                let back = relift_core::serialize::deserialize(&mut r2, &WordCodec)
                    .expect("re-encoded stream is intact")
                    .expect("re-encoded record is well-formed");
                assert!(back.equals(&e));
            }
            Ok(None) => {
                // Malformed record skipped; the stream may be desynced, so
                // stop rather than spin.
                break;
            }
            Err(_) => break,
        }
    }
});

//! Decodes one value from arbitrary bytes with no external handlers registered
#![no_main]
use libfuzzer_sys::fuzz_target;

use flash_amf::AMF3Decoder;

fuzz_target!(|data: &[u8]| {
    let _ = AMF3Decoder::default().decode(data);
});

//! Anything that decodes with the flex handlers must encode again, and encoding is stable after that
#![no_main]
use libfuzzer_sys::fuzz_target;

use flash_amf::amf3::custom_encoder::ExternalRegistry;
use flash_amf::extra::flex::register_flex;
use flash_amf::{AMF3Decoder, AMF3Encoder};
use std::rc::Rc;

fuzz_target!(|data: &[u8]| {
    let mut registry = ExternalRegistry::new();
    register_flex(&mut registry);
    let registry = Rc::new(registry);

    let Ok((value, _)) = AMF3Decoder::new(Rc::clone(&registry)).decode(data) else {
        return;
    };
    let bytes = AMF3Encoder::new(Rc::clone(&registry))
        .encode(&value)
        .expect("decoded value should encode");
    let (again, consumed) = AMF3Decoder::new(Rc::clone(&registry))
        .decode(&bytes)
        .expect("encoded value should decode");
    assert_eq!(consumed, bytes.len());

    // Compared as bytes, NaN doubles never equal themselves
    let bytes_again = AMF3Encoder::new(registry)
        .encode(&again)
        .expect("decoded value should encode");
    assert_eq!(bytes_again, bytes);
});

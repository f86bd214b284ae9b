//! Encoding and decoding of AMF3 value graphs
//!
//! ```
//! use flash_amf::types::{Object, Value};
//!
//! let object = Object::anonymous();
//! object.set("a", Value::Integer(1)).unwrap();
//!
//! let bytes = flash_amf::write_to_bytes(&object.into()).unwrap();
//! assert_eq!(bytes, [0x0A, 0x0B, 0x01, 0x03, b'a', 0x04, 0x01, 0x01]);
//!
//! let (value, consumed) = flash_amf::read_value(&bytes).unwrap();
//! assert_eq!(consumed, bytes.len());
//! assert_eq!(value.as_object().unwrap().get("a"), Ok(Some(Value::Integer(1))));
//! ```
/// Reading and writing of AMF3 values
pub mod amf3;
pub mod dump;
/// Error types
pub mod errors;
/// Support for types beyond the core AMF3 set
pub mod extra;
mod nom_utils;
#[cfg(feature = "serde")]
mod serialize;
pub mod types;

pub use amf3::read::AMF3Decoder;
pub use amf3::write::AMF3Encoder;
pub use nom_utils::AMFResult;

use errors::Error;
use types::Value;

/// Decode a single value from the start of `i`, with no external handlers registered
///
/// Returns the value and the number of bytes it took up.
pub fn read_value(i: &[u8]) -> Result<(Value, usize), Error<'_>> {
    AMF3Decoder::default().decode(i)
}

/// Encode a single value, with no external handlers registered
pub fn write_to_bytes(value: &Value) -> Result<Vec<u8>, Error<'static>> {
    AMF3Encoder::default().encode(value)
}

/// Externalizable class handlers and the registry they live in
pub mod custom_encoder;
/// The three per-session reference tables
pub(crate) mod element_cache;
/// Abstraction over the AMF3 length and reference headers
pub(crate) mod length;
/// Reading of AMF3 data
pub mod read;
/// AMF3 type markers
pub(crate) mod type_marker;
/// Writing of AMF3 data
pub mod write;

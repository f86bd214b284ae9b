use super::Value;
use std::any::Any;
use std::fmt;

/// The payload of an externalizable object, as produced by its registered handler
///
/// The payload is dropped together with its object.
pub trait ExternalObject: fmt::Debug {
    /// A name/value view of the payload, used for comparison, dumping and serialization
    fn properties(&self) -> Vec<(&'static str, Value)>;

    /// Allows handlers to get back to their concrete payload type
    fn as_any(&self) -> &dyn Any;

    /// Render the payload for a tree dump, one property per line indented by `depth`
    fn dump(&self, out: &mut dyn fmt::Write, depth: usize) -> fmt::Result {
        crate::dump::write_properties(out, &self.properties(), depth)
    }
}

use crate::amf3::read::AMF3Decoder;
use crate::amf3::write::{AMF3Encoder, EncodeResult};
use crate::nom_utils::AMFResult;
use crate::types::ExternalObject;
use std::fmt;
use std::rc::Rc;

/// Reads and writes the body of an externalizable class
///
/// Handlers get the session's decoder or encoder so nested values share its reference tables.
pub trait ExternalHandler {
    /// Parse the body of an instance of `class_name`, starting right after its class name
    fn decode<'a>(
        &self,
        decoder: &mut AMF3Decoder,
        i: &'a [u8],
        class_name: &str,
    ) -> AMFResult<'a, Box<dyn ExternalObject>>;

    /// Write the body of an instance of `class_name`, returning the number of bytes written
    fn encode(
        &self,
        encoder: &mut AMF3Encoder,
        class_name: &str,
        payload: &dyn ExternalObject,
    ) -> EncodeResult;
}

/// The handlers available to a session, keyed by class name
///
/// Lookup is in registration order and the first match wins. One handler may be registered
/// under several names.
#[derive(Clone, Default)]
pub struct ExternalRegistry {
    handlers: Vec<(String, Rc<dyn ExternalHandler>)>,
}

impl ExternalRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `class_name`
    pub fn register(
        &mut self,
        class_name: impl Into<String>,
        handler: impl ExternalHandler + 'static,
    ) -> &mut Self {
        self.register_shared(class_name, Rc::new(handler))
    }

    /// Register an already shared handler for `class_name`, used for aliases
    pub fn register_shared(
        &mut self,
        class_name: impl Into<String>,
        handler: Rc<dyn ExternalHandler>,
    ) -> &mut Self {
        self.handlers.push((class_name.into(), handler));
        self
    }

    /// The handler for `class_name`
    pub fn get(&self, class_name: &str) -> Option<Rc<dyn ExternalHandler>> {
        self.handlers
            .iter()
            .find(|(name, _)| name == class_name)
            .map(|(_, handler)| Rc::clone(handler))
    }

    /// Whether a handler is registered for `class_name`
    pub fn contains(&self, class_name: &str) -> bool {
        self.handlers.iter().any(|(name, _)| name == class_name)
    }

    /// The registered class names, in registration order
    pub fn class_names(&self) -> impl Iterator<Item = &str> {
        self.handlers.iter().map(|(name, _)| name.as_str())
    }
}

impl fmt::Debug for ExternalRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.class_names()).finish()
    }
}

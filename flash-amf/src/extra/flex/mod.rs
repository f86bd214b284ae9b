//! Externalizable classes used by Adobe flex remoting (BlazeDS / LCDS)
//!
//! Messages are made of groups of optional fields. Each group starts with one or more flag bytes,
//! where the high bit of a byte says another flag byte follows and the low 7 bits say which fields
//! are present. Bits a reader doesn't know about still stand for one value each, which is read and
//! thrown away.
use crate::amf3::custom_encoder::{ExternalHandler, ExternalRegistry};
use crate::amf3::read::AMF3Decoder;
use crate::amf3::write::{AMF3Encoder, EncodeResult};
use crate::errors::Error;
use crate::nom_utils::AMFResult;
use crate::types::{ExternalObject, Value};
use std::any::Any;
use std::rc::Rc;

/// Reading of flex types
pub mod read;
/// Writing of flex types
pub mod write;

const NEXT_FLAG: u8 = 128;

const BODY_FLAG: u8 = 1;
const CLIENT_ID_FLAG: u8 = 2;
const DESTINATION_FLAG: u8 = 4;
const HEADERS_FLAG: u8 = 8;
const MESSAGE_ID_FLAG: u8 = 16;
const TIMESTAMP_FLAG: u8 = 32;
const TTL_FLAG: u8 = 64;

const CLIENT_ID_BYTES_FLAG: u8 = 1;
const MESSAGE_ID_BYTES_FLAG: u8 = 2;

const CORRELATION_ID_FLAG: u8 = 1;
const CORRELATION_ID_BYTES_FLAG: u8 = 2;

const OPERATION_FLAG: u8 = 1;

/// `flex.messaging.messages.AbstractMessage`, the fields every message carries
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AbstractMessage {
    /// The message body
    pub body: Option<Value>,
    /// The id of the client that sent the message
    pub client_id: Option<Value>,
    /// The destination the message is addressed to
    pub destination: Option<Value>,
    /// Message headers, usually an anonymous object
    pub headers: Option<Value>,
    /// The id of this message
    pub message_id: Option<Value>,
    /// When the message was sent
    pub timestamp: Option<Value>,
    /// How long the message is valid for, in milliseconds
    pub time_to_live: Option<Value>,
    /// The client id as a byte array
    pub client_id_bytes: Option<Value>,
    /// The message id as a byte array
    pub message_id_bytes: Option<Value>,
}

/// `flex.messaging.messages.AsyncMessage`, also known as `DSA`
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AsyncMessage {
    /// The common message fields
    pub base: AbstractMessage,
    /// The id of the message this one answers
    pub correlation_id: Option<Value>,
    /// The correlation id as a byte array
    pub correlation_id_bytes: Option<Value>,
}

/// `flex.messaging.messages.AcknowledgeMessage` (`DSK`), also used for `ErrorMessage`
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AcknowledgeMessage {
    /// The async message fields
    pub base: AsyncMessage,
}

/// `flex.messaging.messages.CommandMessage`, also known as `DSC`
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CommandMessage {
    /// The async message fields
    pub base: AsyncMessage,
    /// The operation code of the command
    pub operation: Option<Value>,
}

/// `flex.messaging.io.ArrayCollection`, also used for `ArrayList`
#[derive(Clone, Debug, PartialEq)]
pub struct ArrayCollection {
    /// The wrapped array
    pub source: Value,
}

/// `flex.messaging.io.ObjectProxy`, also used for `ManagedObjectProxy`
#[derive(Clone, Debug, PartialEq)]
pub struct ObjectProxy {
    /// The wrapped object
    pub object: Value,
}

/// `flex.messaging.io.SerializationProxy`
#[derive(Clone, Debug, PartialEq)]
pub struct SerializationProxy {
    /// The default instance of the proxied class
    pub default_instance: Value,
}

fn present(fields: &[(&'static str, &Option<Value>)]) -> Vec<(&'static str, Value)> {
    fields
        .iter()
        .filter_map(|(name, value)| value.as_ref().map(|v| (*name, v.clone())))
        .collect()
}

impl ExternalObject for AbstractMessage {
    fn properties(&self) -> Vec<(&'static str, Value)> {
        present(&[
            ("body", &self.body),
            ("clientId", &self.client_id),
            ("destination", &self.destination),
            ("headers", &self.headers),
            ("messageId", &self.message_id),
            ("timestamp", &self.timestamp),
            ("timeToLive", &self.time_to_live),
            ("clientIdBytes", &self.client_id_bytes),
            ("messageIdBytes", &self.message_id_bytes),
        ])
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl ExternalObject for AsyncMessage {
    fn properties(&self) -> Vec<(&'static str, Value)> {
        let mut properties = self.base.properties();
        properties.extend(present(&[
            ("correlationId", &self.correlation_id),
            ("correlationIdBytes", &self.correlation_id_bytes),
        ]));
        properties
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl ExternalObject for AcknowledgeMessage {
    fn properties(&self) -> Vec<(&'static str, Value)> {
        self.base.properties()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl ExternalObject for CommandMessage {
    fn properties(&self) -> Vec<(&'static str, Value)> {
        let mut properties = self.base.properties();
        properties.extend(present(&[("operation", &self.operation)]));
        properties
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl ExternalObject for ArrayCollection {
    fn properties(&self) -> Vec<(&'static str, Value)> {
        vec![("source", self.source.clone())]
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl ExternalObject for ObjectProxy {
    fn properties(&self) -> Vec<(&'static str, Value)> {
        vec![("object", self.object.clone())]
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl ExternalObject for SerializationProxy {
    fn properties(&self) -> Vec<(&'static str, Value)> {
        vec![("defaultInstance", self.default_instance.clone())]
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

type ReadFn<T> = for<'a> fn(&'a [u8], &mut AMF3Decoder) -> AMFResult<'a, T>;
type WriteFn<T> = fn(&mut AMF3Encoder, &T) -> EncodeResult;

/// Adapts a pair of read and write functions for one payload type into a handler
struct FlexHandler<T> {
    read: ReadFn<T>,
    write: WriteFn<T>,
}

impl<T: ExternalObject + 'static> ExternalHandler for FlexHandler<T> {
    fn decode<'a>(
        &self,
        decoder: &mut AMF3Decoder,
        i: &'a [u8],
        _class_name: &str,
    ) -> AMFResult<'a, Box<dyn ExternalObject>> {
        let (i, payload) = (self.read)(i, decoder)?;
        Ok((i, Box::new(payload)))
    }

    fn encode(
        &self,
        encoder: &mut AMF3Encoder,
        class_name: &str,
        payload: &dyn ExternalObject,
    ) -> EncodeResult {
        let payload = payload
            .as_any()
            .downcast_ref::<T>()
            .ok_or_else(|| Error::PluginFailure {
                class_name: class_name.to_string(),
                reason: format!("payload is not a {}", std::any::type_name::<T>()),
            })?;
        (self.write)(encoder, payload)
    }
}

fn handler<T: ExternalObject + 'static>(
    read: ReadFn<T>,
    write: WriteFn<T>,
) -> Rc<dyn ExternalHandler> {
    Rc::new(FlexHandler { read, write })
}

/// Register handlers for the flex messaging classes, under their full names and short aliases
pub fn register_flex(registry: &mut ExternalRegistry) {
    let abstract_message = handler(read::parse_abstract_message, write::write_abstract_message);
    let async_message = handler(read::parse_async_message, write::write_async_message);
    let acknowledge_message = handler(
        read::parse_acknowledge_message,
        write::write_acknowledge_message,
    );
    let command_message = handler(read::parse_command_message, write::write_command_message);
    let array_collection = handler(read::parse_array_collection, write::write_array_collection);
    let object_proxy = handler(read::parse_object_proxy, write::write_object_proxy);
    let serialization_proxy = handler(
        read::parse_serialization_proxy,
        write::write_serialization_proxy,
    );

    let entries = [
        ("flex.messaging.messages.AbstractMessage", &abstract_message),
        ("flex.messaging.messages.AsyncMessage", &async_message),
        ("flex.messaging.messages.AsyncMessageExt", &async_message),
        ("DSA", &async_message),
        ("flex.messaging.messages.AcknowledgeMessage", &acknowledge_message),
        ("flex.messaging.messages.AcknowledgeMessageExt", &acknowledge_message),
        ("DSK", &acknowledge_message),
        ("flex.messaging.messages.ErrorMessage", &acknowledge_message),
        ("flex.messaging.messages.CommandMessage", &command_message),
        ("flex.messaging.messages.CommandMessageExt", &command_message),
        ("DSC", &command_message),
        ("flex.messaging.io.ArrayCollection", &array_collection),
        ("flex.messaging.io.ArrayList", &array_collection),
        ("flex.messaging.io.ObjectProxy", &object_proxy),
        ("flex.messaging.io.ManagedObjectProxy", &object_proxy),
        ("flex.messaging.io.SerializationProxy", &serialization_proxy),
    ];

    for (class_name, handler) in entries {
        registry.register_shared(class_name, Rc::clone(handler));
    }
}

//! Handles encoding of flex types

use crate::amf3::write::{AMF3Encoder, EncodeResult};
use crate::extra::flex::{
    AbstractMessage, AcknowledgeMessage, ArrayCollection, AsyncMessage, BODY_FLAG,
    CLIENT_ID_BYTES_FLAG, CLIENT_ID_FLAG, CORRELATION_ID_BYTES_FLAG, CORRELATION_ID_FLAG,
    CommandMessage, DESTINATION_FLAG, HEADERS_FLAG, MESSAGE_ID_BYTES_FLAG, MESSAGE_ID_FLAG,
    NEXT_FLAG, OPERATION_FLAG, ObjectProxy, SerializationProxy, TIMESTAMP_FLAG, TTL_FLAG,
};
use crate::types::Value;

type Field<'a> = (u8, &'a Option<Value>);

/// The flag byte announcing which of `fields` are present
fn flags_of(fields: &[Field<'_>]) -> u8 {
    fields
        .iter()
        .filter(|(_, value)| value.is_some())
        .fold(0, |flags, (flag, _)| flags | flag)
}

fn write_fields(encoder: &mut AMF3Encoder, fields: &[Field<'_>]) -> EncodeResult {
    let mut written = 0;
    for value in fields.iter().filter_map(|(_, value)| value.as_ref()) {
        written += encoder.write_value(value)?;
    }
    Ok(written)
}

/// Write a group with a single flag byte followed by its present fields
fn write_group(encoder: &mut AMF3Encoder, fields: &[Field<'_>]) -> EncodeResult {
    Ok(encoder.write_u8(flags_of(fields))? + write_fields(encoder, fields)?)
}

pub(crate) fn write_abstract_message(
    encoder: &mut AMF3Encoder,
    message: &AbstractMessage,
) -> EncodeResult {
    let first = [
        (BODY_FLAG, &message.body),
        (CLIENT_ID_FLAG, &message.client_id),
        (DESTINATION_FLAG, &message.destination),
        (HEADERS_FLAG, &message.headers),
        (MESSAGE_ID_FLAG, &message.message_id),
        (TIMESTAMP_FLAG, &message.timestamp),
        (TTL_FLAG, &message.time_to_live),
    ];
    let second = [
        (CLIENT_ID_BYTES_FLAG, &message.client_id_bytes),
        (MESSAGE_ID_BYTES_FLAG, &message.message_id_bytes),
    ];

    let second_flags = flags_of(&second);
    let mut written = if second_flags != 0 {
        encoder.write_u8(flags_of(&first) | NEXT_FLAG)? + encoder.write_u8(second_flags)?
    } else {
        encoder.write_u8(flags_of(&first))?
    };

    written += write_fields(encoder, &first)?;
    written += write_fields(encoder, &second)?;
    Ok(written)
}

pub(crate) fn write_async_message(
    encoder: &mut AMF3Encoder,
    message: &AsyncMessage,
) -> EncodeResult {
    let written = write_abstract_message(encoder, &message.base)?;
    let group = [
        (CORRELATION_ID_FLAG, &message.correlation_id),
        (CORRELATION_ID_BYTES_FLAG, &message.correlation_id_bytes),
    ];
    Ok(written + write_group(encoder, &group)?)
}

pub(crate) fn write_acknowledge_message(
    encoder: &mut AMF3Encoder,
    message: &AcknowledgeMessage,
) -> EncodeResult {
    let written = write_async_message(encoder, &message.base)?;
    Ok(written + write_group(encoder, &[])?)
}

pub(crate) fn write_command_message(
    encoder: &mut AMF3Encoder,
    message: &CommandMessage,
) -> EncodeResult {
    let written = write_async_message(encoder, &message.base)?;
    Ok(written + write_group(encoder, &[(OPERATION_FLAG, &message.operation)])?)
}

pub(crate) fn write_array_collection(
    encoder: &mut AMF3Encoder,
    collection: &ArrayCollection,
) -> EncodeResult {
    encoder.write_value(&collection.source)
}

pub(crate) fn write_object_proxy(encoder: &mut AMF3Encoder, proxy: &ObjectProxy) -> EncodeResult {
    encoder.write_value(&proxy.object)
}

pub(crate) fn write_serialization_proxy(
    encoder: &mut AMF3Encoder,
    proxy: &SerializationProxy,
) -> EncodeResult {
    encoder.write_value(&proxy.default_instance)
}

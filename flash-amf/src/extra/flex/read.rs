//! Handles decoding of flex types

use crate::amf3::read::AMF3Decoder;
use crate::extra::flex::{
    AbstractMessage, AcknowledgeMessage, ArrayCollection, AsyncMessage, BODY_FLAG,
    CLIENT_ID_BYTES_FLAG, CLIENT_ID_FLAG, CORRELATION_ID_BYTES_FLAG, CORRELATION_ID_FLAG,
    CommandMessage, DESTINATION_FLAG, HEADERS_FLAG, MESSAGE_ID_BYTES_FLAG, MESSAGE_ID_FLAG,
    NEXT_FLAG, OPERATION_FLAG, ObjectProxy, SerializationProxy, TIMESTAMP_FLAG, TTL_FLAG,
};
use crate::nom_utils::AMFResult;
use crate::types::Value;
use nom::number::complete::be_u8;

/// The flag bytes of one field group, with the high continuation bit stripped
struct Flags {
    bytes: Vec<u8>,
    current: usize,
}

impl Flags {
    /// Clear `mask` in the current byte, returning whether it was set
    fn take(&mut self, mask: u8) -> bool {
        match self.bytes.get_mut(self.current) {
            Some(flags) if *flags & mask != 0 => {
                *flags &= !mask;
                true
            }
            _ => false,
        }
    }

    /// Move on to the next flag byte
    fn next(&mut self) {
        self.current += 1;
    }

    /// The number of bits nobody took, each one stands for a value
    fn unknown(&self) -> u32 {
        self.bytes.iter().map(|b| b.count_ones()).sum()
    }
}

fn parse_flags(i: &[u8]) -> AMFResult<'_, Flags> {
    let mut bytes = Vec::new();

    let mut k = i;
    loop {
        let (j, flag) = be_u8(k)?;
        bytes.push(flag & !NEXT_FLAG);
        k = j;
        if flag & NEXT_FLAG == 0 {
            break;
        }
    }

    Ok((k, Flags { bytes, current: 0 }))
}

fn parse_field<'a>(
    i: &'a [u8],
    amf3: &mut AMF3Decoder,
    flags: &mut Flags,
    mask: u8,
) -> AMFResult<'a, Option<Value>> {
    if !flags.take(mask) {
        return Ok((i, None));
    }

    let (i, value) = amf3.parse_single_element(i)?;
    Ok((i, Some(value)))
}

/// Read and drop one value for every flag bit nobody claimed
fn skip_unknown<'a>(i: &'a [u8], amf3: &mut AMF3Decoder, flags: &Flags) -> AMFResult<'a, ()> {
    let mut k = i;
    for _ in 0..flags.unknown() {
        let (j, value) = amf3.parse_single_element(k)?;
        log::debug!("Discarding unknown flex field: {}", value.type_name());
        k = j;
    }
    Ok((k, ()))
}

pub(crate) fn parse_abstract_message<'a>(
    i: &'a [u8],
    amf3: &mut AMF3Decoder,
) -> AMFResult<'a, AbstractMessage> {
    let (i, mut flags) = parse_flags(i)?;
    let f = &mut flags;

    let (i, body) = parse_field(i, amf3, f, BODY_FLAG)?;
    let (i, client_id) = parse_field(i, amf3, f, CLIENT_ID_FLAG)?;
    let (i, destination) = parse_field(i, amf3, f, DESTINATION_FLAG)?;
    let (i, headers) = parse_field(i, amf3, f, HEADERS_FLAG)?;
    let (i, message_id) = parse_field(i, amf3, f, MESSAGE_ID_FLAG)?;
    let (i, timestamp) = parse_field(i, amf3, f, TIMESTAMP_FLAG)?;
    let (i, time_to_live) = parse_field(i, amf3, f, TTL_FLAG)?;
    f.next();
    let (i, client_id_bytes) = parse_field(i, amf3, f, CLIENT_ID_BYTES_FLAG)?;
    let (i, message_id_bytes) = parse_field(i, amf3, f, MESSAGE_ID_BYTES_FLAG)?;

    let (i, _) = skip_unknown(i, amf3, &flags)?;

    Ok((
        i,
        AbstractMessage {
            body,
            client_id,
            destination,
            headers,
            message_id,
            timestamp,
            time_to_live,
            client_id_bytes,
            message_id_bytes,
        },
    ))
}

pub(crate) fn parse_async_message<'a>(
    i: &'a [u8],
    amf3: &mut AMF3Decoder,
) -> AMFResult<'a, AsyncMessage> {
    let (i, base) = parse_abstract_message(i, amf3)?;
    let (i, mut flags) = parse_flags(i)?;

    let (i, correlation_id) = parse_field(i, amf3, &mut flags, CORRELATION_ID_FLAG)?;
    let (i, correlation_id_bytes) = parse_field(i, amf3, &mut flags, CORRELATION_ID_BYTES_FLAG)?;

    let (i, _) = skip_unknown(i, amf3, &flags)?;

    Ok((
        i,
        AsyncMessage {
            base,
            correlation_id,
            correlation_id_bytes,
        },
    ))
}

pub(crate) fn parse_acknowledge_message<'a>(
    i: &'a [u8],
    amf3: &mut AMF3Decoder,
) -> AMFResult<'a, AcknowledgeMessage> {
    let (i, base) = parse_async_message(i, amf3)?;
    // No fields of its own, but newer peers may still send some
    let (i, flags) = parse_flags(i)?;
    let (i, _) = skip_unknown(i, amf3, &flags)?;

    Ok((i, AcknowledgeMessage { base }))
}

pub(crate) fn parse_command_message<'a>(
    i: &'a [u8],
    amf3: &mut AMF3Decoder,
) -> AMFResult<'a, CommandMessage> {
    let (i, base) = parse_async_message(i, amf3)?;
    let (i, mut flags) = parse_flags(i)?;

    let (i, operation) = parse_field(i, amf3, &mut flags, OPERATION_FLAG)?;

    let (i, _) = skip_unknown(i, amf3, &flags)?;

    Ok((i, CommandMessage { base, operation }))
}

pub(crate) fn parse_array_collection<'a>(
    i: &'a [u8],
    amf3: &mut AMF3Decoder,
) -> AMFResult<'a, ArrayCollection> {
    let (i, source) = amf3.parse_single_element(i)?;
    Ok((i, ArrayCollection { source }))
}

pub(crate) fn parse_object_proxy<'a>(
    i: &'a [u8],
    amf3: &mut AMF3Decoder,
) -> AMFResult<'a, ObjectProxy> {
    let (i, object) = amf3.parse_single_element(i)?;
    Ok((i, ObjectProxy { object }))
}

pub(crate) fn parse_serialization_proxy<'a>(
    i: &'a [u8],
    amf3: &mut AMF3Decoder,
) -> AMFResult<'a, SerializationProxy> {
    let (i, default_instance) = amf3.parse_single_element(i)?;
    Ok((i, SerializationProxy { default_instance }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn flags_follow_continuation_bit() {
        let (rest, flags) = parse_flags(&[0x81, 0x82, 0x03, 0xFF]).unwrap();
        assert_eq!(flags.bytes, vec![0x01, 0x02, 0x03]);
        assert_eq!(rest, &[0xFF]);
    }

    #[test]
    fn taken_bits_are_not_unknown() {
        let (_, mut flags) = parse_flags(&[0x83, 0x01]).unwrap();
        assert!(flags.take(0x01));
        assert!(!flags.take(0x01));
        assert!(!flags.take(0x04));
        assert_eq!(flags.unknown(), 2);

        flags.next();
        assert!(flags.take(0x01));
        flags.next();
        assert!(!flags.take(0x01));
        assert_eq!(flags.unknown(), 1);
    }

    #[test]
    fn abstract_message_fields() {
        // body: 1, destination: "d"
        let bytes = [0x05, 0x04, 0x01, 0x06, 0x03, b'd'];
        let mut amf3 = AMF3Decoder::default();
        let (rest, message) = parse_abstract_message(&bytes, &mut amf3).unwrap();

        assert!(rest.is_empty());
        assert_eq!(message.body, Some(Value::Integer(1)));
        assert_eq!(message.destination, Some(Value::string("d")));
        assert_eq!(message.client_id, None);
    }

    #[test]
    fn unknown_bits_are_skipped() {
        // second flag byte with an unknown bit, followed by its value and a trailing byte
        let bytes = [0x80, 0x04, 0x03, 0x42];
        let mut amf3 = AMF3Decoder::default();
        let (rest, message) = parse_abstract_message(&bytes, &mut amf3).unwrap();

        assert_eq!(rest, &[0x42]);
        assert_eq!(message, AbstractMessage::default());
    }

    #[test]
    fn acknowledge_message_reads_three_groups() {
        let bytes = [0x00, 0x01, 0x06, 0x03, b'c', 0x00];
        let mut amf3 = AMF3Decoder::default();
        let (rest, message) = parse_acknowledge_message(&bytes, &mut amf3).unwrap();

        assert!(rest.is_empty());
        assert_eq!(message.base.correlation_id, Some(Value::string("c")));
    }
}

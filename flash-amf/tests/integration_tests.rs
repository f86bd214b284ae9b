use core::fmt;
use flash_amf::amf3::custom_encoder::{ExternalHandler, ExternalRegistry};
use flash_amf::amf3::write::EncodeResult;
use flash_amf::errors::Error;
use flash_amf::types::{Array, ClassDefinition, ExternalObject, Object, Value};
use flash_amf::{AMF3Decoder, AMF3Encoder, AMFResult};
use pretty_assertions::assert_eq;
use std::any::Any;
use std::rc::Rc;

/// Wrapper around Vec<u8> that makes `{:#?}` the same as `{:?}`
/// Used in `assert*!` macros in combination with `pretty_assertions` crate to make
/// test failures to show nice diffs.
#[derive(PartialEq, Eq)]
#[doc(hidden)]
pub struct PrettyArray<'a>(pub &'a [u8]);

/// Make diff to display string as single-line string
impl fmt::Debug for PrettyArray<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&format!("{:02X?}", self.0))
    }
}

/// Decode `data`, check nothing is left over, then check encoding gives back the same bytes
fn assert_round_trip(registry: Rc<ExternalRegistry>, data: &[u8]) -> Value {
    let (value, consumed) = AMF3Decoder::new(Rc::clone(&registry))
        .decode(data)
        .unwrap_or_else(|e| panic!("decode failed: {}", e));
    assert_eq!(consumed, data.len(), "unparsed bytes");

    let bytes = AMF3Encoder::new(registry).encode(&value).unwrap();
    assert_eq!(PrettyArray(&bytes), PrettyArray(data), "library output != input");
    value
}

macro_rules! auto_test {
    ($([$name: ident, $bytes: expr]),*) => {
        $(
        #[test]
        pub fn $name() {
            assert_round_trip(Rc::new(ExternalRegistry::new()), &$bytes);
        }
        )*
    }
}

auto_test! {
    [undefined, [0x00]],
    [null, [0x01]],
    [boolean_false, [0x02]],
    [boolean_true, [0x03]],
    [integer_small, [0x04, 0x2B]],
    [integer_negative, [0x04, 0xFF, 0xFF, 0xFF, 0xFF]],
    [integer_max, [0x04, 0xBF, 0xFF, 0xFF, 0xFF]],
    [double_pi, [0x05, 0x40, 0x09, 0x21, 0xFB, 0x54, 0x44, 0x2D, 0x18]],
    [string, [0x06, 0x0B, b'h', b'e', b'l', b'l', b'o']],
    [empty_string, [0x06, 0x01]],
    [xml, [0x0B, 0x05, b'<', b'>']],
    [xml_document, [0x07, 0x05, b'<', b'>']],
    [byte_array, [0x0C, 0x07, 0x00, 0x01, 0x02]],
    [date, [0x08, 0x01, 0x42, 0x71, 0x6F, 0xC1, 0xAB, 0x40, 0x00, 0x00]],
    [string_reference, [0x09, 0x05, 0x01, 0x06, 0x05, b'a', b'b', 0x06, 0x00]],
    [key_and_value_share_a_string, [0x0A, 0x0B, 0x01, 0x03, b'a', 0x06, 0x00, 0x01]],
    [date_reference, [0x09, 0x05, 0x01, 0x08, 0x01, 0x40, 0x59, 0, 0, 0, 0, 0, 0, 0x08, 0x02]],
    [byte_array_reference, [0x09, 0x05, 0x01, 0x0C, 0x03, 0x07, 0x0C, 0x02]],
    [mixed_array, [0x09, 0x03, 0x03, b'k', 0x03, 0x01, 0x01]],
    [self_referencing_array, [0x09, 0x03, 0x01, 0x09, 0x00]],
    [anonymous_object, [0x0A, 0x0B, 0x01, 0x03, b'a', 0x04, 0x01, 0x01]],
    [shared_object, [0x09, 0x05, 0x01, 0x0A, 0x0B, 0x01, 0x01, 0x0A, 0x02]],
    [trait_reference, [
        0x09, 0x05, 0x01,
        0x0A, 0x13, 0x03, b'P', 0x03, b'x', 0x04, 0x01,
        0x0A, 0x01, 0x04, 0x02
    ]],
    [dynamic_object_with_members, [
        0x0A, 0x1B, 0x03, b'T', 0x03, b'a', 0x04, 0x01, 0x03, b'b', 0x02, 0x01
    ]]
}

#[test]
fn anonymous_object_has_expected_bytes() {
    let object = Object::anonymous();
    object.set("a", Value::Integer(1)).unwrap();

    let bytes = flash_amf::write_to_bytes(&object.into()).unwrap();
    assert_eq!(
        PrettyArray(&bytes),
        PrettyArray(&[0x0A, 0x0B, 0x01, 0x03, b'a', 0x04, 0x01, 0x01])
    );
}

#[test]
fn built_graph_round_trips() {
    let point = Rc::new(ClassDefinition::sealed(
        "com.example.Point",
        vec!["x".to_string(), "y".to_string()],
    ));
    let origin = Object::new(Rc::clone(&point));
    origin.set("x", Value::Double(0.5)).unwrap();
    origin.set("y", Value::Integer(-7)).unwrap();
    let origin = Value::from(origin);

    let array = Array::from_dense([
        origin.clone(),
        origin,
        Value::new_object(point),
        Value::string("point"),
        Value::string("point"),
        Value::Date(1_600_000_000_000.0),
        Value::byte_array(&[1, 2, 3]),
        Value::xml("<a/>"),
        Value::Null,
    ]);
    array.set_property("name", Value::string("points"));
    let value = Value::from(array);

    let bytes = flash_amf::write_to_bytes(&value).unwrap();
    let (decoded, consumed) = flash_amf::read_value(&bytes).unwrap();
    assert_eq!(consumed, bytes.len());
    assert_eq!(decoded, value);

    // The shared point comes back shared
    let array = decoded.as_array().unwrap();
    let first = array.get(0).unwrap();
    let second = array.get(1).unwrap();
    assert!(Rc::ptr_eq(first.as_object().unwrap(), second.as_object().unwrap()));
}

#[test]
fn integers_wrap_to_29_bits() {
    let value = Value::integer(0x1000_0000);
    let bytes = flash_amf::write_to_bytes(&value).unwrap();
    let (decoded, _) = flash_amf::read_value(&bytes).unwrap();
    assert_eq!(decoded, Value::Integer(-0x1000_0000));
}

#[test]
fn trailing_bytes_are_left_alone() {
    let data = [0x04, 0x01, 0xAA, 0xBB];
    let (value, consumed) = flash_amf::read_value(&data).unwrap();
    assert_eq!(value, Value::Integer(1));
    assert_eq!(consumed, 2);
}

#[test]
fn errors() {
    assert_eq!(flash_amf::read_value(&[]), Err(Error::TruncatedInput));
    assert_eq!(flash_amf::read_value(&[0x05, 0x00]), Err(Error::TruncatedInput));
    assert_eq!(flash_amf::read_value(&[0x0D]), Err(Error::UnknownMarker(0x0D)));
    assert_eq!(
        flash_amf::read_value(&[0x0C, 0x02]),
        Err(Error::InvalidReference {
            table: flash_amf::errors::Table::Object,
            index: 1
        })
    );
}

#[derive(Debug, PartialEq)]
struct Vector3(i32, i32, i32);

impl ExternalObject for Vector3 {
    fn properties(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("x", Value::Integer(self.0)),
            ("y", Value::Integer(self.1)),
            ("z", Value::Integer(self.2)),
        ]
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct Vector3Handler;

impl ExternalHandler for Vector3Handler {
    fn decode<'a>(
        &self,
        decoder: &mut AMF3Decoder,
        i: &'a [u8],
        class_name: &str,
    ) -> AMFResult<'a, Box<dyn ExternalObject>> {
        let mut parts = [0; 3];
        let mut i = i;
        for part in parts.iter_mut() {
            let (j, value) = decoder.parse_single_element(i)?;
            *part = value.as_integer().ok_or_else(|| {
                nom::Err::Error(Error::PluginFailure {
                    class_name: class_name.to_string(),
                    reason: "expected an integer".to_string(),
                })
            })?;
            i = j;
        }

        Ok((i, Box::new(Vector3(parts[0], parts[1], parts[2]))))
    }

    fn encode(
        &self,
        encoder: &mut AMF3Encoder,
        class_name: &str,
        payload: &dyn ExternalObject,
    ) -> EncodeResult {
        let vector = payload
            .as_any()
            .downcast_ref::<Vector3>()
            .ok_or_else(|| Error::PluginFailure {
                class_name: class_name.to_string(),
                reason: "not a Vector3".to_string(),
            })?;

        Ok(encoder.write_value(&Value::Integer(vector.0))?
            + encoder.write_value(&Value::Integer(vector.1))?
            + encoder.write_value(&Value::Integer(vector.2))?)
    }
}

fn vector_registry() -> Rc<ExternalRegistry> {
    let mut registry = ExternalRegistry::new();
    registry.register("V3", Vector3Handler);
    Rc::new(registry)
}

#[test]
fn registered_handler_round_trips() {
    let data = [
        0x0A, 0x07, 0x05, b'V', b'3', 0x04, 0x01, 0x04, 0x02, 0x04, 0x03,
    ];
    let value = assert_round_trip(vector_registry(), &data);

    let object = value.as_object().unwrap();
    assert_eq!(object.class_name(), "V3");
    let payload = object.external().unwrap();
    assert_eq!(
        payload.as_any().downcast_ref::<Vector3>(),
        Some(&Vector3(1, 2, 3))
    );
}

#[test]
fn handler_failure_is_reported() {
    let data = [0x0A, 0x07, 0x05, b'V', b'3', 0x01];
    assert_eq!(
        AMF3Decoder::new(vector_registry()).decode(&data),
        Err(Error::PluginFailure {
            class_name: "V3".to_string(),
            reason: "expected an integer".to_string(),
        })
    );
}

#[test]
fn missing_handler() {
    let data = [0x0A, 0x07, 0x05, b'V', b'3', 0x04, 0x01, 0x04, 0x02, 0x04, 0x03];
    assert_eq!(
        flash_amf::read_value(&data),
        Err(Error::MissingPlugin("V3".to_string()))
    );

    let value = Value::new_external("V3", Box::new(Vector3(1, 2, 3)));
    assert_eq!(
        flash_amf::write_to_bytes(&value),
        Err(Error::MissingPlugin("V3".to_string()))
    );
}

#[cfg(feature = "flex")]
mod flex {
    use super::*;
    use pretty_assertions::assert_eq;
    use flash_amf::extra::flex::{
        AcknowledgeMessage, ArrayCollection, CommandMessage, register_flex,
    };

    fn flex_registry() -> Rc<ExternalRegistry> {
        let mut registry = ExternalRegistry::new();
        register_flex(&mut registry);
        Rc::new(registry)
    }

    /// An externalizable object header for `class_name` followed by `body`
    fn external(class_name: &str, body: &[u8]) -> Vec<u8> {
        let mut data = vec![0x0A, 0x07, ((class_name.len() << 1) | 1) as u8];
        data.extend_from_slice(class_name.as_bytes());
        data.extend_from_slice(body);
        data
    }

    #[test]
    fn acknowledge_message() {
        let data = external(
            "DSK",
            &[0x01, 0x04, 0x01, 0x01, 0x06, 0x03, b'c', 0x00],
        );
        let value = assert_round_trip(flex_registry(), &data);

        let object = value.as_object().unwrap();
        let payload = object.external().unwrap();
        let message = payload.as_any().downcast_ref::<AcknowledgeMessage>().unwrap();
        assert_eq!(message.base.base.body, Some(Value::Integer(1)));
        assert_eq!(message.base.correlation_id, Some(Value::string("c")));
    }

    #[test]
    fn error_message_shares_the_acknowledge_layout() {
        let data = external("flex.messaging.messages.ErrorMessage", &[0x00, 0x00, 0x00]);
        assert_round_trip(flex_registry(), &data);
    }

    #[test]
    fn command_message() {
        let data = external("DSC", &[0x00, 0x00, 0x01, 0x04, 0x05]);
        let value = assert_round_trip(flex_registry(), &data);

        let object = value.as_object().unwrap();
        let payload = object.external().unwrap();
        let message = payload.as_any().downcast_ref::<CommandMessage>().unwrap();
        assert_eq!(message.operation, Some(Value::Integer(5)));
    }

    #[test]
    fn array_collection() {
        let data = external(
            "flex.messaging.io.ArrayCollection",
            &[0x09, 0x05, 0x01, 0x04, 0x01, 0x04, 0x02],
        );
        let value = assert_round_trip(flex_registry(), &data);

        let object = value.as_object().unwrap();
        let payload = object.external().unwrap();
        let collection = payload.as_any().downcast_ref::<ArrayCollection>().unwrap();
        assert_eq!(
            collection.source,
            Value::from(Array::from_dense([Value::Integer(1), Value::Integer(2)]))
        );
    }

    #[test]
    fn nested_values_share_the_session_tables() {
        // ["DSK", ArrayCollection(["DSK"])], the inner string is a reference
        let mut data = vec![0x09, 0x05, 0x01, 0x06, 0x07, b'D', b'S', b'K'];
        data.extend(external(
            "flex.messaging.io.ArrayCollection",
            &[0x09, 0x03, 0x01, 0x06, 0x00],
        ));
        assert_round_trip(flex_registry(), &data);
    }

    #[test]
    fn unknown_fields_are_dropped() {
        // Abstract flags with a bit nobody defines, then its value
        let data = external("DSK", &[0x80, 0x40, 0x06, 0x03, b'?', 0x00, 0x00]);
        let (value, consumed) = AMF3Decoder::new(flex_registry()).decode(&data).unwrap();
        assert_eq!(consumed, data.len());

        let object = value.as_object().unwrap();
        let payload = object.external().unwrap();
        assert_eq!(
            payload.as_any().downcast_ref::<AcknowledgeMessage>(),
            Some(&AcknowledgeMessage::default())
        );
    }

    #[test]
    fn dump_shows_payload() {
        let data = external("DSK", &[0x01, 0x04, 0x01, 0x00, 0x00]);
        let (value, _) = AMF3Decoder::new(flex_registry()).decode(&data).unwrap();
        assert_eq!(
            flash_amf::dump::to_string(&value),
            "(Object \"DSK\")\n  body: (Integer) 1\n"
        );
    }
}

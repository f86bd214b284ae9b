use crate::types::{Array, Object, Value, visit};
use serde::ser::{Error as _, SerializeMap, SerializeStruct};
use serde::{Serialize, Serializer};
use std::rc::Rc;

const CYCLE: &str = "value graph refers back to one of its own containers";

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Undefined => serializer.serialize_unit_variant("Value", 0, "Undefined"),
            Value::Null => serializer.serialize_unit_variant("Value", 1, "Null"),
            Value::Bool(b) => serializer.serialize_newtype_variant("Value", 2, "Bool", b),
            Value::Integer(i) => serializer.serialize_newtype_variant("Value", 3, "Integer", i),
            Value::Double(n) => serializer.serialize_newtype_variant("Value", 4, "Double", n),
            Value::String(s) => serializer.serialize_newtype_variant("Value", 5, "String", s),
            // Text that is not UTF-8 is shown with replacement characters
            Value::XmlDocument(text) => serializer.serialize_newtype_variant(
                "Value",
                6,
                "XmlDocument",
                &String::from_utf8_lossy(text),
            ),
            Value::Xml(text) => serializer.serialize_newtype_variant(
                "Value",
                7,
                "Xml",
                &String::from_utf8_lossy(text),
            ),
            Value::ByteArray(b) => serializer.serialize_newtype_variant("Value", 8, "ByteArray", b),
            Value::Date(d) => serializer.serialize_newtype_variant("Value", 9, "Date", d),
            Value::Array(a) => serializer.serialize_newtype_variant("Value", 10, "Array", &**a),
            Value::Object(o) => serializer.serialize_newtype_variant("Value", 11, "Object", &**o),
        }
    }
}

/// Serializes a list of named values as a map
struct Entries<'a, K>(&'a [(K, Value)]);

impl<K: AsRef<str>> Serialize for Entries<'_, K> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in self.0 {
            map.serialize_entry(key.as_ref(), value)?;
        }
        map.end()
    }
}

/// Serializes the declared members of an object as a map
struct Sealed<'a> {
    names: &'a [String],
    values: &'a [Value],
}

impl Serialize for Sealed<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (name, value) in self.names.iter().zip(self.values) {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl Serialize for Array {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        visit(self as *const Self, move || {
            let mut s = serializer.serialize_struct("Array", 2)?;
            s.serialize_field("dense", &*self.dense())?;
            s.serialize_field("associative", &Entries::<Rc<str>>(&self.associative()))?;
            s.end()
        })
        .unwrap_or_else(|| Err(S::Error::custom(CYCLE)))
    }
}

impl Serialize for Object {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        visit(self as *const Self, move || {
            let class_def = self.class_def();
            let mut s = serializer.serialize_struct("Object", 3)?;
            s.serialize_field("class_def", &**class_def)?;
            if let Some(payload) = self.external() {
                s.serialize_field("external", &Entries(&payload.properties()))?;
                return s.end();
            }

            if let Some(sealed) = self.sealed_values() {
                let sealed = Sealed {
                    names: class_def.static_properties(),
                    values: &sealed,
                };
                s.serialize_field("sealed", &sealed)?;
            }
            if let Some(dynamic) = self.dynamic_properties() {
                s.serialize_field("dynamic", &Entries::<Rc<str>>(&dynamic))?;
            }
            s.end()
        })
        .unwrap_or_else(|| Err(S::Error::custom(CYCLE)))
    }
}

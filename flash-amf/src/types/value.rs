use super::{Array, ClassDefinition, ExternalObject, Object};
use std::rc::Rc;

/// The largest value an AMF3 integer can hold
pub const INTEGER_MAX: i32 = 0x0FFF_FFFF;

/// The smallest value an AMF3 integer can hold
pub const INTEGER_MIN: i32 = -0x1000_0000;

/// A single AMF3 value
///
/// Scalars are held inline. Everything else sits behind an `Rc`, so cloning a `Value` is cheap
/// and shares the underlying data, the same way a back-reference on the wire does.
#[derive(Clone, Debug)]
pub enum Value {
    /// The undefined value
    Undefined,

    /// The null value
    Null,

    /// A boolean
    Bool(bool),

    /// A 29 bit signed integer
    ///
    /// Build it with [`Value::integer`] so that it holds what the wire can carry. A value outside
    /// [`INTEGER_MIN`]..=[`INTEGER_MAX`] is masked to 29 bits when encoded and decodes as the
    /// wrapped value.
    Integer(i32),

    /// An IEEE-754 double
    Double(f64),

    /// UTF-8 text
    String(Rc<str>),

    /// A legacy `flash.xml.XMLDocument`, as the raw bytes of its text
    XmlDocument(Rc<[u8]>),

    /// An E4X `XML` value, as text
    Xml(Rc<[u8]>),

    /// Raw bytes
    ByteArray(Rc<[u8]>),

    /// Milliseconds since the unix epoch
    Date(f64),

    /// A dense list with an optional string keyed part
    Array(Rc<Array>),

    /// An instance of a class
    Object(Rc<Object>),
}

impl Value {
    /// An integer, wrapped into the 29 bit range the same way the wire format wraps it
    pub fn integer(i: i32) -> Self {
        Value::Integer(wrap_i29(i))
    }

    /// A string, copying `s`
    pub fn string(s: &str) -> Self {
        Value::String(Rc::from(s))
    }

    /// An `XMLDocument`, copying `text`
    ///
    /// The text is kept as bytes and is not required to be UTF-8.
    pub fn xml_document(text: impl AsRef<[u8]>) -> Self {
        Value::XmlDocument(Rc::from(text.as_ref()))
    }

    /// An `XML` value, copying `text`
    pub fn xml(text: impl AsRef<[u8]>) -> Self {
        Value::Xml(Rc::from(text.as_ref()))
    }

    /// A byte array, copying `bytes`
    pub fn byte_array(bytes: &[u8]) -> Self {
        Value::ByteArray(Rc::from(bytes))
    }

    /// A new, empty array
    pub fn new_array() -> Self {
        Value::Array(Rc::new(Array::default()))
    }

    /// A new object of the given class with no properties set
    pub fn new_object(class_def: Rc<ClassDefinition>) -> Self {
        Value::Object(Rc::new(Object::new(class_def)))
    }

    /// A new externalizable object of class `class_name` holding `payload`
    pub fn new_external(class_name: &str, payload: Box<dyn ExternalObject>) -> Self {
        Value::Object(Rc::new(Object::with_external(class_name, payload)))
    }

    /// A short name for the kind of this value
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "Undefined",
            Value::Null => "Null",
            Value::Bool(_) => "Boolean",
            Value::Integer(_) => "Integer",
            Value::Double(_) => "Double",
            Value::String(_) => "String",
            Value::XmlDocument(_) => "XmlDocument",
            Value::Xml(_) => "Xml",
            Value::ByteArray(_) => "ByteArray",
            Value::Date(_) => "Date",
            Value::Array(_) => "Array",
            Value::Object(_) => "Object",
        }
    }

    /// The text of a string value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// The value of a boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The value of an integer
    pub fn as_integer(&self) -> Option<i32> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// The value of an integer or a double, as a double
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(f64::from(*i)),
            Value::Double(d) => Some(*d),
            _ => None,
        }
    }

    /// The bytes of a byte array
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::ByteArray(b) => Some(b),
            _ => None,
        }
    }

    /// The text of an `XML` or `XMLDocument` value, as bytes
    pub fn as_xml(&self) -> Option<&[u8]> {
        match self {
            Value::Xml(text) | Value::XmlDocument(text) => Some(text),
            _ => None,
        }
    }

    /// The array behind an array value
    pub fn as_array(&self) -> Option<&Rc<Array>> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// The object behind an object value
    pub fn as_object(&self) -> Option<&Rc<Object>> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Whether this is `Null` or `Undefined`
    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Null | Value::Undefined)
    }

    /// Whether `other` would be written as a back-reference to `self` in the object table
    ///
    /// Containers match only themselves. Dates match by timestamp and the byte carrying types
    /// match by kind and content.
    pub(crate) fn is_same_reference(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            (Value::Date(a), Value::Date(b)) => a.to_bits() == b.to_bits(),
            (Value::ByteArray(a), Value::ByteArray(b)) => a == b,
            (Value::Xml(a), Value::Xml(b)) => a == b,
            (Value::XmlDocument(a), Value::XmlDocument(b)) => a == b,
            _ => false,
        }
    }
}

/// Wrap `i` into the 29 bit two's complement range
pub(crate) fn wrap_i29(i: i32) -> i32 {
    (i << 3) >> 3
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::XmlDocument(a), Value::XmlDocument(b)) => a == b,
            (Value::Xml(a), Value::Xml(b)) => a == b,
            (Value::ByteArray(a), Value::ByteArray(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b) || a == b,
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b) || a == b,
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::integer(i)
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::Double(d)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(Rc::from(s))
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Value::ByteArray(Rc::from(bytes))
    }
}

impl From<Array> for Value {
    fn from(array: Array) -> Self {
        Value::Array(Rc::new(array))
    }
}

impl From<Object> for Value {
    fn from(object: Object) -> Self {
        Value::Object(Rc::new(object))
    }
}

//! Handles encoding AMF3
use crate::amf3::custom_encoder::ExternalRegistry;
use crate::amf3::element_cache::ElementCache;
use crate::amf3::length::{Length, MAX_LENGTH};
use crate::amf3::type_marker::TypeMarker;
use crate::errors::Error;
use crate::types::{Array, ClassDefinition, Object, Value, wrap_i29};
use byteorder::{BigEndian, WriteBytesExt};
use std::io::Write;
use std::rc::Rc;

/// The number of bytes written, or why writing failed
pub type EncodeResult = Result<usize, Error<'static>>;

/// Handles encoding AMF3
///
/// An encoder owns an output buffer and the reference tables of one session. Both are reset at
/// the start and end of every call to [`AMF3Encoder::encode`].
#[derive(Debug)]
pub struct AMF3Encoder {
    out: Vec<u8>,

    /// The table used to cache repeated strings
    string_reference_table: ElementCache<Rc<str>>,

    /// The table used to cache repeated trait definitions
    trait_reference_table: ElementCache<Rc<ClassDefinition>>,

    /// The table used to cache repeated objects
    object_reference_table: ElementCache<Value>,

    /// Handlers used for externalizable classes
    external_encoders: Rc<ExternalRegistry>,
}

impl Default for AMF3Encoder {
    fn default() -> Self {
        Self::new(Rc::new(ExternalRegistry::default()))
    }
}

fn length_of(len: usize) -> Result<Length, Error<'static>> {
    if len > MAX_LENGTH {
        return Err(Error::ValueTooLarge(len));
    }
    Ok(Length::Size(len as u32))
}

impl AMF3Encoder {
    /// An encoder that hands externalizable classes to the handlers in `registry`
    pub fn new(registry: Rc<ExternalRegistry>) -> Self {
        Self {
            out: Vec::new(),
            string_reference_table: ElementCache::default(),
            trait_reference_table: ElementCache::default(),
            object_reference_table: ElementCache::default(),
            external_encoders: registry,
        }
    }

    /// The handlers this encoder uses
    pub fn registry(&self) -> &Rc<ExternalRegistry> {
        &self.external_encoders
    }

    /// Encode `value` into a new buffer
    pub fn encode(&mut self, value: &Value) -> Result<Vec<u8>, Error<'static>> {
        self.reset();
        let result = self.write_value(value);
        let out = std::mem::take(&mut self.out);
        self.reset();

        result?;
        Ok(out)
    }

    fn reset(&mut self) {
        self.out.clear();
        self.string_reference_table.clear();
        self.trait_reference_table.clear();
        self.object_reference_table.clear();
    }

    fn reserve(&mut self, additional: usize) -> Result<(), Error<'static>> {
        self.out.try_reserve(additional)?;
        Ok(())
    }

    /// Write a single byte
    pub fn write_u8(&mut self, b: u8) -> EncodeResult {
        self.reserve(1)?;
        self.out.write_u8(b)?;
        Ok(1)
    }

    /// Write raw bytes
    pub fn write_bytes(&mut self, bytes: &[u8]) -> EncodeResult {
        self.reserve(bytes.len())?;
        self.out.write_all(bytes)?;
        Ok(bytes.len())
    }

    fn write_f64(&mut self, n: f64) -> EncodeResult {
        self.reserve(8)?;
        self.out.write_f64::<BigEndian>(n)?;
        Ok(8)
    }

    /// Write the low 29 bits of `i` as a U29
    #[allow(clippy::unusual_byte_groupings)]
    pub(crate) fn write_int(&mut self, i: u32) -> EncodeResult {
        let n = i & 0b000_1111111_1111111_1111111_11111111;

        if n > 0x1fffff {
            self.reserve(4)?;
            self.out.write_u8(((n >> (7 * 3 + 1)) | 0b10000000) as u8)?;
            self.out.write_u8(((n >> (7 * 2 + 1)) | 0b10000000) as u8)?;
            self.out.write_u8(((n >> (7 + 1)) | 0b10000000) as u8)?;
            self.out.write_u8((n & 0b11111111) as u8)?;
            Ok(4)
        } else if n > 0x3fff {
            self.reserve(3)?;
            self.out.write_u8(((n >> (7 * 2)) | 0b10000000) as u8)?;
            self.out.write_u8(((n >> 7) | 0b10000000) as u8)?;
            self.out.write_u8((n & 0b01111111) as u8)?;
            Ok(3)
        } else if n > 0x7f {
            self.reserve(2)?;
            self.out.write_u8(((n >> 7) | 0b10000000) as u8)?;
            self.out.write_u8((n & 0b01111111) as u8)?;
            Ok(2)
        } else {
            self.write_u8(n as u8)
        }
    }

    fn write_length(&mut self, length: Length) -> EncodeResult {
        self.write_int(length.to_header())
    }

    fn write_type_marker(&mut self, marker: TypeMarker) -> EncodeResult {
        self.write_u8(marker as u8)
    }

    /// Write a string body, as a back-reference when the string was written before
    ///
    /// The empty string is always written inline and never enters the table.
    pub fn write_string(&mut self, s: &str) -> EncodeResult {
        if s.is_empty() {
            return self.write_length(Length::Size(0));
        }

        length_of(s.len())?;
        let length = self
            .string_reference_table
            .to_length(|t| **t == *s, s.len() as u32);
        if length.is_reference() {
            return self.write_length(length);
        }

        self.string_reference_table.store(Rc::from(s));
        Ok(self.write_length(length)? + self.write_bytes(s.as_bytes())?)
    }

    fn write_sized_bytes(&mut self, bytes: &[u8]) -> EncodeResult {
        let length = length_of(bytes.len())?;
        Ok(self.write_length(length)? + self.write_bytes(bytes)?)
    }

    /// Write a marked value, sharing this session's reference tables
    ///
    /// This is the entry point for external handlers writing values nested in their body.
    pub fn write_value(&mut self, value: &Value) -> EncodeResult {
        match value {
            Value::Undefined => self.write_type_marker(TypeMarker::Undefined),
            Value::Null => self.write_type_marker(TypeMarker::Null),
            Value::Bool(false) => self.write_type_marker(TypeMarker::False),
            Value::Bool(true) => self.write_type_marker(TypeMarker::True),
            Value::Integer(i) => {
                if wrap_i29(*i) != *i {
                    log::warn!("Integer {} does not fit in 29 bits, writing {}", i, wrap_i29(*i));
                }
                Ok(self.write_type_marker(TypeMarker::Integer)? + self.write_int(*i as u32)?)
            }
            Value::Double(n) => {
                Ok(self.write_type_marker(TypeMarker::Double)? + self.write_f64(*n)?)
            }
            Value::String(s) => {
                Ok(self.write_type_marker(TypeMarker::String)? + self.write_string(s)?)
            }
            Value::XmlDocument(text) => {
                self.write_referenceable(TypeMarker::XmlDocument, value, |this| {
                    this.write_sized_bytes(text)
                })
            }
            Value::Xml(text) => self.write_referenceable(TypeMarker::Xml, value, |this| {
                this.write_sized_bytes(text)
            }),
            Value::ByteArray(bytes) => {
                self.write_referenceable(TypeMarker::ByteArray, value, |this| {
                    this.write_sized_bytes(bytes)
                })
            }
            Value::Date(millis) => self.write_referenceable(TypeMarker::Date, value, |this| {
                Ok(this.write_length(Length::Size(0))? + this.write_f64(*millis)?)
            }),
            Value::Array(array) => self.write_referenceable(TypeMarker::Array, value, |this| {
                this.write_array_body(array)
            }),
            Value::Object(object) => self.write_referenceable(TypeMarker::Object, value, |this| {
                this.write_object_body(object)
            }),
        }
    }

    /// Write a value that lives in the object table: a back-reference if an equal entry is
    /// already there, otherwise add it and write its body inline
    fn write_referenceable(
        &mut self,
        marker: TypeMarker,
        value: &Value,
        body: impl FnOnce(&mut Self) -> EncodeResult,
    ) -> EncodeResult {
        let written = self.write_type_marker(marker)?;

        if let Some(index) = self
            .object_reference_table
            .position(|v| v.is_same_reference(value))
        {
            return Ok(written + self.write_length(Length::Reference(index))?);
        }

        self.object_reference_table.store(value.clone());
        Ok(written + body(self)?)
    }

    fn write_array_body(&mut self, array: &Array) -> EncodeResult {
        let dense = array.dense();
        let associative = array.associative();

        let mut written = self.write_length(length_of(dense.len())?)?;
        for (key, value) in associative.iter() {
            if key.is_empty() {
                log::warn!("Skipping array property with an empty key");
                continue;
            }
            written += self.write_string(key)?;
            written += self.write_value(value)?;
        }
        written += self.write_string("")?;

        for value in dense.iter() {
            written += self.write_value(value)?;
        }

        Ok(written)
    }

    fn write_class_def(&mut self, class_def: &Rc<ClassDefinition>) -> EncodeResult {
        if let Some(index) = self
            .trait_reference_table
            .position(|c| Rc::ptr_eq(c, class_def) || **c == **class_def)
        {
            return self.write_int(((index as u32) << 2) | 0b01);
        }

        self.trait_reference_table.store(Rc::clone(class_def));

        let header = if class_def.is_external() {
            0b0111
        } else {
            let members = class_def.static_properties().len();
            if members > MAX_LENGTH >> 3 {
                return Err(Error::ValueTooLarge(members));
            }
            ((members as u32) << 4) | ((class_def.is_dynamic() as u32) << 3) | 0b0011
        };

        let mut written = self.write_int(header)?;
        written += self.write_string(class_def.name())?;
        for name in class_def.static_properties() {
            written += self.write_string(name)?;
        }

        Ok(written)
    }

    fn write_object_body(&mut self, object: &Object) -> EncodeResult {
        let class_def = object.class_def();
        let mut written = self.write_class_def(class_def)?;

        if class_def.is_external() {
            let handler = self.external_encoders.get(class_def.name()).ok_or_else(|| {
                log::warn!("No external encoder registered for {}", class_def.name());
                Error::MissingPlugin(class_def.name().to_string())
            })?;
            let payload = object.external().ok_or_else(|| Error::PluginFailure {
                class_name: class_def.name().to_string(),
                reason: "object has no payload".to_string(),
            })?;

            written += handler.encode(self, class_def.name(), &*payload)?;
            return Ok(written);
        }

        if let Some(sealed) = object.sealed_values() {
            for value in sealed.iter() {
                written += self.write_value(value)?;
            }
        }

        if class_def.is_dynamic() {
            if let Some(dynamic) = object.dynamic_properties() {
                for (key, value) in dynamic.iter() {
                    if key.is_empty() {
                        log::warn!("Skipping dynamic property with an empty key");
                        continue;
                    }
                    written += self.write_string(key)?;
                    written += self.write_value(value)?;
                }
            }
            written += self.write_string("")?;
        }

        Ok(written)
    }
}

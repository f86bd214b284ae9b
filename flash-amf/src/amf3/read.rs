use crate::amf3::custom_encoder::ExternalRegistry;
use crate::amf3::element_cache::ElementCache;
use crate::amf3::length::Length;
use crate::amf3::type_marker::TypeMarker;
use crate::errors::{Error, Table};
use crate::nom_utils::{AMFResult, require_remaining, take_bytes, take_str};
use crate::types::{Array, Attribute, ClassDefinition, Object, Value};
use enumset::EnumSet;
use nom::Err;
use nom::combinator::map;
use nom::number::complete::{be_f64, be_u8};
use std::rc::Rc;

const REFERENCE_FLAG: u32 = 0x01;
const TRAIT_INLINE_FLAG: u32 = 0x02;
const TRAIT_EXTERNAL_FLAG: u32 = 0x04;
const TRAIT_DYNAMIC_FLAG: u32 = 0x08;

/// How deeply values may nest before decoding is abandoned
///
/// Every level of nesting recurses through several stack frames, this keeps a debug build well
/// inside a 2 MiB thread stack.
pub const DEFAULT_MAX_DEPTH: usize = 256;

#[cfg(fuzzing)]
/// For fuzzing
pub fn fuzz_read_int_signed(i: &[u8]) -> AMFResult<'_, i32> {
    read_int_signed(i)
}

#[cfg(fuzzing)]
/// For fuzzing
pub fn fuzz_read_int(i: &[u8]) -> AMFResult<'_, u32> {
    read_int(i)
}

fn read_int_signed(i: &[u8]) -> AMFResult<'_, i32> {
    let (i, value) = read_int(i)?;
    // Sign extend from 29 bits
    Ok((i, ((value << 3) as i32) >> 3))
}

fn read_int(i: &[u8]) -> AMFResult<'_, u32> {
    // Read the first byte of the number
    let (mut i, num) = be_u8(i)?;
    let mut value = (num & 0b0111_1111) as u32;
    // Check if we have another byte
    if num & 0b1000_0000 == 0 {
        return Ok((i, value));
    }

    for _ in 0..2 {
        let (j, num) = be_u8(i)?;
        i = j;
        value = (value << 7) | ((num & 0b0111_1111) as u32);
        // Check if we have another byte
        if num & 0b1000_0000 == 0 {
            return Ok((i, value));
        }
    }

    // The fourth byte contributes all 8 bits
    let (i, num) = be_u8(i)?;
    value = (value << 8) | (num as u32);

    Ok((i, value))
}


fn read_length(i: &[u8]) -> AMFResult<'_, Length> {
    map(read_int, Length::from_header)(i)
}

fn read_type_marker(i: &[u8]) -> AMFResult<'_, TypeMarker> {
    let (rest, marker) = be_u8(i)?;
    let marker =
        TypeMarker::try_from(marker).map_err(|b| Err::Error(Error::UnknownMarker(b)))?;
    Ok((rest, marker))
}

fn invalid_reference<'a>(table: Table, index: usize) -> Err<Error<'a>> {
    Err::Error(Error::InvalidReference { table, index })
}

/// Handles decoding AMF3
///
/// A decoder owns the reference tables of one session. They are cleared at the start and end of
/// every call to [`AMF3Decoder::decode`], so one decoder can be reused for many buffers.
#[derive(Debug)]
pub struct AMF3Decoder {
    /// The table used to cache repeated strings
    string_reference_table: ElementCache<Rc<str>>,

    /// The table used to cache repeated trait definitions
    trait_reference_table: ElementCache<Rc<ClassDefinition>>,

    /// The table used to cache repeated objects
    object_reference_table: ElementCache<Value>,

    /// Handlers used for externalizable classes
    external_decoders: Rc<ExternalRegistry>,

    max_depth: usize,
    depth: usize,
}

impl Default for AMF3Decoder {
    fn default() -> Self {
        Self::new(Rc::new(ExternalRegistry::default()))
    }
}

impl AMF3Decoder {
    /// A decoder that hands externalizable classes to the handlers in `registry`
    pub fn new(registry: Rc<ExternalRegistry>) -> Self {
        Self {
            string_reference_table: ElementCache::default(),
            trait_reference_table: ElementCache::default(),
            object_reference_table: ElementCache::default(),
            external_decoders: registry,
            max_depth: DEFAULT_MAX_DEPTH,
            depth: 0,
        }
    }

    /// Limit how deeply values may nest
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// The handlers this decoder uses
    pub fn registry(&self) -> &Rc<ExternalRegistry> {
        &self.external_decoders
    }

    /// Decode one value from the start of `i`
    ///
    /// Returns the value and the number of bytes it took up; anything after it is left alone.
    pub fn decode<'a>(&mut self, i: &'a [u8]) -> Result<(Value, usize), Error<'a>> {
        self.reset();
        let result = self.parse_single_element(i);
        self.reset();

        let (rest, value) = result?;
        Ok((value, i.len() - rest.len()))
    }

    fn reset(&mut self) {
        self.string_reference_table.clear();
        self.trait_reference_table.clear();
        self.object_reference_table.clear();
        self.depth = 0;
    }

    /// Parse a single marked value, sharing this session's reference tables
    ///
    /// This is the entry point for external handlers reading values nested in their body.
    pub fn parse_single_element<'a>(&mut self, i: &'a [u8]) -> AMFResult<'a, Value> {
        if self.depth >= self.max_depth {
            return Err(Err::Failure(Error::NestingTooDeep(self.max_depth)));
        }

        self.depth += 1;
        let result = self.parse_marked_element(i);
        self.depth -= 1;
        result
    }

    fn parse_marked_element<'a>(&mut self, i: &'a [u8]) -> AMFResult<'a, Value> {
        let (i, marker) = read_type_marker(i)?;

        match marker {
            TypeMarker::Undefined => Ok((i, Value::Undefined)),
            TypeMarker::Null => Ok((i, Value::Null)),
            TypeMarker::False => Ok((i, Value::Bool(false))),
            TypeMarker::True => Ok((i, Value::Bool(true))),
            TypeMarker::Integer => map(read_int_signed, Value::Integer)(i),
            TypeMarker::Double => map(be_f64, Value::Double)(i),
            TypeMarker::String => map(|i| self.parse_string(i), Value::String)(i),
            TypeMarker::XmlDocument => self.parse_element_xml(i, true),
            TypeMarker::Date => self.parse_element_date(i),
            TypeMarker::Array => self.parse_element_array(i),
            TypeMarker::Object => self.parse_element_object(i),
            TypeMarker::Xml => self.parse_element_xml(i, false),
            TypeMarker::ByteArray => self.parse_element_byte_array(i),
        }
    }

    #[cfg(fuzzing)]
    /// For fuzzing
    pub fn fuzz_parse_string<'a>(&mut self, i: &'a [u8]) -> AMFResult<'a, Rc<str>> {
        self.parse_string(i)
    }

    /// Parse a string body, either inline or from the string table
    ///
    /// Class names, member names and property keys are read through here too.
    pub(crate) fn parse_string<'a>(&mut self, i: &'a [u8]) -> AMFResult<'a, Rc<str>> {
        let (i, length) = read_length(i)?;

        match length {
            Length::Reference(index) => {
                let s = self
                    .string_reference_table
                    .get(index)
                    .ok_or_else(|| invalid_reference(Table::String, index))?;
                Ok((i, Rc::clone(s)))
            }
            // The empty string is never added to the table
            Length::Size(0) => Ok((i, Rc::from(""))),
            Length::Size(len) => {
                let (i, s) = take_str(i, len)?;
                let s: Rc<str> = Rc::from(s);
                self.string_reference_table.store(Rc::clone(&s));
                Ok((i, s))
            }
        }
    }

    fn object_reference<'a>(&self, index: usize) -> Result<Value, Err<Error<'a>>> {
        self.object_reference_table
            .get(index)
            .cloned()
            .ok_or_else(|| invalid_reference(Table::Object, index))
    }

    /// Add a value to the object table, returning it
    fn remember(&mut self, value: Value) -> Value {
        self.object_reference_table.store(value.clone());
        value
    }

    /// Read a ref-or-length header, resolving references through the object table and handing
    /// inline lengths to `parser`
    fn parse_reference_or_val<'a>(
        &mut self,
        i: &'a [u8],
        parser: impl FnOnce(&mut Self, &'a [u8], u32) -> AMFResult<'a, Value>,
    ) -> AMFResult<'a, Value> {
        let (i, length) = read_length(i)?;

        match length {
            Length::Reference(index) => Ok((i, self.object_reference(index)?)),
            Length::Size(len) => parser(self, i, len),
        }
    }

    fn parse_element_xml<'a>(&mut self, i: &'a [u8], document: bool) -> AMFResult<'a, Value> {
        self.parse_reference_or_val(i, |this, i, len| {
            let (i, text) = take_bytes(i, len)?;
            let text = Rc::from(text);
            let value = if document {
                Value::XmlDocument(text)
            } else {
                Value::Xml(text)
            };
            Ok((i, this.remember(value)))
        })
    }

    fn parse_element_byte_array<'a>(&mut self, i: &'a [u8]) -> AMFResult<'a, Value> {
        self.parse_reference_or_val(i, |this, i, len| {
            let (i, bytes) = take_bytes(i, len)?;
            Ok((i, this.remember(Value::ByteArray(Rc::from(bytes)))))
        })
    }

    fn parse_element_date<'a>(&mut self, i: &'a [u8]) -> AMFResult<'a, Value> {
        self.parse_reference_or_val(i, |this, i, _| {
            let (i, millis) = be_f64(i)?;
            Ok((i, this.remember(Value::Date(millis))))
        })
    }

    fn parse_element_array<'a>(&mut self, i: &'a [u8]) -> AMFResult<'a, Value> {
        self.parse_reference_or_val(i, |this, i, dense_len| {
            // There must be at least `dense_len` bytes (dense_len * min_element_size(1)) to
            // prevent OOM errors with excessive lengths
            let (i, _) = require_remaining(i, dense_len)?;

            // Registered before the body so elements can refer back to the array
            let array = Rc::new(Array::default());
            this.remember(Value::Array(Rc::clone(&array)));

            let (mut i, mut key) = this.parse_string(i)?;
            while !key.is_empty() {
                let (j, value) = this.parse_single_element(i)?;
                array.set_property(key, value);

                let (j, next) = this.parse_string(j)?;
                i = j;
                key = next;
            }

            for _ in 0..dense_len {
                let (j, value) = this.parse_single_element(i)?;
                array.push(value);
                i = j;
            }

            Ok((i, Value::Array(array)))
        })
    }

    fn parse_class_def<'a>(
        &mut self,
        header: u32,
        i: &'a [u8],
    ) -> AMFResult<'a, Rc<ClassDefinition>> {
        if header & TRAIT_INLINE_FLAG == 0 {
            let index = (header >> 2) as usize;
            let class_def = self
                .trait_reference_table
                .get(index)
                .ok_or_else(|| invalid_reference(Table::Trait, index))?;
            return Ok((i, Rc::clone(class_def)));
        }

        let (i, name) = self.parse_string(i)?;

        if header & TRAIT_EXTERNAL_FLAG != 0 {
            let class_def = Rc::new(ClassDefinition::external(&*name));
            self.trait_reference_table.store(Rc::clone(&class_def));
            return Ok((i, class_def));
        }

        let mut attributes = EnumSet::empty();
        if header & TRAIT_DYNAMIC_FLAG != 0 {
            attributes |= Attribute::Dynamic;
        }

        let member_count = header >> 4;
        // Every member name takes at least one byte
        let (mut i, _) = require_remaining(i, member_count)?;
        let mut static_properties = Vec::with_capacity(member_count as usize);
        for _ in 0..member_count {
            let (j, member) = self.parse_string(i)?;
            static_properties.push(member.to_string());
            i = j;
        }

        let class_def = Rc::new(ClassDefinition::new(
            &*name,
            attributes,
            static_properties,
        ));
        self.trait_reference_table.store(Rc::clone(&class_def));
        Ok((i, class_def))
    }

    fn parse_element_object<'a>(&mut self, i: &'a [u8]) -> AMFResult<'a, Value> {
        let (i, header) = read_int(i)?;

        if header & REFERENCE_FLAG == 0 {
            let value = self.object_reference((header >> 1) as usize)?;
            return Ok((i, value));
        }

        let (i, class_def) = self.parse_class_def(header, i)?;

        // Registered before the body so members can refer back to the object
        let object = Rc::new(Object::new(Rc::clone(&class_def)));
        self.remember(Value::Object(Rc::clone(&object)));

        if class_def.is_external() {
            let handler = self.external_decoders.get(class_def.name()).ok_or_else(|| {
                log::warn!("No external decoder registered for {}", class_def.name());
                Err::Error(Error::MissingPlugin(class_def.name().to_string()))
            })?;

            let (i, payload) = handler.decode(self, i, class_def.name())?;
            object.set_external(payload);
            return Ok((i, Value::Object(object)));
        }

        let mut i = i;
        for slot in 0..class_def.static_properties().len() {
            let (j, value) = self.parse_single_element(i)?;
            object.set_sealed(slot, value);
            i = j;
        }

        if class_def.is_dynamic() {
            let (mut j, mut key) = self.parse_string(i)?;
            while !key.is_empty() {
                let (k, value) = self.parse_single_element(j)?;
                object.set_dynamic(key, value);

                let (k, next) = self.parse_string(k)?;
                j = k;
                key = next;
            }
            i = j;
        }

        Ok((i, Value::Object(object)))
    }
}

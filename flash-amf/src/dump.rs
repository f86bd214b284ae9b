//! Human readable rendering of a value graph
//!
//! ```
//! use flash_amf::types::{Array, Value};
//!
//! let array = Array::from_dense([Value::Integer(1)]);
//! array.set_property("name", Value::string("amf"));
//! assert_eq!(
//!     flash_amf::dump::to_string(&array.into()),
//!     "(Array)\n  \"name\": (String) \"amf\"\n  [0] (Integer) 1\n"
//! );
//! ```
use crate::types::{Value, visit};
use std::fmt::{self, Write};

/// Render `value` as an indented tree, one value per line
pub fn to_string(value: &Value) -> String {
    let mut out = String::new();
    // Writing to a String can't fail
    let _ = write_value(&mut out, value, 0);
    out
}

fn indent(out: &mut dyn Write, depth: usize) -> fmt::Result {
    for _ in 0..depth {
        out.write_str("  ")?;
    }
    Ok(())
}

/// Render `value` as a tree whose children are indented one level past `depth`
///
/// The first line is not indented, so a value can follow a key on the same line.
pub fn write_value(out: &mut dyn Write, value: &Value, depth: usize) -> fmt::Result {
    match value {
        Value::Undefined => writeln!(out, "(Undefined)"),
        Value::Null => writeln!(out, "(Null)"),
        Value::Bool(b) => writeln!(out, "(Boolean) {}", b),
        Value::Integer(i) => writeln!(out, "(Integer) {}", i),
        Value::Double(n) => writeln!(out, "(Double) {}", n),
        Value::String(s) => writeln!(out, "(String) {:?}", s),
        Value::XmlDocument(text) => {
            writeln!(out, "(XmlDocument) {:?}", String::from_utf8_lossy(text))
        }
        Value::Xml(text) => writeln!(out, "(Xml) {:?}", String::from_utf8_lossy(text)),
        Value::ByteArray(bytes) => writeln!(out, "(ByteArray) {} bytes", bytes.len()),
        Value::Date(millis) => writeln!(out, "(Date) {}", millis),
        Value::Array(array) => {
            let written = visit(&**array as *const _, || {
                writeln!(out, "(Array)")?;
                for (key, value) in array.associative().iter() {
                    indent(out, depth + 1)?;
                    write!(out, "{:?}: ", key)?;
                    write_value(out, value, depth + 1)?;
                }
                for (index, value) in array.dense().iter().enumerate() {
                    indent(out, depth + 1)?;
                    write!(out, "[{}] ", index)?;
                    write_value(out, value, depth + 1)?;
                }
                Ok(())
            });
            written.unwrap_or_else(|| writeln!(out, "(Array) <cycle>"))
        }
        Value::Object(object) => {
            let written = visit(&**object as *const _, || {
                writeln!(out, "(Object {:?})", object.class_name())?;
                if let Some(payload) = object.external() {
                    return payload.dump(out, depth + 1);
                }

                let class_def = object.class_def();
                if let Some(sealed) = object.sealed_values() {
                    for (name, value) in class_def.static_properties().iter().zip(sealed.iter()) {
                        indent(out, depth + 1)?;
                        write!(out, "{:?}: ", name)?;
                        write_value(out, value, depth + 1)?;
                    }
                }
                if let Some(dynamic) = object.dynamic_properties() {
                    for (key, value) in dynamic.iter() {
                        indent(out, depth + 1)?;
                        write!(out, "{:?}: ", key)?;
                        write_value(out, value, depth + 1)?;
                    }
                }
                Ok(())
            });
            written.unwrap_or_else(|| writeln!(out, "(Object {:?}) <cycle>", object.class_name()))
        }
    }
}

/// Render named values one per line at `depth`, the default rendering of external payloads
pub fn write_properties(
    out: &mut dyn Write,
    properties: &[(&str, Value)],
    depth: usize,
) -> fmt::Result {
    for (name, value) in properties {
        indent(out, depth)?;
        write!(out, "{}: ", name)?;
        write_value(out, value, depth)?;
    }
    Ok(())
}

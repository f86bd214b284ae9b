use nom::error::{ErrorKind, FromExternalError, ParseError};
use std::collections::TryReserveError;
use std::fmt;
use thiserror::Error;

/// The reference table a back-reference points into
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Table {
    /// Arrays, objects, dates, byte arrays and xml
    Object,
    /// Non-empty strings, including class and member names
    String,
    /// Class definitions
    Trait,
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Table::Object => f.write_str("object"),
            Table::String => f.write_str("string"),
            Table::Trait => f.write_str("trait"),
        }
    }
}

/// Enum for representing encoding and decoding errors
#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum Error<'a> {
    /// The input ended before a complete value could be read
    #[error("Input ended before the value was complete")]
    TruncatedInput,

    /// A back-reference pointed past the end of its table
    #[error("Reference {index} is outside the {table} table")]
    InvalidReference {
        /// The table that was indexed
        table: Table,
        /// The index that was read
        index: usize,
    },

    /// A type marker outside of the known set
    #[error("Unknown type marker {0:#04x}")]
    UnknownMarker(u8),

    /// An externalizable class was found with no handler registered for it
    #[error("No external handler is registered for class `{0}`")]
    MissingPlugin(String),

    /// A registered external handler rejected its input
    #[error("External handler for `{class_name}` failed: {reason}")]
    PluginFailure {
        /// The class the handler was registered for
        class_name: String,
        /// Why the handler failed
        reason: String,
    },

    /// The output buffer could not be grown
    #[error("Unable to grow the output buffer")]
    AllocationFailure,

    /// A length that does not fit in the 28 bits available on the wire
    #[error("Length {0} is too large to encode")]
    ValueTooLarge(usize),

    /// Text that was not valid UTF-8
    #[error("String is not valid UTF-8")]
    InvalidString,

    /// Values nested deeper than the decoder allows
    #[error("Values are nested deeper than {0} levels")]
    NestingTooDeep(usize),

    /// A nom internal error
    #[error("Nom internal error")]
    Nom(&'a [u8], ErrorKind),
}

impl<'a> ParseError<&'a [u8]> for Error<'a> {
    fn from_error_kind(input: &'a [u8], kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::Eof => Error::TruncatedInput,
            _ => Error::Nom(input, kind),
        }
    }

    fn append(_: &[u8], _: ErrorKind, other: Self) -> Self {
        other
    }
}

impl<'a, E> FromExternalError<&'a [u8], E> for Error<'a> {
    fn from_external_error(input: &'a [u8], kind: ErrorKind, _e: E) -> Self {
        Error::Nom(input, kind)
    }
}

impl From<TryReserveError> for Error<'_> {
    fn from(_: TryReserveError) -> Self {
        Error::AllocationFailure
    }
}

// Writes only ever target a Vec, which can fail only when it is unable to grow
impl From<std::io::Error> for Error<'_> {
    fn from(_: std::io::Error) -> Self {
        Error::AllocationFailure
    }
}

impl<'a> From<nom::Err<Error<'a>>> for Error<'a> {
    fn from(e: nom::Err<Error<'a>>) -> Self {
        match e {
            nom::Err::Incomplete(_) => Error::TruncatedInput,
            nom::Err::Error(e) | nom::Err::Failure(e) => e,
        }
    }
}

/// Errors from reading or writing a property of an `Object`
#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum PropertyError {
    /// The object is sealed and declares no member with this name
    #[error("`{class_name}` is sealed and has no member `{key}`")]
    Sealed {
        /// The class of the object
        class_name: String,
        /// The key that was looked up
        key: String,
    },

    /// The object is externalizable, its contents belong to its handler
    #[error("`{0}` is externalizable and has no properties")]
    External(String),
}

use crate::errors::Error;
use nom::bytes::complete::take;
use nom::{Err, IResult};

/// The result of every parser in this crate
pub type AMFResult<'a, T> = IResult<&'a [u8], T, Error<'a>>;

pub(crate) fn take_bytes(i: &[u8], length: u32) -> AMFResult<'_, &[u8]> {
    take(length)(i)
}

pub(crate) fn take_str(i: &[u8], length: u32) -> AMFResult<'_, &str> {
    let (i, bytes) = take_bytes(i, length)?;
    let s = std::str::from_utf8(bytes).map_err(|_| Err::Error(Error::InvalidString))?;
    Ok((i, s))
}

/// Fail unless at least `count` bytes remain, every element that follows takes at least one
pub(crate) fn require_remaining(i: &[u8], count: u32) -> AMFResult<'_, ()> {
    if (i.len() as u64) < u64::from(count) {
        return Err(Err::Error(Error::TruncatedInput));
    }
    Ok((i, ()))
}

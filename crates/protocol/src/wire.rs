//! Little-endian primitives shared by every wire structure.

use alloy_primitives::B256;
use thiserror::Error;

/// Errors produced while decoding wire messages.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WireError {
    /// The input ended before the structure was complete.
    #[error("unexpected end of input: wanted {wanted} more bytes, {remaining} left")]
    UnexpectedEof {
        /// Number of bytes the decoder needed.
        wanted: usize,
        /// Number of bytes that were left.
        remaining: usize,
    },
    /// An unknown discriminant was found for a tagged union.
    #[error("unknown {union} variant tag {tag}")]
    UnknownVariant {
        /// Name of the tagged union being decoded.
        union: &'static str,
        /// The unrecognized tag byte.
        tag: u8,
    },
    /// A boolean field held a value other than 0 or 1.
    #[error("invalid boolean byte {0}")]
    InvalidBool(u8),
    /// A string field held invalid UTF-8.
    #[error("invalid utf-8 in string field")]
    InvalidUtf8,
    /// Input bytes remained after the outermost structure was decoded.
    #[error("{0} trailing bytes after message")]
    TrailingBytes(usize),
}

pub(crate) fn take<'a>(input: &mut &'a [u8], n: usize) -> Result<&'a [u8], WireError> {
    if input.len() < n {
        return Err(WireError::UnexpectedEof { wanted: n, remaining: input.len() });
    }
    let (head, tail) = input.split_at(n);
    *input = tail;
    Ok(head)
}

pub(crate) fn read_u8(input: &mut &[u8]) -> Result<u8, WireError> {
    Ok(take(input, 1)?[0])
}

pub(crate) fn read_u32(input: &mut &[u8]) -> Result<u32, WireError> {
    let raw = take(input, 4)?;
    Ok(u32::from_le_bytes(raw.try_into().expect("4-byte slice")))
}

pub(crate) fn read_b256(input: &mut &[u8]) -> Result<B256, WireError> {
    Ok(B256::from_slice(take(input, 32)?))
}

pub(crate) fn read_bool(input: &mut &[u8]) -> Result<bool, WireError> {
    match read_u8(input)? {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(WireError::InvalidBool(other)),
    }
}

pub(crate) fn read_bytes(input: &mut &[u8]) -> Result<Vec<u8>, WireError> {
    let len = read_u32(input)? as usize;
    Ok(take(input, len)?.to_vec())
}

pub(crate) fn read_string(input: &mut &[u8]) -> Result<String, WireError> {
    String::from_utf8(read_bytes(input)?).map_err(|_| WireError::InvalidUtf8)
}

pub(crate) fn read_optional_bytes(input: &mut &[u8]) -> Result<Option<Vec<u8>>, WireError> {
    if read_bool(input)? { Ok(Some(read_bytes(input)?)) } else { Ok(None) }
}

pub(crate) fn put_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

pub(crate) fn put_b256(out: &mut Vec<u8>, value: &B256) {
    out.extend_from_slice(value.as_slice());
}

pub(crate) fn put_bool(out: &mut Vec<u8>, value: bool) {
    out.push(value as u8);
}

pub(crate) fn put_bytes(out: &mut Vec<u8>, value: &[u8]) {
    put_u32(out, value.len() as u32);
    out.extend_from_slice(value);
}

pub(crate) fn put_optional_bytes(out: &mut Vec<u8>, value: Option<&[u8]>) {
    match value {
        Some(bytes) => {
            put_bool(out, true);
            put_bytes(out, bytes);
        }
        None => put_bool(out, false),
    }
}

/// Fails with [`WireError::TrailingBytes`] unless `input` was fully consumed.
pub(crate) fn expect_end(input: &[u8]) -> Result<(), WireError> {
    if input.is_empty() { Ok(()) } else { Err(WireError::TrailingBytes(input.len())) }
}

//! Big-endian framing shared by every command payload and the replica-set
//! codec: int32/int64 fields, int32-length-prefixed UTF-8 strings, and
//! declared counts that are checked against what is left of the stream.
//!
//! `bytes::Buf` panics on underflow, so every read goes through [`ensure`]
//! first.

use crate::error::{DecodeError, EncodeError};
use bytes::{Buf, BufMut};

pub const I32_LEN: usize = 4;
pub const I64_LEN: usize = 8;

pub fn put_len<B: BufMut>(buf: &mut B, field: &'static str, len: usize) -> Result<(), EncodeError> {
    let len = i32::try_from(len).map_err(|_| EncodeError::TooLarge { field, len })?;
    buf.put_i32(len);
    Ok(())
}

pub fn put_str<B: BufMut>(buf: &mut B, field: &'static str, value: &str) -> Result<(), EncodeError> {
    put_len(buf, field, value.len())?;
    buf.put_slice(value.as_bytes());
    Ok(())
}

fn ensure<B: Buf>(buf: &B, field: &'static str, needed: usize) -> Result<(), DecodeError> {
    let remaining = buf.remaining();
    if remaining < needed {
        return Err(DecodeError::Truncated {
            field,
            needed,
            remaining,
        });
    }
    Ok(())
}

pub fn get_i32<B: Buf>(buf: &mut B, field: &'static str) -> Result<i32, DecodeError> {
    ensure(buf, field, I32_LEN)?;
    Ok(buf.get_i32())
}

pub fn get_i64<B: Buf>(buf: &mut B, field: &'static str) -> Result<i64, DecodeError> {
    ensure(buf, field, I64_LEN)?;
    Ok(buf.get_i64())
}

/// Reads a declared count of items that each take at least `min_item_len`
/// bytes on the wire.
pub fn get_count<B: Buf>(
    buf: &mut B,
    field: &'static str,
    min_item_len: usize,
) -> Result<usize, DecodeError> {
    let declared = get_i32(buf, field)?;
    let count = usize::try_from(declared).map_err(|_| DecodeError::NegativeLength {
        field,
        value: declared,
    })?;

    let remaining = buf.remaining();
    if count.saturating_mul(min_item_len) > remaining {
        return Err(DecodeError::CountTooLarge {
            field,
            count: declared,
            remaining,
        });
    }
    Ok(count)
}

pub fn get_str<B: Buf>(buf: &mut B, field: &'static str) -> Result<String, DecodeError> {
    let len = get_count(buf, field, 1)?;
    let mut raw = vec![0u8; len];
    buf.copy_to_slice(&mut raw);
    String::from_utf8(raw).map_err(|_| DecodeError::InvalidUtf8 { field })
}

//! Variable-length integer encoding/decoding for IWA format
//!
//! iWork IWA files use Protocol Buffers variable-length encoding
//! for integers, which encodes values in 7-bit chunks with the
//! most significant bit indicating continuation.

use bytes::{Buf, BufMut};

/// Maximum number of bytes a 64-bit varint may occupy
pub const MAX_VARINT_LEN: usize = 10;

/// Errors produced while decoding a varint
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum VarintError {
    #[error("Truncated variable-length integer")]
    Truncated,
    #[error("Variable-length integer overflow")]
    Overflow,
}

/// Encode a u64 value as a variable-length integer
pub fn encode_varint(value: u64) -> Vec<u8> {
    let mut buf = Vec::with_capacity(encoded_len(value));
    encode_varint_into(value, &mut buf);
    buf
}

/// Append the varint encoding of `value` to `buf`
pub fn encode_varint_into<B: BufMut>(mut value: u64, buf: &mut B) {
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            buf.put_u8(byte);
            break;
        }
        buf.put_u8(byte | 0x80);
    }
}

/// Number of bytes `encode_varint` produces for `value`
pub fn encoded_len(value: u64) -> usize {
    let bits = 64 - (value | 1).leading_zeros() as usize;
    bits.div_ceil(7)
}

/// Read a variable-length integer from the front of a buffer
///
/// The buffer is advanced past the consumed bytes on success.
pub fn read_varint<B: Buf>(buf: &mut B) -> Result<u64, VarintError> {
    let mut value: u64 = 0;

    for index in 0..MAX_VARINT_LEN {
        if !buf.has_remaining() {
            return Err(VarintError::Truncated);
        }
        let byte = buf.get_u8();
        value |= u64::from(byte & 0x7F) << (index * 7);

        if byte & 0x80 == 0 {
            return Ok(value);
        }
    }

    Err(VarintError::Overflow)
}

/// Decode a variable-length integer from a byte slice
///
/// Returns the value and the number of bytes consumed.
pub fn decode_varint_from_bytes(data: &[u8]) -> Result<(u64, usize), VarintError> {
    let mut rest = data;
    let value = read_varint(&mut rest)?;
    Ok((value, data.len() - rest.len()))
}

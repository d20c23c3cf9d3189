//! Variable-byte integer encoding.
//!
//! Every value is written as groups of 7 bits, least significant group first.
//! The high bit of a byte is set when more bytes of the same value follow, so
//! small symbol ids cost a single byte.

use crate::error::{PtableError, Result};

/// Longest encoding of a `u32`.
pub const MAX_U32_BYTES: usize = 5;

/// Encode a u32 value using variable-length encoding.
///
/// Uses 7 bits per byte with a continuation bit. Always emits at least one
/// byte, so `0` encodes as `[0x00]`.
pub fn encode_u32(value: u32) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(MAX_U32_BYTES);
    push_u32(&mut bytes, value);
    bytes
}

/// Append the encoding of `value` to `out`.
#[inline]
pub fn push_u32(out: &mut Vec<u8>, value: u32) {
    let mut val = value;

    loop {
        let mut byte = (val & 0x7F) as u8;
        val >>= 7;

        if val != 0 {
            byte |= 0x80; // Set continuation bit
        }

        out.push(byte);

        if val == 0 {
            break;
        }
    }
}

/// Decode a u32 value from the front of `bytes`.
///
/// Returns the value and the number of bytes consumed.
pub fn decode_u32(bytes: &[u8]) -> Result<(u32, usize)> {
    let mut result = 0u32;
    let mut shift = 0;
    let mut bytes_read = 0;

    for &byte in bytes {
        bytes_read += 1;

        if shift >= 32 || (shift == 28 && (byte & 0x7F) > 0x0F) {
            return Err(PtableError::malformed("varbyte value overflows u32"));
        }

        result |= ((byte & 0x7F) as u32) << shift;

        if (byte & 0x80) == 0 {
            return Ok((result, bytes_read));
        }

        shift += 7;
    }

    Err(PtableError::malformed("varbyte stream ends inside a value"))
}

/// Number of bytes `encode_u32(value)` produces.
pub fn encoded_len(value: u32) -> usize {
    let bits = (32 - value.leading_zeros()).max(1) as usize;
    bits.div_ceil(7)
}

/// Encode every value of `values` and concatenate the byte groups.
pub fn encode_line(values: &[u32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(values.len() * 2);
    for &value in values {
        push_u32(&mut bytes, value);
    }
    bytes
}

/// Decode a whole byte range into its values.
///
/// The range must end on a value boundary.
pub fn decode_line(bytes: &[u8]) -> Result<Vec<u32>> {
    let mut values = Vec::with_capacity(bytes.len());
    let mut position = 0;

    while position < bytes.len() {
        let (value, read) = decode_u32(&bytes[position..])?;
        values.push(value);
        position += read;
    }

    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode_u32() {
        let test_values = [0, 1, 127, 128, 16383, 16384, u32::MAX];

        for &value in &test_values {
            let encoded = encode_u32(value);
            let (decoded, bytes_read) = decode_u32(&encoded).unwrap();

            assert_eq!(value, decoded);
            assert_eq!(encoded.len(), bytes_read);
            assert_eq!(encoded.len(), encoded_len(value));
        }
    }

    #[test]
    fn test_encoding_efficiency() {
        assert_eq!(encode_u32(0), vec![0x00]);
        assert_eq!(encode_u32(1).len(), 1);
        assert_eq!(encode_u32(127).len(), 1);
        assert_eq!(encode_u32(128).len(), 2);
        assert_eq!(encode_u32(16383).len(), 2);
        assert_eq!(encode_u32(16384).len(), 3);
        assert_eq!(encode_u32(u32::MAX).len(), MAX_U32_BYTES);
    }

    #[test]
    fn test_continuation_bits() {
        // 300 = 0b10_0101100
        assert_eq!(encode_u32(300), vec![0xAC, 0x02]);
        assert_eq!(decode_u32(&[0xAC, 0x02, 0x7F]).unwrap(), (300, 2));
    }

    #[test]
    fn test_line_round_trip() {
        let values = vec![3, 0, 0x3FC0_0000, 0, 0, 70000];
        let bytes = encode_line(&values);
        assert_eq!(decode_line(&bytes).unwrap(), values);
        assert!(decode_line(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_incomplete_varint() {
        let incomplete = vec![0x05, 0x80]; // Continuation bit set but no more data
        assert!(matches!(
            decode_line(&incomplete),
            Err(PtableError::MalformedFrame(_))
        ));
    }

    #[test]
    fn test_overflow() {
        let overflow_data = vec![0xFF; 10];
        assert!(decode_u32(&overflow_data).is_err());

        // Fifth byte may only carry the top four bits.
        let too_wide = vec![0xFF, 0xFF, 0xFF, 0xFF, 0x1F];
        assert!(decode_u32(&too_wide).is_err());
        let widest = vec![0xFF, 0xFF, 0xFF, 0xFF, 0x0F];
        assert_eq!(decode_u32(&widest).unwrap(), (u32::MAX, 5));
    }
}

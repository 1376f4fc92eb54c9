//! Variable-length Integer Encoding (Varint)
//!
//! Integers in record payloads use as many bytes as their magnitude needs:
//! each byte carries 7 bits of data and a continuation flag, so counts and
//! stream references (usually small) take a single byte.
//!
//! Signed values (entry timestamps) go through ZigZag first so small negative
//! numbers stay small: 0 → 0, -1 → 1, 1 → 2, -2 → 3, ...
//!
//! Decoders return `None` on truncated or overlong input; the codec turns
//! that into a proper decode error with an offset.

use bytes::{Buf, BufMut};

/// Maximum encoded length of a u64 varint.
const MAX_VARINT_LEN: usize = 10;

/// Encode an unsigned integer as a varint.
pub fn encode_uvarint(buf: &mut impl BufMut, mut value: u64) {
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;

        if value != 0 {
            byte |= 0x80;
        }

        buf.put_u8(byte);

        if value == 0 {
            break;
        }
    }
}

/// Encode a signed integer as a ZigZag varint.
pub fn encode_varint(buf: &mut impl BufMut, value: i64) {
    let unsigned = ((value << 1) ^ (value >> 63)) as u64;
    encode_uvarint(buf, unsigned);
}

/// Decode an unsigned varint. Returns `None` on truncated or overlong input.
pub fn decode_uvarint(buf: &mut impl Buf) -> Option<u64> {
    let mut value: u64 = 0;
    let mut shift: u32 = 0;

    for _ in 0..MAX_VARINT_LEN {
        if !buf.has_remaining() {
            return None;
        }
        let byte = buf.get_u8();

        value |= u64::from(byte & 0x7F) << shift;

        if byte & 0x80 == 0 {
            return Some(value);
        }
        shift += 7;
    }

    // More than 10 bytes cannot be a valid u64.
    None
}

/// Decode a ZigZag varint to a signed integer.
pub fn decode_varint(buf: &mut impl Buf) -> Option<i64> {
    let unsigned = decode_uvarint(buf)?;
    Some(((unsigned >> 1) as i64) ^ -((unsigned & 1) as i64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    fn roundtrip_u64(value: u64) -> u64 {
        let mut buf = BytesMut::new();
        encode_uvarint(&mut buf, value);
        decode_uvarint(&mut buf.as_ref()).unwrap()
    }

    fn roundtrip_i64(value: i64) -> i64 {
        let mut buf = BytesMut::new();
        encode_varint(&mut buf, value);
        decode_varint(&mut buf.as_ref()).unwrap()
    }

    #[test]
    fn test_uvarint_small_values_are_one_byte() {
        let mut buf = BytesMut::new();
        encode_uvarint(&mut buf, 127);
        assert_eq!(buf.len(), 1);
        assert_eq!(roundtrip_u64(0), 0);
        assert_eq!(roundtrip_u64(127), 127);
    }

    #[test]
    fn test_uvarint_boundaries() {
        for value in [128, 16_383, 16_384, u64::from(u32::MAX), u64::MAX] {
            assert_eq!(roundtrip_u64(value), value);
        }
    }

    #[test]
    fn test_varint_signed_values() {
        for value in [0, -1, 1, -64, 64, i64::MIN, i64::MAX] {
            assert_eq!(roundtrip_i64(value), value);
        }
    }

    #[test]
    fn test_zigzag_keeps_small_negatives_small() {
        let mut buf = BytesMut::new();
        encode_varint(&mut buf, -1);
        assert_eq!(buf.len(), 1);
    }

    #[test]
    fn test_decode_empty_is_none() {
        assert_eq!(decode_uvarint(&mut &[][..]), None);
    }

    #[test]
    fn test_decode_truncated_is_none() {
        // Continuation bit set but no following byte.
        assert_eq!(decode_uvarint(&mut &[0x80u8][..]), None);
    }

    #[test]
    fn test_decode_overlong_is_none() {
        // Eleven continuation bytes can never be a u64.
        let bytes = [0x80u8; 11];
        assert_eq!(decode_uvarint(&mut &bytes[..]), None);
    }
}

// Copyright 2022 - 2023 Wenmeng See the COPYRIGHT
// file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! String literal codec: a one-bit Huffman flag folded into a 7-bit length
//! prefix, followed by the (possibly Huffman-coded) payload.

use std::borrow::Cow;

use super::huffman::{HuffmanDecoder, HuffmanDecoderError, HuffmanEncoder};
use super::prefix_int::{self, IntegerError};

#[derive(PartialEq, Clone, Debug)]
pub enum StringError {
    Integer(IntegerError),
    NotEnoughOctets,
    Huffman(HuffmanDecoderError),
}

impl StringError {
    pub fn description_str(&self) -> &'static str {
        match self {
            StringError::Integer(e) => e.description_str(),
            StringError::NotEnoughOctets => "not enough octets for string literal",
            StringError::Huffman(e) => e.description_str(),
        }
    }
}

impl From<IntegerError> for StringError {
    fn from(e: IntegerError) -> Self {
        StringError::Integer(e)
    }
}

/// Encodes `value` into a fresh leading byte of `buf`, choosing Huffman
/// coding whenever it is not longer than the raw representation. Use this
/// for any string that is the sole content of its byte, such as every
/// representation's trailing value string.
pub fn encode_string(value: &[u8], buf: &mut Vec<u8>) {
    buf.push(0x00);
    encode_string_packed(value, 8, buf);
}

/// Decodes a string literal that occupies a fresh leading byte (an 8-bit
/// Huffman-flag-plus-length prefix) from the start of `buf`.
///
/// Returns the decoded bytes and the number of bytes consumed.
pub fn decode_string<'a>(buf: &'a [u8]) -> Result<(Cow<'a, [u8]>, usize), StringError> {
    decode_string_packed(buf, 8)
}

/// Encodes `value`'s Huffman flag and length into the low `prefix_size`
/// bits of the byte `buf` already ends with. The caller must have already
/// pushed that byte with its representation's tag bits set in the high
/// `8 - prefix_size` bits -- this is the case for a name string whose
/// flag-and-length bits are packed alongside an instruction or field-line
/// tag instead of starting a fresh byte.
pub fn encode_string_packed(value: &[u8], prefix_size: u8, buf: &mut Vec<u8>) {
    debug_assert!(prefix_size >= 1 && prefix_size <= 8);
    let huffman_len = HuffmanEncoder::encoded_len(value);
    if huffman_len < value.len() {
        let last = buf.len() - 1;
        buf[last] |= 1u8 << (prefix_size - 1);
        prefix_int::encode(huffman_len as u64, prefix_size - 1, buf);
        let encoded = HuffmanEncoder::new().encode(value);
        buf.extend_from_slice(&encoded);
    } else {
        prefix_int::encode(value.len() as u64, prefix_size - 1, buf);
        buf.extend_from_slice(value);
    }
}

/// Decodes a string literal whose Huffman flag and length prefix occupy the
/// low `prefix_size` bits of the start of `buf`, the high `8 - prefix_size`
/// bits having already been consumed by the caller as tag bits.
///
/// Returns the decoded bytes and the number of bytes consumed.
pub fn decode_string_packed<'a>(buf: &'a [u8], prefix_size: u8) -> Result<(Cow<'a, [u8]>, usize), StringError> {
    debug_assert!(prefix_size >= 1 && prefix_size <= 8);
    if buf.is_empty() {
        return Err(StringError::NotEnoughOctets);
    }
    let flag_bit = 1u8 << (prefix_size - 1);
    let huffman = buf[0] & flag_bit != 0;
    let (len, consumed) = prefix_int::decode(buf, prefix_size - 1)?;
    let len = len as usize;
    if consumed + len > buf.len() {
        return Err(StringError::NotEnoughOctets);
    }
    let raw = &buf[consumed..consumed + len];
    if huffman {
        let decoded = HuffmanDecoder::new().decode(raw).map_err(StringError::Huffman)?;
        Ok((Cow::Owned(decoded), consumed + len))
    } else {
        Ok((Cow::Borrowed(raw), consumed + len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_plain_and_huffman() {
        for s in [&b""[..], b"short", b"custom-key", b"a very long repeated value value value"] {
            let mut buf = Vec::new();
            encode_string(s, &mut buf);
            let (decoded, consumed) = decode_string(&buf).unwrap();
            assert_eq!(&decoded[..], s);
            assert_eq!(consumed, buf.len());
        }
    }

    #[test]
    fn rejects_truncated_payload() {
        let mut buf = Vec::new();
        encode_string(b"hello", &mut buf);
        let truncated = &buf[..buf.len() - 1];
        assert_eq!(decode_string(truncated), Err(StringError::NotEnoughOctets));
    }

    #[test]
    fn packed_round_trip_shares_tag_byte() {
        for s in [&b""[..], b"custom-key", b"a fairly long repeated header name value"] {
            let mut buf = vec![0x40u8]; // pretend tag bits from some representation
            encode_string_packed(s, 6, &mut buf);
            let (decoded, consumed) = decode_string_packed(&buf, 6).unwrap();
            assert_eq!(&decoded[..], s);
            assert_eq!(consumed, buf.len());
            // the tag bits survive untouched
            assert_eq!(buf[0] & 0xc0, 0x40);
        }
    }
}

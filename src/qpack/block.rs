// Copyright 2022 - 2023 Wenmeng See the COPYRIGHT
// file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Header block prefix and the five field-line representations.

use super::literal::{decode_string, decode_string_packed, encode_string, encode_string_packed, StringError};
use super::prefix_int::{self, IntegerError};

#[derive(PartialEq, Clone, Debug)]
pub enum BlockError {
    Integer(IntegerError),
    String(StringError),
    /// `sign=1, delta=0` is a non-canonical encoding of `base ==
    /// largest_reference` and must be rejected.
    RedundantSign,
    NotEnoughOctets,
}

impl BlockError {
    pub fn description_str(&self) -> &'static str {
        match self {
            BlockError::Integer(e) => e.description_str(),
            BlockError::String(e) => e.description_str(),
            BlockError::RedundantSign => "redundant sign bit in header block prefix",
            BlockError::NotEnoughOctets => "not enough octets for field line",
        }
    }
}

impl From<IntegerError> for BlockError {
    fn from(e: IntegerError) -> Self {
        BlockError::Integer(e)
    }
}

impl From<StringError> for BlockError {
    fn from(e: StringError) -> Self {
        BlockError::String(e)
    }
}

/// Encodes the two-field header block prefix: `largest_reference` as a
/// plain 8-bit-prefix integer, followed by a signed delta-base.
pub fn encode_prefix(largest_reference: u64, base: u64, buf: &mut Vec<u8>) {
    buf.push(0);
    prefix_int::encode(largest_reference, 8, buf);
    if base >= largest_reference {
        buf.push(0);
        prefix_int::encode(base - largest_reference, 7, buf);
    } else {
        buf.push(0x80);
        prefix_int::encode(largest_reference - base, 7, buf);
    }
}

/// Decodes the header block prefix, returning `(largest_reference, base,
/// consumed)`.
pub fn decode_prefix(buf: &[u8]) -> Result<(u64, u64, usize), BlockError> {
    let (largest_reference, used1) = prefix_int::decode(buf, 8)?;
    let rest = &buf[used1..];
    if rest.is_empty() {
        return Err(BlockError::NotEnoughOctets);
    }
    let sign = rest[0] & 0x80 != 0;
    let (delta, used2) = prefix_int::decode(rest, 7)?;
    if sign && delta == 0 {
        return Err(BlockError::RedundantSign);
    }
    let base = if sign { largest_reference - delta } else { largest_reference + delta };
    Ok((largest_reference, base, used1 + used2))
}

/// One decoded field line, still carrying raw (unresolved) table indices;
/// the decoder resolves these against its own dynamic table state.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldLine {
    Indexed { is_static: bool, index: u64 },
    IndexedPostBase { index: u64 },
    LiteralWithNameRef { is_static: bool, never_indexed: bool, index: u64, value: Vec<u8> },
    LiteralWithPostBaseNameRef { never_indexed: bool, index: u64, value: Vec<u8> },
    LiteralWithoutNameRef { never_indexed: bool, name: Vec<u8>, value: Vec<u8> },
}

pub fn encode_indexed(is_static: bool, index: u64, buf: &mut Vec<u8>) {
    buf.push(if is_static { 0xc0 } else { 0x80 });
    prefix_int::encode(index, 6, buf);
}

pub fn encode_indexed_post_base(index: u64, buf: &mut Vec<u8>) {
    buf.push(0x00);
    prefix_int::encode(index, 4, buf);
}

pub fn encode_literal_with_name_ref(
    is_static: bool,
    never_indexed: bool,
    index: u64,
    value: &[u8],
    buf: &mut Vec<u8>,
) {
    let mut tag = 0x40;
    if never_indexed {
        tag |= 0x20;
    }
    if is_static {
        tag |= 0x10;
    }
    buf.push(tag);
    prefix_int::encode(index, 4, buf);
    encode_string(value, buf);
}

pub fn encode_literal_with_post_base_name_ref(
    never_indexed: bool,
    index: u64,
    value: &[u8],
    buf: &mut Vec<u8>,
) {
    let mut tag = 0x10;
    if never_indexed {
        tag |= 0x08;
    }
    buf.push(tag);
    prefix_int::encode(index, 3, buf);
    encode_string(value, buf);
}

pub fn encode_literal_without_name_ref(
    never_indexed: bool,
    name: &[u8],
    value: &[u8],
    buf: &mut Vec<u8>,
) {
    let tag = if never_indexed { 0x30 } else { 0x20 };
    buf.push(tag);
    encode_string_packed(name, 4, buf);
    encode_string(value, buf);
}

/// Decodes one field line from the start of `buf`. Returns the parsed line
/// and the number of bytes consumed.
pub fn decode_field(buf: &[u8]) -> Result<(FieldLine, usize), BlockError> {
    if buf.is_empty() {
        return Err(BlockError::NotEnoughOctets);
    }
    let octet = buf[0];

    if octet & 0x80 != 0 {
        let is_static = octet & 0x40 != 0;
        let (index, consumed) = prefix_int::decode(buf, 6)?;
        return Ok((FieldLine::Indexed { is_static, index }, consumed));
    }
    if octet & 0x40 != 0 {
        let never_indexed = octet & 0x20 != 0;
        let is_static = octet & 0x10 != 0;
        let (index, used1) = prefix_int::decode(buf, 4)?;
        let (value, used2) = decode_string(&buf[used1..])?;
        return Ok((
            FieldLine::LiteralWithNameRef { is_static, never_indexed, index, value: value.into_owned() },
            used1 + used2,
        ));
    }
    if octet & 0x20 != 0 {
        let never_indexed = octet & 0x10 != 0;
        let (name, used1) = decode_string_packed(buf, 4)?;
        let (value, used2) = decode_string(&buf[used1..])?;
        return Ok((
            FieldLine::LiteralWithoutNameRef { never_indexed, name: name.into_owned(), value: value.into_owned() },
            used1 + used2,
        ));
    }
    if octet & 0x10 != 0 {
        let never_indexed = octet & 0x08 != 0;
        let (index, used1) = prefix_int::decode(buf, 3)?;
        let (value, used2) = decode_string(&buf[used1..])?;
        return Ok((
            FieldLine::LiteralWithPostBaseNameRef { never_indexed, index, value: value.into_owned() },
            used1 + used2,
        ));
    }
    let (index, consumed) = prefix_int::decode(buf, 4)?;
    Ok((FieldLine::IndexedPostBase { index }, consumed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_round_trip_unsigned() {
        let mut buf = Vec::new();
        encode_prefix(5, 5, &mut buf);
        assert_eq!(decode_prefix(&buf).unwrap(), (5, 5, buf.len()));
    }

    #[test]
    fn prefix_round_trip_signed() {
        let mut buf = Vec::new();
        encode_prefix(10, 3, &mut buf);
        assert_eq!(decode_prefix(&buf).unwrap(), (10, 3, buf.len()));
    }

    #[test]
    fn prefix_rejects_redundant_sign() {
        let mut buf = Vec::new();
        buf.push(0);
        prefix_int::encode(7, 8, &mut buf);
        buf.push(0x80);
        prefix_int::encode(0, 7, &mut buf);
        assert_eq!(decode_prefix(&buf), Err(BlockError::RedundantSign));
    }

    #[test]
    fn indexed_round_trip() {
        let mut buf = Vec::new();
        encode_indexed(true, 42, &mut buf);
        let (line, consumed) = decode_field(&buf).unwrap();
        assert_eq!(line, FieldLine::Indexed { is_static: true, index: 42 });
        assert_eq!(consumed, buf.len());
    }

    #[test]
    fn literal_with_name_ref_round_trip() {
        let mut buf = Vec::new();
        encode_literal_with_name_ref(false, false, 3, b"custom-value", &mut buf);
        let (line, consumed) = decode_field(&buf).unwrap();
        assert_eq!(
            line,
            FieldLine::LiteralWithNameRef {
                is_static: false,
                never_indexed: false,
                index: 3,
                value: b"custom-value".to_vec(),
            }
        );
        assert_eq!(consumed, buf.len());
    }

    #[test]
    fn literal_without_name_ref_round_trip() {
        let mut buf = Vec::new();
        encode_literal_without_name_ref(true, b"x-custom", b"v", &mut buf);
        let (line, consumed) = decode_field(&buf).unwrap();
        assert_eq!(
            line,
            FieldLine::LiteralWithoutNameRef {
                never_indexed: true,
                name: b"x-custom".to_vec(),
                value: b"v".to_vec(),
            }
        );
        assert_eq!(consumed, buf.len());
    }

    #[test]
    fn post_base_forms_round_trip() {
        let mut buf = Vec::new();
        encode_indexed_post_base(2, &mut buf);
        assert_eq!(decode_field(&buf).unwrap().0, FieldLine::IndexedPostBase { index: 2 });

        let mut buf = Vec::new();
        encode_literal_with_post_base_name_ref(false, 1, b"v", &mut buf);
        assert_eq!(
            decode_field(&buf).unwrap().0,
            FieldLine::LiteralWithPostBaseNameRef { never_indexed: false, index: 1, value: b"v".to_vec() }
        );
    }
}

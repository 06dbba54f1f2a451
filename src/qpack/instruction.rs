// Copyright 2022 - 2023 Wenmeng See the COPYRIGHT
// file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Encoder-stream table-mutation instructions and the decoder-stream
//! acknowledgement messages sent back in reply.

use super::literal::{decode_string, decode_string_packed, encode_string, encode_string_packed, StringError};
use super::prefix_int::{self, IntegerError};
use super::varint::{self, VarintError};

#[derive(PartialEq, Clone, Debug)]
pub enum InstructionError {
    Integer(IntegerError),
    String(StringError),
    Varint(VarintError),
    NotEnoughOctets,
    UnknownAckTag(u8),
}

impl InstructionError {
    pub fn description_str(&self) -> &'static str {
        match self {
            InstructionError::Integer(e) => e.description_str(),
            InstructionError::String(e) => e.description_str(),
            InstructionError::Varint(e) => e.description_str(),
            InstructionError::NotEnoughOctets => "not enough octets for instruction",
            InstructionError::UnknownAckTag(_) => "unknown decoder-stream ack tag",
        }
    }
}

impl From<IntegerError> for InstructionError {
    fn from(e: IntegerError) -> Self {
        InstructionError::Integer(e)
    }
}

impl From<StringError> for InstructionError {
    fn from(e: StringError) -> Self {
        InstructionError::String(e)
    }
}

impl From<VarintError> for InstructionError {
    fn from(e: VarintError) -> Self {
        InstructionError::Varint(e)
    }
}

/// One encoder-stream instruction, as seen by the decoder's `update`.
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    InsertWithNameRef { is_static: bool, index: u64, value: Vec<u8> },
    InsertWithoutNameRef { name: Vec<u8>, value: Vec<u8> },
    Duplicate { index: u64 },
    SetCapacity { capacity: u64 },
}

pub fn encode_insert_with_name_ref(is_static: bool, index: u64, value: &[u8], buf: &mut Vec<u8>) {
    buf.push(if is_static { 0xc0 } else { 0x80 });
    prefix_int::encode(index, 6, buf);
    encode_string(value, buf);
}

pub fn encode_insert_without_name_ref(name: &[u8], value: &[u8], buf: &mut Vec<u8>) {
    buf.push(0x40);
    encode_string_packed(name, 6, buf);
    encode_string(value, buf);
}

pub fn encode_duplicate(index: u64, buf: &mut Vec<u8>) {
    buf.push(0x00);
    prefix_int::encode(index, 5, buf);
}

pub fn encode_set_capacity(capacity: u64, buf: &mut Vec<u8>) {
    buf.push(0x20);
    prefix_int::encode(capacity, 5, buf);
}

/// Decodes one encoder-stream instruction from the start of `buf`.
pub fn decode_instruction(buf: &[u8]) -> Result<(Instruction, usize), InstructionError> {
    if buf.is_empty() {
        return Err(InstructionError::NotEnoughOctets);
    }
    let octet = buf[0];
    if octet & 0x80 != 0 {
        let is_static = octet & 0x40 != 0;
        let (index, used1) = prefix_int::decode(buf, 6)?;
        let (value, used2) = decode_string(&buf[used1..])?;
        return Ok((
            Instruction::InsertWithNameRef { is_static, index, value: value.into_owned() },
            used1 + used2,
        ));
    }
    if octet & 0x40 != 0 {
        let (name, used1) = decode_string_packed(buf, 6)?;
        let (value, used2) = decode_string(&buf[used1..])?;
        return Ok((
            Instruction::InsertWithoutNameRef { name: name.into_owned(), value: value.into_owned() },
            used1 + used2,
        ));
    }
    if octet & 0x20 != 0 {
        let (capacity, consumed) = prefix_int::decode(buf, 5)?;
        return Ok((Instruction::SetCapacity { capacity }, consumed));
    }
    let (index, consumed) = prefix_int::decode(buf, 5)?;
    Ok((Instruction::Duplicate { index }, consumed))
}

/// A decoder-stream acknowledgement message.
#[derive(Debug, Clone, PartialEq)]
pub enum AckMessage {
    SectionAck { stream_id: u64 },
    InsertCountIncrement { increment: u64 },
    StreamCancel { stream_id: u64 },
}

const TAG_SECTION_ACK: u8 = 0x00;
const TAG_INSERT_COUNT_INCREMENT: u8 = 0x01;
const TAG_STREAM_CANCEL: u8 = 0x02;

pub fn encode_ack(message: &AckMessage, buf: &mut Vec<u8>) {
    match message {
        AckMessage::SectionAck { stream_id } => {
            buf.push(TAG_SECTION_ACK);
            varint::encode(*stream_id, buf);
        }
        AckMessage::InsertCountIncrement { increment } => {
            buf.push(TAG_INSERT_COUNT_INCREMENT);
            varint::encode(*increment, buf);
        }
        AckMessage::StreamCancel { stream_id } => {
            buf.push(TAG_STREAM_CANCEL);
            varint::encode(*stream_id, buf);
        }
    }
}

pub fn decode_ack(buf: &[u8]) -> Result<(AckMessage, usize), InstructionError> {
    if buf.is_empty() {
        return Err(InstructionError::NotEnoughOctets);
    }
    let tag = buf[0];
    let (value, used) = varint::decode(&buf[1..])?;
    let message = match tag {
        TAG_SECTION_ACK => AckMessage::SectionAck { stream_id: value },
        TAG_INSERT_COUNT_INCREMENT => AckMessage::InsertCountIncrement { increment: value },
        TAG_STREAM_CANCEL => AckMessage::StreamCancel { stream_id: value },
        other => return Err(InstructionError::UnknownAckTag(other)),
    };
    Ok((message, 1 + used))
}

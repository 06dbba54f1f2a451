// Copyright 2022 - 2023 Wenmeng See the COPYRIGHT
// file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The decoder half of the codec: applies encoder-stream instructions to
//! its dynamic table, decodes per-stream header blocks, and parks blocks
//! that arrive ahead of the insertions they depend on.

use log::{debug, trace};

use super::block::{self, BlockError, FieldLine};
use super::dynamic_table::{DynamicTable, DynamicTableError};
use super::field::HeaderField;
use super::instruction::{self, AckMessage, Instruction, InstructionError};
use super::static_table;
use super::stream_tracker::StreamTracker;

#[derive(PartialEq, Clone, Debug)]
pub enum DecoderError {
    Instruction(InstructionError),
    Block(BlockError),
    Table(DynamicTableError),
    /// A reference pointed past this block's declared `largest_reference`,
    /// or past the table's current insert count.
    InvalidRef,
    /// Decoded header list exceeded the configured budget. The whole block
    /// was still consumed to keep table state synchronized.
    TooLarge,
}

impl DecoderError {
    pub fn description_str(&self) -> &'static str {
        match self {
            DecoderError::Instruction(e) => e.description_str(),
            DecoderError::Block(e) => e.description_str(),
            DecoderError::Table(e) => e.description_str(),
            DecoderError::InvalidRef => "reference to an index beyond this block's bound",
            DecoderError::TooLarge => "decoded header list exceeds max_header_list_size",
        }
    }
}

impl From<InstructionError> for DecoderError {
    fn from(e: InstructionError) -> Self {
        DecoderError::Instruction(e)
    }
}

impl From<BlockError> for DecoderError {
    fn from(e: BlockError) -> Self {
        DecoderError::Block(e)
    }
}

impl From<DynamicTableError> for DecoderError {
    fn from(e: DynamicTableError) -> Self {
        DecoderError::Table(e)
    }
}

/// Outcome of decoding a single stream's header block.
#[derive(Debug, PartialEq)]
pub enum DecodeOutcome {
    Decoded { section_ack: Vec<u8>, headers: Vec<HeaderField> },
    Blocked,
}

pub struct Decoder {
    dynamic_table: DynamicTable,
    blocked: StreamTracker,
    max_header_list_size: usize,
}

impl Decoder {
    pub fn new(max_capacity: usize, max_header_list_size: usize) -> Decoder {
        Decoder {
            dynamic_table: DynamicTable::new(max_capacity),
            blocked: StreamTracker::new(),
            max_header_list_size,
        }
    }

    pub fn insert_count(&self) -> u64 {
        self.dynamic_table.insert_count()
    }

    pub fn blocked_stream_count(&self) -> usize {
        self.blocked.len()
    }

    /// Applies a run of encoder-stream instructions. Returns the
    /// acknowledgement bytes to send back (an insert-count-increment
    /// message, if any insertions were made) and the list of streams that
    /// are now unblocked, in ascending order of the insertion count they
    /// were waiting on.
    pub fn update(&mut self, mut buf: &[u8]) -> Result<(Vec<u8>, Vec<u64>), DecoderError> {
        let mut inserted = 0u64;
        while !buf.is_empty() {
            let (instruction, consumed) = instruction::decode_instruction(buf)?;
            match instruction {
                Instruction::InsertWithNameRef { is_static, index, value } => {
                    let name = self.resolve_name(is_static, index)?.to_vec();
                    self.dynamic_table.insert(name, value)?;
                    inserted += 1;
                }
                Instruction::InsertWithoutNameRef { name, value } => {
                    self.dynamic_table.insert(name, value)?;
                    inserted += 1;
                }
                Instruction::Duplicate { index } => {
                    self.dynamic_table.duplicate(index)?;
                    inserted += 1;
                }
                Instruction::SetCapacity { capacity } => {
                    self.dynamic_table.set_capacity(capacity as usize)?;
                }
            }
            buf = &buf[consumed..];
        }

        let mut ack_bytes = Vec::new();
        if inserted > 0 {
            debug!("qpack decoder applied {inserted} insertion(s), insert_count now {}", self.insert_count());
            instruction::encode_ack(&AckMessage::InsertCountIncrement { increment: inserted }, &mut ack_bytes);
        }

        let resumed = self.blocked.pop_le(self.insert_count()).into_iter().map(|(stream_id, _)| stream_id).collect();
        Ok((ack_bytes, resumed))
    }

    fn resolve_name(&self, is_static: bool, index: u64) -> Result<&[u8], DecoderError> {
        if is_static {
            static_table::get(index as usize).map(|(n, _)| n).ok_or(DecoderError::InvalidRef)
        } else {
            self.dynamic_table.get(index).map(|(n, _)| n).map_err(DecoderError::from)
        }
    }

    /// Decodes the header block for `stream_id`. If the block's
    /// `largest_reference` has not arrived yet, the stream is parked and
    /// `DecodeOutcome::Blocked` is returned; a later `update()` call will
    /// report it in its `resumed` list, at which point the caller must call
    /// `decode` again with the same bytes.
    pub fn decode(&mut self, stream_id: u64, buf: &[u8]) -> Result<DecodeOutcome, DecoderError> {
        let (largest_reference, base, mut offset) = block::decode_prefix(buf)?;

        if largest_reference > self.insert_count() {
            trace!("qpack stream {stream_id} blocked on insert count {largest_reference}");
            self.blocked.insert(stream_id, largest_reference);
            return Ok(DecodeOutcome::Blocked);
        }

        let mut headers = Vec::new();
        let mut total_size = 0usize;
        let mut overflowed = false;

        while offset < buf.len() {
            let (line, consumed) = block::decode_field(&buf[offset..])?;
            offset += consumed;

            let field = self.resolve_field(line, base, largest_reference)?;
            if !overflowed {
                total_size += field.mem_size();
                if total_size > self.max_header_list_size {
                    overflowed = true;
                } else {
                    headers.push(field);
                }
            }
        }

        if overflowed {
            return Err(DecoderError::TooLarge);
        }

        let mut section_ack = Vec::new();
        instruction::encode_ack(&AckMessage::SectionAck { stream_id }, &mut section_ack);
        Ok(DecodeOutcome::Decoded { section_ack, headers })
    }

    fn resolve_field(&self, line: FieldLine, base: u64, largest_reference: u64) -> Result<HeaderField, DecoderError> {
        match line {
            FieldLine::Indexed { is_static, index } => {
                if is_static {
                    let (name, value) = static_table::get(index as usize).ok_or(DecoderError::InvalidRef)?;
                    Ok(HeaderField::new(name, value))
                } else {
                    let abs = base.checked_sub(index).ok_or(DecoderError::InvalidRef)?;
                    self.checked_dynamic(abs, largest_reference).map(|(n, v)| HeaderField::new(n, v))
                }
            }
            FieldLine::IndexedPostBase { index } => {
                let abs = base + index + 1;
                self.checked_dynamic(abs, largest_reference).map(|(n, v)| HeaderField::new(n, v))
            }
            FieldLine::LiteralWithNameRef { is_static, never_indexed, index, value } => {
                let name = if is_static {
                    static_table::get(index as usize).map(|(n, _)| n.to_vec()).ok_or(DecoderError::InvalidRef)?
                } else {
                    let abs = base.checked_sub(index).ok_or(DecoderError::InvalidRef)?;
                    self.checked_dynamic(abs, largest_reference)?.0.to_vec()
                };
                Ok(field_with_flag(name, value, never_indexed))
            }
            FieldLine::LiteralWithPostBaseNameRef { never_indexed, index, value } => {
                let abs = base + index + 1;
                let name = self.checked_dynamic(abs, largest_reference)?.0.to_vec();
                Ok(field_with_flag(name, value, never_indexed))
            }
            FieldLine::LiteralWithoutNameRef { never_indexed, name, value } => {
                Ok(field_with_flag(name, value, never_indexed))
            }
        }
    }

    fn checked_dynamic(&self, abs: u64, largest_reference: u64) -> Result<(&[u8], &[u8]), DecoderError> {
        if abs == 0 || abs > largest_reference {
            return Err(DecoderError::InvalidRef);
        }
        self.dynamic_table.get(abs).map_err(DecoderError::from)
    }
}

fn field_with_flag(name: Vec<u8>, value: Vec<u8>, never_indexed: bool) -> HeaderField {
    let mut field = HeaderField::new(name, value);
    field.never_indexed = never_indexed;
    field
}

#[cfg(test)]
mod tests {
    use super::super::encoder::Encoder;
    use super::*;

    #[test]
    fn static_only_round_trip() {
        let mut dec = Decoder::new(0, 4096);
        let mut enc = Encoder::new(0, 0, 0);
        let (_, block_bytes) = enc.encode(4, &[HeaderField::new(":path", "/")], false);
        match dec.decode(4, &block_bytes).unwrap() {
            DecodeOutcome::Decoded { headers, .. } => {
                assert_eq!(headers, vec![HeaderField::new(":path", "/")]);
            }
            DecodeOutcome::Blocked => panic!("must not block on static-only content"),
        }
    }

    #[test]
    fn blocked_then_resumed() {
        let mut enc = Encoder::new(256, 256, 10);
        let mut dec = Decoder::new(256, 4096);

        let (stream_bytes, block_bytes) =
            enc.encode(4, &[HeaderField::new("custom-key", "custom-value")], true);

        // Header block arrives before the encoder-stream update.
        match dec.decode(4, &block_bytes).unwrap() {
            DecodeOutcome::Blocked => {}
            DecodeOutcome::Decoded { .. } => panic!("expected block to be blocked"),
        }
        assert_eq!(dec.blocked_stream_count(), 1);

        let (_, resumed) = dec.update(&stream_bytes).unwrap();
        assert_eq!(resumed, vec![4]);
        assert_eq!(dec.blocked_stream_count(), 0);

        match dec.decode(4, &block_bytes).unwrap() {
            DecodeOutcome::Decoded { headers, .. } => {
                assert_eq!(headers, vec![HeaderField::new("custom-key", "custom-value")]);
            }
            DecodeOutcome::Blocked => panic!("must decode once resumed"),
        }
    }

    #[test]
    fn no_blocking_when_can_block_is_false() {
        let mut enc = Encoder::new(256, 256, 10);
        let mut dec = Decoder::new(256, 4096);

        let (stream_bytes, block_bytes) =
            enc.encode(1, &[HeaderField::new("a", "b"), HeaderField::new(":path", "/")], false);
        dec.update(&stream_bytes).unwrap();
        match dec.decode(1, &block_bytes).unwrap() {
            DecodeOutcome::Decoded { .. } => {}
            DecodeOutcome::Blocked => panic!("can_block=false must never block a freshly-updated decoder"),
        }
    }

    #[test]
    fn max_header_list_size_overflow_consumes_whole_block_then_errors() {
        let mut enc = Encoder::new(0, 0, 0);
        let mut dec = Decoder::new(0, 10);
        let (_, block_bytes) = enc.encode(
            1,
            &[HeaderField::new("x-long-header-name", "a reasonably long value")],
            false,
        );
        assert_eq!(dec.decode(1, &block_bytes), Err(DecoderError::TooLarge));

        // A later, smaller stream must still decode fine.
        let (_, small_block) = enc.encode(2, &[HeaderField::new(":path", "/")], false);
        assert!(matches!(dec.decode(2, &small_block), Ok(DecodeOutcome::Decoded { .. })));
    }
}

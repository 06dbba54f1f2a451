// Copyright 2022 - 2023 Wenmeng See the COPYRIGHT
// file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The encoder half of the codec: turns header lists into an encoder-stream
//! update and a per-request header block, and consumes acknowledgements
//! coming back from the decoder.

use log::{debug, trace};

use super::dynamic_table::{DynamicTable, MatchKind};
use super::field::HeaderField;
use super::instruction::{self, AckMessage, InstructionError};
use super::static_table;
use super::{block, stream_tracker::StreamTracker};

#[derive(PartialEq, Clone, Debug)]
pub enum EncoderError {
    Instruction(InstructionError),
}

impl EncoderError {
    pub fn description_str(&self) -> &'static str {
        match self {
            EncoderError::Instruction(e) => e.description_str(),
        }
    }
}

impl From<InstructionError> for EncoderError {
    fn from(e: InstructionError) -> Self {
        EncoderError::Instruction(e)
    }
}

/// Where a header's name (and possibly value) was found, prior to resolving
/// dynamic absolute indices into this block's relative form.
enum Lookup {
    StaticExact(usize),
    DynamicExact(u64),
    StaticName(usize),
    DynamicName(u64),
    None,
}

enum Chosen {
    Indexed { is_static: bool, index: u64 },
    LiteralWithNameRef { is_static: bool, never_indexed: bool, index: u64, value: Vec<u8> },
    LiteralWithoutNameRef { never_indexed: bool, name: Vec<u8>, value: Vec<u8> },
}

pub struct Encoder {
    dynamic_table: DynamicTable,
    unacked: StreamTracker,
    known_received_count: u64,
    max_blocked_streams: u64,
    pending_capacity: Option<usize>,
}

impl Encoder {
    pub fn new(initial_capacity: usize, max_capacity: usize, max_blocked_streams: u64) -> Encoder {
        let mut dynamic_table = DynamicTable::new(max_capacity);
        dynamic_table.set_capacity(initial_capacity).expect("initial_capacity must be <= max_capacity");
        Encoder {
            dynamic_table,
            unacked: StreamTracker::new(),
            known_received_count: 0,
            max_blocked_streams,
            pending_capacity: None,
        }
    }

    pub fn set_dynamic_table_capacity(&mut self, capacity: usize) {
        self.pending_capacity = Some(capacity);
    }

    fn lookup(&self, name: &[u8], value: &[u8]) -> Lookup {
        let static_hit = static_table::find(name, value);
        let dynamic_hit = self.dynamic_table.lookup(name, value);

        match (static_hit, dynamic_hit) {
            (Some((idx, true)), _) => Lookup::StaticExact(idx),
            (_, Some((idx, MatchKind::NameValue))) if self.reference_allowed(idx) => {
                Lookup::DynamicExact(idx)
            }
            (Some((idx, false)), _) => Lookup::StaticName(idx),
            (_, Some((idx, _))) if self.reference_allowed(idx) => Lookup::DynamicName(idx),
            _ => Lookup::None,
        }
    }

    fn reference_allowed(&self, _index: u64) -> bool {
        // Whether an as-yet-unacknowledged dynamic index may be referenced
        // is a function of `can_block`, checked by the caller; at lookup
        // time every live dynamic entry is a structurally valid candidate.
        true
    }

    /// Encodes `headers` for `stream_id`. Returns `(encoder_stream_bytes,
    /// header_block_bytes)`.
    pub fn encode(&mut self, stream_id: u64, headers: &[HeaderField], can_block: bool) -> (Vec<u8>, Vec<u8>) {
        let mut encoder_stream = Vec::new();

        if let Some(capacity) = self.pending_capacity.take() {
            instruction::encode_set_capacity(capacity as u64, &mut encoder_stream);
            self.dynamic_table.set_capacity(capacity).expect("pending capacity already validated");
        }

        let mut protect_up_to = self.unacked.by_threshold_max();
        let mut chosen_lines = Vec::with_capacity(headers.len());
        let mut largest_reference: u64 = 0;

        for header in headers {
            let chosen = self.choose_representation(header, can_block, &mut encoder_stream, &mut protect_up_to);
            if let Some(idx) = dynamic_index_of(&chosen) {
                largest_reference = largest_reference.max(idx);
            }
            chosen_lines.push(chosen);
        }

        let base = largest_reference;
        if largest_reference > 0 {
            let prior = self.unacked.threshold_of(stream_id).unwrap_or(0);
            self.unacked.insert(stream_id, largest_reference.max(prior));
        }

        let mut header_block = Vec::new();
        block::encode_prefix(largest_reference, base, &mut header_block);
        for chosen in chosen_lines {
            emit_chosen(chosen, base, &mut header_block);
        }

        (encoder_stream, header_block)
    }

    fn choose_representation(
        &mut self,
        header: &HeaderField,
        can_block: bool,
        encoder_stream: &mut Vec<u8>,
        protect_up_to: &mut Option<u64>,
    ) -> Chosen {
        let lookup = self.lookup(&header.name, &header.value);

        if header.never_indexed {
            return match lookup {
                Lookup::StaticExact(idx) | Lookup::StaticName(idx) => Chosen::LiteralWithNameRef {
                    is_static: true,
                    never_indexed: true,
                    index: idx as u64,
                    value: header.value.clone(),
                },
                Lookup::DynamicExact(idx) | Lookup::DynamicName(idx) if idx <= self.known_received_count || can_block => {
                    *protect_up_to = Some(protect_up_to.map_or(idx, |p| p.max(idx)));
                    Chosen::LiteralWithNameRef {
                        is_static: false,
                        never_indexed: true,
                        index: idx,
                        value: header.value.clone(),
                    }
                }
                _ => Chosen::LiteralWithoutNameRef {
                    never_indexed: true,
                    name: header.name.clone(),
                    value: header.value.clone(),
                },
            };
        }

        match lookup {
            Lookup::StaticExact(idx) => Chosen::Indexed { is_static: true, index: idx as u64 },
            Lookup::DynamicExact(idx) if idx <= self.known_received_count || can_block => {
                *protect_up_to = Some(protect_up_to.map_or(idx, |p| p.max(idx)));
                Chosen::Indexed { is_static: false, index: idx }
            }
            Lookup::StaticName(idx) => {
                self.try_index(header, encoder_stream, protect_up_to, can_block, Some((true, idx as u64)))
                    .unwrap_or(Chosen::LiteralWithNameRef {
                        is_static: true,
                        never_indexed: false,
                        index: idx as u64,
                        value: header.value.clone(),
                    })
            }
            Lookup::DynamicName(idx) if idx <= self.known_received_count || can_block => {
                *protect_up_to = Some(protect_up_to.map_or(idx, |p| p.max(idx)));
                self.try_index(header, encoder_stream, protect_up_to, can_block, Some((false, idx)))
                    .unwrap_or(Chosen::LiteralWithNameRef {
                        is_static: false,
                        never_indexed: false,
                        index: idx,
                        value: header.value.clone(),
                    })
            }
            _ => self
                .try_index(header, encoder_stream, protect_up_to, can_block, None)
                .unwrap_or(Chosen::LiteralWithoutNameRef {
                    never_indexed: false,
                    name: header.name.clone(),
                    value: header.value.clone(),
                }),
        }
    }

    /// Attempts to insert `header` into the dynamic table, honoring the
    /// rule that an insertion must not evict an entry still referenced by an
    /// unacknowledged stream (or by this very block). On success, returns the
    /// representation the block should use for this header -- an `Indexed`
    /// reference to the freshly created entry when `can_block`, otherwise
    /// `None` so the caller falls back to its own literal representation
    /// while the insertion still lands on the encoder stream.
    ///
    /// `name_ref` carries the table entry `header`'s name was already found
    /// at, if any, so the insertion can be framed as `insert_with_name_ref`
    /// instead of retransmitting the name literally.
    fn try_index(
        &mut self,
        header: &HeaderField,
        encoder_stream: &mut Vec<u8>,
        protect_up_to: &Option<u64>,
        can_block: bool,
        name_ref: Option<(bool, u64)>,
    ) -> Option<Chosen> {
        let entry_size = header.mem_size();
        if self.dynamic_table.would_evict_protected(entry_size, *protect_up_to) {
            trace!("qpack encoder skipping insert, would evict a protected entry");
            return None;
        }

        match self.dynamic_table.insert(header.name.clone(), header.value.clone()) {
            Ok(absolute_index) => {
                match name_ref {
                    Some((is_static, idx)) => {
                        instruction::encode_insert_with_name_ref(is_static, idx, &header.value, encoder_stream)
                    }
                    None => instruction::encode_insert_without_name_ref(&header.name, &header.value, encoder_stream),
                }
                debug!("qpack encoder inserted #{absolute_index} ({} bytes)", entry_size);
                if can_block {
                    Some(Chosen::Indexed { is_static: false, index: absolute_index })
                } else {
                    None
                }
            }
            Err(_) => None,
        }
    }

    /// Applies a decoder-stream acknowledgement message.
    pub fn on_section_ack(&mut self, stream_id: u64) {
        if let Some(threshold) = self.unacked.remove(stream_id) {
            self.known_received_count = self.known_received_count.max(threshold);
        }
    }

    pub fn on_insert_count_increment(&mut self, increment: u64) {
        self.known_received_count += increment;
    }

    pub fn on_stream_cancel(&mut self, stream_id: u64) {
        self.unacked.remove(stream_id);
    }

    /// Parses a run of framed decoder-stream ack messages and dispatches
    /// each to the corresponding method above.
    pub fn on_decoder_stream(&mut self, mut buf: &[u8]) -> Result<(), EncoderError> {
        while !buf.is_empty() {
            let (message, consumed) = instruction::decode_ack(buf)?;
            match message {
                AckMessage::SectionAck { stream_id } => self.on_section_ack(stream_id),
                AckMessage::InsertCountIncrement { increment } => self.on_insert_count_increment(increment),
                AckMessage::StreamCancel { stream_id } => self.on_stream_cancel(stream_id),
            }
            buf = &buf[consumed..];
        }
        Ok(())
    }

    pub fn known_received_count(&self) -> u64 {
        self.known_received_count
    }

    pub fn dynamic_table_insert_count(&self) -> u64 {
        self.dynamic_table.insert_count()
    }

    pub fn unacked_stream_count(&self) -> usize {
        self.unacked.len()
    }

    pub fn max_blocked_streams(&self) -> u64 {
        self.max_blocked_streams
    }
}

fn dynamic_index_of(chosen: &Chosen) -> Option<u64> {
    match chosen {
        Chosen::Indexed { is_static: false, index } => Some(*index),
        Chosen::LiteralWithNameRef { is_static: false, index, .. } => Some(*index),
        _ => None,
    }
}

fn emit_chosen(chosen: Chosen, base: u64, buf: &mut Vec<u8>) {
    match chosen {
        Chosen::Indexed { is_static: true, index } => block::encode_indexed(true, index, buf),
        Chosen::Indexed { is_static: false, index } => block::encode_indexed(false, base - index, buf),
        Chosen::LiteralWithNameRef { is_static: true, never_indexed, index, value } => {
            block::encode_literal_with_name_ref(true, never_indexed, index, &value, buf)
        }
        Chosen::LiteralWithNameRef { is_static: false, never_indexed, index, value } => {
            block::encode_literal_with_name_ref(false, never_indexed, base - index, &value, buf)
        }
        Chosen::LiteralWithoutNameRef { never_indexed, name, value } => {
            block::encode_literal_without_name_ref(never_indexed, &name, &value, buf)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_only_indexed_header_touches_no_dynamic_state() {
        let mut enc = Encoder::new(0, 0, 0);
        let (stream_bytes, block_bytes) =
            enc.encode(4, &[HeaderField::new(":path", "/")], false);
        assert!(stream_bytes.is_empty());
        assert_eq!(enc.dynamic_table_insert_count(), 0);
        // prefix with largest_reference=0 -> single byte 0x00, base delta 0x00
        assert_eq!(&block_bytes[0..2], &[0x00, 0x00]);
    }

    #[test]
    fn insert_then_reference_when_can_block() {
        let mut enc = Encoder::new(256, 256, 10);
        let (stream_bytes, block_bytes) =
            enc.encode(4, &[HeaderField::new("custom-key", "custom-value")], true);
        assert!(!stream_bytes.is_empty());
        assert_eq!(enc.dynamic_table_insert_count(), 1);
        assert_eq!(enc.unacked_stream_count(), 1);
        // prefix's largest_reference must be 1 (the entry we just inserted).
        let (largest_reference, base, _) = block::decode_prefix(&block_bytes).unwrap();
        assert_eq!(largest_reference, 1);
        assert_eq!(base, 1);
    }

    #[test]
    fn eviction_respects_unacked_entries() {
        let entry_size = 32 + "k".len() + "v".len();
        let mut enc = Encoder::new(entry_size, entry_size, 10);
        enc.encode(1, &[HeaderField::new("k", "v")], true);
        assert_eq!(enc.dynamic_table_insert_count(), 1);

        // Table is full and the only entry is still unacknowledged by
        // stream 1; a second distinct insertion must be skipped.
        let (stream_bytes, _) = enc.encode(2, &[HeaderField::new("k2", "v2")], true);
        assert!(stream_bytes.is_empty());
        assert_eq!(enc.dynamic_table_insert_count(), 1);
    }

    #[test]
    fn ack_bookkeeping_converges() {
        let mut enc = Encoder::new(256, 256, 10);
        enc.encode(1, &[HeaderField::new("a", "1")], true);
        enc.encode(2, &[HeaderField::new("b", "2")], true);
        enc.on_section_ack(1);
        enc.on_section_ack(2);
        assert_eq!(enc.unacked_stream_count(), 0);
        assert_eq!(enc.known_received_count(), enc.dynamic_table_insert_count());
    }
}

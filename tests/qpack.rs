// Copyright 2022 - 2023 Wenmeng See the COPYRIGHT
// file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! End-to-end encoder/decoder round trips, exercising the wire channels
//! (encoder stream, header block, decoder stream) the way two real QUIC
//! peers would use them.

use qpack_codec::{DecodeOutcome, Decoder, Encoder, HeaderField};

#[test]
fn static_only_header_list_round_trips_without_touching_dynamic_state() {
    let mut enc = Encoder::new(0, 0, 0);
    let mut dec = Decoder::new(0, 4096);

    let headers = vec![
        HeaderField::new(":method", "GET"),
        HeaderField::new(":scheme", "https"),
        HeaderField::new(":path", "/"),
    ];
    let (stream_bytes, block_bytes) = enc.encode(0, &headers, false);
    assert!(stream_bytes.is_empty());

    match dec.decode(0, &block_bytes).unwrap() {
        DecodeOutcome::Decoded { headers: got, .. } => assert_eq!(got, headers),
        DecodeOutcome::Blocked => panic!("static-only block must never block"),
    }
    assert_eq!(dec.insert_count(), 0);
}

#[test]
fn inserted_header_is_referenced_and_then_acknowledged() {
    let mut enc = Encoder::new(512, 512, 16);
    let mut dec = Decoder::new(512, 4096);

    let headers = vec![HeaderField::new("x-request-id", "abc-123")];
    let (stream_bytes, block_bytes) = enc.encode(1, &headers, true);

    let (ack_bytes, resumed) = dec.update(&stream_bytes).unwrap();
    assert!(resumed.is_empty(), "nothing was waiting on this insertion yet");
    assert!(!ack_bytes.is_empty(), "an insert-count-increment must be sent back");

    let (section_ack, got) = match dec.decode(1, &block_bytes).unwrap() {
        DecodeOutcome::Decoded { section_ack, headers } => (section_ack, headers),
        DecodeOutcome::Blocked => panic!("insert already landed, must not block"),
    };
    assert_eq!(got, headers);

    enc.on_decoder_stream(&ack_bytes).unwrap();
    enc.on_decoder_stream(&section_ack).unwrap();
    assert_eq!(enc.unacked_stream_count(), 0);
    assert_eq!(enc.known_received_count(), enc.dynamic_table_insert_count());
}

#[test]
fn header_block_ahead_of_insert_blocks_then_resumes_on_update() {
    let mut enc = Encoder::new(512, 512, 16);
    let mut dec = Decoder::new(512, 4096);

    let headers = vec![HeaderField::new("x-trace", "deadbeef")];
    let (stream_bytes, block_bytes) = enc.encode(7, &headers, true);

    // Simulate the header block arriving on its stream before the
    // encoder-stream instructions land.
    match dec.decode(7, &block_bytes).unwrap() {
        DecodeOutcome::Blocked => {}
        DecodeOutcome::Decoded { .. } => panic!("must block: insertion hasn't arrived yet"),
    }
    assert_eq!(dec.blocked_stream_count(), 1);

    let (_, resumed) = dec.update(&stream_bytes).unwrap();
    assert_eq!(resumed, vec![7]);

    match dec.decode(7, &block_bytes).unwrap() {
        DecodeOutcome::Decoded { headers: got, .. } => assert_eq!(got, headers),
        DecodeOutcome::Blocked => panic!("must decode once the blocking insertion has arrived"),
    }
}

#[test]
fn unacknowledged_entry_is_protected_from_eviction() {
    let entry_size = HeaderField::new("k", "v").mem_size();
    let mut enc = Encoder::new(entry_size, entry_size, 16);
    let mut dec = Decoder::new(entry_size, 4096);

    let (stream_bytes_1, block_bytes_1) = enc.encode(1, &[HeaderField::new("k", "v")], true);
    dec.update(&stream_bytes_1).unwrap();
    dec.decode(1, &block_bytes_1).unwrap();

    // The table is full and stream 1's reference is still unacknowledged,
    // so a second, distinct header cannot be inserted -- it must fall back
    // to a literal with no dynamic-table interaction.
    let (stream_bytes_2, block_bytes_2) = enc.encode(2, &[HeaderField::new("k2", "v2")], true);
    assert!(stream_bytes_2.is_empty());
    assert_eq!(enc.dynamic_table_insert_count(), 1);

    dec.update(&stream_bytes_2).unwrap();
    match dec.decode(2, &block_bytes_2).unwrap() {
        DecodeOutcome::Decoded { headers, .. } => {
            assert_eq!(headers, vec![HeaderField::new("k2", "v2")]);
        }
        DecodeOutcome::Blocked => panic!("literal-only block must not block"),
    }
}

#[test]
fn oversized_header_list_is_rejected_but_table_stays_synchronized() {
    let mut enc = Encoder::new(0, 0, 0);
    let mut dec = Decoder::new(0, 16);

    let (_, oversized_block) =
        enc.encode(1, &[HeaderField::new("x-long-header-name", "a reasonably long value")], false);
    assert!(dec.decode(1, &oversized_block).is_err());

    // A later, small stream must decode fine -- the oversized block didn't
    // leave the decoder's table state corrupted.
    let (_, small_block) = enc.encode(2, &[HeaderField::new(":path", "/")], false);
    assert!(matches!(dec.decode(2, &small_block), Ok(DecodeOutcome::Decoded { .. })));
}

#[test]
fn shrinking_dynamic_table_capacity_evicts_down_to_fit() {
    let mut enc = Encoder::new(512, 512, 16);
    let mut dec = Decoder::new(512, 4096);

    let (stream_bytes, _) = enc.encode(1, &[HeaderField::new("a", "1"), HeaderField::new("b", "2")], false);
    dec.update(&stream_bytes).unwrap();
    assert_eq!(dec.insert_count(), 2);

    let entry_size = HeaderField::new("b", "2").mem_size();
    enc.set_dynamic_table_capacity(entry_size);
    let (shrink_bytes, block_bytes) = enc.encode(2, &[HeaderField::new(":path", "/")], false);
    assert!(!shrink_bytes.is_empty(), "a set-capacity instruction must be sent");

    dec.update(&shrink_bytes).unwrap();
    // The shrink left no room for the stale "a" entry; a purely static
    // request still decodes cleanly against the smaller table.
    match dec.decode(2, &block_bytes).unwrap() {
        DecodeOutcome::Decoded { headers, .. } => assert_eq!(headers, vec![HeaderField::new(":path", "/")]),
        DecodeOutcome::Blocked => panic!("static-only block must not block"),
    }
}

// Copyright 2022 - 2023 Wenmeng See the COPYRIGHT
// file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! QPACK header compression (RFC 9204) for HTTP/3.

pub mod block;
pub mod decoder;
pub mod dynamic_table;
pub mod encoder;
pub mod field;
pub mod huffman;
pub mod instruction;
pub mod literal;
pub mod prefix_int;
pub mod static_table;
pub mod stream_tracker;
pub mod varint;

pub use decoder::{DecodeOutcome, Decoder, DecoderError};
pub use dynamic_table::{DynamicTable, DynamicTableError};
pub use encoder::{Encoder, EncoderError};
pub use field::HeaderField;

/// Default initial dynamic table capacity, matching the default HTTP/2
/// header table size this crate's HPACK code used historically.
pub const DEFAULT_DYNAMIC_TABLE_CAPACITY: usize = 4_096;

/// Default cap on the number of header blocks a decoder will let park in
/// its blocked-stream set at once.
pub const DEFAULT_MAX_BLOCKED_STREAMS: u64 = 100;

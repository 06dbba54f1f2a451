// Copyright 2022 - 2023 Wenmeng See the COPYRIGHT
// file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! QPACK (RFC 9204) header compression for HTTP/3.

mod error;
pub mod qpack;

pub use error::{QpackError, QpackResult};
pub use qpack::{
    DecodeOutcome, Decoder, DecoderError, DynamicTable, DynamicTableError, Encoder, EncoderError,
    HeaderField, DEFAULT_DYNAMIC_TABLE_CAPACITY, DEFAULT_MAX_BLOCKED_STREAMS,
};

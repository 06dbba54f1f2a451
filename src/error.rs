// Copyright 2022 - 2023 Wenmeng See the COPYRIGHT
// file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.
//
// Author: tickbh
// -----
// Created Date: 2023/08/15 10:47:56

use std::fmt;

use crate::qpack::block::BlockError;
use crate::qpack::decoder::DecoderError;
use crate::qpack::dynamic_table::DynamicTableError;
use crate::qpack::encoder::EncoderError;
use crate::qpack::huffman::HuffmanDecoderError;
use crate::qpack::instruction::InstructionError;
use crate::qpack::literal::StringError;
use crate::qpack::prefix_int::IntegerError;

#[derive(Debug, Clone, PartialEq)]
pub enum QpackError {
    Integer(IntegerError),
    String(StringError),
    Huffman(HuffmanDecoderError),
    Block(BlockError),
    Instruction(InstructionError),
    Table(DynamicTableError),
    Encoder(EncoderError),
    Decoder(DecoderError),
}

impl QpackError {
    #[inline]
    pub fn description_str(&self) -> &'static str {
        match self {
            QpackError::Integer(e) => e.description_str(),
            QpackError::String(e) => e.description_str(),
            QpackError::Huffman(e) => e.description_str(),
            QpackError::Block(e) => e.description_str(),
            QpackError::Instruction(e) => e.description_str(),
            QpackError::Table(e) => e.description_str(),
            QpackError::Encoder(e) => e.description_str(),
            QpackError::Decoder(e) => e.description_str(),
        }
    }

    /// Whether this connection's dynamic table state is still synchronized
    /// between peers after this error. Errors from `Decoder::update` are
    /// always fatal; per-stream `Decoder::decode` errors other than
    /// `TooLarge` are too, since they can leave the reader mid-block.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, QpackError::Decoder(DecoderError::TooLarge))
    }
}

impl fmt::Display for QpackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description_str())
    }
}

impl From<IntegerError> for QpackError {
    fn from(e: IntegerError) -> Self {
        QpackError::Integer(e)
    }
}

impl From<StringError> for QpackError {
    fn from(e: StringError) -> Self {
        QpackError::String(e)
    }
}

impl From<HuffmanDecoderError> for QpackError {
    fn from(e: HuffmanDecoderError) -> Self {
        QpackError::Huffman(e)
    }
}

impl From<BlockError> for QpackError {
    fn from(e: BlockError) -> Self {
        QpackError::Block(e)
    }
}

impl From<InstructionError> for QpackError {
    fn from(e: InstructionError) -> Self {
        QpackError::Instruction(e)
    }
}

impl From<DynamicTableError> for QpackError {
    fn from(e: DynamicTableError) -> Self {
        QpackError::Table(e)
    }
}

impl From<EncoderError> for QpackError {
    fn from(e: EncoderError) -> Self {
        QpackError::Encoder(e)
    }
}

impl From<DecoderError> for QpackError {
    fn from(e: DecoderError) -> Self {
        QpackError::Decoder(e)
    }
}

pub type QpackResult<T> = Result<T, QpackError>;

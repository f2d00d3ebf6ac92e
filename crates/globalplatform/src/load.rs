//! LOAD command block streaming
//!
//! A load file is wrapped in the C4 load-file-data-block TLV (BER length),
//! optionally preceded by a DAP block, and split into blocks small enough
//! to survive MAC wrapping. Blocks are numbered from zero; the last block
//! is flagged in P1 by the command builder.

use bytes::{BufMut, BytesMut};

use crate::constants::tags;
use crate::error::{Error, Result};

/// Maximum block size: 255 minus 8 bytes for the command MAC
pub const BLOCK_SIZE: usize = 247;

/// Maximum block size under C-DECRYPTION: the largest plaintext whose
/// ISO 7816 padding plus the MAC still fits a one-byte Lc
pub const ENC_BLOCK_SIZE: usize = 239;

/// Splits a load file into LOAD command blocks
#[derive(Debug)]
pub struct LoadCommandStream {
    data: Vec<u8>,
    position: usize,
    block_size: usize,
    blocks_count: usize,
    current_block: usize,
}

impl LoadCommandStream {
    /// Create a stream for a raw load file
    pub fn new(load_file: &[u8]) -> Result<Self> {
        Self::with_dap_block(load_file, None)
    }

    /// Create a stream with an optional DAP block prepended to the C4 TLV
    pub fn with_dap_block(load_file: &[u8], dap_block: Option<&[u8]>) -> Result<Self> {
        Self::with_block_size(load_file, dap_block, BLOCK_SIZE)
    }

    /// Create a stream with an explicit block size
    ///
    /// The block size depends on the secure channel level: a channel that
    /// encrypts command data needs room for the padding the encryption adds.
    pub fn with_block_size(
        load_file: &[u8],
        dap_block: Option<&[u8]>,
        block_size: usize,
    ) -> Result<Self> {
        if load_file.is_empty() {
            return Err(Error::InvalidParameter("empty load file"));
        }
        if block_size == 0 {
            return Err(Error::InvalidParameter("zero block size"));
        }

        let length_bytes = encode_length(load_file.len());

        let dap_len = dap_block.map_or(0, <[u8]>::len);
        let mut data =
            BytesMut::with_capacity(dap_len + 1 + length_bytes.len() + load_file.len());
        if let Some(dap) = dap_block {
            data.put_slice(dap);
        }
        data.put_u8(tags::LOAD_FILE_DATA_BLOCK);
        data.put_slice(&length_bytes);
        data.put_slice(load_file);

        let data = data.freeze().to_vec();
        let blocks_count = data.len().div_ceil(block_size);

        Ok(Self {
            data,
            position: 0,
            block_size,
            blocks_count,
            current_block: 0,
        })
    }

    /// Total number of blocks
    pub const fn blocks_count(&self) -> usize {
        self.blocks_count
    }

    /// Index of the next block to emit
    pub const fn current_block(&self) -> usize {
        self.current_block
    }

    /// Whether blocks remain
    pub fn has_next(&self) -> bool {
        self.position < self.data.len()
    }

    /// The next block: (is_last, block_number, data)
    pub fn next_block(&mut self) -> Option<(bool, u8, &[u8])> {
        if !self.has_next() {
            return None;
        }

        let remaining = self.data.len() - self.position;
        let block_size = remaining.min(self.block_size);
        let is_last = remaining <= self.block_size;

        let block_number = self.current_block as u8;
        let block_data = &self.data[self.position..self.position + block_size];

        self.position += block_size;
        self.current_block += 1;

        Some((is_last, block_number, block_data))
    }
}

/// Encode a BER-TLV length
fn encode_length(length: usize) -> Vec<u8> {
    if length < 0x80 {
        vec![length as u8]
    } else if length < 0x100 {
        vec![0x81, length as u8]
    } else if length < 0x10000 {
        vec![0x82, (length >> 8) as u8, length as u8]
    } else {
        vec![
            0x83,
            (length >> 16) as u8,
            (length >> 8) as u8,
            length as u8,
        ]
    }
}

//! Enumeration of fixed-length trailer blocks.
//!
//! Index `n` maps to the block whose byte `i` is `(n >> 8*i) & 0xff`, i.e.
//! the little-endian encoding of `n` truncated or zero-padded to the block
//! size. Stepping through the space is done on the bytes themselves with a
//! carry, so block sizes wider than any native integer stay correct.
//!
//! [`BlockEnumerator`] is the public lazy view of the space, yielding owned
//! [`Block`]s. The search loops drive a [`BlockCounter`] directly and only
//! copy a block out once it matches.

use serde::{Serialize, Serializer};
use std::fmt;

use crate::error::{Result, SpoofError};

pub const DEFAULT_BLOCK_SIZE: usize = 6;
pub const MAX_BLOCK_SIZE: usize = 32;

/// Largest block size whose space size `256^n` still fits in a `u128`.
const MAX_COUNTABLE_BLOCK_SIZE: usize = 15;

/// One point in the search space.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Block(Vec<u8>);

impl Block {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl From<Vec<u8>> for Block {
    fn from(bytes: Vec<u8>) -> Self {
        Block(bytes)
    }
}

impl AsRef<[u8]> for Block {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Block({})", self.to_hex())
    }
}

impl Serialize for Block {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

pub fn validate_block_size(block_size: usize) -> Result<()> {
    if block_size == 0 {
        return Err(SpoofError::invalid("block size must be at least 1 byte"));
    }
    if block_size > MAX_BLOCK_SIZE {
        return Err(SpoofError::invalid(format!(
            "block size {block_size} exceeds the maximum of {MAX_BLOCK_SIZE} bytes"
        )));
    }
    Ok(())
}

/// All blocks of one size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchSpace {
    block_size: usize,
}

impl SearchSpace {
    pub fn new(block_size: usize) -> Result<Self> {
        validate_block_size(block_size)?;
        Ok(Self { block_size })
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// `256^block_size`, or `None` when that does not fit in a `u128`.
    pub fn total(&self) -> Option<u128> {
        if self.block_size > MAX_COUNTABLE_BLOCK_SIZE {
            None
        } else {
            Some(1u128 << (8 * self.block_size))
        }
    }

    pub fn contains(&self, index: u128) -> bool {
        self.total().is_none_or(|total| index < total)
    }
}

/// Little-endian byte counter over one block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockCounter {
    bytes: Vec<u8>,
}

impl BlockCounter {
    pub fn new(block_size: usize) -> Result<Self> {
        Self::at(block_size, 0)
    }

    /// Positions the counter on enumeration index `index`.
    pub fn at(block_size: usize, index: u128) -> Result<Self> {
        let space = SearchSpace::new(block_size)?;
        if !space.contains(index) {
            return Err(SpoofError::invalid(format!(
                "index {index} is outside the {block_size}-byte block space"
            )));
        }

        let mut bytes = vec![0u8; block_size];
        for (byte, source) in bytes.iter_mut().zip(index.to_le_bytes()) {
            *byte = source;
        }
        Ok(Self { bytes })
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn block_size(&self) -> usize {
        self.bytes.len()
    }

    pub fn to_block(&self) -> Block {
        Block(self.bytes.clone())
    }

    /// Moves to the next index. Returns `false` once the counter wraps past
    /// the last block, leaving it back at all zeroes.
    #[inline]
    pub fn advance(&mut self) -> bool {
        for byte in self.bytes.iter_mut() {
            let (next, carry) = byte.overflowing_add(1);
            *byte = next;
            if !carry {
                return true;
            }
        }
        false
    }
}

/// Block at enumeration index `index`.
pub fn block_at(block_size: usize, index: u128) -> Result<Block> {
    Ok(BlockCounter::at(block_size, index)?.to_block())
}

/// Lazy, restartable walk over a block space in ascending index order.
#[derive(Debug, Clone)]
pub struct BlockEnumerator {
    origin: BlockCounter,
    origin_remaining: Option<u128>,
    counter: BlockCounter,
    remaining: Option<u128>,
    done: bool,
}

impl BlockEnumerator {
    pub fn new(block_size: usize) -> Result<Self> {
        Self::starting_at(block_size, 0)
    }

    pub fn starting_at(block_size: usize, start: u128) -> Result<Self> {
        let counter = BlockCounter::at(block_size, start)?;
        let remaining = SearchSpace::new(block_size)?
            .total()
            .map(|total| total - start);
        Ok(Self {
            origin: counter.clone(),
            origin_remaining: remaining,
            counter,
            remaining,
            done: false,
        })
    }

    pub fn block_size(&self) -> usize {
        self.counter.block_size()
    }

    /// Rewinds to the starting index.
    pub fn restart(&mut self) {
        self.counter = self.origin.clone();
        self.remaining = self.origin_remaining;
        self.done = false;
    }
}

impl Iterator for BlockEnumerator {
    type Item = Block;

    fn next(&mut self) -> Option<Block> {
        if self.done {
            return None;
        }

        let block = self.counter.to_block();
        if let Some(remaining) = self.remaining.as_mut() {
            *remaining -= 1;
        }
        if !self.counter.advance() {
            self.done = true;
        }
        Some(block)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.done {
            return (0, Some(0));
        }
        match self.remaining.and_then(|r| usize::try_from(r).ok()) {
            Some(r) => (r, Some(r)),
            None => (usize::MAX, None),
        }
    }
}

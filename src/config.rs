//! Search options

use std::time::Duration;

use crate::block::{validate_block_size, SearchSpace, DEFAULT_BLOCK_SIZE};
use crate::digest::HashAlgorithm;
use crate::error::{Result, SpoofError};

pub const DEFAULT_PROGRESS_INTERVAL: u64 = 1_000_000;
pub const DEFAULT_CHUNK_LEN: u64 = 1 << 16;

/// Options for one prefix search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOptions {
    /// Trailer length in bytes
    pub block_size: usize,
    /// Digest used for candidates
    pub algorithm: HashAlgorithm,
    /// First enumeration index to try
    pub start_index: u128,
    /// Stop after this many candidates (None = whole space)
    pub max_iterations: Option<u128>,
    /// Emit a progress event every N indices
    pub progress_interval: u64,
    /// Worker threads (1 = sequential)
    pub threads: usize,
    /// Indices handed to one worker at a time in parallel mode
    pub chunk_len: u64,
    /// Wall-clock budget for the search
    pub timeout: Option<Duration>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            algorithm: HashAlgorithm::Sha512,
            start_index: 0,
            max_iterations: None,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            threads: 1,
            chunk_len: DEFAULT_CHUNK_LEN,
            timeout: None,
        }
    }
}

impl SearchOptions {
    pub fn new(algorithm: HashAlgorithm, block_size: usize) -> Self {
        Self {
            algorithm,
            block_size,
            ..Default::default()
        }
    }

    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    pub fn with_algorithm(mut self, algorithm: HashAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn with_start_index(mut self, start_index: u128) -> Self {
        self.start_index = start_index;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: u128) -> Self {
        self.max_iterations = Some(max_iterations);
        self
    }

    pub fn with_progress_interval(mut self, interval: u64) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Uses `threads` workers; 0 picks one per logical CPU.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = if threads == 0 {
            num_cpus::get().max(1)
        } else {
            threads
        };
        self
    }

    pub fn with_chunk_len(mut self, chunk_len: u64) -> Self {
        self.chunk_len = chunk_len;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn space(&self) -> Result<SearchSpace> {
        SearchSpace::new(self.block_size)
    }

    /// One past the last index this search will visit, or None when the
    /// space does not fit in a `u128` and no cap is set.
    pub fn end_index(&self) -> Result<Option<u128>> {
        let total = self.space()?.total();
        let capped = self
            .max_iterations
            .and_then(|cap| self.start_index.checked_add(cap));
        Ok(match (total, capped) {
            (Some(total), Some(capped)) => Some(total.min(capped)),
            (Some(total), None) => Some(total),
            (None, capped) => capped,
        })
    }

    pub fn validate(&self) -> Result<()> {
        validate_block_size(self.block_size)?;

        if !self.space()?.contains(self.start_index) {
            return Err(SpoofError::invalid(format!(
                "start index {} is outside the {}-byte block space",
                self.start_index, self.block_size
            )));
        }
        if self.max_iterations == Some(0) {
            return Err(SpoofError::invalid("iteration limit must be positive"));
        }
        if self.progress_interval == 0 {
            return Err(SpoofError::invalid("progress interval must be positive"));
        }
        if self.threads == 0 {
            return Err(SpoofError::invalid("thread count must be positive"));
        }
        if self.chunk_len == 0 {
            return Err(SpoofError::invalid("chunk length must be positive"));
        }
        Ok(())
    }
}

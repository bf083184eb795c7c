//! Candidate assembly: `base ++ block`.

use crate::digest::{DigestBytes, HashAlgorithm, Hasher};

/// Returns a fresh buffer holding `base` followed by `block`.
pub fn assemble(base: &[u8], block: &[u8]) -> Vec<u8> {
    let mut candidate = Vec::with_capacity(base.len() + block.len());
    candidate.extend_from_slice(base);
    candidate.extend_from_slice(block);
    candidate
}

/// Scratch buffer that keeps one copy of the base and only rewrites the
/// trailing block between candidates.
#[derive(Debug, Clone)]
pub struct CandidateBuffer {
    buf: Vec<u8>,
    base_len: usize,
}

impl CandidateBuffer {
    pub fn new(base: &[u8], block_size: usize) -> Self {
        let mut buf = Vec::with_capacity(base.len() + block_size);
        buf.extend_from_slice(base);
        Self {
            buf,
            base_len: base.len(),
        }
    }

    pub fn base(&self) -> &[u8] {
        &self.buf[..self.base_len]
    }

    pub fn with_block(&mut self, block: &[u8]) -> &[u8] {
        self.buf.truncate(self.base_len);
        self.buf.extend_from_slice(block);
        &self.buf
    }
}

/// Digests candidates without re-reading the base.
///
/// The base is absorbed once; each candidate forks that state and absorbs
/// only the block, which yields the same digest as hashing
/// [`assemble`]`(base, block)` from scratch.
#[derive(Clone)]
pub struct CandidateHasher {
    algorithm: HashAlgorithm,
    base_state: Hasher,
}

impl CandidateHasher {
    pub fn new(base: &[u8], algorithm: HashAlgorithm) -> Self {
        let mut base_state = Hasher::new(algorithm);
        base_state.update(base);
        Self {
            algorithm,
            base_state,
        }
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    #[inline]
    pub fn digest_into(&self, block: &[u8], out: &mut DigestBytes) {
        let mut state = self.base_state.clone();
        state.update(block);
        state.finalize_into(out);
    }

    pub fn digest_hex(&self, block: &[u8]) -> String {
        let mut out = DigestBytes::default();
        self.digest_into(block, &mut out);
        out.to_hex()
    }
}

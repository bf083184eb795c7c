//! Digest engine and target prefix matching.
//!
//! Every supported algorithm goes through the same [`Hasher`] so the search
//! loop stays algorithm-agnostic. Digests are compared as raw bytes against
//! a pre-decoded [`TargetPrefix`]; hex strings are only produced for
//! reporting.

use serde::Serialize;
use sha2::Digest;
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, SpoofError};

/// Largest digest produced by any supported algorithm (SHA-512, SHA3-512).
pub const MAX_DIGEST_LEN: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum HashAlgorithm {
    #[serde(rename = "sha224")]
    Sha224,
    #[serde(rename = "sha256")]
    Sha256,
    #[serde(rename = "sha384")]
    Sha384,
    #[default]
    #[serde(rename = "sha512")]
    Sha512,
    #[serde(rename = "sha512-224")]
    Sha512_224,
    #[serde(rename = "sha512-256")]
    Sha512_256,
    #[serde(rename = "sha3-224")]
    Sha3_224,
    #[serde(rename = "sha3-256")]
    Sha3_256,
    #[serde(rename = "sha3-384")]
    Sha3_384,
    #[serde(rename = "sha3-512")]
    Sha3_512,
}

impl HashAlgorithm {
    pub const ALL: [HashAlgorithm; 10] = [
        HashAlgorithm::Sha224,
        HashAlgorithm::Sha256,
        HashAlgorithm::Sha384,
        HashAlgorithm::Sha512,
        HashAlgorithm::Sha512_224,
        HashAlgorithm::Sha512_256,
        HashAlgorithm::Sha3_224,
        HashAlgorithm::Sha3_256,
        HashAlgorithm::Sha3_384,
        HashAlgorithm::Sha3_512,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha224 => "sha224",
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Sha384 => "sha384",
            HashAlgorithm::Sha512 => "sha512",
            HashAlgorithm::Sha512_224 => "sha512-224",
            HashAlgorithm::Sha512_256 => "sha512-256",
            HashAlgorithm::Sha3_224 => "sha3-224",
            HashAlgorithm::Sha3_256 => "sha3-256",
            HashAlgorithm::Sha3_384 => "sha3-384",
            HashAlgorithm::Sha3_512 => "sha3-512",
        }
    }

    /// Digest length in bytes.
    pub fn digest_len(&self) -> usize {
        match self {
            HashAlgorithm::Sha224 | HashAlgorithm::Sha512_224 | HashAlgorithm::Sha3_224 => 28,
            HashAlgorithm::Sha256 | HashAlgorithm::Sha512_256 | HashAlgorithm::Sha3_256 => 32,
            HashAlgorithm::Sha384 | HashAlgorithm::Sha3_384 => 48,
            HashAlgorithm::Sha512 | HashAlgorithm::Sha3_512 => 64,
        }
    }

    /// Digest length in hex characters.
    pub fn hex_len(&self) -> usize {
        self.digest_len() * 2
    }

    pub fn hasher(&self) -> Hasher {
        Hasher::new(*self)
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HashAlgorithm {
    type Err = SpoofError;

    fn from_str(s: &str) -> Result<Self> {
        // "SHA-512", "sha512", "sha512_256" and "sha512/256" all name the same thing
        let normalized: String = s
            .trim()
            .to_ascii_lowercase()
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | '/'))
            .collect();

        let algorithm = match normalized.as_str() {
            "sha224" => HashAlgorithm::Sha224,
            "sha256" => HashAlgorithm::Sha256,
            "sha384" => HashAlgorithm::Sha384,
            "sha512" => HashAlgorithm::Sha512,
            "sha512224" => HashAlgorithm::Sha512_224,
            "sha512256" => HashAlgorithm::Sha512_256,
            "sha3224" => HashAlgorithm::Sha3_224,
            "sha3256" => HashAlgorithm::Sha3_256,
            "sha3384" => HashAlgorithm::Sha3_384,
            "sha3512" => HashAlgorithm::Sha3_512,
            _ => return Err(SpoofError::UnsupportedAlgorithm(s.to_string())),
        };
        Ok(algorithm)
    }
}

/// Incremental hash state for any [`HashAlgorithm`].
///
/// Cloning a hasher that has already absorbed a long prefix is how the
/// search avoids re-hashing the base buffer for every candidate.
#[derive(Clone)]
pub enum Hasher {
    Sha224(sha2::Sha224),
    Sha256(sha2::Sha256),
    Sha384(sha2::Sha384),
    Sha512(sha2::Sha512),
    Sha512_224(sha2::Sha512_224),
    Sha512_256(sha2::Sha512_256),
    Sha3_224(sha3::Sha3_224),
    Sha3_256(sha3::Sha3_256),
    Sha3_384(sha3::Sha3_384),
    Sha3_512(sha3::Sha3_512),
}

macro_rules! each_state {
    ($hasher:expr, $state:ident => $body:expr) => {
        match $hasher {
            Hasher::Sha224($state) => $body,
            Hasher::Sha256($state) => $body,
            Hasher::Sha384($state) => $body,
            Hasher::Sha512($state) => $body,
            Hasher::Sha512_224($state) => $body,
            Hasher::Sha512_256($state) => $body,
            Hasher::Sha3_224($state) => $body,
            Hasher::Sha3_256($state) => $body,
            Hasher::Sha3_384($state) => $body,
            Hasher::Sha3_512($state) => $body,
        }
    };
}

impl Hasher {
    pub fn new(algorithm: HashAlgorithm) -> Self {
        match algorithm {
            HashAlgorithm::Sha224 => Hasher::Sha224(sha2::Sha224::new()),
            HashAlgorithm::Sha256 => Hasher::Sha256(sha2::Sha256::new()),
            HashAlgorithm::Sha384 => Hasher::Sha384(sha2::Sha384::new()),
            HashAlgorithm::Sha512 => Hasher::Sha512(sha2::Sha512::new()),
            HashAlgorithm::Sha512_224 => Hasher::Sha512_224(sha2::Sha512_224::new()),
            HashAlgorithm::Sha512_256 => Hasher::Sha512_256(sha2::Sha512_256::new()),
            HashAlgorithm::Sha3_224 => Hasher::Sha3_224(sha3::Sha3_224::new()),
            HashAlgorithm::Sha3_256 => Hasher::Sha3_256(sha3::Sha3_256::new()),
            HashAlgorithm::Sha3_384 => Hasher::Sha3_384(sha3::Sha3_384::new()),
            HashAlgorithm::Sha3_512 => Hasher::Sha3_512(sha3::Sha3_512::new()),
        }
    }

    #[inline]
    pub fn update(&mut self, data: &[u8]) {
        each_state!(self, state => Digest::update(state, data))
    }

    #[inline]
    pub fn finalize_into(self, out: &mut DigestBytes) {
        each_state!(self, state => out.copy_from(&state.finalize()))
    }

    pub fn finalize(self) -> DigestBytes {
        let mut out = DigestBytes::default();
        self.finalize_into(&mut out);
        out
    }
}

/// A finished digest held on the stack.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct DigestBytes {
    buf: [u8; MAX_DIGEST_LEN],
    len: usize,
}

impl DigestBytes {
    #[inline]
    fn copy_from(&mut self, bytes: &[u8]) {
        self.buf[..bytes.len()].copy_from_slice(bytes);
        self.len = bytes.len();
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.as_slice())
    }
}

impl Default for DigestBytes {
    fn default() -> Self {
        Self {
            buf: [0u8; MAX_DIGEST_LEN],
            len: 0,
        }
    }
}

impl fmt::Debug for DigestBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DigestBytes({})", self.to_hex())
    }
}

/// Hashes `bytes` and returns the lowercase hex digest.
pub fn hash_hex(bytes: &[u8], algorithm: HashAlgorithm) -> String {
    let mut hasher = algorithm.hasher();
    hasher.update(bytes);
    hasher.finalize().to_hex()
}

/// Same as [`hash_hex`] with the algorithm given by name.
pub fn hash_named(bytes: &[u8], algorithm: &str) -> Result<String> {
    let algorithm = algorithm.parse::<HashAlgorithm>()?;
    Ok(hash_hex(bytes, algorithm))
}

/// Normalised hexadecimal prefix a digest has to start with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetPrefix {
    text: String,
    whole: Vec<u8>,
    half: Option<u8>,
}

impl TargetPrefix {
    /// Trims the input, strips an optional `0x` and lowercases it.
    ///
    /// An empty prefix is valid and matches every digest.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let stripped = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        let text = stripped.to_ascii_lowercase();

        if let Some(bad) = text.chars().find(|c| !c.is_ascii_hexdigit()) {
            return Err(SpoofError::invalid(format!(
                "target prefix {raw:?} contains non-hex character {bad:?}"
            )));
        }

        let split = text.len() - text.len() % 2;
        let whole = hex::decode(&text[..split])
            .map_err(|e| SpoofError::invalid(format!("target prefix {raw:?}: {e}")))?;
        let half = if split < text.len() {
            u8::from_str_radix(&text[split..], 16).ok()
        } else {
            None
        };

        Ok(Self { text, whole, half })
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Length in hex characters.
    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Fails when no digest of `algorithm` could ever start with this prefix.
    pub fn ensure_reachable(&self, algorithm: HashAlgorithm) -> Result<()> {
        if self.len() > algorithm.hex_len() {
            return Err(SpoofError::invalid(format!(
                "target prefix has {} hex characters but {} digests only have {}",
                self.len(),
                algorithm,
                algorithm.hex_len()
            )));
        }
        Ok(())
    }

    /// Compares against raw digest bytes, nibble by nibble.
    #[inline]
    pub fn matches(&self, digest: &[u8]) -> bool {
        if !digest.starts_with(&self.whole) {
            return false;
        }
        match self.half {
            None => true,
            Some(nibble) => digest
                .get(self.whole.len())
                .is_some_and(|byte| byte >> 4 == nibble),
        }
    }

    pub fn matches_hex(&self, digest: &str) -> bool {
        digest.starts_with(&self.text)
    }
}

impl fmt::Display for TargetPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl FromStr for TargetPrefix {
    type Err = SpoofError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_vectors() {
        assert_eq!(
            hash_hex(b"abc", HashAlgorithm::Sha256),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(
            hash_hex(b"abc", HashAlgorithm::Sha3_256),
            "3a985da74fe225b2045c172d6bd390bd855f086e3e9d525b46bfe24511431532"
        );
        assert_eq!(
            hash_hex(b"abc", HashAlgorithm::Sha224),
            "23097d223405d8228642a477bda255b32aadbce4bda0b3f7e36c9da7"
        );
        assert_eq!(
            hash_hex(b"abc", HashAlgorithm::Sha512_256),
            "53048e2681941ef99b2e29b76b4c7dabe4c2d0c634fc6d46e0e2f13107e7af23"
        );
        assert_eq!(
            hash_hex(b"", HashAlgorithm::Sha512),
            "cf83e1357eefb8bdf1542850d66d8007d620e4050b5715dc83f4a921d36ce9ce\
             47d0d13c5d85f2b0ff8318d2877eec2f63b931bd47417a81a538327af927da3e"
        );
    }

    #[test]
    fn test_hex_len_matches_output() {
        for algorithm in HashAlgorithm::ALL {
            let digest = hash_hex(b"length", algorithm);
            assert_eq!(digest.len(), algorithm.hex_len(), "{algorithm}");
            assert!(digest.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f')));
        }
    }

    #[test]
    fn test_hash_is_deterministic() {
        let data = b"same bytes every time";
        for algorithm in HashAlgorithm::ALL {
            assert_eq!(hash_hex(data, algorithm), hash_hex(data, algorithm));
        }
    }

    #[test]
    fn test_incremental_equals_one_shot() {
        let mut hasher = Hasher::new(HashAlgorithm::Sha384);
        hasher.update(b"hello ");
        let forked = hasher.clone();
        hasher.update(b"world");
        assert_eq!(
            hasher.finalize().to_hex(),
            hash_hex(b"hello world", HashAlgorithm::Sha384)
        );

        let mut forked = forked;
        forked.update(b"there");
        assert_eq!(
            forked.finalize().to_hex(),
            hash_hex(b"hello there", HashAlgorithm::Sha384)
        );
    }

    #[test]
    fn test_parse_algorithm_names() {
        assert_eq!("sha512".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Sha512);
        assert_eq!("SHA-256".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Sha256);
        assert_eq!(
            "sha512_256".parse::<HashAlgorithm>().unwrap(),
            HashAlgorithm::Sha512_256
        );
        assert_eq!("sha3-384".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Sha3_384);
        for algorithm in HashAlgorithm::ALL {
            assert_eq!(algorithm.name().parse::<HashAlgorithm>().unwrap(), algorithm);
        }
    }

    #[test]
    fn test_unsupported_algorithm() {
        let err = hash_named(b"abc", "md4").unwrap_err();
        assert!(matches!(err, SpoofError::UnsupportedAlgorithm(name) if name == "md4"));
    }

    #[test]
    fn test_default_is_sha512() {
        assert_eq!(HashAlgorithm::default(), HashAlgorithm::Sha512);
    }

    #[test]
    fn test_prefix_normalization() {
        let prefix = TargetPrefix::parse("0xABcd").unwrap();
        assert_eq!(prefix.as_str(), "abcd");
        assert_eq!(TargetPrefix::parse("  24 ").unwrap().as_str(), "24");
        assert!(TargetPrefix::parse("").unwrap().is_empty());
    }

    #[test]
    fn test_prefix_rejects_non_hex() {
        assert!(matches!(
            TargetPrefix::parse("12g4"),
            Err(SpoofError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_prefix_matches_raw_bytes() {
        let digest = [0xab, 0xcd, 0xef];
        assert!(TargetPrefix::parse("").unwrap().matches(&digest));
        assert!(TargetPrefix::parse("a").unwrap().matches(&digest));
        assert!(TargetPrefix::parse("abc").unwrap().matches(&digest));
        assert!(TargetPrefix::parse("abcdef").unwrap().matches(&digest));
        assert!(!TargetPrefix::parse("abd").unwrap().matches(&digest));
        assert!(!TargetPrefix::parse("b").unwrap().matches(&digest));
        assert!(!TargetPrefix::parse("abcdef0").unwrap().matches(&digest));
    }

    #[test]
    fn test_raw_and_hex_matching_agree() {
        let digest = hash_hex(b"agree", HashAlgorithm::Sha256);
        let raw = hex::decode(&digest).unwrap();
        for len in 0..=8 {
            let prefix = TargetPrefix::parse(&digest[..len]).unwrap();
            assert!(prefix.matches(&raw));
            assert!(prefix.matches_hex(&digest));
        }
    }

    #[test]
    fn test_prefix_reachability() {
        let long = TargetPrefix::parse(&"0".repeat(65)).unwrap();
        assert!(long.ensure_reachable(HashAlgorithm::Sha256).is_err());
        let exact = TargetPrefix::parse(&"0".repeat(64)).unwrap();
        assert!(exact.ensure_reachable(HashAlgorithm::Sha256).is_ok());
    }
}

//! Post-write verification and the machine-readable run summary.

use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::digest::{HashAlgorithm, TargetPrefix};
use crate::error::Result;
use crate::io::file_digest;
use crate::search::SearchOutcome;

/// Result of re-hashing the written output file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verification {
    pub output_digest: String,
    /// Output digest starts with the target prefix
    pub prefix_matches: bool,
    /// Output digest differs from the original input's
    pub changed: bool,
    /// Output digest equals the digest the search reported
    pub digest_agrees: bool,
}

impl Verification {
    pub fn is_success(&self) -> bool {
        self.prefix_matches && self.digest_agrees
    }
}

pub fn verify_output(
    output: &Path,
    algorithm: HashAlgorithm,
    target: &TargetPrefix,
    original_digest: &str,
    reported_digest: &str,
) -> Result<Verification> {
    let output_digest = file_digest(output, algorithm)?;
    Ok(Verification {
        prefix_matches: target.matches_hex(&output_digest),
        changed: output_digest != original_digest,
        digest_agrees: output_digest == reported_digest,
        output_digest,
    })
}

/// Everything one CLI run did, for `--json`.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub algorithm: HashAlgorithm,
    pub target_prefix: String,
    pub input: PathBuf,
    pub output: PathBuf,
    pub source: &'static str,
    pub block_size: usize,
    pub base_len: usize,
    pub original_digest: String,
    pub outcome: SearchOutcome,
    pub written: bool,
    pub verification: Option<Verification>,
    pub elapsed_ms: u128,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::block_at;
    use crate::digest::hash_hex;
    use crate::search::Match;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_verify_output() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.bin");
        fs::write(&path, b"AB\x00").unwrap();

        let digest = hash_hex(b"AB\x00", HashAlgorithm::Sha256);
        let original = hash_hex(b"AB", HashAlgorithm::Sha256);
        let target = TargetPrefix::parse("58b6").unwrap();

        let verification =
            verify_output(&path, HashAlgorithm::Sha256, &target, &original, &digest).unwrap();
        assert!(verification.prefix_matches);
        assert!(verification.changed);
        assert!(verification.digest_agrees);
        assert!(verification.is_success());
    }

    #[test]
    fn test_verify_detects_wrong_prefix() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.bin");
        fs::write(&path, b"AB").unwrap();

        let original = hash_hex(b"AB", HashAlgorithm::Sha256);
        let target = TargetPrefix::parse("58b6").unwrap();
        let verification =
            verify_output(&path, HashAlgorithm::Sha256, &target, &original, "58b6").unwrap();
        assert!(!verification.prefix_matches);
        assert!(!verification.changed);
        assert!(!verification.is_success());
    }

    #[test]
    fn test_report_serializes() {
        let report = RunReport {
            algorithm: HashAlgorithm::Sha512,
            target_prefix: "24".to_string(),
            input: PathBuf::from("in.png"),
            output: PathBuf::from("out.png"),
            source: "image",
            block_size: 1,
            base_len: 2,
            original_digest: "00".to_string(),
            outcome: SearchOutcome::Found(Match {
                index: 1,
                block: block_at(1, 1).unwrap(),
                digest: "24ab".to_string(),
                checked: 2,
            }),
            written: true,
            verification: None,
            elapsed_ms: 3,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["algorithm"], "sha512");
        assert_eq!(json["outcome"]["outcome"], "found");
        assert_eq!(json["outcome"]["block"], "01");
        assert_eq!(json["outcome"]["index"], 1);
    }
}

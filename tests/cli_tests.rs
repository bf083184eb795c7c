use std::path::Path;
use std::process::{Command, Output};
use tempfile::tempdir;

use hashspoof::{hash_hex, HashAlgorithm};

fn hashspoof(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_hashspoof"))
        .args(args)
        .output()
        .unwrap()
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn test_missing_arguments_exit_1() {
    let output = hashspoof(&["24"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(!output.stderr.is_empty());
}

#[test]
fn test_help_exit_0() {
    let output = hashspoof(&["--help"]);
    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn test_missing_input_exit_1() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("absent.png");
    let out = dir.path().join("out.png");

    let output = hashspoof(&["24", path_str(&input), path_str(&out)]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("does not exist"));
    assert!(!out.exists());
}

#[test]
fn test_prefix_longer_than_digest_exit_1() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("input.bin");
    std::fs::write(&input, b"hello").unwrap();
    let out = dir.path().join("out.bin");
    let prefix = "a".repeat(65);

    let output = hashspoof(&[
        "-a",
        "sha256",
        "--raw",
        &prefix,
        path_str(&input),
        path_str(&out),
    ]);
    assert_eq!(output.status.code(), Some(1));
    assert!(!out.exists());
}

#[test]
fn test_undecodable_image_reports_failure_exit_0() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("input.png");
    std::fs::write(&input, b"definitely not an image").unwrap();
    let out = dir.path().join("out.png");

    let output = hashspoof(&["24", path_str(&input), path_str(&out)]);
    assert_eq!(output.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Error during hash modification"));
    assert!(String::from_utf8_lossy(&output.stdout).contains("Failed to produce a matching hash."));
    assert!(!out.exists());
}

#[test]
fn test_raw_spoof_writes_matching_output() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("input.bin");
    std::fs::write(&input, b"hello").unwrap();
    let out = dir.path().join("nested").join("out.bin");

    let output = hashspoof(&[
        "-a",
        "sha256",
        "-b",
        "2",
        "--raw",
        "--json",
        "0",
        path_str(&input),
        path_str(&out),
    ]);
    assert_eq!(output.status.code(), Some(0));

    let written = std::fs::read(&out).unwrap();
    assert_eq!(&written[..5], b"hello");
    assert_eq!(written.len(), 7);
    assert!(hash_hex(&written, HashAlgorithm::Sha256).starts_with('0'));

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["outcome"]["outcome"], "found");
    assert_eq!(report["written"], true);
    assert_eq!(report["source"], "raw");
    assert_eq!(report["verification"]["prefix_matches"], true);
}

use clap::Parser;
use hashspoof::block::DEFAULT_BLOCK_SIZE;
use hashspoof::config::DEFAULT_PROGRESS_INTERVAL;
use hashspoof::{FinishEvent, HashAlgorithm, ProgressEvent, SearchObserver, SearchOptions, TargetPrefix};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "hashspoof")]
#[command(author, version)]
#[command(about = "Append trailer bytes to a re-encoded image until its digest starts with a chosen hex prefix", long_about = None)]
pub struct Cli {
    /// Hex prefix the output digest must start with ("0x" optional)
    pub target_prefix: TargetPrefix,

    /// Image to read
    pub input: PathBuf,

    /// Where the modified image is written
    pub output: PathBuf,

    /// Digest algorithm (sha224, sha256, sha384, sha512, sha512-224, sha512-256, sha3-*)
    #[arg(short, long, default_value = "sha512")]
    pub algorithm: HashAlgorithm,

    /// Trailer length in bytes
    #[arg(short, long, default_value_t = DEFAULT_BLOCK_SIZE)]
    pub block_size: usize,

    /// Worker threads, 0 = one per CPU
    #[arg(short = 'j', long, default_value_t = 1)]
    pub threads: usize,

    /// First enumeration index to try
    #[arg(long, default_value_t = 0)]
    pub start_index: u128,

    /// Give up after this many candidates
    #[arg(long)]
    pub max_iterations: Option<u128>,

    /// Give up after this many seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Report progress every N candidates
    #[arg(long, default_value_t = DEFAULT_PROGRESS_INTERVAL)]
    pub progress_interval: u64,

    /// Hash the input bytes as they are instead of re-encoding the image
    #[arg(long)]
    pub raw: bool,

    /// Print a JSON report on stdout
    #[arg(long)]
    pub json: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn search_options(&self) -> SearchOptions {
        let mut options = SearchOptions::new(self.algorithm, self.block_size)
            .with_threads(self.threads)
            .with_start_index(self.start_index)
            .with_progress_interval(self.progress_interval);
        if let Some(cap) = self.max_iterations {
            options = options.with_max_iterations(cap);
        }
        if let Some(secs) = self.timeout {
            options = options.with_timeout(Duration::from_secs(secs));
        }
        options
    }
}

/// Renders search progress with indicatif
pub struct ProgressReporter {
    bar: ProgressBar,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self {
            bar: ProgressBar::new_spinner(),
        }
    }

    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }
}

impl SearchObserver for ProgressReporter {
    fn on_start(&self, total: Option<u128>) {
        match total.and_then(|t| u64::try_from(t).ok()) {
            Some(total) => {
                self.bar.set_length(total);
                self.bar.set_style(
                    ProgressStyle::default_bar()
                        .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {human_pos}/{human_len} combinations ({per_sec}) {msg}")
                        .unwrap_or_else(|_| ProgressStyle::default_bar())
                        .progress_chars("=>-"),
                );
            }
            None => {
                self.bar.set_style(
                    ProgressStyle::default_spinner()
                        .template("{spinner:.green} [{elapsed_precise}] {human_pos} combinations {msg}")
                        .unwrap_or_else(|_| ProgressStyle::default_spinner()),
                );
            }
        }
    }

    fn on_progress(&self, event: &ProgressEvent) {
        self.bar
            .set_position(u64::try_from(event.index).unwrap_or(u64::MAX));
        tracing::debug!(index = %event.index, "progress");
    }

    fn on_finish(&self, event: &FinishEvent) {
        self.bar
            .set_position(u64::try_from(event.checked).unwrap_or(u64::MAX));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positional_arguments() {
        let cli = Cli::try_parse_from(["hashspoof", "0x24AB", "in.png", "out.png"]).unwrap();
        assert_eq!(cli.target_prefix.as_str(), "24ab");
        assert_eq!(cli.input, PathBuf::from("in.png"));
        assert_eq!(cli.output, PathBuf::from("out.png"));
        assert_eq!(cli.algorithm, HashAlgorithm::Sha512);
        assert_eq!(cli.block_size, 6);
    }

    #[test]
    fn test_missing_arguments_is_usage_error() {
        assert!(Cli::try_parse_from(["hashspoof", "24", "in.png"]).is_err());
    }

    #[test]
    fn test_rejects_non_hex_prefix() {
        assert!(Cli::try_parse_from(["hashspoof", "xyz", "in.png", "out.png"]).is_err());
    }

    #[test]
    fn test_rejects_unknown_algorithm() {
        let parsed = Cli::try_parse_from(["hashspoof", "-a", "md4", "24", "in.png", "out.png"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_options_mapping() {
        let cli = Cli::try_parse_from([
            "hashspoof",
            "--algorithm",
            "sha3-256",
            "--block-size",
            "3",
            "--threads",
            "4",
            "--max-iterations",
            "1000",
            "--timeout",
            "30",
            "ff",
            "in.png",
            "out.png",
        ])
        .unwrap();
        let options = cli.search_options();
        assert_eq!(options.algorithm, HashAlgorithm::Sha3_256);
        assert_eq!(options.block_size, 3);
        assert_eq!(options.threads, 4);
        assert_eq!(options.max_iterations, Some(1000));
        assert_eq!(options.timeout, Some(Duration::from_secs(30)));
    }
}

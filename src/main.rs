//! hashspoof - make an image's digest start with a chosen hex prefix.

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use humansize::{format_size, BINARY};
use std::process::ExitCode;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

use cli::{Cli, ProgressReporter};
use hashspoof::io::{file_digest, write_bytes};
use hashspoof::report::{verify_output, RunReport};
use hashspoof::{
    BaseSource, CancelToken, ImageNormalizer, LogObserver, RawSource, SearchController,
    SearchOutcome,
};

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    init_tracing(cli.verbose);

    if !cli.input.exists() {
        eprintln!("Input file {:?} does not exist.", cli.input);
        return ExitCode::from(1);
    }

    let options = cli.search_options();
    if let Err(e) = options
        .validate()
        .and_then(|_| cli.target_prefix.ensure_reachable(cli.algorithm))
    {
        eprintln!("{e}");
        return ExitCode::from(1);
    }

    // Search failures are reported, not signalled through the exit code
    if let Err(e) = run(&cli) {
        eprintln!("Error during hash modification: {e:#}");
        println!("Failed to produce a matching hash.");
    }
    ExitCode::SUCCESS
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "hashspoof=debug" } else { "hashspoof=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn run(cli: &Cli) -> Result<()> {
    let started = Instant::now();
    let algorithm = cli.algorithm;
    let target = cli.target_prefix.clone();
    let say = |line: String| {
        if !cli.json {
            println!("{line}");
        }
    };

    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || handler_token.cancel())
        .context("Failed to set Ctrl+C handler")?;

    let original_digest = file_digest(&cli.input, algorithm)
        .with_context(|| format!("Failed to hash input: {:?}", cli.input))?;
    say(format!("Original Image Hash: {original_digest}"));

    let source: Box<dyn BaseSource> = if cli.raw {
        Box::new(RawSource)
    } else {
        Box::new(ImageNormalizer)
    };
    let base = source
        .load(&cli.input)
        .with_context(|| format!("Failed to load {:?} via {} source", cli.input, source.name()))?;
    let base_len = base.len();
    tracing::info!(source = source.name(), size = %format_size(base_len, BINARY), "base buffer ready");

    say(format!("Starting hash modification for target prefix: {target}"));

    let options = cli.search_options();
    let block_size = options.block_size;
    let mut controller = SearchController::new(base, target.clone(), options)?;
    // Keep stdout clean for the JSON report; progress goes to the log instead
    let outcome = if cli.json {
        controller.run(&LogObserver, &cancel)?
    } else {
        let reporter = ProgressReporter::new();
        let outcome = controller.run(&reporter, &cancel)?;
        reporter.finish(match &outcome {
            SearchOutcome::Found(_) => "match found",
            SearchOutcome::Exhausted { .. } => "space exhausted",
            SearchOutcome::Stopped { .. } => "stopped",
        });
        outcome
    };
    let base = controller.into_base();

    let mut written = false;
    let mut verification = None;

    match &outcome {
        SearchOutcome::Found(found) => {
            write_bytes(&cli.output, &found.candidate(&base))
                .with_context(|| format!("Failed to write output: {:?}", cli.output))?;
            written = true;
            say(format!("Match found! Appended block: {}", found.block));
            say(format!(
                "Success! Modified file saved to {:?} with hash: {}",
                cli.output, found.digest
            ));

            let check = verify_output(
                &cli.output,
                algorithm,
                &target,
                &original_digest,
                &found.digest,
            )?;
            say(format!("Modified Image Hash: {}", check.output_digest));
            if check.prefix_matches {
                say(format!("Success! The modified image hash starts with {target}."));
            } else {
                say(format!("No match! The modified image hash doesn't start with {target}."));
            }
            if check.changed {
                say("The image has been successfully modified.".to_string());
            } else {
                say("The image is the same as the original.".to_string());
            }
            verification = Some(check);
        }
        SearchOutcome::Exhausted { checked } => {
            say(format!("No matching hash found with the given prefix ({checked} combinations checked)."));
            say("Failed to produce a matching hash.".to_string());
        }
        SearchOutcome::Stopped { checked, reason } => {
            say(format!("Search stopped ({reason:?}) after {checked} combinations."));
            say("Failed to produce a matching hash.".to_string());
        }
    }

    if cli.json {
        let report = RunReport {
            algorithm,
            target_prefix: target.to_string(),
            input: cli.input.clone(),
            output: cli.output.clone(),
            source: source.name(),
            block_size,
            base_len,
            original_digest,
            outcome,
            written,
            verification,
            elapsed_ms: started.elapsed().as_millis(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    Ok(())
}

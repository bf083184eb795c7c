//! Search controller.
//!
//! Walks the block space in ascending index order, digests `base ++ block`
//! for each index and stops at the first digest that starts with the
//! target prefix. Parallel runs scan contiguous chunks in waves and still
//! report the lowest matching index, so both modes return the same outcome.

use rayon::prelude::*;
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use crate::block::{Block, BlockCounter};
use crate::candidate::{assemble, CandidateHasher};
use crate::config::SearchOptions;
use crate::digest::{hash_hex, DigestBytes, HashAlgorithm, TargetPrefix};
use crate::error::{Result, SpoofError};
use crate::progress::{CancelToken, FinishEvent, NoopObserver, ProgressEvent, SearchObserver};

/// Cancellation and deadline are polled once per this many candidates.
const STOP_POLL_INTERVAL: u128 = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchState {
    Idle,
    Running,
    Found,
    Exhausted,
    Stopped,
    Failed,
}

impl SearchState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SearchState::Idle | SearchState::Running)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    Cancelled,
    DeadlineElapsed,
    IterationLimit,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Match {
    /// Enumeration index of the block
    pub index: u128,
    pub block: Block,
    /// Lowercase hex digest of `base ++ block`
    pub digest: String,
    /// Candidates up to and including this one, in enumeration order
    pub checked: u128,
}

impl Match {
    pub fn candidate(&self, base: &[u8]) -> Vec<u8> {
        assemble(base, self.block.as_bytes())
    }

    /// Re-hashes the candidate from scratch and checks both the recorded
    /// digest and the prefix.
    pub fn verify(&self, base: &[u8], algorithm: HashAlgorithm, target: &TargetPrefix) -> bool {
        let digest = hash_hex(&self.candidate(base), algorithm);
        digest == self.digest && target.matches_hex(&digest)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SearchOutcome {
    Found(Match),
    /// Every block in the space was tried.
    Exhausted { checked: u128 },
    /// The search ended early without a match.
    Stopped { checked: u128, reason: StopReason },
}

impl SearchOutcome {
    pub fn is_found(&self) -> bool {
        matches!(self, SearchOutcome::Found(_))
    }

    pub fn as_match(&self) -> Option<&Match> {
        match self {
            SearchOutcome::Found(m) => Some(m),
            _ => None,
        }
    }

    pub fn checked(&self) -> u128 {
        match self {
            SearchOutcome::Found(m) => m.checked,
            SearchOutcome::Exhausted { checked } | SearchOutcome::Stopped { checked, .. } => {
                *checked
            }
        }
    }

    pub fn state(&self) -> SearchState {
        match self {
            SearchOutcome::Found(_) => SearchState::Found,
            SearchOutcome::Exhausted { .. } => SearchState::Exhausted,
            SearchOutcome::Stopped { .. } => SearchState::Stopped,
        }
    }
}

struct StopConditions {
    cancel: CancelToken,
    deadline: Option<Instant>,
}

impl StopConditions {
    #[inline]
    fn poll(&self) -> Option<StopReason> {
        if self.cancel.is_cancelled() {
            return Some(StopReason::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(StopReason::DeadlineElapsed),
            _ => None,
        }
    }
}

/// Owns the base buffer for one search and tracks its lifecycle.
pub struct SearchController {
    base: Vec<u8>,
    target: TargetPrefix,
    options: SearchOptions,
    state: SearchState,
}

impl SearchController {
    /// Validates everything up front; no hashing happens here.
    pub fn new(base: Vec<u8>, target: TargetPrefix, options: SearchOptions) -> Result<Self> {
        options.validate()?;
        target.ensure_reachable(options.algorithm)?;
        Ok(Self {
            base,
            target,
            options,
            state: SearchState::Idle,
        })
    }

    pub fn state(&self) -> SearchState {
        self.state
    }

    pub fn base(&self) -> &[u8] {
        &self.base
    }

    pub fn target(&self) -> &TargetPrefix {
        &self.target
    }

    pub fn options(&self) -> &SearchOptions {
        &self.options
    }

    pub fn into_base(self) -> Vec<u8> {
        self.base
    }

    /// Runs the search once. Any later call fails with `InvalidState`.
    pub fn run(
        &mut self,
        observer: &dyn SearchObserver,
        cancel: &CancelToken,
    ) -> Result<SearchOutcome> {
        if self.state != SearchState::Idle {
            return Err(SpoofError::InvalidState(self.state));
        }
        self.state = SearchState::Running;

        let stop = StopConditions {
            cancel: cancel.clone(),
            deadline: self.options.timeout.map(|t| Instant::now() + t),
        };

        tracing::info!(
            algorithm = %self.options.algorithm,
            prefix = %self.target,
            block_size = self.options.block_size,
            base_len = self.base.len(),
            threads = self.options.threads,
            "starting prefix search"
        );

        let result = match self.options.space() {
            Ok(space) => {
                observer.on_start(space.total());
                if self.options.threads > 1 {
                    self.run_parallel(observer, &stop)
                } else {
                    self.run_sequential(observer, &stop)
                }
            }
            Err(e) => Err(e),
        };

        match &result {
            Ok(outcome) => {
                self.state = outcome.state();
                tracing::info!(state = ?self.state, checked = %outcome.checked(), "search finished");
                observer.on_finish(&FinishEvent::from(outcome));
            }
            Err(e) => {
                self.state = SearchState::Failed;
                tracing::error!(error = %e, "search failed");
            }
        }
        result
    }

    /// Outcome once the walk ran out of indices without a match. Only a
    /// walk that stepped past the last block of the space is exhausted.
    fn end_outcome(wrapped: bool, checked: u128) -> SearchOutcome {
        if wrapped {
            SearchOutcome::Exhausted { checked }
        } else {
            SearchOutcome::Stopped {
                checked,
                reason: StopReason::IterationLimit,
            }
        }
    }

    fn run_sequential(
        &self,
        observer: &dyn SearchObserver,
        stop: &StopConditions,
    ) -> Result<SearchOutcome> {
        let start = self.options.start_index;
        let end = self.options.end_index()?;
        let total = self.options.space()?.total();
        let interval = u128::from(self.options.progress_interval);

        let hasher = CandidateHasher::new(&self.base, self.options.algorithm);
        let mut counter = BlockCounter::at(self.options.block_size, start)?;
        let mut digest = DigestBytes::default();
        let mut index = start;

        loop {
            let checked = index - start;
            if checked % STOP_POLL_INTERVAL == 0 {
                if let Some(reason) = stop.poll() {
                    return Ok(SearchOutcome::Stopped { checked, reason });
                }
            }

            hasher.digest_into(counter.as_bytes(), &mut digest);
            if self.target.matches(digest.as_slice()) {
                return Ok(SearchOutcome::Found(Match {
                    index,
                    block: counter.to_block(),
                    digest: digest.to_hex(),
                    checked: checked + 1,
                }));
            }

            if index % interval == 0 {
                observer.on_progress(&ProgressEvent { index, total });
            }

            let wrapped = !counter.advance();
            match index.checked_add(1) {
                Some(next) if !wrapped && end != Some(next) => index = next,
                _ => return Ok(Self::end_outcome(wrapped, checked + 1)),
            }
        }
    }

    fn run_parallel(
        &self,
        observer: &dyn SearchObserver,
        stop: &StopConditions,
    ) -> Result<SearchOutcome> {
        let threads = self.options.threads;
        let chunk_len = u128::from(self.options.chunk_len);
        let start = self.options.start_index;
        // Inclusive; `validate` guarantees end > start
        let last_index = match self.options.end_index()? {
            Some(end) => end - 1,
            None => u128::MAX,
        };
        let wrapped = {
            let mut counter = BlockCounter::at(self.options.block_size, last_index)?;
            !counter.advance()
        };
        let total = self.options.space()?.total();
        let interval = u128::from(self.options.progress_interval);
        let wave_span = chunk_len.saturating_mul(threads as u128);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("hashspoof-worker-{i}"))
            .build()
            .map_err(|e| SpoofError::ThreadPool(e.to_string()))?;

        let hasher = CandidateHasher::new(&self.base, self.options.algorithm);
        let mut wave_start = start;
        let mut next_progress = start.div_ceil(interval).saturating_mul(interval);

        loop {
            if let Some(reason) = stop.poll() {
                return Ok(SearchOutcome::Stopped {
                    checked: wave_start - start,
                    reason,
                });
            }

            let wave_last = wave_start.saturating_add(wave_span - 1).min(last_index);
            let jobs: Vec<ChunkJob> = (0..threads)
                .filter_map(|slot| {
                    let from = wave_start.checked_add(chunk_len * slot as u128)?;
                    if from > wave_last {
                        return None;
                    }
                    let job_last = from.saturating_add(chunk_len - 1).min(wave_last);
                    Some(ChunkJob {
                        slot,
                        from,
                        len: job_last - from + 1,
                    })
                })
                .collect();

            let lowest_hit = AtomicUsize::new(usize::MAX);
            let ctx = ChunkContext {
                hasher: &hasher,
                target: &self.target,
                block_size: self.options.block_size,
                lowest_hit: &lowest_hit,
                stop,
            };
            let scans: Vec<ChunkScan> = pool.install(|| {
                jobs.par_iter()
                    .map(|job| scan_chunk(&ctx, job))
                    .collect::<Result<Vec<_>>>()
            })?;

            // Slots are in index order, so the first decisive chunk wins
            let mut wave_checked = 0u128;
            for scan in scans {
                wave_checked = wave_checked.saturating_add(scan.checked);
                if let Some((index, block, digest)) = scan.hit {
                    return Ok(SearchOutcome::Found(Match {
                        index,
                        block,
                        digest,
                        checked: index - start + 1,
                    }));
                }
                if let Some(reason) = scan.stopped {
                    return Ok(SearchOutcome::Stopped {
                        checked: (wave_start - start).saturating_add(wave_checked),
                        reason,
                    });
                }
            }

            if wave_last >= next_progress {
                let index = wave_last / interval * interval;
                tracing::debug!(index = %index, "parallel wave passed progress mark");
                observer.on_progress(&ProgressEvent { index, total });
                next_progress = (wave_last / interval)
                    .saturating_add(1)
                    .saturating_mul(interval);
            }

            if wave_last == last_index {
                let checked = (wave_last - start).saturating_add(1);
                return Ok(Self::end_outcome(wrapped, checked));
            }
            wave_start = wave_last + 1;
        }
    }
}

struct ChunkJob {
    slot: usize,
    from: u128,
    len: u128,
}

struct ChunkContext<'a> {
    hasher: &'a CandidateHasher,
    target: &'a TargetPrefix,
    block_size: usize,
    lowest_hit: &'a AtomicUsize,
    stop: &'a StopConditions,
}

#[derive(Default)]
struct ChunkScan {
    hit: Option<(u128, Block, String)>,
    stopped: Option<StopReason>,
    checked: u128,
}

fn scan_chunk(ctx: &ChunkContext<'_>, job: &ChunkJob) -> Result<ChunkScan> {
    let mut counter = BlockCounter::at(ctx.block_size, job.from)?;
    let mut digest = DigestBytes::default();

    for offset in 0..job.len {
        if offset % STOP_POLL_INTERVAL == 0 && offset > 0 {
            // A lower slot already holds a better match
            if ctx.lowest_hit.load(Ordering::Acquire) < job.slot {
                return Ok(ChunkScan {
                    checked: offset,
                    ..Default::default()
                });
            }
            if let Some(reason) = ctx.stop.poll() {
                return Ok(ChunkScan {
                    stopped: Some(reason),
                    checked: offset,
                    ..Default::default()
                });
            }
        }

        ctx.hasher.digest_into(counter.as_bytes(), &mut digest);
        if ctx.target.matches(digest.as_slice()) {
            ctx.lowest_hit.fetch_min(job.slot, Ordering::AcqRel);
            return Ok(ChunkScan {
                hit: Some((job.from + offset, counter.to_block(), digest.to_hex())),
                checked: offset + 1,
                ..Default::default()
            });
        }
        counter.advance();
    }

    Ok(ChunkScan {
        checked: job.len,
        ..Default::default()
    })
}

/// Runs a full search over `base` without progress reporting or
/// cancellation.
pub fn search(base: &[u8], target: &TargetPrefix, options: &SearchOptions) -> Result<SearchOutcome> {
    search_with(base, target, options, &NoopObserver, &CancelToken::new())
}

pub fn search_with(
    base: &[u8],
    target: &TargetPrefix,
    options: &SearchOptions,
    observer: &dyn SearchObserver,
    cancel: &CancelToken,
) -> Result<SearchOutcome> {
    let mut controller = SearchController::new(base.to_vec(), target.clone(), options.clone())?;
    controller.run(observer, cancel)
}

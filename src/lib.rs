pub mod block;
pub mod candidate;
pub mod config;
pub mod digest;
mod error;
pub mod io;
pub mod progress;
pub mod report;
pub mod search;

pub use block::{block_at, Block, BlockCounter, BlockEnumerator, SearchSpace};
pub use candidate::{assemble, CandidateBuffer, CandidateHasher};
pub use config::SearchOptions;
pub use digest::{hash_hex, hash_named, HashAlgorithm, TargetPrefix};
pub use error::{Result, SpoofError};
pub use io::{BaseSource, ImageNormalizer, RawSource};
pub use progress::{CancelToken, FinishEvent, LogObserver, NoopObserver, ProgressEvent, SearchObserver};
pub use search::{search, search_with, Match, SearchController, SearchOutcome, SearchState, StopReason};

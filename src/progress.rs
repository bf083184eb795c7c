//! Progress events, observers and cancellation.

use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::search::SearchOutcome;

/// Periodic notification from a running search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProgressEvent {
    /// Enumeration index reached
    pub index: u128,
    /// Size of the index range being searched, when it is countable
    pub total: Option<u128>,
}

impl ProgressEvent {
    pub fn fraction(&self) -> Option<f64> {
        self.total
            .filter(|&total| total > 0)
            .map(|total| self.index as f64 / total as f64)
    }
}

/// Terminal notification, emitted once per search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FinishEvent {
    pub found: bool,
    pub digest: Option<String>,
    pub block: Option<String>,
    pub checked: u128,
}

impl From<&SearchOutcome> for FinishEvent {
    fn from(outcome: &SearchOutcome) -> Self {
        match outcome {
            SearchOutcome::Found(m) => FinishEvent {
                found: true,
                digest: Some(m.digest.clone()),
                block: Some(m.block.to_hex()),
                checked: m.checked,
            },
            SearchOutcome::Exhausted { checked } | SearchOutcome::Stopped { checked, .. } => {
                FinishEvent {
                    found: false,
                    digest: None,
                    block: None,
                    checked: *checked,
                }
            }
        }
    }
}

/// Receives search notifications. Implementations must be cheap; they run
/// on the search thread.
pub trait SearchObserver: Send + Sync {
    fn on_start(&self, _total: Option<u128>) {}

    fn on_progress(&self, _event: &ProgressEvent) {}

    fn on_finish(&self, _event: &FinishEvent) {}
}

pub struct NoopObserver;

impl SearchObserver for NoopObserver {}

/// Forwards notifications to `tracing`.
pub struct LogObserver;

impl SearchObserver for LogObserver {
    fn on_start(&self, total: Option<u128>) {
        match total {
            Some(total) => tracing::info!(total = %total, "search started"),
            None => tracing::info!("search started over an uncountable space"),
        }
    }

    fn on_progress(&self, event: &ProgressEvent) {
        match event.total {
            Some(total) => tracing::info!("Checked {}/{} combinations...", event.index, total),
            None => tracing::info!("Checked {} combinations...", event.index),
        }
    }

    fn on_finish(&self, event: &FinishEvent) {
        if event.found {
            tracing::info!(
                checked = %event.checked,
                block = event.block.as_deref().unwrap_or_default(),
                "match found"
            );
        } else {
            tracing::info!(checked = %event.checked, "no matching digest");
        }
    }
}

/// Shared stop flag, e.g. wired to Ctrl+C.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_token_is_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn test_progress_fraction() {
        let event = ProgressEvent {
            index: 64,
            total: Some(256),
        };
        assert_eq!(event.fraction(), Some(0.25));
        let open = ProgressEvent {
            index: 64,
            total: None,
        };
        assert_eq!(open.fraction(), None);
    }

    #[test]
    fn test_progress_event_json() {
        let event = ProgressEvent {
            index: 3,
            total: Some(256),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"index":3,"total":256}"#);
    }
}

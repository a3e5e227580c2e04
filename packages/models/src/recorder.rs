//! Observability port for non-fatal normalization failures.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Receives non-fatal errors raised while processing a request.
///
/// `kind` names the field that failed (`postal_code`, `city`, `street`);
/// `label` carries the value it failed for.
pub trait ErrorRecorder: Send + Sync {
    /// Records one occurrence of an error.
    fn record_error(&self, kind: &str, label: &str);
}

/// Writes every recorded error to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogErrorRecorder;

impl ErrorRecorder for LogErrorRecorder {
    fn record_error(&self, kind: &str, label: &str) {
        log::warn!("Failed to normalize {kind} ({label:?})");
    }
}

/// Counts recorded errors per `(kind, label)` pair.
#[derive(Debug, Default)]
pub struct CountingErrorRecorder {
    counts: Mutex<BTreeMap<(String, String), u64>>,
}

impl CountingErrorRecorder {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// How often `(kind, label)` was recorded.
    #[must_use]
    pub fn count(&self, kind: &str, label: &str) -> u64 {
        self.counts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(kind.to_string(), label.to_string()))
            .copied()
            .unwrap_or(0)
    }

    /// Total number of recorded errors.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.counts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .sum()
    }

    /// Copy of all counters.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<(String, String), u64> {
        self.counts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ErrorRecorder for CountingErrorRecorder {
    fn record_error(&self, kind: &str, label: &str) {
        log::debug!("Normalization error: {kind} ({label:?})");
        *self
            .counts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry((kind.to_string(), label.to_string()))
            .or_insert(0) += 1;
    }
}

/// Shared recorder that only logs.
#[must_use]
pub fn log_recorder() -> Arc<dyn ErrorRecorder> {
    Arc::new(LogErrorRecorder)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counting_recorder_counts_per_kind_and_label() {
        let recorder = CountingErrorRecorder::new();
        recorder.record_error("city", "");
        recorder.record_error("city", "");
        recorder.record_error("postal_code", "de");

        assert_eq!(recorder.count("city", ""), 2);
        assert_eq!(recorder.count("postal_code", "de"), 1);
        assert_eq!(recorder.count("street", "x"), 0);
        assert_eq!(recorder.total(), 3);
        assert_eq!(recorder.snapshot().len(), 2);
    }
}

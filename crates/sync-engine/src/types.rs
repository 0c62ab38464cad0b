//! Sync pass types and the progress-reporting seam

use serde::{Deserialize, Serialize};

/// How a sync pass treats prior local state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncMode {
    /// Fetch only records changed since the last successful pass
    Incremental,
    /// Fetch everything, but merge with existing rows
    Full,
    /// Clear all local state and insert the fresh result
    Rebuild,
}

/// Outcome of one completed pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub mode: SyncMode,
    /// Rows fetched from the index after directory filtering
    pub fetched: usize,
    /// Tracks removed because the index no longer reports them
    pub deleted: u64,
    /// Tracks written in the main transaction
    pub upserted: usize,
    /// Annotations stored by the optional post-sync scan
    pub annotations_updated: usize,
    pub elapsed: std::time::Duration,
}

/// Coarse pass phases surfaced to progress consumers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    /// External fetch and per-record enrichment
    Fetch,
    /// Post-sync annotation scan
    Annotations,
}

/// Consumer of `(current, total, phase)` progress tuples
pub trait ProgressSink: Send + Sync {
    fn report(&self, current: usize, total: usize, phase: SyncPhase);
}

/// Progress sink that discards everything
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn report(&self, _current: usize, _total: usize, _phase: SyncPhase) {}
}

/// Reporting granularity: a batch of ~50 items or 5% of the total,
/// whichever is coarser
pub fn progress_step(total: usize) -> usize {
    (total / 20).max(50)
}

/// True when `current` is on a reporting boundary
pub fn should_report(current: usize, total: usize) -> bool {
    current == total || current % progress_step(total) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_step_small_totals() {
        assert_eq!(progress_step(0), 50);
        assert_eq!(progress_step(100), 50);
        assert_eq!(progress_step(999), 50);
    }

    #[test]
    fn test_progress_step_large_totals() {
        assert_eq!(progress_step(10_000), 500);
    }

    #[test]
    fn test_should_report_boundaries() {
        assert!(should_report(50, 120));
        assert!(should_report(120, 120));
        assert!(!should_report(51, 120));
    }
}

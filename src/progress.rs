//! Run statistics, rolling-average ETA and progress reporting

use crate::relocate::RelocationOutcome;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Number of recent per-file durations kept for the ETA
pub const ETA_WINDOW: usize = 300;

/// Samples needed before an ETA is reported
pub const ETA_MIN_SAMPLES: usize = 10;

/// A file that could not be dated or moved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureRecord {
    pub path: PathBuf,
    pub reason: String,
}

/// Counters of a single run
#[derive(Debug, Clone, Default)]
pub struct RunStatistics {
    /// Eligible files found by the initial scan
    pub total: usize,
    /// Moved plus skipped as duplicate
    pub processed: usize,
    /// No date plus move errors
    pub failed: usize,
    /// Failures in the order they happened
    pub failures: Vec<FailureRecord>,
    /// Durations of the most recent moves
    pub durations: VecDeque<Duration>,
    /// Estimated time remaining, `None` until enough samples exist
    pub eta: Option<Duration>,
}

impl RunStatistics {
    pub fn remaining(&self) -> usize {
        self.total.saturating_sub(self.processed + self.failed)
    }

    pub fn summary(&self) -> String {
        format!(
            "Total: {}, Processed: {}, Failed: {}",
            self.total, self.processed, self.failed
        )
    }
}

/// Point-in-time view handed to observers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub processed: usize,
    pub total: usize,
    pub failed: usize,
    pub eta: Option<Duration>,
}

impl ProgressSnapshot {
    /// ETA in seconds, -1 when unavailable
    pub fn eta_seconds(&self) -> f64 {
        self.eta.map(|d| d.as_secs_f64()).unwrap_or(-1.0)
    }
}

/// Receives progress and status lines from a run.
///
/// Both methods default to no-ops; an observer never influences the run.
pub trait RunObserver {
    fn on_progress(&self, _snapshot: &ProgressSnapshot) {}
    fn on_log(&self, _line: &str) {}
}

/// Observer that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentObserver;

impl RunObserver for SilentObserver {}

/// Aggregates outcomes into [`RunStatistics`]
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    stats: RunStatistics,
}

impl ProgressTracker {
    /// `total` is fixed for the lifetime of the tracker
    pub fn new(total: usize) -> Self {
        Self {
            stats: RunStatistics {
                total,
                ..Default::default()
            },
        }
    }

    /// Record one outcome.
    ///
    /// `elapsed` is only used for moved files; the ETA is recomputed after
    /// those and left as is otherwise.
    pub fn record(&mut self, path: &Path, outcome: &RelocationOutcome, elapsed: Option<Duration>) {
        match outcome {
            RelocationOutcome::Moved { .. } => {
                self.stats.processed += 1;
                if let Some(elapsed) = elapsed {
                    if self.stats.durations.len() == ETA_WINDOW {
                        self.stats.durations.pop_front();
                    }
                    self.stats.durations.push_back(elapsed);
                }
                self.update_eta();
            }
            RelocationOutcome::SkippedDuplicate { .. } => {
                self.stats.processed += 1;
            }
            RelocationOutcome::FailedNoDate { reason }
            | RelocationOutcome::FailedMoveError { reason } => {
                self.stats.failed += 1;
                self.stats.failures.push(FailureRecord {
                    path: path.to_path_buf(),
                    reason: reason.clone(),
                });
            }
        }
        debug_assert!(self.stats.processed + self.stats.failed <= self.stats.total);
    }

    fn update_eta(&mut self) {
        let samples = self.stats.durations.len();
        if samples < ETA_MIN_SAMPLES {
            return;
        }
        let mean = self.stats.durations.iter().sum::<Duration>() / samples as u32;
        self.stats.eta = Some(mean * self.stats.remaining() as u32);
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            processed: self.stats.processed,
            total: self.stats.total,
            failed: self.stats.failed,
            eta: self.stats.eta,
        }
    }

    pub fn statistics(&self) -> &RunStatistics {
        &self.stats
    }

    pub fn into_statistics(self) -> RunStatistics {
        self.stats
    }
}

/// Human-readable duration: ms, seconds, minutes or hours
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs_f64();
    if secs < 1.0 {
        format!("{:.2} ms", secs * 1000.0)
    } else if secs < 60.0 {
        format!("{:.2} seconds", secs)
    } else if secs < 3600.0 {
        format!("{:.2} minutes", secs / 60.0)
    } else {
        format!("{:.2} hours", secs / 3600.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn moved() -> RelocationOutcome {
        RelocationOutcome::Moved {
            destination: PathBuf::from("/out/2022/01/a.jpg"),
        }
    }

    fn skipped() -> RelocationOutcome {
        RelocationOutcome::SkippedDuplicate {
            existing: PathBuf::from("/out/2022/01/a.jpg"),
        }
    }

    fn no_date() -> RelocationOutcome {
        RelocationOutcome::FailedNoDate {
            reason: "No date found".into(),
        }
    }

    #[test]
    fn test_counts() {
        let mut tracker = ProgressTracker::new(5);
        tracker.record(Path::new("a.jpg"), &moved(), Some(Duration::from_millis(5)));
        tracker.record(Path::new("b.jpg"), &skipped(), None);
        tracker.record(Path::new("c.mp4"), &no_date(), None);
        tracker.record(
            Path::new("d.jpg"),
            &RelocationOutcome::FailedMoveError {
                reason: "Permission denied".into(),
            },
            None,
        );

        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.processed, 2);
        assert_eq!(snapshot.failed, 2);
        assert_eq!(snapshot.total, 5);
        assert_eq!(snapshot.eta, None);
        assert_eq!(snapshot.eta_seconds(), -1.0);

        let stats = tracker.statistics();
        assert_eq!(stats.remaining(), 1);
        assert_eq!(stats.failures.len(), 2);
        assert_eq!(stats.failures[0].path, PathBuf::from("c.mp4"));
        assert_eq!(stats.failures[1].reason, "Permission denied");
        assert!(stats.summary().contains("Processed: 2"));
    }

    #[test]
    fn test_eta_needs_ten_samples() {
        let mut tracker = ProgressTracker::new(20);
        for _ in 0..9 {
            tracker.record(Path::new("a.jpg"), &moved(), Some(Duration::from_secs(1)));
        }
        assert_eq!(tracker.snapshot().eta, None);

        tracker.record(Path::new("a.jpg"), &moved(), Some(Duration::from_secs(1)));
        assert_eq!(tracker.snapshot().eta, Some(Duration::from_secs(10)));
    }

    #[test]
    fn test_eta_with_two_files_left() {
        let mut tracker = ProgressTracker::new(12);
        for _ in 0..10 {
            tracker.record(Path::new("a.jpg"), &moved(), Some(Duration::from_secs(1)));
        }
        let eta = tracker.snapshot().eta.unwrap();
        assert!((eta.as_secs_f64() - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_eta_is_stale_after_skip_and_failure() {
        let mut tracker = ProgressTracker::new(14);
        for _ in 0..10 {
            tracker.record(Path::new("a.jpg"), &moved(), Some(Duration::from_secs(1)));
        }
        assert_eq!(tracker.snapshot().eta, Some(Duration::from_secs(4)));

        tracker.record(Path::new("b.jpg"), &skipped(), None);
        tracker.record(Path::new("c.mp4"), &no_date(), None);
        assert_eq!(tracker.snapshot().eta, Some(Duration::from_secs(4)));

        tracker.record(Path::new("d.jpg"), &moved(), Some(Duration::from_secs(1)));
        assert_eq!(tracker.snapshot().eta, Some(Duration::from_secs(1)));
    }

    #[test]
    fn test_window_is_bounded() {
        let mut tracker = ProgressTracker::new(1000);
        for _ in 0..ETA_WINDOW {
            tracker.record(Path::new("a.jpg"), &moved(), Some(Duration::from_secs(10)));
        }
        for _ in 0..ETA_WINDOW {
            tracker.record(Path::new("a.jpg"), &moved(), Some(Duration::from_secs(1)));
        }
        let stats = tracker.statistics();
        assert_eq!(stats.durations.len(), ETA_WINDOW);
        // Only the 1s samples remain: 400 files left at 1s each
        assert_eq!(stats.eta, Some(Duration::from_secs(400)));
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(250)), "250.00 ms");
        assert_eq!(format_duration(Duration::from_secs(5)), "5.00 seconds");
        assert_eq!(format_duration(Duration::from_secs(90)), "1.50 minutes");
        assert_eq!(format_duration(Duration::from_secs(5400)), "1.50 hours");
    }
}

//! Progress reporting for long-running stages.
//!
//! Counters are atomics so any worker may record into them. A progress line
//! is logged every `interval` units and once more on the final unit.

use crate::types::{Stage, StageSummary};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Point-in-time view of a stage's progress.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressSnapshot {
    pub processed: usize,
    pub total: usize,
    pub found: usize,
    pub elapsed: Duration,
    /// Units per second; 0 when nothing has been measured yet
    pub rate: f64,
    /// Estimated time remaining; `None` while the rate is unknown
    pub eta: Option<Duration>,
}

/// Compute rate and ETA for a progress line.
///
/// Zero elapsed time or zero processed units give a rate of 0 and no ETA.
pub fn report(processed: usize, total: usize, found: usize, elapsed: Duration) -> ProgressSnapshot {
    let secs = elapsed.as_secs_f64();
    let rate = if secs > 0.0 {
        processed as f64 / secs
    } else {
        0.0
    };

    let eta = if rate > 0.0 {
        let remaining = total.saturating_sub(processed) as f64;
        Some(Duration::from_secs_f64(remaining / rate))
    } else {
        None
    };

    ProgressSnapshot {
        processed,
        total,
        found,
        elapsed,
        rate,
        eta,
    }
}

impl fmt::Display for ProgressSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Processed {}/{} | Found {} | {:.1}/s | ETA ",
            self.processed, self.total, self.found, self.rate
        )?;
        match self.eta {
            Some(eta) => write!(f, "{}s", eta.as_secs()),
            None => write!(f, "unknown"),
        }
    }
}

/// Shared progress counters for one stage.
#[derive(Debug)]
pub struct ProgressReporter {
    stage: Stage,
    total: usize,
    interval: usize,
    processed: AtomicUsize,
    found: AtomicUsize,
    errors: AtomicUsize,
    started: Instant,
}

impl ProgressReporter {
    /// Start reporting for `total` units of `stage`.
    pub fn new(stage: Stage, total: usize, interval: usize) -> Self {
        Self {
            stage,
            total,
            interval: interval.max(1),
            processed: AtomicUsize::new(0),
            found: AtomicUsize::new(0),
            errors: AtomicUsize::new(0),
            started: Instant::now(),
        }
    }

    /// Record one completed unit; logs a progress line when due.
    pub fn record(&self, found: bool) {
        if found {
            self.found.fetch_add(1, Ordering::SeqCst);
        }
        let processed = self.processed.fetch_add(1, Ordering::SeqCst) + 1;

        if processed % self.interval == 0 || processed == self.total {
            let snapshot = self.snapshot();
            tracing::info!(stage = %self.stage, "{}", snapshot);
        }
    }

    /// Record that a unit fell back to the conservative outcome.
    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::SeqCst);
    }

    /// Current counters.
    pub fn snapshot(&self) -> ProgressSnapshot {
        report(
            self.processed.load(Ordering::SeqCst),
            self.total,
            self.found.load(Ordering::SeqCst),
            self.started.elapsed(),
        )
    }

    /// Final counters for the stage summary.
    pub fn summary(&self, aborted: bool) -> StageSummary {
        StageSummary {
            total: self.total,
            processed: self.processed.load(Ordering::SeqCst),
            found: self.found.load(Ordering::SeqCst),
            errors: self.errors.load(Ordering::SeqCst),
            elapsed: self.started.elapsed(),
            aborted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_rate_and_eta() {
        let snap = report(100, 300, 7, Duration::from_secs(10));
        assert_eq!(snap.rate, 10.0);
        assert_eq!(snap.eta, Some(Duration::from_secs(20)));
        assert_eq!(snap.to_string(), "Processed 100/300 | Found 7 | 10.0/s | ETA 20s");
    }

    #[test]
    fn test_report_guards_division_by_zero() {
        let snap = report(0, 50, 0, Duration::ZERO);
        assert_eq!(snap.rate, 0.0);
        assert_eq!(snap.eta, None);
        assert!(snap.to_string().ends_with("ETA unknown"));

        let no_progress = report(0, 50, 0, Duration::from_secs(3));
        assert_eq!(no_progress.eta, None);
    }

    #[test]
    fn test_report_at_completion() {
        let snap = report(40, 40, 2, Duration::from_secs(4));
        assert_eq!(snap.eta, Some(Duration::ZERO));
    }

    #[test]
    fn test_reporter_counts() {
        let reporter = ProgressReporter::new(Stage::Prescreen, 5, 2);
        let mut last = 0;
        for i in 0..5 {
            reporter.record(i % 2 == 0);
            let now = reporter.snapshot().processed;
            assert!(now >= last);
            last = now;
        }
        reporter.record_error();

        let summary = reporter.summary(false);
        assert_eq!(summary.total, 5);
        assert_eq!(summary.processed, 5);
        assert_eq!(summary.found, 3);
        assert_eq!(summary.errors, 1);
        assert!(!summary.aborted);
    }
}

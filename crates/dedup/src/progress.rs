//! Progress side channel for the aggregator and the remediation pipeline.
//!
//! Progress is advisory: observers see percent complete and an ETA
//! extrapolated from elapsed time, but nothing they do feeds back into
//! the run.

use std::time::{Duration, Instant};

use log::info;
use parking_lot::Mutex;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Aggregating,
    Remediating,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Aggregating => write!(f, "aggregating"),
            Self::Remediating => write!(f, "remediating"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressUpdate {
    pub phase: Phase,
    /// Dataset that just finished.
    pub label: String,
    pub completed: usize,
    pub total: usize,
    pub percent: f64,
    pub eta: Duration,
    pub finished: bool,
}

pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, update: &ProgressUpdate);
}

/// Discards every update.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;

impl ProgressObserver for NoopProgress {
    fn on_progress(&self, _update: &ProgressUpdate) {}
}

/// Writes each update to the `log` facade at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

impl ProgressObserver for LogProgress {
    fn on_progress(&self, u: &ProgressUpdate) {
        if u.finished {
            info!("{}: {} ({}/{}) complete", u.phase, u.label, u.completed, u.total);
        } else {
            info!(
                "{}: {} ({}/{}, {:.1}%), ETA {:.1}s",
                u.phase,
                u.label,
                u.completed,
                u.total,
                u.percent,
                u.eta.as_secs_f64()
            );
        }
    }
}

/// Adapts a closure into an observer.
pub struct ClosureProgress<F>(pub F);

impl<F> ProgressObserver for ClosureProgress<F>
where
    F: Fn(&ProgressUpdate) + Send + Sync,
{
    fn on_progress(&self, update: &ProgressUpdate) {
        (self.0)(update)
    }
}

/// Run-wide completion counter. `advance` increments and notifies under one
/// lock, so observers see strictly increasing `completed` even when datasets
/// finish on several worker threads.
pub struct ProgressTracker {
    phase: Phase,
    total: usize,
    started: Instant,
    completed: Mutex<usize>,
}

impl ProgressTracker {
    pub fn new(phase: Phase, total: usize) -> Self {
        Self {
            phase,
            total,
            started: Instant::now(),
            completed: Mutex::new(0),
        }
    }

    pub fn completed(&self) -> usize {
        *self.completed.lock()
    }

    pub fn advance(&self, label: &str, observer: &dyn ProgressObserver) -> ProgressUpdate {
        let mut completed = self.completed.lock();
        *completed += 1;
        let update = self.snapshot(label, *completed, self.started.elapsed());
        observer.on_progress(&update);
        update
    }

    /// Build an update for `completed` datasets after `elapsed`.
    ///
    /// ETA is `elapsed / completed * remaining`; nothing completed yet, or
    /// nothing remaining, yields a zero ETA.
    pub fn snapshot(&self, label: &str, completed: usize, elapsed: Duration) -> ProgressUpdate {
        let remaining = self.total.saturating_sub(completed);
        let eta = if completed == 0 || remaining == 0 {
            Duration::ZERO
        } else {
            elapsed
                .div_f64(completed as f64)
                .mul_f64(remaining as f64)
        };
        let percent = if self.total == 0 {
            100.0
        } else {
            completed as f64 / self.total as f64 * 100.0
        };

        ProgressUpdate {
            phase: self.phase,
            label: label.to_string(),
            completed,
            total: self.total,
            percent,
            eta,
            finished: remaining == 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn eta_extrapolates_elapsed_per_dataset() {
        let tracker = ProgressTracker::new(Phase::Aggregating, 4);
        let u = tracker.snapshot("M5", 1, Duration::from_secs(2));
        assert_eq!(u.eta, Duration::from_secs(6));
        assert_eq!(u.percent, 25.0);
        assert!(!u.finished);
    }

    #[test]
    fn zero_completed_does_not_divide() {
        let tracker = ProgressTracker::new(Phase::Aggregating, 3);
        let u = tracker.snapshot("", 0, Duration::from_secs(5));
        assert_eq!(u.eta, Duration::ZERO);
        assert_eq!(u.percent, 0.0);
    }

    #[test]
    fn last_dataset_is_finished() {
        let tracker = ProgressTracker::new(Phase::Remediating, 2);
        let u = tracker.snapshot("H1", 2, Duration::from_secs(9));
        assert!(u.finished);
        assert_eq!(u.eta, Duration::ZERO);
        assert_eq!(u.percent, 100.0);
    }

    #[test]
    fn empty_total_reports_complete() {
        let tracker = ProgressTracker::new(Phase::Aggregating, 0);
        let u = tracker.snapshot("", 0, Duration::ZERO);
        assert!(u.finished);
        assert_eq!(u.percent, 100.0);
    }

    #[test]
    fn advance_is_monotonic_across_threads() {
        let tracker = Arc::new(ProgressTracker::new(Phase::Remediating, 64));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let observer = {
            let seen = Arc::clone(&seen);
            Arc::new(ClosureProgress(move |u: &ProgressUpdate| seen.lock().push(u.completed)))
        };

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let tracker = Arc::clone(&tracker);
                let observer = Arc::clone(&observer);
                std::thread::spawn(move || {
                    for _ in 0..8 {
                        tracker.advance("x", observer.as_ref());
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let seen = seen.lock();
        assert_eq!(seen.len(), 64);
        assert!(seen.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(tracker.completed(), 64);
    }
}

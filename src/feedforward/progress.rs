use log::{debug, info};
use std::time::Duration;

/// What the training loop reports after every epoch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochReport {
    /// Zero-based epoch index.
    pub epoch: usize,
    /// Share of the epoch budget done so far, `(epoch + 1) / epochs_count`.
    pub fraction: f64,
    /// Mean squared error of the epoch.
    pub error: f64,
    /// Time since the training run started.
    pub elapsed: Duration,
}

pub trait ProgressObserver {
    fn on_epoch(&mut self, report: &EpochReport);
}

/// Ignores every report.
impl ProgressObserver for () {
    fn on_epoch(&mut self, _report: &EpochReport) {}
}

impl<F: FnMut(&EpochReport)> ProgressObserver for F {
    fn on_epoch(&mut self, report: &EpochReport) {
        self(report)
    }
}

/// Writes reports through `log`, at info level every `every` epochs and at debug level otherwise.
#[derive(Debug, Clone, Copy)]
pub struct LogProgress {
    every: usize,
}

impl LogProgress {
    pub fn new(every: usize) -> Self {
        Self {
            every: every.max(1),
        }
    }
}

impl Default for LogProgress {
    fn default() -> Self {
        Self::new(1)
    }
}

impl ProgressObserver for LogProgress {
    fn on_epoch(&mut self, report: &EpochReport) {
        let EpochReport {
            epoch,
            fraction,
            error,
            elapsed,
        } = *report;

        if (epoch + 1) % self.every == 0 {
            info!(
                "epoch {} ({:.1}%): error={:.6} elapsed={:.2?}",
                epoch,
                fraction * 100.0,
                error,
                elapsed
            );
        } else {
            debug!("epoch {}: error={:.6}", epoch, error);
        }
    }
}

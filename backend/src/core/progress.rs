//! Progress reporting for the event loop
//!
//! The printer counts processed events and logs a progress line at a
//! decade cadence: every event up to 10, every 10 up to 100, every 100 up
//! to 1000, and so on, capped at `max_interval`. It is write-only: nothing
//! in the selector reads its state back to make a decision.

use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Progress printer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressConfig {
    /// Emit progress lines at all
    pub enabled: bool,
    /// Largest gap between two progress lines
    pub max_interval: u64,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_interval: 100_000,
        }
    }
}

/// Periodic progress feedback
///
/// # Example
/// ```
/// use hlfv_selector_core::core::progress::{ProgressConfig, ProgressPrinter};
///
/// let mut printer = ProgressPrinter::new(ProgressConfig::default());
/// printer.reset();
///
/// let emitted = (0..25).filter(|_| printer.advance()).count();
/// assert_eq!(printer.processed(), 25);
/// assert_eq!(emitted, 11); // 1..=10, then 20
/// ```
#[derive(Debug, Clone)]
pub struct ProgressPrinter {
    config: ProgressConfig,
    processed: u64,
    interval: u64,
    next_report: u64,
    started: Option<Instant>,
}

impl ProgressPrinter {
    /// Create a printer; call `reset` before the loop starts
    pub fn new(config: ProgressConfig) -> Self {
        let mut printer = Self {
            config,
            processed: 0,
            interval: 1,
            next_report: 1,
            started: None,
        };
        printer.reset();
        printer
    }

    /// Zero the counters and restart the clock
    pub fn reset(&mut self) {
        self.processed = 0;
        self.interval = 1;
        self.next_report = 1;
        self.started = Some(Instant::now());
    }

    /// Count one processed event
    ///
    /// Returns true if a progress line was due at this event.
    pub fn advance(&mut self) -> bool {
        self.processed += 1;
        if self.processed < self.next_report {
            return false;
        }

        if self.processed >= self.interval.saturating_mul(10) {
            self.interval = self.interval.saturating_mul(10).min(self.config.max_interval.max(1));
        }
        self.next_report = self.processed + self.interval;

        if self.config.enabled {
            let elapsed = self.elapsed_secs();
            tracing::info!(
                processed = self.processed,
                elapsed_s = elapsed,
                rate_hz = self.rate(elapsed),
                "processing"
            );
        }
        true
    }

    /// Log the closing line
    pub fn finish(&self) {
        if self.config.enabled {
            let elapsed = self.elapsed_secs();
            tracing::info!(
                processed = self.processed,
                elapsed_s = elapsed,
                rate_hz = self.rate(elapsed),
                "event loop done"
            );
        }
    }

    /// Events counted since the last reset
    pub fn processed(&self) -> u64 {
        self.processed
    }

    fn elapsed_secs(&self) -> f64 {
        self.started
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    fn rate(&self, elapsed: f64) -> f64 {
        if elapsed > 0.0 {
            self.processed as f64 / elapsed
        } else {
            0.0
        }
    }
}

impl Default for ProgressPrinter {
    fn default() -> Self {
        Self::new(ProgressConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report_points(printer: &mut ProgressPrinter, n: u64) -> Vec<u64> {
        (1..=n).filter(|_| printer.advance()).collect()
    }

    #[test]
    fn test_decade_cadence() {
        let mut printer = ProgressPrinter::default();
        let points = report_points(&mut printer, 300);
        let expected: Vec<u64> = (1..=10)
            .chain((20..=100).step_by(10))
            .chain([200, 300])
            .collect();
        assert_eq!(points, expected);
    }

    #[test]
    fn test_interval_capped() {
        let mut printer = ProgressPrinter::new(ProgressConfig {
            enabled: false,
            max_interval: 10,
        });
        let points = report_points(&mut printer, 150);
        assert!(points.ends_with(&[100, 110, 120, 130, 140, 150]));
    }

    #[test]
    fn test_reset_restarts_cadence() {
        let mut printer = ProgressPrinter::default();
        report_points(&mut printer, 50);
        printer.reset();
        assert_eq!(printer.processed(), 0);
        assert!(printer.advance());
    }
}

//! Detects motor controllers with a climbing communication-error counter.
//!
//! The controller exposes a cumulative error count. The check keeps a short
//! history of `(timestamp, count)` samples covering the sliding window and
//! faults when the count grew by more than the allowed amount inside it.
//!
//! A window can span more ticks than the history holds. When the history
//! fills up, every other sample is dropped while the oldest one stays as the
//! baseline, so the history keeps covering the whole window at a coarser
//! resolution.

use core::time::Duration;

use heapless::Deque;

use super::{CheckId, DiagnosticCheck, Sample, TestResult, Timestamp};
use crate::subsystem::Subsystem;

/// Samples retained per check before the history is thinned.
pub const ERROR_HISTORY_DEPTH: usize = 64;

/// Thresholds for [`ErrorRateCheck`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ErrorRateConfig {
    /// Length of the sliding window.
    pub window: Duration,
    /// Largest counter increase tolerated inside one window.
    pub max_errors: u32,
}

impl ErrorRateConfig {
    pub const DEFAULT: Self = Self::new(Duration::from_secs(1), 10);

    #[must_use]
    pub const fn new(window: Duration, max_errors: u32) -> Self {
        Self { window, max_errors }
    }
}

impl Default for ErrorRateConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Fault when the error counter rises faster than the configured rate.
pub struct ErrorRateCheck<S> {
    id: CheckId,
    source: S,
    config: ErrorRateConfig,
    history: Deque<(Timestamp, u32), ERROR_HISTORY_DEPTH>,
}

impl<S> ErrorRateCheck<S>
where
    S: Sample<u32>,
{
    pub fn new(
        name: &'static str,
        subsystem: Subsystem,
        source: S,
        config: ErrorRateConfig,
    ) -> Self {
        Self {
            id: CheckId::new(name, subsystem),
            source,
            config,
            history: Deque::new(),
        }
    }

    fn record(&mut self, now: Timestamp, count: u32) -> u32 {
        if let Some(&(_, last)) = self.history.back()
            && count < last
        {
            // Counter was reset by the controller.
            self.history.clear();
        }

        while let Some(&(at, _)) = self.history.front() {
            if now.saturating_sub(at) > self.config.window {
                self.history.pop_front();
            } else {
                break;
            }
        }

        if self.history.is_full() {
            self.thin();
        }
        let _ = self.history.push_back((now, count));

        self.history
            .front()
            .map_or(0, |&(_, oldest)| count.saturating_sub(oldest))
    }

    /// Drops every other sample, keeping the oldest.
    fn thin(&mut self) {
        let mut kept = Deque::new();
        for (index, sample) in self.history.iter().enumerate() {
            if index % 2 == 0 {
                let _ = kept.push_back(*sample);
            }
        }
        self.history = kept;
    }
}

impl<S> DiagnosticCheck for ErrorRateCheck<S>
where
    S: Sample<u32>,
{
    fn name(&self) -> &'static str {
        self.id.name
    }

    fn subsystem(&self) -> Subsystem {
        self.id.subsystem
    }

    fn evaluate(&mut self, now: Timestamp) -> TestResult {
        let count = match self.source.sample() {
            Ok(count) => count,
            Err(fault) => {
                self.history.clear();
                return TestResult::from_sensor_fault(self.id.name, fault);
            }
        };

        let increase = self.record(now, count);
        if increase > self.config.max_errors {
            TestResult::fault(format_args!(
                "{}: {increase} errors within {}ms",
                self.id.name,
                self.config.window.as_millis()
            ))
        } else {
            TestResult::pass()
        }
    }
}

#[cfg(test)]
mod tests {
    use core::cell::Cell;

    use super::*;
    use crate::checks::SensorFault;

    fn millis(value: u64) -> Timestamp {
        Duration::from_millis(value)
    }

    #[test]
    fn burst_inside_window_faults() {
        let errors = Cell::new(100_u32);
        let source = || -> Result<u32, SensorFault> { Ok(errors.get()) };
        let config = ErrorRateConfig::new(Duration::from_millis(100), 5);
        let mut check = ErrorRateCheck::new(
            "lf motor errors",
            Subsystem::Drivebase,
            source,
            config,
        );

        assert!(!check.evaluate(millis(0)).fault_detected());
        errors.set(104);
        assert!(!check.evaluate(millis(40)).fault_detected());
        errors.set(106);
        let result = check.evaluate(millis(80));
        assert!(result.fault_detected());
        assert_eq!(result.message(), "lf motor errors: 6 errors within 100ms");
    }

    #[test]
    fn slow_growth_ages_out_of_window() {
        let errors = Cell::new(0_u32);
        let source = || -> Result<u32, SensorFault> { Ok(errors.get()) };
        let config = ErrorRateConfig::new(Duration::from_millis(100), 5);
        let mut check = ErrorRateCheck::new(
            "rr motor errors",
            Subsystem::Drivebase,
            source,
            config,
        );

        for step in 0..20_u32 {
            errors.set(step * 3);
            let result = check.evaluate(millis(u64::from(step) * 60));
            assert!(!result.fault_detected(), "step {step} should be within rate");
        }
    }

    #[test]
    fn counter_reset_restarts_window() {
        let errors = Cell::new(500_u32);
        let source = || -> Result<u32, SensorFault> { Ok(errors.get()) };
        let config = ErrorRateConfig::new(Duration::from_millis(100), 5);
        let mut check = ErrorRateCheck::new(
            "elevator motor errors",
            Subsystem::Elevator,
            source,
            config,
        );

        assert!(!check.evaluate(millis(0)).fault_detected());
        errors.set(2);
        assert!(!check.evaluate(millis(10)).fault_detected());
        errors.set(4);
        assert!(!check.evaluate(millis(20)).fault_detected());
    }

    #[test]
    fn window_longer_than_history_still_counts_from_its_start() {
        const TICK_MS: u64 = 20;
        let errors = Cell::new(0_u32);
        let source = || -> Result<u32, SensorFault> { Ok(errors.get()) };
        let config = ErrorRateConfig::new(Duration::from_secs(2), 60);
        let mut check = ErrorRateCheck::new(
            "lr motor errors",
            Subsystem::Drivebase,
            source,
            config,
        );

        // One error per 20ms tick; the 2s window spans 100 ticks.
        for tick in 0..=60_u32 {
            errors.set(tick);
            let result = check.evaluate(millis(u64::from(tick) * TICK_MS));
            assert!(!result.fault_detected(), "tick {tick}: {}", result.message());
        }
        for tick in 61..=400_u32 {
            errors.set(tick);
            let result = check.evaluate(millis(u64::from(tick) * TICK_MS));
            assert!(result.fault_detected(), "tick {tick} should fault");
        }
    }

    #[test]
    fn thinned_history_recovers_once_errors_stop() {
        let errors = Cell::new(0_u32);
        let source = || -> Result<u32, SensorFault> { Ok(errors.get()) };
        let config = ErrorRateConfig::new(Duration::from_secs(2), 60);
        let mut check = ErrorRateCheck::new(
            "rf motor errors",
            Subsystem::Drivebase,
            source,
            config,
        );

        for tick in 0..200_u32 {
            errors.set(tick);
            let _ = check.evaluate(millis(u64::from(tick) * 20));
        }
        // Counter holds still for longer than one window.
        let mut last = check.evaluate(millis(200 * 20));
        for tick in 201..=320_u32 {
            last = check.evaluate(millis(u64::from(tick) * 20));
        }
        assert!(!last.fault_detected(), "{}", last.message());
        assert!(check.history.len() <= ERROR_HISTORY_DEPTH);
    }
}

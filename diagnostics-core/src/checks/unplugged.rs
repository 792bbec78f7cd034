//! Detects distance/magnitude sensors that have been unplugged.
//!
//! A disconnected ultrasonic or analog sensor typically reads back a fixed
//! sentinel value. A reading pinned near that sentinel for longer than the
//! grace window, or any reading outside the physically plausible range, is
//! reported as a fault.

use core::time::Duration;

use super::{
    CheckId, ConditionTimer, DiagnosticCheck, Sample, TestResult, Timestamp, sample_finite,
};
use crate::subsystem::Subsystem;

/// Thresholds for [`UnpluggedSensorCheck`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct UnpluggedSensorConfig {
    /// Value the sensor reports while disconnected.
    pub disconnected_value: f32,
    /// Readings within this distance of the sentinel count as pinned.
    pub tolerance: f32,
    /// How long a pinned reading is tolerated before faulting.
    pub grace: Duration,
    /// Smallest physically plausible reading.
    pub min_valid: f32,
    /// Largest physically plausible reading.
    pub max_valid: f32,
}

impl UnpluggedSensorConfig {
    /// Defaults for the sonar rangefinders (inches).
    pub const DEFAULT: Self = Self::new(0.0, 0.01, Duration::from_millis(500), 0.0, 255.0);

    #[must_use]
    pub const fn new(
        disconnected_value: f32,
        tolerance: f32,
        grace: Duration,
        min_valid: f32,
        max_valid: f32,
    ) -> Self {
        Self {
            disconnected_value,
            tolerance,
            grace,
            min_valid,
            max_valid,
        }
    }

    fn is_pinned(&self, value: f32) -> bool {
        (value - self.disconnected_value).abs() <= self.tolerance
    }

    fn is_plausible(&self, value: f32) -> bool {
        (self.min_valid..=self.max_valid).contains(&value)
    }
}

impl Default for UnpluggedSensorConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Fault when a sensor sits at its disconnected sentinel or reads implausibly.
pub struct UnpluggedSensorCheck<S> {
    id: CheckId,
    source: S,
    config: UnpluggedSensorConfig,
    pinned: ConditionTimer,
}

impl<S> UnpluggedSensorCheck<S>
where
    S: Sample<f32>,
{
    pub fn new(
        name: &'static str,
        subsystem: Subsystem,
        source: S,
        config: UnpluggedSensorConfig,
    ) -> Self {
        Self {
            id: CheckId::new(name, subsystem),
            source,
            config,
            pinned: ConditionTimer::new(),
        }
    }
}

impl<S> DiagnosticCheck for UnpluggedSensorCheck<S>
where
    S: Sample<f32>,
{
    fn name(&self) -> &'static str {
        self.id.name
    }

    fn subsystem(&self) -> Subsystem {
        self.id.subsystem
    }

    fn evaluate(&mut self, now: Timestamp) -> TestResult {
        let value = match sample_finite(&self.source) {
            Ok(value) => value,
            Err(fault) => {
                self.pinned.reset();
                return TestResult::from_sensor_fault(self.id.name, fault);
            }
        };

        if !self.config.is_plausible(value) {
            self.pinned.reset();
            return TestResult::fault(format_args!(
                "{}: reading {value:.2} outside {:.2}..{:.2}",
                self.id.name, self.config.min_valid, self.config.max_valid
            ));
        }

        match self.pinned.update(self.config.is_pinned(value), now) {
            Some(held) if held > self.config.grace => TestResult::fault(format_args!(
                "{}: pinned at {value:.2} for {}ms, sensor unplugged",
                self.id.name,
                held.as_millis()
            )),
            _ => TestResult::pass(),
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
    fn pinned_reading_faults_only_after_grace() {
        let reading = Cell::new(0.0_f32);
        let source = || -> Result<f32, SensorFault> { Ok(reading.get()) };
        let mut check = UnpluggedSensorCheck::new(
            "left sonar",
            Subsystem::Sensors,
            source,
            UnpluggedSensorConfig::DEFAULT,
        );

        assert!(!check.evaluate(millis(0)).fault_detected());
        assert!(!check.evaluate(millis(500)).fault_detected());
        let result = check.evaluate(millis(520));
        assert!(result.fault_detected());
        assert!(result.message().starts_with("left sonar: pinned"));

        reading.set(42.0);
        assert!(!check.evaluate(millis(540)).fault_detected());
    }

    #[test]
    fn implausible_reading_faults_immediately() {
        let source = || -> Result<f32, SensorFault> { Ok(900.0) };
        let mut check = UnpluggedSensorCheck::new(
            "right sonar",
            Subsystem::Sensors,
            source,
            UnpluggedSensorConfig::DEFAULT,
        );

        let result = check.evaluate(millis(0));
        assert!(result.fault_detected());
        assert!(result.message().contains("outside"));
    }

    #[test]
    fn read_error_is_a_fault() {
        let source = || -> Result<f32, SensorFault> { Err(SensorFault::Unavailable) };
        let mut check = UnpluggedSensorCheck::new(
            "left sonar",
            Subsystem::Sensors,
            source,
            UnpluggedSensorConfig::DEFAULT,
        );

        let result = check.evaluate(millis(0));
        assert!(result.fault_detected());
        assert_eq!(result.message(), "left sonar: sensor unavailable");
    }

    #[test]
    fn non_finite_reading_is_a_fault_and_restarts_grace() {
        let reading = Cell::new(0.0_f32);
        let source = || -> Result<f32, SensorFault> { Ok(reading.get()) };
        let mut check = UnpluggedSensorCheck::new(
            "left sonar",
            Subsystem::Sensors,
            source,
            UnpluggedSensorConfig::DEFAULT,
        );

        assert!(!check.evaluate(millis(0)).fault_detected());
        reading.set(f32::NAN);
        let result = check.evaluate(millis(400));
        assert!(result.fault_detected());
        assert_eq!(result.message(), "left sonar: sensor invalid data");

        reading.set(f32::INFINITY);
        assert!(check.evaluate(millis(420)).fault_detected());

        reading.set(0.0);
        assert!(!check.evaluate(millis(450)).fault_detected());
        assert!(!check.evaluate(millis(900)).fault_detected());
    }
}

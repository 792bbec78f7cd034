//! Detects motors drawing abnormal current.
//!
//! Two failure shapes are covered: sustained over-current (stall, binding) and
//! near-zero current while the motor is being driven (open lead, tripped
//! breaker). Both must persist past the debounce window before a fault is
//! reported so inrush spikes do not trip the check.

use core::time::Duration;

use super::{
    CheckId, ConditionTimer, DiagnosticCheck, Sample, SensorFault, TestResult, Timestamp,
    sample_finite,
};
use crate::subsystem::Subsystem;

/// Thresholds for [`CurrentDrawCheck`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CurrentDrawConfig {
    /// Current above this is over-current (amps).
    pub max_amps: f32,
    /// Current below this while commanded is an open circuit (amps).
    pub min_amps: f32,
    /// Commanded output magnitude below this counts as idle.
    pub command_deadband: f32,
    /// How long the condition must persist before faulting.
    pub debounce: Duration,
}

impl CurrentDrawConfig {
    /// Defaults for the grabber motors.
    pub const DEFAULT: Self = Self::new(40.0, 0.5, 0.1, Duration::from_millis(500));

    #[must_use]
    pub const fn new(
        max_amps: f32,
        min_amps: f32,
        command_deadband: f32,
        debounce: Duration,
    ) -> Self {
        Self {
            max_amps,
            min_amps,
            command_deadband,
            debounce,
        }
    }
}

impl Default for CurrentDrawConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Band {
    Normal,
    Over,
    Under,
}

/// Fault when current stays outside the expected band past the debounce window.
pub struct CurrentDrawCheck<I, C> {
    id: CheckId,
    current: I,
    command: C,
    config: CurrentDrawConfig,
    out_of_band: ConditionTimer,
}

impl<I, C> CurrentDrawCheck<I, C>
where
    I: Sample<f32>,
    C: Sample<f32>,
{
    pub fn new(
        name: &'static str,
        subsystem: Subsystem,
        current: I,
        command: C,
        config: CurrentDrawConfig,
    ) -> Self {
        Self {
            id: CheckId::new(name, subsystem),
            current,
            command,
            config,
            out_of_band: ConditionTimer::new(),
        }
    }

    fn classify(&self) -> Result<(Band, f32), SensorFault> {
        let amps = sample_finite(&self.current)?;
        let command = sample_finite(&self.command)?;

        let band = if amps > self.config.max_amps {
            Band::Over
        } else if command.abs() > self.config.command_deadband && amps < self.config.min_amps {
            Band::Under
        } else {
            Band::Normal
        };
        Ok((band, amps))
    }
}

impl<I, C> DiagnosticCheck for CurrentDrawCheck<I, C>
where
    I: Sample<f32>,
    C: Sample<f32>,
{
    fn name(&self) -> &'static str {
        self.id.name
    }

    fn subsystem(&self) -> Subsystem {
        self.id.subsystem
    }

    fn evaluate(&mut self, now: Timestamp) -> TestResult {
        let (band, amps) = match self.classify() {
            Ok(sample) => sample,
            Err(fault) => {
                self.out_of_band.reset();
                return TestResult::from_sensor_fault(self.id.name, fault);
            }
        };

        let held = self.out_of_band.update(band != Band::Normal, now);
        match (band, held) {
            (Band::Over, Some(held)) if held > self.config.debounce => {
                TestResult::fault(format_args!(
                    "{}: drawing {amps:.1}A, above {:.1}A limit",
                    self.id.name, self.config.max_amps
                ))
            }
            (Band::Under, Some(held)) if held > self.config.debounce => {
                TestResult::fault(format_args!(
                    "{}: drawing {amps:.1}A while commanded, check wiring",
                    self.id.name
                ))
            }
            _ => TestResult::pass(),
        }
    }
}

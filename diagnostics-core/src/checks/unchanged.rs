//! Detects scalars that fail to move while their subsystem is commanded.
//!
//! Used for encoders (motor driven but position flat), elevator position,
//! pneumatic pressure while the compressor runs, and digital sensors sampled
//! as `0.0`/`1.0`. The first commanded evaluation counts as tick one, so a value
//! held for `ticks` commanded evaluations faults on exactly that evaluation.

use super::{CheckId, DiagnosticCheck, Sample, TestResult, Timestamp, sample_finite};
use crate::subsystem::Subsystem;

/// Thresholds for [`UnchangedValueCheck`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct UnchangedValueConfig {
    /// Changes no larger than this are treated as sensor noise.
    pub noise: f32,
    /// Consecutive commanded evaluations without movement before faulting.
    pub ticks: u32,
}

impl UnchangedValueConfig {
    /// Half a second of 20 ms control-loop ticks.
    pub const DEFAULT: Self = Self::new(0.01, 25);

    #[must_use]
    pub const fn new(noise: f32, ticks: u32) -> Self {
        Self { noise, ticks }
    }
}

impl Default for UnchangedValueConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Fault when a value stays flat across N commanded ticks.
pub struct UnchangedValueCheck<V, C> {
    id: CheckId,
    value: V,
    commanded: C,
    config: UnchangedValueConfig,
    reference: Option<f32>,
    unchanged_ticks: u32,
}

impl<V, C> UnchangedValueCheck<V, C>
where
    V: Sample<f32>,
    C: Sample<bool>,
{
    pub fn new(
        name: &'static str,
        subsystem: Subsystem,
        value: V,
        commanded: C,
        config: UnchangedValueConfig,
    ) -> Self {
        Self {
            id: CheckId::new(name, subsystem),
            value,
            commanded,
            config,
            reference: None,
            unchanged_ticks: 0,
        }
    }

    /// Number of consecutive commanded ticks the value has stayed flat.
    #[must_use]
    pub const fn unchanged_ticks(&self) -> u32 {
        self.unchanged_ticks
    }

    fn reset(&mut self) {
        self.reference = None;
        self.unchanged_ticks = 0;
    }
}

impl<V, C> DiagnosticCheck for UnchangedValueCheck<V, C>
where
    V: Sample<f32>,
    C: Sample<bool>,
{
    fn name(&self) -> &'static str {
        self.id.name
    }

    fn subsystem(&self) -> Subsystem {
        self.id.subsystem
    }

    fn evaluate(&mut self, _now: Timestamp) -> TestResult {
        let commanded = match self.commanded.sample() {
            Ok(commanded) => commanded,
            Err(fault) => {
                self.reset();
                return TestResult::from_sensor_fault(self.id.name, fault);
            }
        };
        if !commanded {
            self.reset();
            return TestResult::pass();
        }

        let value = match sample_finite(&self.value) {
            Ok(value) => value,
            Err(fault) => {
                self.reset();
                return TestResult::from_sensor_fault(self.id.name, fault);
            }
        };

        match self.reference {
            Some(reference) if (value - reference).abs() <= self.config.noise => {
                self.unchanged_ticks = self.unchanged_ticks.saturating_add(1);
            }
            _ => {
                self.reference = Some(value);
                self.unchanged_ticks = 1;
            }
        }

        if self.unchanged_ticks >= self.config.ticks {
            TestResult::fault(format_args!(
                "{}: value {value:.2} unchanged for {} ticks while commanded",
                self.id.name, self.unchanged_ticks
            ))
        } else {
            TestResult::pass()
        }
    }
}

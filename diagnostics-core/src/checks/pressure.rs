//! Detects a pneumatic system that is not holding working pressure.

use core::time::Duration;

use super::{
    CheckId, ConditionTimer, DiagnosticCheck, Sample, TestResult, Timestamp, sample_finite,
};
use crate::subsystem::Subsystem;

/// Thresholds for [`PressureLowCheck`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PressureLowConfig {
    /// Lowest acceptable stored pressure (psi).
    pub min_psi: f32,
    /// How long pressure may sit below `min_psi` before faulting.
    pub debounce: Duration,
}

impl PressureLowConfig {
    pub const DEFAULT: Self = Self::new(60.0, Duration::from_secs(1));

    #[must_use]
    pub const fn new(min_psi: f32, debounce: Duration) -> Self {
        Self { min_psi, debounce }
    }
}

impl Default for PressureLowConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Fault when stored pressure stays under the working minimum.
pub struct PressureLowCheck<S> {
    id: CheckId,
    source: S,
    config: PressureLowConfig,
    low: ConditionTimer,
}

impl<S> PressureLowCheck<S>
where
    S: Sample<f32>,
{
    pub fn new(
        name: &'static str,
        subsystem: Subsystem,
        source: S,
        config: PressureLowConfig,
    ) -> Self {
        Self {
            id: CheckId::new(name, subsystem),
            source,
            config,
            low: ConditionTimer::new(),
        }
    }
}

impl<S> DiagnosticCheck for PressureLowCheck<S>
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
        let psi = match sample_finite(&self.source) {
            Ok(psi) => psi,
            Err(fault) => {
                self.low.reset();
                return TestResult::from_sensor_fault(self.id.name, fault);
            }
        };

        match self.low.update(psi < self.config.min_psi, now) {
            Some(held) if held > self.config.debounce => TestResult::fault(format_args!(
                "{}: pressure {psi:.0}psi below {:.0}psi",
                self.id.name, self.config.min_psi
            )),
            _ => TestResult::pass(),
        }
    }
}

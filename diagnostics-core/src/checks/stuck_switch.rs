//! Detects limit/position switches stuck in the active state.

use core::time::Duration;

use super::{CheckId, ConditionTimer, DiagnosticCheck, Sample, TestResult, Timestamp};
use crate::subsystem::Subsystem;

/// Thresholds for [`StuckSwitchCheck`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct StuckSwitchConfig {
    /// Longest the mechanism can legitimately rest on the switch.
    pub max_active: Duration,
}

impl StuckSwitchConfig {
    /// Full elevator travel takes well under two seconds.
    pub const DEFAULT: Self = Self::new(Duration::from_secs(2));

    #[must_use]
    pub const fn new(max_active: Duration) -> Self {
        Self { max_active }
    }
}

impl Default for StuckSwitchConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Fault when a digital switch stays active longer than the expected transit time.
pub struct StuckSwitchCheck<S> {
    id: CheckId,
    source: S,
    config: StuckSwitchConfig,
    active: ConditionTimer,
}

impl<S> StuckSwitchCheck<S>
where
    S: Sample<bool>,
{
    pub fn new(
        name: &'static str,
        subsystem: Subsystem,
        source: S,
        config: StuckSwitchConfig,
    ) -> Self {
        Self {
            id: CheckId::new(name, subsystem),
            source,
            config,
            active: ConditionTimer::new(),
        }
    }
}

impl<S> DiagnosticCheck for StuckSwitchCheck<S>
where
    S: Sample<bool>,
{
    fn name(&self) -> &'static str {
        self.id.name
    }

    fn subsystem(&self) -> Subsystem {
        self.id.subsystem
    }

    fn evaluate(&mut self, now: Timestamp) -> TestResult {
        let active = match self.source.sample() {
            Ok(active) => active,
            Err(fault) => {
                self.active.reset();
                return TestResult::from_sensor_fault(self.id.name, fault);
            }
        };

        match self.active.update(active, now) {
            Some(held) if held > self.config.max_active => TestResult::fault(format_args!(
                "{}: switch active for {}ms, likely stuck",
                self.id.name,
                held.as_millis()
            )),
            _ => TestResult::pass(),
        }
    }
}

//! Liveness check for background processing tasks.
//!
//! The vision task runs outside the control loop and publishes the timestamp
//! of its last completed frame. The check polls that timestamp; it never
//! waits on the task.

use core::time::Duration;

use super::{CheckId, DiagnosticCheck, Sample, TestResult, Timestamp};
use crate::subsystem::Subsystem;

/// Thresholds for [`HeartbeatCheck`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct HeartbeatConfig {
    /// Longest acceptable gap between heartbeats.
    pub period: Duration,
}

impl HeartbeatConfig {
    pub const DEFAULT: Self = Self::new(Duration::from_millis(500));

    #[must_use]
    pub const fn new(period: Duration) -> Self {
        Self { period }
    }
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Fault when a background task stops producing heartbeats.
pub struct HeartbeatCheck<S> {
    id: CheckId,
    source: S,
    config: HeartbeatConfig,
}

impl<S> HeartbeatCheck<S>
where
    S: Sample<Option<Timestamp>>,
{
    pub fn new(
        name: &'static str,
        subsystem: Subsystem,
        source: S,
        config: HeartbeatConfig,
    ) -> Self {
        Self {
            id: CheckId::new(name, subsystem),
            source,
            config,
        }
    }
}

impl<S> DiagnosticCheck for HeartbeatCheck<S>
where
    S: Sample<Option<Timestamp>>,
{
    fn name(&self) -> &'static str {
        self.id.name
    }

    fn subsystem(&self) -> Subsystem {
        self.id.subsystem
    }

    fn evaluate(&mut self, now: Timestamp) -> TestResult {
        match self.source.sample() {
            Err(fault) => TestResult::from_sensor_fault(self.id.name, fault),
            Ok(None) => TestResult::fault(format_args!("{}: task never reported", self.id.name)),
            Ok(Some(last)) => {
                let silent = now.saturating_sub(last);
                if silent > self.config.period {
                    TestResult::fault(format_args!(
                        "{}: no heartbeat for {}ms, task terminated",
                        self.id.name,
                        silent.as_millis()
                    ))
                } else {
                    TestResult::pass()
                }
            }
        }
    }
}

//! Connectivity flag check (gyro and other bus devices).

use super::{CheckId, DiagnosticCheck, Sample, TestResult, Timestamp};
use crate::subsystem::Subsystem;

/// Fault when a device reports that it is not connected.
pub struct ConnectivityCheck<S> {
    id: CheckId,
    source: S,
}

impl<S> ConnectivityCheck<S>
where
    S: Sample<bool>,
{
    pub fn new(name: &'static str, subsystem: Subsystem, source: S) -> Self {
        Self {
            id: CheckId::new(name, subsystem),
            source,
        }
    }
}

impl<S> DiagnosticCheck for ConnectivityCheck<S>
where
    S: Sample<bool>,
{
    fn name(&self) -> &'static str {
        self.id.name
    }

    fn subsystem(&self) -> Subsystem {
        self.id.subsystem
    }

    fn evaluate(&mut self, _now: Timestamp) -> TestResult {
        match self.source.sample() {
            Ok(true) => TestResult::pass(),
            Ok(false) => TestResult::fault(format_args!("{}: device not connected", self.id.name)),
            Err(fault) => TestResult::from_sensor_fault(self.id.name, fault),
        }
    }
}

//! Periodic diagnostics driver called from the robot's control loop.

use crate::checks::Timestamp;
use crate::health::HealthReport;
use crate::registry::{DiagnosticsRegistry, MAX_CHECKS};
use crate::report::{Dashboard, FaultIndicator, FaultSink, Reporter};

/// Runs every registered check once per tick and publishes the result.
pub struct DiagnosticsMonitor<'a, const CAPACITY: usize = MAX_CHECKS> {
    registry: DiagnosticsRegistry<'a, CAPACITY>,
    reporter: Reporter,
}

impl<'a, const CAPACITY: usize> DiagnosticsMonitor<'a, CAPACITY> {
    #[must_use]
    pub const fn new(registry: DiagnosticsRegistry<'a, CAPACITY>, reporter: Reporter) -> Self {
        Self { registry, reporter }
    }

    /// Evaluates, aggregates and publishes one tick.
    pub fn update<D>(&mut self, now: Timestamp, dashboard: &mut D) -> HealthReport<CAPACITY>
    where
        D: Dashboard + ?Sized,
    {
        self.registry.run_all(now);
        let report = self.registry.health();
        self.reporter.publish(dashboard, &report);
        report
    }

    /// Prints the faults found by the most recent [`update`](Self::update).
    pub fn print_diagnostics<S, F>(&self, sink: &mut S, indicator: &mut F) -> usize
    where
        S: FaultSink + ?Sized,
        F: FaultIndicator + ?Sized,
    {
        self.reporter
            .print_diagnostics(self.registry.outcomes(), sink, indicator)
    }

    #[must_use]
    pub const fn registry(&self) -> &DiagnosticsRegistry<'a, CAPACITY> {
        &self.registry
    }
}

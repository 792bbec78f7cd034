//! Publishing health to the operator dashboard and the fault indicator.

use core::fmt::Write;

use heapless::String;

use crate::checks::MAX_MESSAGE_LEN;
use crate::health::HealthReport;
use crate::registry::CheckOutcome;

/// Longest dashboard key the reporter will build.
pub const MAX_KEY_LEN: usize = 64;

const MAX_REPORT_LEN: usize = MAX_MESSAGE_LEN + 32;

/// Operator display that accepts named boolean values.
pub trait Dashboard {
    fn put_boolean(&mut self, key: &str, value: bool);
}

/// Physical or virtual fault lamp.
pub trait FaultIndicator {
    fn show_fault(&mut self);
    fn show_no_fault(&mut self);
}

/// Operator-facing message channel (driver station console, transcript).
pub trait FaultSink {
    fn report(&mut self, message: &str);
}

/// Key prefixes and banner used by [`Reporter`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ReporterConfig {
    /// Prefix of per-check dashboard keys.
    pub check_prefix: &'static str,
    /// Prefix of per-subsystem dashboard keys.
    pub subsystem_prefix: &'static str,
    /// Leading text of every printed diagnostics line.
    pub banner: &'static str,
}

impl ReporterConfig {
    pub const DEFAULT: Self = Self::new("Diagnostics/", "Test/", "### Diagnostics: ");

    #[must_use]
    pub const fn new(
        check_prefix: &'static str,
        subsystem_prefix: &'static str,
        banner: &'static str,
    ) -> Self {
        Self {
            check_prefix,
            subsystem_prefix,
            banner,
        }
    }
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Writes aggregated health to a [`Dashboard`] and prints fault summaries.
#[derive(Copy, Clone, Debug, Default)]
pub struct Reporter {
    config: ReporterConfig,
}

impl Reporter {
    #[must_use]
    pub const fn new(config: ReporterConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub const fn config(&self) -> &ReporterConfig {
        &self.config
    }

    /// Writes one boolean per check and one per subsystem.
    pub fn publish<D, const CAPACITY: usize>(
        &self,
        dashboard: &mut D,
        report: &HealthReport<CAPACITY>,
    ) where
        D: Dashboard + ?Sized,
    {
        for (name, healthy) in report.checks.iter() {
            put(dashboard, self.config.check_prefix, name, healthy);
        }
        for (subsystem, healthy) in report.subsystems.iter() {
            put(dashboard, self.config.subsystem_prefix, subsystem.label(), healthy);
        }
    }

    /// Reports every faulted check, or a single all-clear line, and drives
    /// the indicator. Returns the number of faulted checks.
    pub fn print_diagnostics<'r, S, F>(
        &self,
        outcomes: impl IntoIterator<Item = CheckOutcome<'r>>,
        sink: &mut S,
        indicator: &mut F,
    ) -> usize
    where
        S: FaultSink + ?Sized,
        F: FaultIndicator + ?Sized,
    {
        let mut faults = 0;
        for outcome in outcomes {
            if !outcome.result.fault_detected() {
                continue;
            }
            faults += 1;
            self.emit(sink, outcome.result.message());
        }

        if faults == 0 {
            self.emit(sink, "No faults");
            indicator.show_no_fault();
        } else {
            log_warn!("diagnostics: {} checks faulted", faults);
            indicator.show_fault();
        }
        faults
    }

    fn emit<S>(&self, sink: &mut S, message: &str)
    where
        S: FaultSink + ?Sized,
    {
        let mut line: String<MAX_REPORT_LEN> = String::new();
        // Banner plus a bounded message always fits.
        let _ = write!(line, "{}{message}", self.config.banner);
        sink.report(&line);
    }
}

fn put<D>(dashboard: &mut D, prefix: &str, name: &str, value: bool)
where
    D: Dashboard + ?Sized,
{
    let mut key: String<MAX_KEY_LEN> = String::new();
    if write!(key, "{prefix}{name}").is_err() {
        log_warn!("diagnostics: dashboard key for `{}` too long, skipped", name);
        return;
    }
    dashboard.put_boolean(&key, value);
}

#[cfg(test)]
mod tests {
    use heapless::Vec;

    use super::*;
    use crate::checks::TestResult;
    use crate::subsystem::Subsystem;

    #[derive(Default)]
    struct Lines {
        lines: Vec<String<MAX_REPORT_LEN>, 8>,
    }

    impl FaultSink for Lines {
        fn report(&mut self, message: &str) {
            let mut line = String::new();
            line.push_str(message).unwrap();
            self.lines.push(line).unwrap();
        }
    }

    #[derive(Default)]
    struct Keys {
        values: Vec<(String<MAX_KEY_LEN>, bool), 16>,
    }

    impl Dashboard for Keys {
        fn put_boolean(&mut self, key: &str, value: bool) {
            let mut owned = String::new();
            owned.push_str(key).unwrap();
            self.values.push((owned, value)).unwrap();
        }
    }

    #[derive(Default)]
    struct Lamp {
        faulted: Option<bool>,
    }

    impl FaultIndicator for Lamp {
        fn show_fault(&mut self) {
            self.faulted = Some(true);
        }

        fn show_no_fault(&mut self) {
            self.faulted = Some(false);
        }
    }

    #[test]
    fn all_clear_prints_single_line() {
        let ok = TestResult::pass();
        let outcomes = [CheckOutcome {
            name: "gyro connected",
            subsystem: Subsystem::Sensors,
            result: &ok,
        }];
        let mut sink = Lines::default();
        let mut lamp = Lamp::default();

        let faults = Reporter::default().print_diagnostics(outcomes, &mut sink, &mut lamp);
        assert_eq!(faults, 0);
        assert_eq!(sink.lines.len(), 1);
        assert_eq!(sink.lines[0].as_str(), "### Diagnostics: No faults");
        assert_eq!(lamp.faulted, Some(false));
    }

    #[test]
    fn each_fault_is_reported_with_banner() {
        let ok = TestResult::pass();
        let bad = TestResult::fault(format_args!(
            "lf encoder: value 0.00 unchanged for 25 ticks while commanded"
        ));
        let outcomes = [
            CheckOutcome {
                name: "gyro connected",
                subsystem: Subsystem::Sensors,
                result: &ok,
            },
            CheckOutcome {
                name: "lf encoder",
                subsystem: Subsystem::Drivebase,
                result: &bad,
            },
        ];
        let mut sink = Lines::default();
        let mut lamp = Lamp::default();

        let faults = Reporter::default().print_diagnostics(outcomes, &mut sink, &mut lamp);
        assert_eq!(faults, 1);
        assert_eq!(
            sink.lines[0].as_str(),
            "### Diagnostics: lf encoder: value 0.00 unchanged for 25 ticks while commanded"
        );
        assert_eq!(lamp.faulted, Some(true));
    }

    #[test]
    fn publish_writes_check_and_subsystem_keys() {
        let bad = TestResult::fault(format_args!(
            "grabber left current: drawing 55.0A, above 40.0A limit"
        ));
        let outcomes = [CheckOutcome {
            name: "grabber left current",
            subsystem: Subsystem::Grabber,
            result: &bad,
        }];
        let report: HealthReport<4> = HealthReport::from_outcomes(outcomes);
        let mut keys = Keys::default();

        Reporter::default().publish(&mut keys, &report);

        let lookup = |key: &str| {
            keys.values
                .iter()
                .find(|(k, _)| k.as_str() == key)
                .map(|(_, v)| *v)
        };
        assert_eq!(lookup("Diagnostics/grabber left current"), Some(false));
        assert_eq!(lookup("Test/GRABBER"), Some(false));
        assert_eq!(lookup("Test/DRIVEBASE"), Some(true));
        assert_eq!(keys.values.len(), 1 + 5);
    }
}

//! Diagnostic check contract and the concrete check variants.
//!
//! A check is a predicate over one piece of hardware state. It samples the
//! hardware through an injected [`Sample`] accessor, keeps whatever history it
//! needs (debounce timers, last-seen values) inside the instance, and returns a
//! fresh [`TestResult`] on every evaluation. Checks never block and never write
//! to hardware.

use core::fmt::{self, Write};
use core::time::Duration;

use heapless::String;

use crate::subsystem::Subsystem;

pub mod connectivity;
pub mod current;
pub mod error_rate;
pub mod heartbeat;
pub mod pressure;
pub mod stuck_switch;
pub mod unchanged;
pub mod unplugged;

pub use connectivity::ConnectivityCheck;
pub use current::{CurrentDrawCheck, CurrentDrawConfig};
pub use error_rate::{ErrorRateCheck, ErrorRateConfig};
pub use heartbeat::{HeartbeatCheck, HeartbeatConfig};
pub use pressure::{PressureLowCheck, PressureLowConfig};
pub use stuck_switch::{StuckSwitchCheck, StuckSwitchConfig};
pub use unchanged::{UnchangedValueCheck, UnchangedValueConfig};
pub use unplugged::{UnpluggedSensorCheck, UnpluggedSensorConfig};

/// Maximum length of a fault message; longer messages are truncated.
pub const MAX_MESSAGE_LEN: usize = 96;

/// Monotonic control-loop time, measured from the start of the loop.
pub type Timestamp = Duration;

/// Bounded message attached to a [`TestResult`].
pub type FaultMessage = String<MAX_MESSAGE_LEN>;

/// Errors an accessor may report instead of a reading.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorFault {
    /// The device reports that it is not connected.
    Disconnected,
    /// The device answered but the value cannot be trusted.
    InvalidData,
    /// The device did not answer within the read budget.
    Unavailable,
}

impl fmt::Display for SensorFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorFault::Disconnected => f.write_str("disconnected"),
            SensorFault::InvalidData => f.write_str("invalid data"),
            SensorFault::Unavailable => f.write_str("unavailable"),
        }
    }
}

/// Non-blocking read of the current value of one piece of hardware state.
///
/// Implemented for any `Fn() -> Result<T, SensorFault>`, so most call sites
/// pass a closure over the real device wrapper.
pub trait Sample<T> {
    /// Reads the current value.
    ///
    /// # Errors
    ///
    /// Returns the [`SensorFault`] reported by the device.
    fn sample(&self) -> Result<T, SensorFault>;
}

impl<T, F> Sample<T> for F
where
    F: Fn() -> Result<T, SensorFault>,
{
    fn sample(&self) -> Result<T, SensorFault> {
        self()
    }
}

/// Verdict of a single check evaluation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TestResult {
    fault_detected: bool,
    message: FaultMessage,
}

impl TestResult {
    /// A passing result with no message.
    #[must_use]
    pub const fn pass() -> Self {
        Self {
            fault_detected: false,
            message: String::new(),
        }
    }

    /// A faulted result; the formatted message is truncated to [`MAX_MESSAGE_LEN`].
    #[must_use]
    pub fn fault(args: fmt::Arguments<'_>) -> Self {
        let mut message = FaultMessage::new();
        let mut writer = Truncating(&mut message);
        let _ = writer.write_fmt(args);
        Self {
            fault_detected: true,
            message,
        }
    }

    /// Converts an accessor error into a faulted result for the named check.
    #[must_use]
    pub fn from_sensor_fault(name: &str, fault: SensorFault) -> Self {
        Self::fault(format_args!("{name}: sensor {fault}"))
    }

    #[must_use]
    pub const fn fault_detected(&self) -> bool {
        self.fault_detected
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Default for TestResult {
    fn default() -> Self {
        Self::pass()
    }
}

/// Writer that keeps as many characters as fit instead of failing the whole write.
struct Truncating<'a>(&'a mut FaultMessage);

impl Write for Truncating<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for ch in s.chars() {
            if self.0.push(ch).is_err() {
                break;
            }
        }
        Ok(())
    }
}

/// Name and subsystem shared by every check variant.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct CheckId {
    pub name: &'static str,
    pub subsystem: Subsystem,
}

impl CheckId {
    #[must_use]
    pub const fn new(name: &'static str, subsystem: Subsystem) -> Self {
        Self { name, subsystem }
    }
}

/// Capability every diagnostic check exposes to the registry.
pub trait DiagnosticCheck {
    /// Human name, unique within a registry.
    fn name(&self) -> &'static str;

    /// Subsystem this check reports into.
    fn subsystem(&self) -> Subsystem;

    /// Samples the hardware and returns the current verdict.
    fn evaluate(&mut self, now: Timestamp) -> TestResult;
}

/// Reads a scalar, treating non-finite values as invalid data.
pub(crate) fn sample_finite<S>(source: &S) -> Result<f32, SensorFault>
where
    S: Sample<f32> + ?Sized,
{
    let value = source.sample()?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(SensorFault::InvalidData)
    }
}

/// Tracks how long a condition has held continuously.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub(crate) struct ConditionTimer {
    since: Option<Timestamp>,
}

impl ConditionTimer {
    pub(crate) const fn new() -> Self {
        Self { since: None }
    }

    /// Feeds the condition for this evaluation and returns how long it has held.
    pub(crate) fn update(&mut self, active: bool, now: Timestamp) -> Option<Duration> {
        if active {
            let since = *self.since.get_or_insert(now);
            Some(now.saturating_sub(since))
        } else {
            self.since = None;
            None
        }
    }

    pub(crate) fn reset(&mut self) {
        self.since = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pass_has_no_message() {
        let result = TestResult::pass();
        assert!(!result.fault_detected());
        assert_eq!(result.message(), "");
    }

    #[test]
    fn fault_message_is_truncated_not_dropped() {
        const LONG: &str = "0123456789012345678901234567890123456789012345678901234567890123456789";
        let result = TestResult::fault(format_args!("{LONG}{LONG}"));
        assert!(result.fault_detected());
        assert_eq!(result.message().len(), MAX_MESSAGE_LEN);
    }

    #[test]
    fn sensor_fault_names_the_check() {
        let result = TestResult::from_sensor_fault("gyro", SensorFault::Disconnected);
        assert!(result.fault_detected());
        assert_eq!(result.message(), "gyro: sensor disconnected");
    }

    #[test]
    fn non_finite_samples_are_invalid() {
        let source = || -> Result<f32, SensorFault> { Ok(f32::NAN) };
        assert_eq!(sample_finite(&source), Err(SensorFault::InvalidData));
        let source = || -> Result<f32, SensorFault> { Ok(1.5) };
        assert_eq!(sample_finite(&source), Ok(1.5));
    }

    #[test]
    fn condition_timer_measures_continuous_hold() {
        let mut timer = ConditionTimer::new();
        assert_eq!(timer.update(true, Duration::from_millis(100)), Some(Duration::ZERO));
        assert_eq!(
            timer.update(true, Duration::from_millis(250)),
            Some(Duration::from_millis(150))
        );
        assert_eq!(timer.update(false, Duration::from_millis(300)), None);
        assert_eq!(timer.update(true, Duration::from_millis(400)), Some(Duration::ZERO));
    }
}

//! Ordered collection of diagnostic checks for one monitoring session.
//!
//! The registry is populated once through [`RegistryBuilder`]. Checks for
//! optional hardware are only registered when the [`HardwareInventory`] says
//! the device is installed, so construction code never branches on missing
//! devices itself. After construction the set of checks is fixed.

use core::fmt;

use heapless::Vec;

use crate::checks::{DiagnosticCheck, TestResult, Timestamp};
use crate::health::HealthReport;
use crate::subsystem::Subsystem;

/// Default registry capacity; the full robot catalog uses 23 checks.
pub const MAX_CHECKS: usize = 32;

/// Hardware that may or may not be installed on a given robot.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum OptionalHardware {
    LeftSonar,
    RightSonar,
    VisionCamera,
    Gyro,
}

impl OptionalHardware {
    const fn bit(self) -> u8 {
        match self {
            OptionalHardware::LeftSonar => 1 << 0,
            OptionalHardware::RightSonar => 1 << 1,
            OptionalHardware::VisionCamera => 1 << 2,
            OptionalHardware::Gyro => 1 << 3,
        }
    }
}

/// Set of optional hardware present on this robot.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct HardwareInventory {
    installed: u8,
}

impl HardwareInventory {
    /// Inventory with no optional hardware.
    #[must_use]
    pub const fn none() -> Self {
        Self { installed: 0 }
    }

    /// Inventory with every optional device installed.
    #[must_use]
    pub const fn all() -> Self {
        Self::none()
            .with(OptionalHardware::LeftSonar)
            .with(OptionalHardware::RightSonar)
            .with(OptionalHardware::VisionCamera)
            .with(OptionalHardware::Gyro)
    }

    /// Marks `hardware` as installed.
    #[must_use]
    pub const fn with(self, hardware: OptionalHardware) -> Self {
        Self {
            installed: self.installed | hardware.bit(),
        }
    }

    #[must_use]
    pub const fn contains(self, hardware: OptionalHardware) -> bool {
        self.installed & hardware.bit() != 0
    }
}

/// Errors that may occur while populating the registry.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RegistryError {
    /// Registry has reached its capacity.
    RegistryFull,
    /// Another check already uses this name.
    DuplicateName(&'static str),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::RegistryFull => f.write_str("diagnostics registry is full"),
            RegistryError::DuplicateName(name) => write!(f, "duplicate check name `{name}`"),
        }
    }
}

/// Borrowed view of one check and its latest result.
#[derive(Copy, Clone, Debug)]
pub struct CheckOutcome<'r> {
    pub name: &'static str,
    pub subsystem: Subsystem,
    pub result: &'r TestResult,
}

struct Entry<'a> {
    check: &'a mut dyn DiagnosticCheck,
    last: TestResult,
}

/// Fixed, ordered set of checks plus the result of the most recent run.
pub struct DiagnosticsRegistry<'a, const CAPACITY: usize = MAX_CHECKS> {
    entries: Vec<Entry<'a>, CAPACITY>,
}

impl<'a, const CAPACITY: usize> DiagnosticsRegistry<'a, CAPACITY> {
    /// Starts building a registry for the given hardware inventory.
    #[must_use]
    pub const fn builder(inventory: HardwareInventory) -> RegistryBuilder<'a, CAPACITY> {
        RegistryBuilder::new(inventory)
    }

    /// Evaluates every check once, in registration order.
    pub fn run_all(&mut self, now: Timestamp) {
        for entry in &mut self.entries {
            entry.last = entry.check.evaluate(now);
        }
        log_debug!("diagnostics: evaluated {} checks", self.entries.len());
    }

    /// Iterates the latest result of every check in registration order.
    pub fn outcomes(&self) -> impl Iterator<Item = CheckOutcome<'_>> + Clone + '_ {
        self.entries.iter().map(|entry| CheckOutcome {
            name: entry.check.name(),
            subsystem: entry.check.subsystem(),
            result: &entry.last,
        })
    }

    /// Latest result for the named check.
    #[must_use]
    pub fn result(&self, name: &str) -> Option<&TestResult> {
        self.entries
            .iter()
            .find(|entry| entry.check.name() == name)
            .map(|entry| &entry.last)
    }

    /// Aggregates the latest results.
    #[must_use]
    pub fn health(&self) -> HealthReport<CAPACITY> {
        HealthReport::from_outcomes(self.outcomes())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Construction-time builder for [`DiagnosticsRegistry`].
pub struct RegistryBuilder<'a, const CAPACITY: usize = MAX_CHECKS> {
    inventory: HardwareInventory,
    entries: Vec<Entry<'a>, CAPACITY>,
}

impl<'a, const CAPACITY: usize> RegistryBuilder<'a, CAPACITY> {
    #[must_use]
    pub const fn new(inventory: HardwareInventory) -> Self {
        Self {
            inventory,
            entries: Vec::new(),
        }
    }

    /// Registers a check for hardware that is always present.
    ///
    /// # Errors
    ///
    /// Fails when the registry is full or the name is already taken.
    pub fn register(&mut self, check: &'a mut dyn DiagnosticCheck) -> Result<(), RegistryError> {
        let name = check.name();
        if self.entries.iter().any(|entry| entry.check.name() == name) {
            return Err(RegistryError::DuplicateName(name));
        }

        self.entries
            .push(Entry {
                check,
                last: TestResult::pass(),
            })
            .map_err(|_| RegistryError::RegistryFull)
    }

    /// Registers a check only when `hardware` is installed.
    ///
    /// Returns `Ok(false)` when the hardware is absent and the check was skipped.
    ///
    /// # Errors
    ///
    /// Same as [`RegistryBuilder::register`].
    pub fn register_optional(
        &mut self,
        hardware: OptionalHardware,
        check: &'a mut dyn DiagnosticCheck,
    ) -> Result<bool, RegistryError> {
        if !self.inventory.contains(hardware) {
            log_info!("diagnostics: skipping `{}`, hardware not installed", check.name());
            return Ok(false);
        }
        self.register(check).map(|()| true)
    }

    /// Freezes the check set.
    #[must_use]
    pub fn build(self) -> DiagnosticsRegistry<'a, CAPACITY> {
        log_info!("diagnostics: registry built with {} checks", self.entries.len());
        DiagnosticsRegistry {
            entries: self.entries,
        }
    }
}

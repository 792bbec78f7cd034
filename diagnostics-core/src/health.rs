//! Aggregation of check results into per-check and per-subsystem health.
//!
//! Every function here is a pure reduction over the latest outcomes. Nothing
//! is remembered between ticks; any hysteresis lives inside the checks.

use heapless::Vec;

use crate::registry::{CheckOutcome, MAX_CHECKS};
use crate::subsystem::{ALL_SUBSYSTEMS, SUBSYSTEM_COUNT, Subsystem};

/// Healthy flag per check name, in registration order.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CheckHealth<const CAPACITY: usize = MAX_CHECKS> {
    entries: Vec<(&'static str, bool), CAPACITY>,
}

impl<const CAPACITY: usize> CheckHealth<CAPACITY> {
    /// Healthy flag for `name`, if such a check exists.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<bool> {
        self.entries
            .iter()
            .find(|(entry, _)| *entry == name)
            .map(|&(_, healthy)| healthy)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, bool)> + '_ {
        self.entries.iter().copied()
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

/// Healthy flag per subsystem; a subsystem without checks is healthy.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SubsystemHealth {
    healthy: [bool; SUBSYSTEM_COUNT],
}

impl SubsystemHealth {
    /// Every subsystem healthy.
    #[must_use]
    pub const fn all_healthy() -> Self {
        Self {
            healthy: [true; SUBSYSTEM_COUNT],
        }
    }

    #[must_use]
    pub const fn get(&self, subsystem: Subsystem) -> bool {
        self.healthy[subsystem.as_index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (Subsystem, bool)> + '_ {
        ALL_SUBSYSTEMS
            .iter()
            .map(|subsystem| (*subsystem, self.get(*subsystem)))
    }
}

impl Default for SubsystemHealth {
    fn default() -> Self {
        Self::all_healthy()
    }
}

/// Maps every check to `!fault_detected`.
#[must_use]
pub fn check_health<'r, const CAPACITY: usize>(
    outcomes: impl IntoIterator<Item = CheckOutcome<'r>>,
) -> CheckHealth<CAPACITY> {
    let mut health = CheckHealth { entries: Vec::new() };
    for outcome in outcomes {
        // Registry capacity bounds the outcome count.
        let _ = health
            .entries
            .push((outcome.name, !outcome.result.fault_detected()));
    }
    health
}

/// ANDs check health per subsystem, starting from healthy.
#[must_use]
pub fn subsystem_health<'r>(
    outcomes: impl IntoIterator<Item = CheckOutcome<'r>>,
) -> SubsystemHealth {
    outcomes
        .into_iter()
        .fold(SubsystemHealth::all_healthy(), |mut health, outcome| {
            let slot = &mut health.healthy[outcome.subsystem.as_index()];
            *slot = *slot && !outcome.result.fault_detected();
            health
        })
}

/// Both health views computed from the same evaluation.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct HealthReport<const CAPACITY: usize = MAX_CHECKS> {
    pub checks: CheckHealth<CAPACITY>,
    pub subsystems: SubsystemHealth,
}

impl<const CAPACITY: usize> HealthReport<CAPACITY> {
    #[must_use]
    pub fn from_outcomes<'r, I>(outcomes: I) -> Self
    where
        I: IntoIterator<Item = CheckOutcome<'r>>,
        I::IntoIter: Clone,
    {
        let outcomes = outcomes.into_iter();
        Self {
            checks: check_health(outcomes.clone()),
            subsystems: subsystem_health(outcomes),
        }
    }

    /// Returns `true` when at least one check is faulted.
    #[must_use]
    pub fn any_fault(&self) -> bool {
        self.checks.iter().any(|(_, healthy)| !healthy)
    }

    /// Number of faulted checks.
    #[must_use]
    pub fn fault_count(&self) -> usize {
        self.checks.iter().filter(|(_, healthy)| !healthy).count()
    }
}

//! Logical subsystems used to group diagnostic checks.

use core::fmt;

/// Number of subsystem categories.
pub const SUBSYSTEM_COUNT: usize = 5;

/// Grouping category a diagnostic check reports into.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Subsystem {
    Drivebase,
    Elevator,
    Sensors,
    Grabber,
    Pressure,
}

/// Every subsystem in index order.
pub const ALL_SUBSYSTEMS: [Subsystem; SUBSYSTEM_COUNT] = [
    Subsystem::Drivebase,
    Subsystem::Elevator,
    Subsystem::Sensors,
    Subsystem::Grabber,
    Subsystem::Pressure,
];

impl Subsystem {
    /// Deterministic index for lookups into [`ALL_SUBSYSTEMS`].
    #[must_use]
    pub const fn as_index(self) -> usize {
        match self {
            Subsystem::Drivebase => 0,
            Subsystem::Elevator => 1,
            Subsystem::Sensors => 2,
            Subsystem::Grabber => 3,
            Subsystem::Pressure => 4,
        }
    }

    /// Attempts to construct a [`Subsystem`] from a raw index.
    #[must_use]
    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Subsystem::Drivebase),
            1 => Some(Subsystem::Elevator),
            2 => Some(Subsystem::Sensors),
            3 => Some(Subsystem::Grabber),
            4 => Some(Subsystem::Pressure),
            _ => None,
        }
    }

    /// Upper-case label used for dashboard keys.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Subsystem::Drivebase => "DRIVEBASE",
            Subsystem::Elevator => "ELEVATOR",
            Subsystem::Sensors => "SENSORS",
            Subsystem::Grabber => "GRABBER",
            Subsystem::Pressure => "PRESSURE",
        }
    }
}

impl fmt::Display for Subsystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_round_trips_for_every_subsystem() {
        for (index, subsystem) in ALL_SUBSYSTEMS.iter().enumerate() {
            assert_eq!(subsystem.as_index(), index);
            assert_eq!(Subsystem::from_index(index), Some(*subsystem));
        }
        assert_eq!(Subsystem::from_index(SUBSYSTEM_COUNT), None);
    }

    #[test]
    fn labels_match_dashboard_names() {
        assert_eq!(Subsystem::Drivebase.label(), "DRIVEBASE");
        assert_eq!(Subsystem::Pressure.label(), "PRESSURE");
    }
}

//! Run modes, match identity and the log names derived from them.

use core::fmt::{self, Write};

use heapless::String;

/// Longest event name kept from the field management system.
pub const MAX_EVENT_NAME_LEN: usize = 32;

/// Longest log name produced by the lifecycle.
pub const MAX_LOG_NAME_LEN: usize = 48;

pub type EventName = String<MAX_EVENT_NAME_LEN>;
pub type LogName = String<MAX_LOG_NAME_LEN>;

/// Operating mode the robot enters when a disabled period ends.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RunMode {
    Autonomous,
    Teleop,
    Test,
}

impl RunMode {
    /// Name used for logs that cover a run outside a competition match.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            RunMode::Autonomous => "Autonomous",
            RunMode::Teleop => "Teleop",
            RunMode::Test => "Test",
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Kind of match reported by field management.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MatchType {
    Practice,
    Qualification,
    Elimination,
    Unknown,
}

impl MatchType {
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            MatchType::Practice => "Prac",
            MatchType::Qualification => "Qual",
            MatchType::Elimination => "Elim",
            MatchType::Unknown => "None",
        }
    }
}

/// Identity of the competition match being played.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MatchIdentity {
    pub event_name: EventName,
    pub match_type: MatchType,
    pub match_number: u16,
}

impl MatchIdentity {
    /// Builds an identity; over-long event names are truncated.
    #[must_use]
    pub fn new(event_name: &str, match_type: MatchType, match_number: u16) -> Self {
        Self {
            event_name: bounded(event_name),
            match_type,
            match_number,
        }
    }

    /// Final log name, e.g. `SVR_Qual007`.
    #[must_use]
    pub fn log_name(&self) -> LogName {
        let mut name = LogName::new();
        // Event name and code are bounded well below the name capacity.
        let _ = write!(
            name,
            "{}_{}{:03}",
            self.event_name,
            self.match_type.code(),
            self.match_number
        );
        name
    }
}

/// Copies `text` into a bounded string, dropping whole characters past capacity.
pub(crate) fn bounded<const N: usize>(text: &str) -> String<N> {
    let mut out = String::new();
    for ch in text.chars() {
        if out.push(ch).is_err() {
            break;
        }
    }
    out
}

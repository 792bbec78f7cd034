//! Trace-log lifecycle across disabled periods.
//!
//! The robot opens its trace log as soon as it first becomes disabled, long
//! before field management can say which match is being played. The log is
//! opened under a provisional name and renamed when it is closed. Closing
//! happens at the start of the *next* disabled period, once the mode that ran
//! in between (and, in competition, the match identity) is known:
//!
//! ```text
//! Start --entry--> AwaitingModeDecision --exit(mode)--> AwaitingCompetitionClose(id)
//!   ^                                                | or AwaitingGenericClose(mode)
//!   +--------------- close(final name) <---entry-----+
//! ```
//!
//! Every close except [`RunLogLifecycle::shutdown`] is immediately followed by
//! a fresh provisional open.

use core::fmt::{self, Write};

use heapless::String;

use crate::report::FaultSink;

mod naming;

pub use naming::{
    EventName, LogName, MAX_EVENT_NAME_LEN, MAX_LOG_NAME_LEN, MatchIdentity, MatchType, RunMode,
};

const MAX_FAILURE_LEN: usize = 128;

/// Storage that holds the trace log.
pub trait LogStorage {
    /// Open log, owned by the lifecycle between `open` and `close`.
    type Handle;
    type Error: fmt::Display;

    /// Opens a new log under a provisional name.
    ///
    /// # Errors
    ///
    /// Storage-specific failure; the lifecycle reports it and stays closed.
    fn open(&mut self, provisional_name: &str) -> Result<Self::Handle, Self::Error>;

    /// Closes the log and gives it its final name.
    ///
    /// # Errors
    ///
    /// Storage-specific failure; the lifecycle reports it and moves on.
    fn close(&mut self, handle: Self::Handle, final_name: &str) -> Result<(), Self::Error>;
}

/// Competition field management system.
pub trait FieldManagement {
    type Error: fmt::Display;

    /// Whether the robot is attached to a competition field.
    fn is_competition(&self) -> bool;

    /// Identity of the current match.
    ///
    /// # Errors
    ///
    /// The field did not provide match information.
    fn match_identity(&mut self) -> Result<MatchIdentity, Self::Error>;
}

/// Where the lifecycle is between disabled periods.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum LogState {
    /// No log open.
    Start,
    /// Provisional log open, the next mode is not known yet.
    AwaitingModeDecision,
    /// A competition match is running; close with the match name.
    AwaitingCompetitionClose(MatchIdentity),
    /// A non-match run is in progress; close with the mode label.
    AwaitingGenericClose(RunMode),
}

/// Names and the mode that counts as the start of a match.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct LifecycleConfig {
    /// Name every log is opened under.
    pub provisional_name: &'static str,
    /// Mode whose start, on a competition field, names the log after the match.
    pub competition_mode: RunMode,
}

impl LifecycleConfig {
    pub const DEFAULT: Self = Self::new("Temp", RunMode::Autonomous);

    #[must_use]
    pub const fn new(provisional_name: &'static str, competition_mode: RunMode) -> Self {
        Self {
            provisional_name,
            competition_mode,
        }
    }
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// State machine that opens, closes and names the trace log.
pub struct RunLogLifecycle<S: LogStorage> {
    state: LogState,
    handle: Option<S::Handle>,
    config: LifecycleConfig,
}

impl<S: LogStorage> RunLogLifecycle<S> {
    #[must_use]
    pub const fn new(config: LifecycleConfig) -> Self {
        Self {
            state: LogState::Start,
            handle: None,
            config,
        }
    }

    #[must_use]
    pub const fn state(&self) -> &LogState {
        &self.state
    }

    #[must_use]
    pub const fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    /// The open log, for writing trace records.
    pub fn log_mut(&mut self) -> Option<&mut S::Handle> {
        self.handle.as_mut()
    }

    /// Called when the robot enters a disabled period.
    pub fn on_disabled_entry<K>(&mut self, storage: &mut S, sink: &mut K)
    where
        K: FaultSink + ?Sized,
    {
        match self.state {
            LogState::Start => self.open(storage, sink),
            LogState::AwaitingModeDecision => {
                log_debug!("run log: already waiting for a mode decision");
            }
            LogState::AwaitingCompetitionClose(_) | LogState::AwaitingGenericClose(_) => {
                let name = self.closing_name();
                self.close(storage, &name, sink);
                self.state = LogState::Start;
                self.open(storage, sink);
            }
        }
    }

    /// Called when the disabled period ends and `next` is about to run.
    pub fn on_disabled_exit<F, K>(&mut self, next: RunMode, field: &mut F, sink: &mut K)
    where
        F: FieldManagement + ?Sized,
        K: FaultSink + ?Sized,
    {
        if self.state != LogState::AwaitingModeDecision {
            log_debug!("run log: ignoring exit to {}, no decision pending", next.label());
            return;
        }

        self.state = if next == self.config.competition_mode && field.is_competition() {
            match field.match_identity() {
                Ok(identity) => {
                    log_info!("run log: competition match started");
                    LogState::AwaitingCompetitionClose(identity)
                }
                Err(error) => {
                    log_warn!("run log: match identity unavailable, using mode name");
                    report(sink, format_args!("run log: match identity unavailable: {error}"));
                    LogState::AwaitingGenericClose(next)
                }
            }
        } else {
            log_info!("run log: {} run started", next.label());
            LogState::AwaitingGenericClose(next)
        };
    }

    /// Periodic hook while disabled; the lifecycle has no periodic work.
    #[allow(clippy::unused_self)]
    pub fn on_periodic(&mut self) {}

    /// Closes the current log under the name the current state would give it,
    /// without reopening. Does nothing when no log is open.
    pub fn shutdown<K>(&mut self, storage: &mut S, sink: &mut K)
    where
        K: FaultSink + ?Sized,
    {
        if self.handle.is_none() {
            return;
        }
        let name = self.closing_name();
        self.close(storage, &name, sink);
        self.state = LogState::Start;
    }

    fn closing_name(&self) -> LogName {
        match &self.state {
            LogState::AwaitingCompetitionClose(identity) => identity.log_name(),
            LogState::AwaitingGenericClose(mode) => naming::bounded(mode.label()),
            LogState::Start | LogState::AwaitingModeDecision => {
                naming::bounded(self.config.provisional_name)
            }
        }
    }

    fn open<K>(&mut self, storage: &mut S, sink: &mut K)
    where
        K: FaultSink + ?Sized,
    {
        let name = self.config.provisional_name;
        match storage.open(name) {
            Ok(handle) => {
                log_info!("run log: opened `{}`", name);
                self.handle = Some(handle);
                self.state = LogState::AwaitingModeDecision;
            }
            Err(error) => {
                log_error!("run log: open of `{}` failed", name);
                report(sink, format_args!("run log: cannot open `{name}`: {error}"));
            }
        }
    }

    fn close<K>(&mut self, storage: &mut S, final_name: &str, sink: &mut K)
    where
        K: FaultSink + ?Sized,
    {
        let Some(handle) = self.handle.take() else {
            log_warn!("run log: nothing open to close as `{}`", final_name);
            return;
        };
        match storage.close(handle, final_name) {
            Ok(()) => log_info!("run log: closed as `{}`", final_name),
            Err(error) => {
                log_error!("run log: close as `{}` failed", final_name);
                report(sink, format_args!("run log: cannot close as `{final_name}`: {error}"));
            }
        }
    }
}

impl<S: LogStorage> Default for RunLogLifecycle<S> {
    fn default() -> Self {
        Self::new(LifecycleConfig::DEFAULT)
    }
}

fn report<K>(sink: &mut K, args: fmt::Arguments<'_>)
where
    K: FaultSink + ?Sized,
{
    let mut line: String<MAX_FAILURE_LEN> = String::new();
    let _ = line.write_fmt(args);
    sink.report(&line);
}

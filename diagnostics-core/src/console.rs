#![allow(clippy::module_name_repetitions)]

//! Operator console grammar.
//!
//! Commands are one keyword followed by at most one argument. Keywords and
//! enumerated arguments are case-insensitive; fault targets are taken
//! verbatim up to the end of the line.

use core::fmt;

use winnow::ModalResult;
use winnow::ascii::{Caseless, dec_uint, multispace1};
use winnow::combinator::{alt, eof, peek, terminated};
use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::token::{literal, rest};

use crate::lifecycle::RunMode;

/// A parsed console command.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ConsoleCommand<'a> {
    /// Enter a disabled period.
    Disable,
    /// Leave the disabled period into the given mode.
    Enable(RunMode),
    /// Attach or detach the simulated field management system.
    Fms(bool),
    /// Advance the control loop by this many ticks.
    Tick(u32),
    /// Print the faults found by the last tick.
    Print,
    /// Show lifecycle state and subsystem health.
    Status,
    /// Inject a hardware fault.
    Fault(&'a str),
    /// Clear an injected hardware fault.
    Restore(&'a str),
    Help,
}

/// Console parse failures.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ConsoleError<'a> {
    /// The line held only whitespace.
    Empty,
    UnknownCommand(&'a str),
    MissingArgument {
        command: &'static str,
        expected: &'static str,
    },
    InvalidArgument {
        command: &'static str,
        expected: &'static str,
    },
    TrailingInput(&'a str),
}

impl fmt::Display for ConsoleError<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsoleError::Empty => f.write_str("empty command"),
            ConsoleError::UnknownCommand(word) => write!(f, "unknown command `{word}`"),
            ConsoleError::MissingArgument { command, expected } => {
                write!(f, "`{command}` expects {expected}")
            }
            ConsoleError::InvalidArgument { command, expected } => {
                write!(f, "`{command}` argument must be {expected}")
            }
            ConsoleError::TrailingInput(extra) => write!(f, "unexpected input `{extra}`"),
        }
    }
}

/// One-line summary per command, in the order `help` prints them.
pub const HELP: [(&str, &str); 9] = [
    ("disable", "enter a disabled period"),
    ("enable <auto|teleop|test>", "leave the disabled period into a mode"),
    ("fms <on|off>", "attach or detach field management"),
    ("tick [count]", "advance the control loop (20 ms per tick)"),
    ("print", "print faults from the last tick"),
    ("status", "show run log state and subsystem health"),
    ("fault <target>", "inject a hardware fault"),
    ("restore <target>", "clear an injected fault"),
    ("help", "show this list"),
];

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Keyword {
    Disable,
    Enable,
    Fms,
    Tick,
    Print,
    Status,
    Fault,
    Restore,
    Help,
}

/// Parses one console line.
///
/// # Errors
///
/// Returns a [`ConsoleError`] describing the first problem found.
pub fn parse_command(line: &str) -> Result<ConsoleCommand<'_>, ConsoleError<'_>> {
    let mut input = line.trim();
    if input.is_empty() {
        return Err(ConsoleError::Empty);
    }

    let start = input;
    let Ok(keyword) = keyword.parse_next(&mut input) else {
        let word = start.split_whitespace().next().unwrap_or(start);
        return Err(ConsoleError::UnknownCommand(word));
    };
    let mut args = input.trim_start();

    let command = match keyword {
        Keyword::Disable => ConsoleCommand::Disable,
        Keyword::Enable => {
            ConsoleCommand::Enable(argument(&mut args, "enable", "auto, teleop or test", run_mode)?)
        }
        Keyword::Fms => ConsoleCommand::Fms(argument(&mut args, "fms", "on or off", on_off)?),
        Keyword::Tick if args.is_empty() => ConsoleCommand::Tick(1),
        Keyword::Tick => {
            ConsoleCommand::Tick(argument(&mut args, "tick", "a positive count", count)?)
        }
        Keyword::Print => ConsoleCommand::Print,
        Keyword::Status => ConsoleCommand::Status,
        Keyword::Fault => {
            ConsoleCommand::Fault(argument(&mut args, "fault", "a target name", target)?)
        }
        Keyword::Restore => {
            ConsoleCommand::Restore(argument(&mut args, "restore", "a target name", target)?)
        }
        Keyword::Help => ConsoleCommand::Help,
    };

    if args.is_empty() {
        Ok(command)
    } else {
        Err(ConsoleError::TrailingInput(args))
    }
}

fn argument<'a, O, P>(
    args: &mut &'a str,
    command: &'static str,
    expected: &'static str,
    parser: P,
) -> Result<O, ConsoleError<'a>>
where
    P: Parser<&'a str, O, ErrMode<ContextError>>,
{
    if args.is_empty() {
        return Err(ConsoleError::MissingArgument { command, expected });
    }
    let value = terminated(parser, word_end)
        .parse_next(args)
        .map_err(|_| ConsoleError::InvalidArgument { command, expected })?;
    *args = args.trim_start();
    Ok(value)
}

fn word_end<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    peek(alt((multispace1, eof))).parse_next(input)
}

fn keyword(input: &mut &str) -> ModalResult<Keyword> {
    terminated(
        alt((
            literal(Caseless("disable")).value(Keyword::Disable),
            literal(Caseless("enable")).value(Keyword::Enable),
            literal(Caseless("fms")).value(Keyword::Fms),
            literal(Caseless("tick")).value(Keyword::Tick),
            literal(Caseless("print")).value(Keyword::Print),
            literal(Caseless("status")).value(Keyword::Status),
            literal(Caseless("fault")).value(Keyword::Fault),
            literal(Caseless("restore")).value(Keyword::Restore),
            literal(Caseless("help")).value(Keyword::Help),
        )),
        word_end,
    )
    .parse_next(input)
}

fn run_mode(input: &mut &str) -> ModalResult<RunMode> {
    alt((
        alt((literal(Caseless("autonomous")), literal(Caseless("auto"))))
            .value(RunMode::Autonomous),
        literal(Caseless("teleop")).value(RunMode::Teleop),
        literal(Caseless("test")).value(RunMode::Test),
    ))
    .parse_next(input)
}

fn on_off(input: &mut &str) -> ModalResult<bool> {
    alt((
        literal(Caseless("on")).value(true),
        literal(Caseless("off")).value(false),
    ))
    .parse_next(input)
}

fn target<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    rest.parse_next(input)
}

fn count(input: &mut &str) -> ModalResult<u32> {
    dec_uint::<_, u32, _>.verify(|ticks: &u32| *ticks > 0).parse_next(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_keywords() {
        assert_eq!(parse_command("disable"), Ok(ConsoleCommand::Disable));
        assert_eq!(parse_command("  PRINT "), Ok(ConsoleCommand::Print));
        assert_eq!(parse_command("status"), Ok(ConsoleCommand::Status));
        assert_eq!(parse_command("help"), Ok(ConsoleCommand::Help));
    }

    #[test]
    fn parses_mode_and_switch_arguments() {
        assert_eq!(parse_command("enable auto"), Ok(ConsoleCommand::Enable(RunMode::Autonomous)));
        assert_eq!(
            parse_command("enable autonomous"),
            Ok(ConsoleCommand::Enable(RunMode::Autonomous))
        );
        assert_eq!(parse_command("Enable Teleop"), Ok(ConsoleCommand::Enable(RunMode::Teleop)));
        assert_eq!(parse_command("enable test"), Ok(ConsoleCommand::Enable(RunMode::Test)));
        assert_eq!(parse_command("fms on"), Ok(ConsoleCommand::Fms(true)));
        assert_eq!(parse_command("fms off"), Ok(ConsoleCommand::Fms(false)));
    }

    #[test]
    fn tick_count_defaults_to_one() {
        assert_eq!(parse_command("tick"), Ok(ConsoleCommand::Tick(1)));
        assert_eq!(parse_command("tick 50"), Ok(ConsoleCommand::Tick(50)));
        assert_eq!(
            parse_command("tick 0"),
            Err(ConsoleError::InvalidArgument {
                command: "tick",
                expected: "a positive count"
            })
        );
    }

    #[test]
    fn fault_target_runs_to_end_of_line() {
        assert_eq!(parse_command("fault lf-encoder"), Ok(ConsoleCommand::Fault("lf-encoder")));
        assert_eq!(
            parse_command("restore vision task"),
            Ok(ConsoleCommand::Restore("vision task"))
        );
    }

    #[test]
    fn reports_errors() {
        assert_eq!(parse_command("   "), Err(ConsoleError::Empty));
        assert_eq!(parse_command("reboot now"), Err(ConsoleError::UnknownCommand("reboot")));
        assert_eq!(parse_command("disabled"), Err(ConsoleError::UnknownCommand("disabled")));
        assert_eq!(
            parse_command("enable"),
            Err(ConsoleError::MissingArgument {
                command: "enable",
                expected: "auto, teleop or test"
            })
        );
        assert_eq!(
            parse_command("enable practice"),
            Err(ConsoleError::InvalidArgument {
                command: "enable",
                expected: "auto, teleop or test"
            })
        );
        assert_eq!(
            parse_command("print everything"),
            Err(ConsoleError::TrailingInput("everything"))
        );
    }
}

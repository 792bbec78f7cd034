mod session;
mod sim;

use std::env;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process;

use crossterm::style::{StyledContent, Stylize, style};
use diagnostics_core::HardwareInventory;

use session::{Session, SessionOptions};
use sim::SimRobot;

const USAGE: &str = "Usage: robot-emulator [--log-dir <path>] [--fms] [--bare]";

fn main() -> io::Result<()> {
    let options = parse_options().unwrap_or_else(|err| {
        eprintln!("{err}");
        eprintln!("{USAGE}");
        process::exit(2);
    });

    let robot = SimRobot::new(options.inventory);
    let mut catalog = sim::catalog(&robot);
    let registry = sim::build_registry(&mut catalog, robot.inventory())
        .map_err(|err| io::Error::other(err.to_string()))?;
    let mut session = Session::new(&robot, registry, &options)?;

    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let stdout = io::stdout();
    let mut writer = stdout.lock();
    let mut line = String::new();

    writeln!(
        writer,
        "Robot Diagnostics Emulator ready. Type `help` for commands or `exit` to quit."
    )?;
    print_lines(&mut writer, &session.boot()?)?;

    loop {
        line.clear();
        write!(writer, "> ")?;
        writer.flush()?;

        let bytes_read = reader.read_line(&mut line)?;
        if bytes_read == 0 {
            writeln!(writer)?;
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if should_terminate(trimmed) {
            break;
        }

        let responses = session.handle_command(trimmed)?;
        print_lines(&mut writer, &responses)?;
    }

    print_lines(&mut writer, &session.shutdown()?)?;
    writeln!(writer, "Session closed.")?;
    Ok(())
}

fn print_lines(writer: &mut impl Write, lines: &[String]) -> io::Result<()> {
    for response in lines {
        writeln!(writer, "{}", styled(response))?;
    }
    Ok(())
}

fn styled(line: &str) -> StyledContent<&str> {
    let content = style(line);
    if line.starts_with("ERR") || line.contains("FAULT") {
        content.red()
    } else if line.starts_with("WARN")
        || (line.starts_with("###") && !line.ends_with("No faults"))
    {
        content.yellow()
    } else if line.starts_with("OK") {
        content.green()
    } else {
        content
    }
}

fn should_terminate(input: &str) -> bool {
    input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit")
}

fn parse_options() -> Result<SessionOptions, String> {
    let mut options = SessionOptions::default();
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        if let Some(value) = arg.strip_prefix("--log-dir=") {
            options.log_dir = PathBuf::from(value);
        } else if arg == "--log-dir" {
            let value = args.next().ok_or("Expected value after --log-dir")?;
            options.log_dir = PathBuf::from(value);
        } else if arg == "--fms" {
            options.fms = true;
        } else if arg == "--bare" {
            options.inventory = HardwareInventory::none();
        } else {
            return Err(format!("Unknown argument `{arg}`"));
        }
    }
    Ok(options)
}

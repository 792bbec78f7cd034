use std::io;
use std::path::PathBuf;

#[allow(dead_code)]
#[path = "../session.rs"]
mod session;

#[allow(dead_code)]
#[path = "../sim.rs"]
mod sim;

use diagnostics_core::HardwareInventory;
use session::{Session, SessionOptions};
use sim::SimRobot;

const TRANSCRIPT_ROOT: &str = "logs/transcripts";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Scenario {
    Competition,
    Bench,
    Faults,
}

impl Scenario {
    const ALL: [Scenario; 3] = [Scenario::Competition, Scenario::Bench, Scenario::Faults];

    fn tag(self) -> &'static str {
        match self {
            Scenario::Competition => "competition",
            Scenario::Bench => "bench",
            Scenario::Faults => "faults",
        }
    }

    fn options(self) -> SessionOptions {
        SessionOptions {
            log_dir: PathBuf::from(TRANSCRIPT_ROOT).join(self.tag()),
            fms: self == Scenario::Competition,
            inventory: HardwareInventory::all(),
        }
    }

    fn commands(self) -> &'static [&'static str] {
        match self {
            Scenario::Competition => &[
                "status",
                "enable auto",
                "tick 750",
                "disable",
                "tick 50",
                "enable teleop",
                "tick 500",
                "disable",
                "print",
                "status",
            ],
            Scenario::Bench => &[
                "enable test",
                "tick 100",
                "print",
                "disable",
                "enable teleop",
                "tick 50",
                "disable",
            ],
            Scenario::Faults => &[
                "enable teleop",
                "tick 10",
                "fault lf-encoder",
                "fault master-grabber",
                "fault gyro",
                "tick 50",
                "print",
                "status",
                "restore lf-encoder",
                "restore master-grabber",
                "restore gyro",
                "tick 5",
                "print",
                "fault flux-capacitor",
                "disable",
            ],
        }
    }
}

fn main() -> io::Result<()> {
    for scenario in Scenario::ALL {
        record(scenario)?;
    }
    Ok(())
}

fn record(scenario: Scenario) -> io::Result<()> {
    let options = scenario.options();
    let robot = SimRobot::new(options.inventory);
    let mut catalog = sim::catalog(&robot);
    let registry = sim::build_registry(&mut catalog, robot.inventory())
        .map_err(|err| io::Error::other(err.to_string()))?;
    let mut session = Session::new(&robot, registry, &options)?;

    let _ = session.boot()?;
    for command in scenario.commands() {
        let _ = session.handle_command(command)?;
    }
    let _ = session.shutdown()?;
    Ok(())
}

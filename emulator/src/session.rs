use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant as HostInstant};

use diagnostics_core::console::{self, ConsoleCommand};
use diagnostics_core::lifecycle::{
    FieldManagement, LifecycleConfig, LogState, LogStorage, MatchIdentity, MatchType,
};
use diagnostics_core::{
    Dashboard, DiagnosticsMonitor, DiagnosticsRegistry, FaultIndicator, FaultSink,
    HardwareInventory, HealthReport, Reporter, RunLogLifecycle, RunMode,
};

use crate::sim::{SimFault, SimRobot, TICK};

const TRANSCRIPT_FILE: &str = "emulator-transcript.log";
const EVENT_NAME: &str = "SVR";

/// Command-line options for one emulator run.
#[derive(Clone, Debug)]
pub struct SessionOptions {
    pub log_dir: PathBuf,
    pub fms: bool,
    pub inventory: HardwareInventory,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("logs"),
            fms: false,
            inventory: HardwareInventory::all(),
        }
    }
}

pub struct Session<'r> {
    robot: &'r SimRobot,
    monitor: DiagnosticsMonitor<'r>,
    lifecycle: RunLogLifecycle<FileLogStorage>,
    storage: FileLogStorage,
    field: SimField,
    dashboard: TerminalDashboard,
    indicator: LedIndicator,
    last_report: HealthReport,
    transcript: TranscriptLogger,
    started_at: HostInstant,
    tick: u32,
}

impl<'r> Session<'r> {
    pub fn new(
        robot: &'r SimRobot,
        registry: DiagnosticsRegistry<'r>,
        options: &SessionOptions,
    ) -> io::Result<Self> {
        let transcript = TranscriptLogger::new(&options.log_dir.join(TRANSCRIPT_FILE))?;

        Ok(Self {
            robot,
            monitor: DiagnosticsMonitor::new(registry, Reporter::default()),
            lifecycle: RunLogLifecycle::new(LifecycleConfig::DEFAULT),
            storage: FileLogStorage::new(options.log_dir.clone()),
            field: SimField::new(options.fms),
            dashboard: TerminalDashboard::default(),
            indicator: LedIndicator::default(),
            last_report: HealthReport::default(),
            transcript,
            started_at: HostInstant::now(),
            tick: 0,
        })
    }

    /// The robot powers up disabled.
    pub fn boot(&mut self) -> io::Result<Vec<String>> {
        let elapsed = self.started_at.elapsed();
        let mut console = OperatorConsole::default();
        self.lifecycle.on_disabled_entry(&mut self.storage, &mut console);

        let mut lines = console.into_warnings();
        lines.push(format!(
            "OK boot checks={} log={}",
            self.monitor.registry().len(),
            describe_state(self.lifecycle.state())
        ));
        self.finish(elapsed, lines)
    }

    /// Closes the run log without reopening it.
    pub fn shutdown(&mut self) -> io::Result<Vec<String>> {
        let elapsed = self.started_at.elapsed();
        let mut console = OperatorConsole::default();
        self.trace(elapsed, &["shutdown".to_string()], &mut console);
        self.lifecycle.shutdown(&mut self.storage, &mut console);

        let mut lines = console.into_warnings();
        lines.push("OK shutdown run log closed".to_string());
        self.record_output(elapsed, &lines)?;
        Ok(lines)
    }

    pub fn handle_command(&mut self, line: &str) -> io::Result<Vec<String>> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }

        let elapsed = self.started_at.elapsed();
        self.transcript
            .append_line(elapsed, TranscriptRole::Host, trimmed)?;
        let mut console = OperatorConsole::default();
        self.trace(elapsed, &[format!("> {trimmed}")], &mut console);

        let mut lines = console.into_warnings();
        match console::parse_command(trimmed) {
            Ok(command) => lines.extend(self.execute(command)),
            Err(err) => lines.push(format!("ERR syntax {err}")),
        }

        self.finish(elapsed, lines)
    }

    fn execute(&mut self, command: ConsoleCommand<'_>) -> Vec<String> {
        match command {
            ConsoleCommand::Disable => self.handle_disable(),
            ConsoleCommand::Enable(mode) => self.handle_enable(mode),
            ConsoleCommand::Fms(attached) => {
                self.field.attached = attached;
                vec![format!("OK fms {}", attached_label(attached))]
            }
            ConsoleCommand::Tick(count) => self.handle_tick(count),
            ConsoleCommand::Print => self.handle_print(),
            ConsoleCommand::Status => self.handle_status(),
            ConsoleCommand::Fault(target) => self.handle_fault(target, true),
            ConsoleCommand::Restore(target) => self.handle_fault(target, false),
            ConsoleCommand::Help => handle_help(),
        }
    }

    fn handle_disable(&mut self) -> Vec<String> {
        if self.robot.mode().is_none() {
            return vec!["ERR already disabled".to_string()];
        }

        self.robot.set_mode(None);
        let mut console = OperatorConsole::default();
        self.lifecycle.on_disabled_entry(&mut self.storage, &mut console);

        let mut lines = console.into_warnings();
        lines.push(format!(
            "OK disabled log={}",
            describe_state(self.lifecycle.state())
        ));
        lines
    }

    fn handle_enable(&mut self, mode: RunMode) -> Vec<String> {
        if let Some(current) = self.robot.mode() {
            return vec![format!("ERR already enabled in {current}, disable first")];
        }

        let mut console = OperatorConsole::default();
        self.lifecycle
            .on_disabled_exit(mode, &mut self.field, &mut console);
        self.robot.set_mode(Some(mode));

        let mut lines = console.into_warnings();
        lines.push(format!(
            "OK enabled mode={mode} log={}",
            describe_state(self.lifecycle.state())
        ));
        lines
    }

    fn handle_tick(&mut self, count: u32) -> Vec<String> {
        for _ in 0..count {
            self.tick = self.tick.saturating_add(1);
            let now = TICK * self.tick;
            self.robot.step(now);
            self.last_report = self.monitor.update(now, &mut self.dashboard);
            if self.robot.mode().is_none() {
                self.lifecycle.on_periodic();
            }
        }

        let mut lines = vec![format!(
            "OK tick={} t=+{}ms faults={}",
            self.tick,
            self.loop_time().as_millis(),
            self.last_report.fault_count()
        )];
        for change in self.dashboard.take_changes() {
            lines.push(format!(
                "  {} {} -> {}",
                change.key,
                change.previous.map_or("unset", health_label),
                health_label(change.value)
            ));
        }
        lines
    }

    fn handle_print(&mut self) -> Vec<String> {
        let mut console = OperatorConsole::default();
        self.monitor
            .print_diagnostics(&mut console, &mut self.indicator);
        let mut lines = console.lines;
        lines.push(format!("LED {}", self.indicator.label()));
        lines
    }

    fn handle_status(&self) -> Vec<String> {
        let mode = self
            .robot
            .mode()
            .map_or_else(|| "disabled".to_string(), |mode| mode.to_string());
        let mut lines = vec![
            format!(
                "mode={mode} fms={} tick={} t=+{}ms",
                attached_label(self.field.attached),
                self.tick,
                self.loop_time().as_millis()
            ),
            format!(
                "log={} file={}",
                describe_state(self.lifecycle.state()),
                self.storage
                    .open_path()
                    .map_or_else(|| "none".to_string(), |path| path.display().to_string())
            ),
            format!(
                "checks={} faults={} LED {}",
                self.monitor.registry().len(),
                self.last_report.fault_count(),
                self.indicator.label()
            ),
            format!(
                "pressure={:.1}psi elevator={:.1}in",
                self.robot.pressure(),
                self.robot.elevator_position()
            ),
        ];
        for (subsystem, healthy) in self.last_report.subsystems.iter() {
            lines.push(format!("  {:<10} {}", subsystem.label(), health_label(healthy)));
        }

        let injected: Vec<&str> = self.robot.active_faults().map(SimFault::tag).collect();
        if !injected.is_empty() {
            lines.push(format!("injected: {}", injected.join(", ")));
        }
        lines
    }

    fn handle_fault(&mut self, target: &str, inject: bool) -> Vec<String> {
        match SimFault::from_tag(target) {
            Ok(fault) if inject => {
                self.robot.inject(fault);
                vec![format!("OK fault {fault} injected")]
            }
            Ok(fault) => {
                self.robot.restore(fault);
                vec![format!("OK fault {fault} restored")]
            }
            Err(message) => {
                let targets: Vec<&str> = SimFault::ALL.iter().map(|fault| fault.tag()).collect();
                vec![
                    format!("ERR {message}"),
                    format!("Available targets: {}", targets.join(", ")),
                ]
            }
        }
    }

    fn loop_time(&self) -> Duration {
        TICK * self.tick
    }

    /// Traces `lines` to the run log, then records them in the transcript.
    fn finish(&mut self, elapsed: Duration, mut lines: Vec<String>) -> io::Result<Vec<String>> {
        let mut console = OperatorConsole::default();
        self.trace(elapsed, &lines, &mut console);
        lines.extend(console.into_warnings());
        self.record_output(elapsed, &lines)?;
        Ok(lines)
    }

    /// Run log failures are reported to `console`; the session keeps going.
    fn trace(&mut self, elapsed: Duration, lines: &[String], console: &mut OperatorConsole) {
        let loop_time = self.loop_time();
        let Some(log) = self.lifecycle.log_mut() else {
            return;
        };
        for line in lines {
            if let Err(err) = log.write_line(elapsed, loop_time, line) {
                let path = log.path.display();
                console.report(&format!("run log: write to `{path}` failed: {err}"));
                return;
            }
        }
    }

    fn record_output(&mut self, elapsed: Duration, lines: &[String]) -> io::Result<()> {
        for line in lines {
            self.transcript
                .append_line(elapsed, TranscriptRole::Emulator, line)?;
        }
        Ok(())
    }
}

fn handle_help() -> Vec<String> {
    let mut lines = vec!["Available commands:".to_string()];
    for (usage, summary) in console::HELP {
        lines.push(format!("  {usage:<26} - {summary}"));
    }
    lines.push("Type `exit` to close the run log and quit.".to_string());
    lines
}

fn describe_state(state: &LogState) -> String {
    match state {
        LogState::Start => "closed".to_string(),
        LogState::AwaitingModeDecision => "awaiting-mode".to_string(),
        LogState::AwaitingCompetitionClose(identity) => {
            format!("awaiting-close name={}", identity.log_name())
        }
        LogState::AwaitingGenericClose(mode) => format!("awaiting-close name={mode}"),
    }
}

fn health_label(healthy: bool) -> &'static str {
    if healthy { "ok" } else { "FAULT" }
}

fn attached_label(attached: bool) -> &'static str {
    if attached { "attached" } else { "detached" }
}

/// Trace log stored as `<dir>/<name>.log`.
pub struct RunLog {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl RunLog {
    fn write_line(&mut self, elapsed: Duration, loop_time: Duration, line: &str) -> io::Result<()> {
        writeln!(
            self.writer,
            "[+{:>6} ms] [loop {:>7} ms] {}",
            elapsed.as_millis(),
            loop_time.as_millis(),
            line
        )?;
        self.writer.flush()
    }
}

/// Log storage in a host directory; closing renames the provisional file.
///
/// Existing files are never overwritten: both the provisional and the final
/// name get a numeric suffix when taken, so a log left behind by a failed
/// close survives the next open.
pub struct FileLogStorage {
    dir: PathBuf,
    open_path: Option<PathBuf>,
}

impl FileLogStorage {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            open_path: None,
        }
    }

    pub fn open_path(&self) -> Option<&Path> {
        self.open_path.as_deref()
    }

    /// First `<name>.log`, `<name>-1.log`, ... that does not exist yet.
    fn unused_path(&self, name: &str) -> PathBuf {
        let name = file_stem(name);
        let mut suffix = 0_u32;
        loop {
            let candidate = if suffix == 0 {
                self.dir.join(format!("{name}.log"))
            } else {
                self.dir.join(format!("{name}-{suffix}.log"))
            };
            if !candidate.exists() {
                return candidate;
            }
            suffix += 1;
        }
    }
}

impl LogStorage for FileLogStorage {
    type Handle = RunLog;
    type Error = io::Error;

    fn open(&mut self, provisional_name: &str) -> io::Result<RunLog> {
        fs::create_dir_all(&self.dir)?;
        let path = self.unused_path(provisional_name);
        let file = OpenOptions::new().write(true).create_new(true).open(&path)?;

        self.open_path = Some(path.clone());
        Ok(RunLog {
            path,
            writer: BufWriter::new(file),
        })
    }

    fn close(&mut self, handle: RunLog, final_name: &str) -> io::Result<()> {
        self.open_path = None;
        let RunLog { path, mut writer } = handle;
        writer.flush()?;
        drop(writer);

        let target = self.unused_path(final_name);
        fs::rename(&path, &target)
    }
}

/// Keeps `name` to a single path component made of `[A-Za-z0-9_-]`.
fn file_stem(name: &str) -> String {
    let stem: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if stem.is_empty() { "log".to_string() } else { stem }
}

/// Field management stand-in; hands out consecutive qualification matches.
struct SimField {
    attached: bool,
    next_match: u16,
}

impl SimField {
    fn new(attached: bool) -> Self {
        Self {
            attached,
            next_match: 1,
        }
    }
}

impl FieldManagement for SimField {
    type Error = &'static str;

    fn is_competition(&self) -> bool {
        self.attached
    }

    fn match_identity(&mut self) -> Result<MatchIdentity, &'static str> {
        if !self.attached {
            return Err("field detached");
        }
        let identity = MatchIdentity::new(EVENT_NAME, MatchType::Qualification, self.next_match);
        self.next_match = self.next_match.saturating_add(1);
        Ok(identity)
    }
}

struct DashboardChange {
    key: String,
    previous: Option<bool>,
    value: bool,
}

/// Dashboard that remembers values and reports what changed.
#[derive(Default)]
struct TerminalDashboard {
    values: BTreeMap<String, bool>,
    changes: Vec<DashboardChange>,
}

impl TerminalDashboard {
    fn take_changes(&mut self) -> Vec<DashboardChange> {
        std::mem::take(&mut self.changes)
    }
}

impl Dashboard for TerminalDashboard {
    fn put_boolean(&mut self, key: &str, value: bool) {
        let previous = self.values.insert(key.to_string(), value);
        if previous != Some(value) {
            self.changes.push(DashboardChange {
                key: key.to_string(),
                previous,
                value,
            });
        }
    }
}

#[derive(Default)]
struct LedIndicator {
    faulted: Option<bool>,
}

impl LedIndicator {
    fn label(&self) -> &'static str {
        match self.faulted {
            None => "off",
            Some(false) => "green",
            Some(true) => "red",
        }
    }
}

impl FaultIndicator for LedIndicator {
    fn show_fault(&mut self) {
        self.faulted = Some(true);
    }

    fn show_no_fault(&mut self) {
        self.faulted = Some(false);
    }
}

#[derive(Default)]
struct OperatorConsole {
    lines: Vec<String>,
}

impl OperatorConsole {
    fn into_warnings(self) -> Vec<String> {
        self.lines
            .into_iter()
            .map(|line| format!("WARN {line}"))
            .collect()
    }
}

impl FaultSink for OperatorConsole {
    fn report(&mut self, message: &str) {
        self.lines.push(message.to_string());
    }
}

struct TranscriptLogger {
    writer: BufWriter<File>,
}

impl TranscriptLogger {
    fn new(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        let mut logger = Self {
            writer: BufWriter::new(file),
        };

        logger.write_header()?;
        Ok(logger)
    }

    fn write_header(&mut self) -> io::Result<()> {
        writeln!(self.writer, "# Robot diagnostics emulator transcript")?;
        writeln!(
            self.writer,
            "# Timestamps are milliseconds since session start"
        )?;
        writeln!(self.writer)?;
        self.writer.flush()
    }

    fn append_line(
        &mut self,
        elapsed: Duration,
        role: TranscriptRole,
        line: &str,
    ) -> io::Result<()> {
        writeln!(
            self.writer,
            "[+{:>6} ms] {} {}",
            elapsed.as_millis(),
            role.prefix(),
            line
        )?;
        self.writer.flush()
    }
}

enum TranscriptRole {
    Host,
    Emulator,
}

impl TranscriptRole {
    fn prefix(&self) -> &'static str {
        match self {
            TranscriptRole::Host => "HOST>",
            TranscriptRole::Emulator => "EMU <",
        }
    }
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::process;

    use super::*;
    use crate::sim;

    fn scratch_dir(test: &str) -> PathBuf {
        let dir = env::temp_dir().join(format!("robot-emulator-{}-{test}", process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn log_files(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name != TRANSCRIPT_FILE)
            .collect();
        names.sort();
        names
    }

    fn write(log: &mut RunLog, line: &str) {
        log.write_line(Duration::ZERO, Duration::ZERO, line).unwrap();
    }

    #[test]
    fn provisional_log_left_by_failed_close_survives_reopen() {
        let dir = scratch_dir("left-behind");
        let mut storage = FileLogStorage::new(dir.clone());

        let mut log = storage.open("Temp").unwrap();
        write(&mut log, "match trace");
        // Never closed, as after a failed rename.
        drop(log);

        let mut next = storage.open("Temp").unwrap();
        write(&mut next, "next run");
        assert_eq!(log_files(&dir), ["Temp-1.log", "Temp.log"]);
        assert!(fs::read_to_string(dir.join("Temp.log")).unwrap().contains("match trace"));

        storage.close(next, "Test").unwrap();
        assert_eq!(log_files(&dir), ["Temp.log", "Test.log"]);
        assert!(fs::read_to_string(dir.join("Test.log")).unwrap().contains("next run"));
    }

    #[test]
    fn final_name_is_kept_inside_log_dir() {
        let dir = scratch_dir("final-name");
        let mut storage = FileLogStorage::new(dir.clone());

        let mut log = storage.open("Temp").unwrap();
        write(&mut log, "match trace");
        storage.close(log, "SV/R_Qual007").unwrap();

        assert_eq!(log_files(&dir), ["SV_R_Qual007.log"]);
        assert!(storage.open_path().is_none());
        let contents = fs::read_to_string(dir.join("SV_R_Qual007.log")).unwrap();
        assert!(contents.contains("match trace"));
    }

    #[test]
    fn repeated_final_names_get_a_suffix() {
        let dir = scratch_dir("suffix");
        let mut storage = FileLogStorage::new(dir.clone());

        for _ in 0..2 {
            let log = storage.open("Temp").unwrap();
            storage.close(log, "Test").unwrap();
        }
        assert_eq!(log_files(&dir), ["Test-1.log", "Test.log"]);
    }

    #[test]
    fn finished_run_is_renamed_and_a_new_log_opened() {
        let dir = scratch_dir("session-run");
        let robot = SimRobot::new(HardwareInventory::all());
        let mut entries = sim::catalog(&robot);
        let registry = sim::build_registry(&mut entries, robot.inventory()).unwrap();
        let options = SessionOptions {
            log_dir: dir.clone(),
            ..SessionOptions::default()
        };
        let mut session = Session::new(&robot, registry, &options).unwrap();

        session.boot().unwrap();
        session.handle_command("enable test").unwrap();
        session.handle_command("tick 5").unwrap();
        let lines = session.handle_command("disable").unwrap();
        assert!(lines.iter().any(|line| line.starts_with("OK disabled")), "{lines:?}");

        assert_eq!(log_files(&dir), ["Temp.log", "Test.log"]);
        let trace = fs::read_to_string(dir.join("Test.log")).unwrap();
        assert!(trace.contains("> enable test"));
        assert!(trace.contains("> tick 5"));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn run_log_write_failure_is_reported_and_session_continues() {
        let dir = scratch_dir("write-failure");
        let robot = SimRobot::new(HardwareInventory::all());
        let mut entries = sim::catalog(&robot);
        let registry = sim::build_registry(&mut entries, robot.inventory()).unwrap();
        let options = SessionOptions {
            log_dir: dir.clone(),
            ..SessionOptions::default()
        };
        let mut session = Session::new(&robot, registry, &options).unwrap();
        session.boot().unwrap();

        let full = OpenOptions::new().write(true).open("/dev/full").unwrap();
        session.lifecycle.log_mut().unwrap().writer = BufWriter::new(full);

        let lines = session.handle_command("status").unwrap();
        assert!(lines.iter().any(|line| line.starts_with("mode=disabled")), "{lines:?}");
        assert!(
            lines.iter().any(|line| line.starts_with("WARN run log: write to")),
            "{lines:?}"
        );

        let lines = session.handle_command("tick").unwrap();
        assert!(lines.iter().any(|line| line.starts_with("OK tick=1")), "{lines:?}");

        let lines = session.shutdown().unwrap();
        assert_eq!(lines.last().map(String::as_str), Some("OK shutdown run log closed"));
        assert!(!session.lifecycle.is_open());
    }
}

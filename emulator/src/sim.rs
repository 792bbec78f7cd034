//! Simulated robot hardware and the diagnostics catalog wired to it.
//!
//! Hardware state lives in `Cell`s so the check accessors can borrow the
//! robot immutably while the session steps it between evaluations.

use std::cell::Cell;
use std::fmt;
use std::time::Duration;

use diagnostics_core::checks::{
    ConnectivityCheck, CurrentDrawCheck, CurrentDrawConfig, ErrorRateCheck, ErrorRateConfig,
    HeartbeatCheck, HeartbeatConfig, PressureLowCheck, PressureLowConfig, StuckSwitchCheck,
    StuckSwitchConfig, UnchangedValueCheck, UnchangedValueConfig, UnpluggedSensorCheck,
    UnpluggedSensorConfig,
};
use diagnostics_core::registry::RegistryError;
use diagnostics_core::{
    DiagnosticCheck, DiagnosticsRegistry, HardwareInventory, OptionalHardware, RunMode,
    SensorFault, Subsystem, Timestamp,
};

/// Control loop period.
pub const TICK: Duration = Duration::from_millis(20);

const DRIVE_OUTPUT: f32 = 0.5;
const DRIVE_SPEED: f32 = 120.0; // encoder counts per second at full output
const MOTOR_DEADBAND: f32 = 0.1;
const FAULTY_MOTOR_ERRORS_PER_TICK: u32 = 20;

const ELEVATOR_OUTPUT: f32 = 0.5;
const ELEVATOR_SPEED: f32 = 60.0; // inches per second at full output
const ELEVATOR_MIN: f32 = 0.0;
const ELEVATOR_MAX: f32 = 60.0;

const GRABBER_OUTPUT: f32 = 0.8;
const GRABBER_AMPS_PER_OUTPUT: f32 = 20.0;
const CUBE_CYCLE_TICKS: u32 = 150;

const PRESSURE_START: f32 = 110.0;
const COMPRESSOR_ON_BELOW: f32 = 100.0;
const COMPRESSOR_OFF_AT: f32 = 120.0;
const COMPRESSOR_PSI_PER_TICK: f32 = 0.5;
const PNEUMATIC_USE_PSI: f32 = 1.0;
const PNEUMATIC_USE_EVERY_TICKS: u32 = 100;

const SONAR_BASE_INCHES: f32 = 36.0;

const ENCODER_UNCHANGED: UnchangedValueConfig = UnchangedValueConfig::new(0.01, 25);
const SWITCH_UNCHANGED: UnchangedValueConfig = UnchangedValueConfig::new(0.5, 250);
const PNEUMATICS_UNCHANGED: UnchangedValueConfig = UnchangedValueConfig::new(0.25, 50);
const SONAR_UNPLUGGED: UnpluggedSensorConfig = UnpluggedSensorConfig::DEFAULT;
const GRABBER_CURRENT: CurrentDrawConfig = CurrentDrawConfig::DEFAULT;

/// Hardware fault the operator can inject.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SimFault {
    Encoder(Wheel),
    Motor(Wheel),
    ElevatorMotor,
    ElevatorEncoder,
    LowerLimit,
    UpperLimit,
    LeftSonar,
    RightSonar,
    CubeSensor,
    Compressor,
    MasterGrabber,
    SlaveGrabber,
    Pixy,
    Gyro,
}

impl SimFault {
    pub const ALL: [SimFault; 20] = [
        SimFault::Encoder(Wheel::LeftFront),
        SimFault::Encoder(Wheel::RightFront),
        SimFault::Encoder(Wheel::LeftRear),
        SimFault::Encoder(Wheel::RightRear),
        SimFault::Motor(Wheel::LeftFront),
        SimFault::Motor(Wheel::RightFront),
        SimFault::Motor(Wheel::LeftRear),
        SimFault::Motor(Wheel::RightRear),
        SimFault::ElevatorMotor,
        SimFault::ElevatorEncoder,
        SimFault::LowerLimit,
        SimFault::UpperLimit,
        SimFault::LeftSonar,
        SimFault::RightSonar,
        SimFault::CubeSensor,
        SimFault::Compressor,
        SimFault::MasterGrabber,
        SimFault::SlaveGrabber,
        SimFault::Pixy,
        SimFault::Gyro,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            SimFault::Encoder(Wheel::LeftFront) => "lf-encoder",
            SimFault::Encoder(Wheel::RightFront) => "rf-encoder",
            SimFault::Encoder(Wheel::LeftRear) => "lr-encoder",
            SimFault::Encoder(Wheel::RightRear) => "rr-encoder",
            SimFault::Motor(Wheel::LeftFront) => "lf-motor",
            SimFault::Motor(Wheel::RightFront) => "rf-motor",
            SimFault::Motor(Wheel::LeftRear) => "lr-motor",
            SimFault::Motor(Wheel::RightRear) => "rr-motor",
            SimFault::ElevatorMotor => "elevator-motor",
            SimFault::ElevatorEncoder => "elevator-encoder",
            SimFault::LowerLimit => "lower-limit",
            SimFault::UpperLimit => "upper-limit",
            SimFault::LeftSonar => "left-sonar",
            SimFault::RightSonar => "right-sonar",
            SimFault::CubeSensor => "cube-sensor",
            SimFault::Compressor => "compressor",
            SimFault::MasterGrabber => "master-grabber",
            SimFault::SlaveGrabber => "slave-grabber",
            SimFault::Pixy => "pixy",
            SimFault::Gyro => "gyro",
        }
    }

    pub fn from_tag(tag: &str) -> Result<Self, String> {
        SimFault::ALL
            .into_iter()
            .find(|fault| fault.tag().eq_ignore_ascii_case(tag))
            .ok_or_else(|| format!("unknown fault target `{tag}`"))
    }

    fn bit(self) -> u32 {
        let index = match self {
            SimFault::Encoder(wheel) => wheel.as_index(),
            SimFault::Motor(wheel) => 4 + wheel.as_index(),
            SimFault::ElevatorMotor => 8,
            SimFault::ElevatorEncoder => 9,
            SimFault::LowerLimit => 10,
            SimFault::UpperLimit => 11,
            SimFault::LeftSonar => 12,
            SimFault::RightSonar => 13,
            SimFault::CubeSensor => 14,
            SimFault::Compressor => 15,
            SimFault::MasterGrabber => 16,
            SimFault::SlaveGrabber => 17,
            SimFault::Pixy => 18,
            SimFault::Gyro => 19,
        };
        1 << index
    }
}

impl fmt::Display for SimFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Drive wheel position.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Wheel {
    LeftFront,
    RightFront,
    LeftRear,
    RightRear,
}

pub const ALL_WHEELS: [Wheel; 4] = [
    Wheel::LeftFront,
    Wheel::RightFront,
    Wheel::LeftRear,
    Wheel::RightRear,
];

impl Wheel {
    pub const fn as_index(self) -> usize {
        match self {
            Wheel::LeftFront => 0,
            Wheel::RightFront => 1,
            Wheel::LeftRear => 2,
            Wheel::RightRear => 3,
        }
    }
}

#[derive(Default)]
struct DriveMotor {
    output: Cell<f32>,
    encoder: Cell<f32>,
    errors: Cell<u32>,
}

#[derive(Default)]
struct Elevator {
    output: Cell<f32>,
    position: Cell<f32>,
    reading: Cell<f32>,
    errors: Cell<u32>,
}

/// Simulated robot hardware.
pub struct SimRobot {
    inventory: HardwareInventory,
    faults: Cell<u32>,
    mode: Cell<Option<RunMode>>,
    now: Cell<Timestamp>,
    enabled_ticks: Cell<u32>,
    drive: [DriveMotor; 4],
    elevator: Elevator,
    grabber_output: Cell<f32>,
    cube_in_proximity: Cell<bool>,
    pressure: Cell<f32>,
    compressor_on: Cell<bool>,
    sonar_phase: Cell<f32>,
    pixy_last_frame: Cell<Option<Timestamp>>,
}

impl SimRobot {
    pub fn new(inventory: HardwareInventory) -> Self {
        let elevator = Elevator::default();
        elevator.position.set(ELEVATOR_MAX / 2.0);
        elevator.reading.set(ELEVATOR_MAX / 2.0);
        Self {
            inventory,
            faults: Cell::new(0),
            mode: Cell::new(None),
            now: Cell::new(Duration::ZERO),
            enabled_ticks: Cell::new(0),
            drive: Default::default(),
            elevator,
            grabber_output: Cell::new(0.0),
            cube_in_proximity: Cell::new(false),
            pressure: Cell::new(PRESSURE_START),
            compressor_on: Cell::new(false),
            sonar_phase: Cell::new(0.0),
            pixy_last_frame: Cell::new(None),
        }
    }

    pub fn inventory(&self) -> HardwareInventory {
        self.inventory
    }

    pub fn mode(&self) -> Option<RunMode> {
        self.mode.get()
    }

    pub fn set_mode(&self, mode: Option<RunMode>) {
        self.mode.set(mode);
    }

    pub fn inject(&self, fault: SimFault) {
        self.faults.set(self.faults.get() | fault.bit());
    }

    pub fn restore(&self, fault: SimFault) {
        self.faults.set(self.faults.get() & !fault.bit());
    }

    pub fn active_faults(&self) -> impl Iterator<Item = SimFault> + '_ {
        SimFault::ALL
            .into_iter()
            .filter(|fault| self.is_faulted(*fault))
    }

    fn is_faulted(&self, fault: SimFault) -> bool {
        self.faults.get() & fault.bit() != 0
    }

    /// Advances the physical model to `now`.
    pub fn step(&self, now: Timestamp) {
        let dt = now.saturating_sub(self.now.get()).as_secs_f32();
        self.now.set(now);
        let enabled = self.mode.get().is_some();

        self.step_drive(enabled, dt);
        self.step_elevator(enabled, dt);
        self.step_grabber(enabled);
        self.step_pneumatics(enabled);

        self.sonar_phase.set((self.sonar_phase.get() + dt) % 1.0);
        if !self.is_faulted(SimFault::Pixy) {
            self.pixy_last_frame.set(Some(now));
        }
        if enabled {
            self.enabled_ticks.set(self.enabled_ticks.get().wrapping_add(1));
        }
    }

    fn step_drive(&self, enabled: bool, dt: f32) {
        for wheel in ALL_WHEELS {
            let motor = &self.drive[wheel.as_index()];
            let output = if enabled { DRIVE_OUTPUT } else { 0.0 };
            motor.output.set(output);
            if !self.is_faulted(SimFault::Encoder(wheel)) {
                motor.encoder.set(motor.encoder.get() + output * DRIVE_SPEED * dt);
            }
            if self.is_faulted(SimFault::Motor(wheel)) {
                motor.errors.set(motor.errors.get().wrapping_add(FAULTY_MOTOR_ERRORS_PER_TICK));
            }
        }
    }

    fn step_elevator(&self, enabled: bool, dt: f32) {
        let elevator = &self.elevator;
        if enabled {
            let mut output = elevator.output.get();
            if output.abs() < MOTOR_DEADBAND {
                output = ELEVATOR_OUTPUT;
            }
            let mut position = elevator.position.get() + output * ELEVATOR_SPEED * dt;
            if position >= ELEVATOR_MAX {
                position = ELEVATOR_MAX;
                output = -ELEVATOR_OUTPUT;
            } else if position <= ELEVATOR_MIN {
                position = ELEVATOR_MIN;
                output = ELEVATOR_OUTPUT;
            }
            elevator.output.set(output);
            elevator.position.set(position);
        } else {
            elevator.output.set(0.0);
            // Resting against a limit switch would read as a stuck switch.
            let position = elevator.position.get().clamp(ELEVATOR_MIN + 1.0, ELEVATOR_MAX - 1.0);
            elevator.position.set(position);
        }

        if !self.is_faulted(SimFault::ElevatorEncoder) {
            elevator.reading.set(elevator.position.get());
        }
        if self.is_faulted(SimFault::ElevatorMotor) {
            elevator.errors.set(elevator.errors.get().wrapping_add(FAULTY_MOTOR_ERRORS_PER_TICK));
        }
    }

    fn step_grabber(&self, enabled: bool) {
        self.grabber_output.set(if enabled { GRABBER_OUTPUT } else { 0.0 });
        if enabled
            && !self.is_faulted(SimFault::CubeSensor)
            && self.enabled_ticks.get() % CUBE_CYCLE_TICKS == 0
        {
            self.cube_in_proximity.set(!self.cube_in_proximity.get());
        }
    }

    fn step_pneumatics(&self, enabled: bool) {
        let mut pressure = self.pressure.get();
        let compressor_on = enabled
            && if self.compressor_on.get() {
                pressure < COMPRESSOR_OFF_AT
            } else {
                pressure < COMPRESSOR_ON_BELOW
            };
        self.compressor_on.set(compressor_on);

        if compressor_on && !self.is_faulted(SimFault::Compressor) {
            pressure = (pressure + COMPRESSOR_PSI_PER_TICK).min(COMPRESSOR_OFF_AT);
        }
        if enabled && self.enabled_ticks.get() % PNEUMATIC_USE_EVERY_TICKS == 0 {
            pressure = (pressure - PNEUMATIC_USE_PSI).max(0.0);
        }
        self.pressure.set(pressure);
    }

    fn drive_moving(&self, wheel: Wheel) -> bool {
        self.drive[wheel.as_index()].output.get().abs() > MOTOR_DEADBAND
    }

    fn elevator_moving(&self) -> bool {
        self.elevator.output.get().abs() > MOTOR_DEADBAND
    }

    fn lower_limit(&self) -> bool {
        self.is_faulted(SimFault::LowerLimit) || self.elevator.position.get() <= ELEVATOR_MIN
    }

    fn upper_limit(&self) -> bool {
        self.is_faulted(SimFault::UpperLimit) || self.elevator.position.get() >= ELEVATOR_MAX
    }

    fn sonar(&self, fault: SimFault) -> f32 {
        if self.is_faulted(fault) {
            0.0
        } else {
            SONAR_BASE_INCHES + self.sonar_phase.get()
        }
    }

    fn grabber_current(&self, fault: SimFault) -> f32 {
        if self.is_faulted(fault) {
            0.0
        } else {
            self.grabber_output.get().abs() * GRABBER_AMPS_PER_OUTPUT
        }
    }

    pub fn pressure(&self) -> f32 {
        self.pressure.get()
    }

    pub fn elevator_position(&self) -> f32 {
        self.elevator.position.get()
    }
}

/// One catalog check plus the optional hardware it depends on.
pub struct CatalogEntry<'r> {
    pub hardware: Option<OptionalHardware>,
    pub check: Box<dyn DiagnosticCheck + 'r>,
}

impl<'r> CatalogEntry<'r> {
    fn always(check: impl DiagnosticCheck + 'r) -> Self {
        Self {
            hardware: None,
            check: Box::new(check),
        }
    }

    fn optional(hardware: OptionalHardware, check: impl DiagnosticCheck + 'r) -> Self {
        Self {
            hardware: Some(hardware),
            check: Box::new(check),
        }
    }
}

/// Builds every check the robot knows about, in dashboard order.
pub fn catalog(robot: &SimRobot) -> Vec<CatalogEntry<'_>> {
    let mut entries = Vec::new();
    drivebase_checks(robot, &mut entries);
    elevator_checks(robot, &mut entries);
    sensor_checks(robot, &mut entries);
    pressure_checks(robot, &mut entries);
    grabber_checks(robot, &mut entries);
    entries
}

/// Registers the catalog, skipping checks for hardware that is not installed.
pub fn build_registry<'a>(
    entries: &'a mut [CatalogEntry<'_>],
    inventory: HardwareInventory,
) -> Result<DiagnosticsRegistry<'a>, RegistryError> {
    let mut builder = DiagnosticsRegistry::builder(inventory);
    for entry in entries {
        match entry.hardware {
            Some(hardware) => {
                builder.register_optional(hardware, entry.check.as_mut())?;
            }
            None => builder.register(entry.check.as_mut())?,
        }
    }
    Ok(builder.build())
}

fn drivebase_checks<'r>(robot: &'r SimRobot, entries: &mut Vec<CatalogEntry<'r>>) {
    const ENCODERS: [&str; 4] = ["lf encoder", "rf encoder", "lr encoder", "rr encoder"];
    const ERRORS: [&str; 4] = [
        "lf motor errors",
        "rf motor errors",
        "lr motor errors",
        "rr motor errors",
    ];

    for wheel in ALL_WHEELS {
        let motor = &robot.drive[wheel.as_index()];
        entries.push(CatalogEntry::always(UnchangedValueCheck::new(
            ENCODERS[wheel.as_index()],
            Subsystem::Drivebase,
            move || -> Result<f32, SensorFault> { Ok(motor.encoder.get()) },
            move || -> Result<bool, SensorFault> { Ok(robot.drive_moving(wheel)) },
            ENCODER_UNCHANGED,
        )));
    }
    for wheel in ALL_WHEELS {
        let motor = &robot.drive[wheel.as_index()];
        entries.push(CatalogEntry::always(ErrorRateCheck::new(
            ERRORS[wheel.as_index()],
            Subsystem::Drivebase,
            move || -> Result<u32, SensorFault> { Ok(motor.errors.get()) },
            ErrorRateConfig::DEFAULT,
        )));
    }
}

fn elevator_checks<'r>(robot: &'r SimRobot, entries: &mut Vec<CatalogEntry<'r>>) {
    let elevator = &robot.elevator;
    entries.push(CatalogEntry::always(ErrorRateCheck::new(
        "elevator motor errors",
        Subsystem::Elevator,
        move || -> Result<u32, SensorFault> { Ok(elevator.errors.get()) },
        ErrorRateConfig::DEFAULT,
    )));
    entries.push(CatalogEntry::always(StuckSwitchCheck::new(
        "elevator lower limit stuck",
        Subsystem::Elevator,
        move || -> Result<bool, SensorFault> { Ok(robot.lower_limit()) },
        StuckSwitchConfig::DEFAULT,
    )));
    entries.push(CatalogEntry::always(StuckSwitchCheck::new(
        "elevator upper limit stuck",
        Subsystem::Elevator,
        move || -> Result<bool, SensorFault> { Ok(robot.upper_limit()) },
        StuckSwitchConfig::DEFAULT,
    )));
    entries.push(CatalogEntry::always(UnchangedValueCheck::new(
        "elev L switch unchanged",
        Subsystem::Elevator,
        move || -> Result<f32, SensorFault> { Ok(level(robot.lower_limit())) },
        move || -> Result<bool, SensorFault> { Ok(robot.elevator_moving()) },
        SWITCH_UNCHANGED,
    )));
    entries.push(CatalogEntry::always(UnchangedValueCheck::new(
        "elev U switch unchanged",
        Subsystem::Elevator,
        move || -> Result<f32, SensorFault> { Ok(level(robot.upper_limit())) },
        move || -> Result<bool, SensorFault> { Ok(robot.elevator_moving()) },
        SWITCH_UNCHANGED,
    )));
    entries.push(CatalogEntry::always(UnchangedValueCheck::new(
        "elevator position",
        Subsystem::Elevator,
        move || -> Result<f32, SensorFault> { Ok(elevator.reading.get()) },
        move || -> Result<bool, SensorFault> { Ok(robot.elevator_moving()) },
        ENCODER_UNCHANGED,
    )));
}

fn sensor_checks<'r>(robot: &'r SimRobot, entries: &mut Vec<CatalogEntry<'r>>) {
    entries.push(CatalogEntry::optional(
        OptionalHardware::LeftSonar,
        UnpluggedSensorCheck::new(
            "left sonar",
            Subsystem::Sensors,
            move || -> Result<f32, SensorFault> { Ok(robot.sonar(SimFault::LeftSonar)) },
            SONAR_UNPLUGGED,
        ),
    ));
    entries.push(CatalogEntry::optional(
        OptionalHardware::RightSonar,
        UnpluggedSensorCheck::new(
            "right sonar",
            Subsystem::Sensors,
            move || -> Result<f32, SensorFault> { Ok(robot.sonar(SimFault::RightSonar)) },
            SONAR_UNPLUGGED,
        ),
    ));
    entries.push(CatalogEntry::always(UnchangedValueCheck::new(
        "cube proximity sensor",
        Subsystem::Sensors,
        move || -> Result<f32, SensorFault> { Ok(level(robot.cube_in_proximity.get())) },
        move || -> Result<bool, SensorFault> {
            Ok(robot.grabber_output.get().abs() > MOTOR_DEADBAND)
        },
        SWITCH_UNCHANGED,
    )));
    entries.push(CatalogEntry::optional(
        OptionalHardware::VisionCamera,
        HeartbeatCheck::new(
            "pixy errors",
            Subsystem::Sensors,
            move || -> Result<Option<Timestamp>, SensorFault> { Ok(robot.pixy_last_frame.get()) },
            HeartbeatConfig::DEFAULT,
        ),
    ));
    entries.push(CatalogEntry::optional(
        OptionalHardware::Gyro,
        ConnectivityCheck::new(
            "gyro connected",
            Subsystem::Sensors,
            move || -> Result<bool, SensorFault> { Ok(!robot.is_faulted(SimFault::Gyro)) },
        ),
    ));
}

fn pressure_checks<'r>(robot: &'r SimRobot, entries: &mut Vec<CatalogEntry<'r>>) {
    entries.push(CatalogEntry::always(UnchangedValueCheck::new(
        "pneumatics working",
        Subsystem::Pressure,
        move || -> Result<f32, SensorFault> { Ok(robot.pressure.get()) },
        move || -> Result<bool, SensorFault> { Ok(robot.compressor_on.get()) },
        PNEUMATICS_UNCHANGED,
    )));
    entries.push(CatalogEntry::always(PressureLowCheck::new(
        "pneumatics charged",
        Subsystem::Pressure,
        move || -> Result<f32, SensorFault> { Ok(robot.pressure.get()) },
        PressureLowConfig::DEFAULT,
    )));
}

fn grabber_checks<'r>(robot: &'r SimRobot, entries: &mut Vec<CatalogEntry<'r>>) {
    for (name, fault) in [
        ("master grabber motor", SimFault::MasterGrabber),
        ("slave grabber motor", SimFault::SlaveGrabber),
    ] {
        entries.push(CatalogEntry::always(CurrentDrawCheck::new(
            name,
            Subsystem::Grabber,
            move || -> Result<f32, SensorFault> { Ok(robot.grabber_current(fault)) },
            move || -> Result<f32, SensorFault> { Ok(robot.grabber_output.get()) },
            GRABBER_CURRENT,
        )));
    }
}

fn level(active: bool) -> f32 {
    if active { 1.0 } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use diagnostics_core::{Dashboard, DiagnosticsMonitor, Reporter};

    use super::*;

    struct NullDashboard;

    impl Dashboard for NullDashboard {
        fn put_boolean(&mut self, _key: &str, _value: bool) {}
    }

    fn run(robot: &SimRobot, monitor: &mut DiagnosticsMonitor<'_>, from: u32, ticks: u32) -> usize {
        let mut faults = 0;
        for tick in from..from + ticks {
            let now = TICK * tick;
            robot.step(now);
            faults = monitor.update(now, &mut NullDashboard).fault_count();
        }
        faults
    }

    #[test]
    fn full_catalog_registers_every_check() {
        let robot = SimRobot::new(HardwareInventory::all());
        let mut entries = catalog(&robot);
        let registry = build_registry(&mut entries, robot.inventory()).unwrap();
        assert_eq!(registry.len(), 23);
    }

    #[test]
    fn bare_robot_skips_optional_hardware() {
        let robot = SimRobot::new(HardwareInventory::none());
        let mut entries = catalog(&robot);
        let registry = build_registry(&mut entries, robot.inventory()).unwrap();
        assert_eq!(registry.len(), 19);
        assert!(registry.result("gyro connected").is_none());
    }

    #[test]
    fn healthy_robot_runs_without_faults() {
        let robot = SimRobot::new(HardwareInventory::all());
        let mut entries = catalog(&robot);
        let registry = build_registry(&mut entries, robot.inventory()).unwrap();
        let mut monitor = DiagnosticsMonitor::new(registry, Reporter::default());

        assert_eq!(run(&robot, &mut monitor, 1, 100), 0);
        robot.set_mode(Some(RunMode::Teleop));
        assert_eq!(run(&robot, &mut monitor, 101, 2_000), 0);
        robot.set_mode(None);
        assert_eq!(run(&robot, &mut monitor, 2_101, 200), 0);
    }

    #[test]
    fn injected_encoder_fault_is_isolated() {
        let robot = SimRobot::new(HardwareInventory::all());
        let mut entries = catalog(&robot);
        let registry = build_registry(&mut entries, robot.inventory()).unwrap();
        let mut monitor = DiagnosticsMonitor::new(registry, Reporter::default());

        robot.set_mode(Some(RunMode::Autonomous));
        robot.inject(SimFault::Encoder(Wheel::RightRear));
        assert_eq!(run(&robot, &mut monitor, 1, 30), 1);

        let health = monitor.registry().health();
        assert_eq!(health.checks.get("rr encoder"), Some(false));
        assert!(!health.subsystems.get(Subsystem::Drivebase));
        assert!(health.subsystems.get(Subsystem::Elevator));

        robot.restore(SimFault::Encoder(Wheel::RightRear));
        assert_eq!(run(&robot, &mut monitor, 31, 1), 0);
    }

    #[test]
    fn fault_tags_round_trip() {
        for fault in SimFault::ALL {
            assert_eq!(SimFault::from_tag(fault.tag()), Ok(fault));
        }
        assert!(SimFault::from_tag("flux-capacitor").is_err());
    }
}

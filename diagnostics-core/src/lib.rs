#![no_std]

// Shared logic for on-board robot diagnostics and run-log management.
//
// This crate stays portable across the robot controller and host tooling by
// avoiding the Rust standard library. Hardware, display and storage are reached
// only through the traits exposed here.

#[macro_use]
mod logging;

pub mod checks;
pub mod console;
pub mod health;
pub mod lifecycle;
pub mod monitor;
pub mod registry;
pub mod report;
pub mod subsystem;

pub use checks::{DiagnosticCheck, Sample, SensorFault, TestResult, Timestamp};
pub use health::{CheckHealth, HealthReport, SubsystemHealth};
pub use lifecycle::{LogState, RunLogLifecycle, RunMode};
pub use monitor::DiagnosticsMonitor;
pub use registry::{DiagnosticsRegistry, HardwareInventory, OptionalHardware, RegistryBuilder};
pub use report::{Dashboard, FaultIndicator, FaultSink, Reporter};
pub use subsystem::Subsystem;

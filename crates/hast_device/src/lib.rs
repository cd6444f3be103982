//! Target device models for hardware generation.
//!
//! A [`DeviceManifest`] describes the clock and bus of a device. A
//! [`TimingReport`] holds the measured latency of every operator on the
//! device, and a [`DeviceDriver`] turns those latencies into the clock cycle
//! estimates the transformer schedules states by.
//!
//! # Usage
//!
//! ```
//! use hast_device::{builtin_manifest, BinaryOperation, BinaryOperator, DeviceDriver,
//!     TimingReport, TimingReportDeviceDriver};
//!
//! let report = TimingReport::parse("Op\tInType\tOutType\tDPD\tTWDFR\nadd\tunsigned32\tunsigned32\t4.5\t0.5\n").unwrap();
//! let driver = TimingReportDeviceDriver::new(builtin_manifest("Nexys A7").unwrap(), report);
//! let cycles = driver.clock_cycles_needed_for_binary_operation(
//!     &BinaryOperation::new(BinaryOperator::Add, 32, false),
//! );
//! assert!((cycles - 0.5).abs() < 1e-9);
//! ```

#![warn(missing_docs)]

pub mod driver;
pub mod manifest;
pub mod operators;
pub mod timing_report;

pub use driver::{BinaryOperation, DeviceDriver, TimingReportDeviceDriver, INSTANT_OPERATION_CYCLES};
pub use manifest::{builtin_manifest, builtin_manifests, DeviceManifest};
pub use operators::{BinaryOperator, UnaryOperator};
pub use timing_report::{TimingReport, TimingReportError};

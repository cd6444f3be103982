//! Clock cycle estimates for operations on a device.

use crate::manifest::DeviceManifest;
use crate::operators::{BinaryOperator, UnaryOperator};
use crate::timing_report::TimingReport;
use tracing::warn;

/// Cycles assumed for operations that synthesize to wiring, and for
/// operations the timing report has no data on.
pub const INSTANT_OPERATION_CYCLES: f64 = 0.1;

/// A binary operation whose cost is queried.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinaryOperation {
    /// The operator.
    pub operator: BinaryOperator,
    /// Width of the operands in bits.
    pub operand_width: u32,
    /// Whether the operands are signed.
    pub is_signed: bool,
    /// The right operand, when it is a compile-time constant.
    pub constant_right_operand: Option<i64>,
}

impl BinaryOperation {
    /// An operation on non-constant operands.
    pub fn new(operator: BinaryOperator, operand_width: u32, is_signed: bool) -> Self {
        Self {
            operator,
            operand_width,
            is_signed,
            constant_right_operand: None,
        }
    }

    /// Marks the right operand as the given constant.
    pub fn with_constant_right_operand(mut self, value: i64) -> Self {
        self.constant_right_operand = Some(value);
        self
    }

    /// Multiplication or division by a constant power of two, which is a
    /// plain shift in hardware.
    pub fn is_power_of_two_scaling(&self) -> bool {
        matches!(
            self.operator,
            BinaryOperator::Multiply | BinaryOperator::Divide
        ) && self
            .constant_right_operand
            .is_some_and(|value| value > 0 && value.count_ones() == 1)
    }
}

/// The device collaborator of the transformer.
pub trait DeviceDriver: std::fmt::Debug + Send + Sync {
    /// The device's manifest.
    fn manifest(&self) -> &DeviceManifest;

    /// Clock cycles a binary operation takes, possibly fractional.
    fn clock_cycles_needed_for_binary_operation(&self, operation: &BinaryOperation) -> f64;

    /// Clock cycles a unary operation takes, possibly fractional.
    fn clock_cycles_needed_for_unary_operation(
        &self,
        operator: UnaryOperator,
        operand_width: u32,
        is_signed: bool,
    ) -> f64;
}

/// A [`DeviceDriver`] backed by a parsed [`TimingReport`].
#[derive(Debug, Clone)]
pub struct TimingReportDeviceDriver {
    manifest: DeviceManifest,
    timing_report: TimingReport,
}

impl TimingReportDeviceDriver {
    /// Creates a driver for `manifest` using latencies from `timing_report`.
    pub fn new(manifest: DeviceManifest, timing_report: TimingReport) -> Self {
        Self {
            manifest,
            timing_report,
        }
    }

    /// The underlying report.
    pub fn timing_report(&self) -> &TimingReport {
        &self.timing_report
    }

    fn cycles_for(&self, operation: &str, latency_ns: Option<f64>, operand_width: u32, is_signed: bool) -> f64 {
        match latency_ns {
            Some(latency) => latency / self.manifest.clock_period_ns(),
            None => {
                warn!(
                    device = %self.manifest.name,
                    operation,
                    operand_width,
                    is_signed,
                    "no timing data for operation, assuming {INSTANT_OPERATION_CYCLES} clock cycles"
                );
                INSTANT_OPERATION_CYCLES
            }
        }
    }
}

impl DeviceDriver for TimingReportDeviceDriver {
    fn manifest(&self) -> &DeviceManifest {
        &self.manifest
    }

    fn clock_cycles_needed_for_binary_operation(&self, operation: &BinaryOperation) -> f64 {
        if operation.is_power_of_two_scaling() {
            return INSTANT_OPERATION_CYCLES;
        }
        let latency = self.timing_report.binary_operation_latency_ns(
            operation.operator,
            operation.operand_width,
            operation.is_signed,
        );
        self.cycles_for(
            operation.operator.timing_report_name(),
            latency,
            operation.operand_width,
            operation.is_signed,
        )
    }

    fn clock_cycles_needed_for_unary_operation(
        &self,
        operator: UnaryOperator,
        operand_width: u32,
        is_signed: bool,
    ) -> f64 {
        let latency = self
            .timing_report
            .unary_operation_latency_ns(operator, operand_width, is_signed);
        self.cycles_for(operator.timing_report_name(), latency, operand_width, is_signed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::builtin_manifest;

    fn driver() -> TimingReportDeviceDriver {
        let report = TimingReport::parse(
            "Op\tInType\tOutType\tDPD\tTWDFR
add\tunsigned32\tunsigned32\t4.5\t0.5
mul\tunsigned32\tunsigned32\t20.0\t5.0
neg\tsigned32\tsigned32\t2.0\t0.5
",
        )
        .unwrap();
        TimingReportDeviceDriver::new(builtin_manifest("Nexys A7").unwrap(), report)
    }

    fn close(actual: f64, expected: f64) -> bool {
        (actual - expected).abs() < 1e-9
    }

    #[test]
    fn cycles_are_latency_over_clock_period() {
        let driver = driver();
        let add = BinaryOperation::new(BinaryOperator::Add, 32, false);
        assert!(close(driver.clock_cycles_needed_for_binary_operation(&add), 0.5));
        let mul = BinaryOperation::new(BinaryOperator::Multiply, 32, false);
        assert!(close(driver.clock_cycles_needed_for_binary_operation(&mul), 2.5));
        assert!(close(
            driver.clock_cycles_needed_for_unary_operation(UnaryOperator::Negate, 32, true),
            0.25
        ));
    }

    #[test]
    fn power_of_two_scaling_is_instant() {
        let driver = driver();
        let mul = BinaryOperation::new(BinaryOperator::Multiply, 32, false).with_constant_right_operand(8);
        assert!(mul.is_power_of_two_scaling());
        assert!(close(
            driver.clock_cycles_needed_for_binary_operation(&mul),
            INSTANT_OPERATION_CYCLES
        ));
        let not_power = BinaryOperation::new(BinaryOperator::Multiply, 32, false).with_constant_right_operand(6);
        assert!(!not_power.is_power_of_two_scaling());
        let add = BinaryOperation::new(BinaryOperator::Add, 32, false).with_constant_right_operand(8);
        assert!(!add.is_power_of_two_scaling());
        let negative = BinaryOperation::new(BinaryOperator::Divide, 32, true).with_constant_right_operand(-4);
        assert!(!negative.is_power_of_two_scaling());
    }

    #[test_log::test]
    fn missing_timing_data_falls_back() {
        let driver = driver();
        let div = BinaryOperation::new(BinaryOperator::Divide, 32, false);
        assert!(close(
            driver.clock_cycles_needed_for_binary_operation(&div),
            INSTANT_OPERATION_CYCLES
        ));
        assert!(close(
            driver.clock_cycles_needed_for_unary_operation(UnaryOperator::Not, 8, false),
            INSTANT_OPERATION_CYCLES
        ));
    }

    #[test]
    fn driver_is_object_safe() {
        let driver: Box<dyn DeviceDriver> = Box::new(driver());
        assert_eq!(driver.manifest().name, "Nexys A7");
    }
}

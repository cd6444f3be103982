//! Parsing of operator timing reports.
//!
//! A timing report is a tab-separated table produced by synthesizing every
//! supported operator on the target device:
//!
//! ```text
//! Op   InType      OutType     DPD    TWDFR
//! add  unsigned32  unsigned32  4.123  0.512
//! ```
//!
//! `DPD` is the data path delay and `TWDFR` the worst-case delay from the
//! clock edge to the register, both in nanoseconds. Their sum is the latency.

use crate::operators::{BinaryOperator, UnaryOperator};
use serde::Deserialize;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::io::Read;

/// Errors raised while reading a timing report.
#[derive(Debug, thiserror::Error)]
pub enum TimingReportError {
    /// The table could not be read.
    #[error("malformed timing report: {0}")]
    Csv(#[from] csv::Error),

    /// An `InType` cell is neither `signedN`, `unsignedN`, `boolean` nor `std_logic`.
    #[error("unrecognized operand type '{0}' in timing report")]
    InvalidType(String),

    /// A delay column holds a negative number.
    #[error("negative latency for operation '{operation}'")]
    NegativeLatency {
        /// The offending `Op` cell.
        operation: String,
    },

    /// Two rows measure the same operation on the same operand type.
    #[error("duplicate timing report row for '{operation}' on {in_type}")]
    DuplicateOperation {
        /// The repeated `Op` cell.
        operation: String,
        /// The repeated `InType` cell.
        in_type: String,
    },
}

#[derive(Debug, Deserialize)]
struct TimingReportRow {
    #[serde(rename = "Op")]
    operation: String,
    #[serde(rename = "InType")]
    in_type: String,
    #[serde(rename = "DPD")]
    data_path_delay: f64,
    #[serde(rename = "TWDFR")]
    clock_to_register_delay: f64,
}

/// Identifies one measured operation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct OperationKey {
    operation: String,
    operand_width: u32,
    is_signed: bool,
}

/// Operator latencies of one device, in nanoseconds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimingReport {
    latencies: BTreeMap<OperationKey, f64>,
}

impl TimingReport {
    /// Parses a report from text.
    pub fn parse(text: &str) -> Result<Self, TimingReportError> {
        Self::from_reader(text.as_bytes())
    }

    /// Parses a report from any reader.
    ///
    /// Rows are keyed by `Op` and `InType` only, since callers never know
    /// the output type; a repeated key is an error.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, TimingReportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .trim(csv::Trim::All)
            .flexible(false)
            .from_reader(reader);

        let mut latencies = BTreeMap::new();
        for row in csv_reader.deserialize() {
            let row: TimingReportRow = row?;
            if row.data_path_delay < 0.0 || row.clock_to_register_delay < 0.0 {
                return Err(TimingReportError::NegativeLatency {
                    operation: row.operation,
                });
            }
            let (operand_width, is_signed) = parse_operand_type(&row.in_type)?;
            let key = OperationKey {
                operation: row.operation.to_ascii_lowercase(),
                operand_width,
                is_signed,
            };
            match latencies.entry(key) {
                Entry::Occupied(_) => {
                    return Err(TimingReportError::DuplicateOperation {
                        operation: row.operation,
                        in_type: row.in_type,
                    });
                }
                Entry::Vacant(slot) => {
                    slot.insert(row.data_path_delay + row.clock_to_register_delay);
                }
            }
        }
        Ok(Self { latencies })
    }

    /// Latency of `operation` on operands of the given width and signedness.
    pub fn latency_ns(&self, operation: &str, operand_width: u32, is_signed: bool) -> Option<f64> {
        self.latencies
            .get(&OperationKey {
                operation: operation.to_ascii_lowercase(),
                operand_width,
                is_signed,
            })
            .copied()
    }

    /// Latency of a binary operator.
    pub fn binary_operation_latency_ns(
        &self,
        operator: BinaryOperator,
        operand_width: u32,
        is_signed: bool,
    ) -> Option<f64> {
        self.latency_ns(operator.timing_report_name(), operand_width, is_signed)
    }

    /// Latency of a unary operator.
    pub fn unary_operation_latency_ns(
        &self,
        operator: UnaryOperator,
        operand_width: u32,
        is_signed: bool,
    ) -> Option<f64> {
        self.latency_ns(operator.timing_report_name(), operand_width, is_signed)
    }

    /// Number of measured operations.
    pub fn len(&self) -> usize {
        self.latencies.len()
    }

    /// Returns `true` if nothing was measured.
    pub fn is_empty(&self) -> bool {
        self.latencies.is_empty()
    }
}

fn parse_operand_type(text: &str) -> Result<(u32, bool), TimingReportError> {
    let lower = text.to_ascii_lowercase();
    if lower == "boolean" || lower == "std_logic" {
        return Ok((1, false));
    }
    let (digits, is_signed) = if let Some(rest) = lower.strip_prefix("unsigned") {
        (rest, false)
    } else if let Some(rest) = lower.strip_prefix("signed") {
        (rest, true)
    } else {
        return Err(TimingReportError::InvalidType(text.to_owned()));
    };
    digits
        .parse::<u32>()
        .ok()
        .filter(|width| *width > 0)
        .map(|width| (width, is_signed))
        .ok_or_else(|| TimingReportError::InvalidType(text.to_owned()))
}

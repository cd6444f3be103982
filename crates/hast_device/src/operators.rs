//! Operators whose latency the timing report records.

use serde::{Deserialize, Serialize};

/// A binary operator of the input program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BinaryOperator {
    /// `+`
    Add,
    /// `-`
    Subtract,
    /// `*`
    Multiply,
    /// `/`
    Divide,
    /// `%`
    Modulus,
    /// `&`
    And,
    /// `|`
    Or,
    /// `^`
    ExclusiveOr,
    /// `<<`
    ShiftLeft,
    /// `>>`
    ShiftRight,
    /// `==`
    Equality,
    /// `!=`
    Inequality,
    /// `<`
    LessThan,
    /// `<=`
    LessThanOrEqual,
    /// `>`
    GreaterThan,
    /// `>=`
    GreaterThanOrEqual,
}

impl BinaryOperator {
    /// The operator's name in the `Op` column of a timing report.
    pub fn timing_report_name(self) -> &'static str {
        match self {
            BinaryOperator::Add => "add",
            BinaryOperator::Subtract => "sub",
            BinaryOperator::Multiply => "mul",
            BinaryOperator::Divide => "div",
            BinaryOperator::Modulus => "mod",
            BinaryOperator::And => "and",
            BinaryOperator::Or => "or",
            BinaryOperator::ExclusiveOr => "xor",
            BinaryOperator::ShiftLeft => "sll",
            BinaryOperator::ShiftRight => "srl",
            BinaryOperator::Equality => "eq",
            BinaryOperator::Inequality => "neq",
            BinaryOperator::LessThan => "lt",
            BinaryOperator::LessThanOrEqual => "le",
            BinaryOperator::GreaterThan => "gt",
            BinaryOperator::GreaterThanOrEqual => "ge",
        }
    }

    /// `true` for operators yielding a boolean.
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOperator::Equality
                | BinaryOperator::Inequality
                | BinaryOperator::LessThan
                | BinaryOperator::LessThanOrEqual
                | BinaryOperator::GreaterThan
                | BinaryOperator::GreaterThanOrEqual
        )
    }
}

/// A unary operator of the input program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UnaryOperator {
    /// Logical or bitwise `!`.
    Not,
    /// Arithmetic `-`.
    Negate,
}

impl UnaryOperator {
    /// The operator's name in the `Op` column of a timing report.
    pub fn timing_report_name(self) -> &'static str {
        match self {
            UnaryOperator::Not => "not",
            UnaryOperator::Negate => "neg",
        }
    }
}

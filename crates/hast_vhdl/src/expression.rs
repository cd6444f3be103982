//! Expressions, literals and references to data objects.

use crate::options::VhdlGenerationOptions;
use crate::render::{identifier, join, Render};
use hast_common::BitMask;
use serde::{Deserialize, Serialize};

/// The class of a data object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataObjectKind {
    /// A signal; assigned with `<=`.
    Signal,
    /// A variable; assigned with `:=`.
    Variable,
    /// A constant.
    Constant,
}

impl DataObjectKind {
    pub(crate) fn keyword(self) -> &'static str {
        match self {
            DataObjectKind::Signal => "signal",
            DataObjectKind::Variable => "variable",
            DataObjectKind::Constant => "constant",
        }
    }
}

/// A by-name reference to a signal, variable or constant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DataObjectReference {
    /// What the name refers to.
    pub kind: DataObjectKind,
    /// The unescaped name.
    pub name: String,
}

impl DataObjectReference {
    /// A reference to a signal.
    pub fn signal(name: impl Into<String>) -> Self {
        Self {
            kind: DataObjectKind::Signal,
            name: name.into(),
        }
    }

    /// A reference to a variable.
    pub fn variable(name: impl Into<String>) -> Self {
        Self {
            kind: DataObjectKind::Variable,
            name: name.into(),
        }
    }

    /// A reference to a constant.
    pub fn constant(name: impl Into<String>) -> Self {
        Self {
            kind: DataObjectKind::Constant,
            name: name.into(),
        }
    }
}

impl Render for DataObjectReference {
    fn to_vhdl(&self, options: &VhdlGenerationOptions) -> String {
        identifier(&self.name, options)
    }
}

/// A literal value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Value {
    /// `true` / `false`.
    Boolean(bool),
    /// A decimal integer literal.
    Integer(i64),
    /// A character literal.
    Character(char),
    /// A `std_logic` literal such as `'1'` or `'Z'`.
    StdLogic(char),
    /// A bit string literal, most significant bit first.
    BitVector(String),
    /// An aggregate setting every element, `(others => 'c')`.
    Others(char),
}

impl Value {
    /// A bit string literal of the mask's full width.
    pub fn from_bit_mask(mask: &BitMask) -> Self {
        let bits = (0..mask.size())
            .rev()
            .map(|index| if mask.get_bit(index) { '1' } else { '0' })
            .collect();
        Value::BitVector(bits)
    }
}

impl Render for Value {
    fn to_vhdl(&self, _options: &VhdlGenerationOptions) -> String {
        match self {
            Value::Boolean(value) => value.to_string(),
            Value::Integer(value) => value.to_string(),
            Value::Character(value) | Value::StdLogic(value) => format!("'{value}'"),
            Value::BitVector(bits) => format!("\"{bits}\""),
            Value::Others(value) => format!("(others => '{value}')"),
        }
    }
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum BinaryOperator {
    And,
    Or,
    Nand,
    Nor,
    Xor,
    Xnor,
    Equality,
    Inequality,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    ShiftLeftLogical,
    ShiftRightLogical,
    Add,
    Subtract,
    Concatenation,
    Multiply,
    Divide,
    Modulus,
    Remainder,
}

impl BinaryOperator {
    /// The operator's VHDL symbol.
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOperator::And => "and",
            BinaryOperator::Or => "or",
            BinaryOperator::Nand => "nand",
            BinaryOperator::Nor => "nor",
            BinaryOperator::Xor => "xor",
            BinaryOperator::Xnor => "xnor",
            BinaryOperator::Equality => "=",
            BinaryOperator::Inequality => "/=",
            BinaryOperator::LessThan => "<",
            BinaryOperator::LessThanOrEqual => "<=",
            BinaryOperator::GreaterThan => ">",
            BinaryOperator::GreaterThanOrEqual => ">=",
            BinaryOperator::ShiftLeftLogical => "sll",
            BinaryOperator::ShiftRightLogical => "srl",
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Concatenation => "&",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulus => "mod",
            BinaryOperator::Remainder => "rem",
        }
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOperator {
    /// Logical `not`.
    Not,
    /// Arithmetic negation.
    Negation,
}

/// A function call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invokation {
    /// Name of the called function.
    pub target: String,
    /// Arguments in order.
    pub arguments: Vec<Expression>,
}

impl Invokation {
    /// A call of `target` with `arguments`.
    pub fn new(target: impl Into<String>, arguments: Vec<Expression>) -> Self {
        Self {
            target: target.into(),
            arguments,
        }
    }

    fn call(target: &str, arguments: Vec<Expression>) -> Expression {
        Expression::Invokation(Self::new(target, arguments))
    }

    /// `to_integer(e)`.
    pub fn to_integer(expression: Expression) -> Expression {
        Self::call("to_integer", vec![expression])
    }

    /// `resize(e, size)`.
    pub fn resize(expression: Expression, size: u32) -> Expression {
        Self::call(
            "resize",
            vec![expression, Value::Integer(i64::from(size)).into()],
        )
    }

    /// `to_unsigned(e, size)`.
    pub fn to_unsigned(expression: Expression, size: u32) -> Expression {
        Self::call(
            "to_unsigned",
            vec![expression, Value::Integer(i64::from(size)).into()],
        )
    }

    /// `to_signed(e, size)`.
    pub fn to_signed(expression: Expression, size: u32) -> Expression {
        Self::call(
            "to_signed",
            vec![expression, Value::Integer(i64::from(size)).into()],
        )
    }

    /// `signed(e)`.
    pub fn signed(expression: Expression) -> Expression {
        Self::call("signed", vec![expression])
    }

    /// `unsigned(e)`.
    pub fn unsigned(expression: Expression) -> Expression {
        Self::call("unsigned", vec![expression])
    }

    /// `std_logic_vector(e)`.
    pub fn std_logic_vector(expression: Expression) -> Expression {
        Self::call("std_logic_vector", vec![expression])
    }

    /// `rising_edge(e)`.
    pub fn rising_edge(expression: Expression) -> Expression {
        Self::call("rising_edge", vec![expression])
    }
}

impl Render for Invokation {
    fn to_vhdl(&self, options: &VhdlGenerationOptions) -> String {
        let target = identifier(&self.target, options);
        if self.arguments.is_empty() {
            target
        } else {
            format!("{target}({})", join(&self.arguments, ", ", options))
        }
    }
}

/// A VHDL expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    /// A literal.
    Value(Value),
    /// A signal, variable or constant.
    Reference(DataObjectReference),
    /// An enumeration literal, rendered as an identifier.
    EnumValue(String),
    /// `target(index)`.
    Index {
        /// The indexed array.
        target: Box<Expression>,
        /// The index.
        index: Box<Expression>,
    },
    /// `target.field`.
    Field {
        /// The record.
        target: Box<Expression>,
        /// The field name.
        field: String,
    },
    /// `(left op right)`.
    Binary {
        /// The operator.
        operator: BinaryOperator,
        /// Left operand.
        left: Box<Expression>,
        /// Right operand.
        right: Box<Expression>,
    },
    /// A unary operation.
    Unary {
        /// The operator.
        operator: UnaryOperator,
        /// The operand.
        operand: Box<Expression>,
    },
    /// A function call.
    Invokation(Invokation),
    /// Unescaped text.
    Raw(String),
}

impl Expression {
    /// `(left op right)`.
    pub fn binary(operator: BinaryOperator, left: Expression, right: Expression) -> Self {
        Expression::Binary {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// `not e` or `-e`.
    pub fn unary(operator: UnaryOperator, operand: Expression) -> Self {
        Expression::Unary {
            operator,
            operand: Box::new(operand),
        }
    }

    /// `target(index)`.
    pub fn index(target: Expression, index: Expression) -> Self {
        Expression::Index {
            target: Box::new(target),
            index: Box::new(index),
        }
    }

    /// `target.field`.
    pub fn field(target: Expression, field: impl Into<String>) -> Self {
        Expression::Field {
            target: Box::new(target),
            field: field.into(),
        }
    }

    /// `left = right`.
    pub fn equals(left: Expression, right: Expression) -> Self {
        Self::binary(BinaryOperator::Equality, left, right)
    }

    /// The class of the data object this expression ultimately names, if any.
    pub fn data_object_kind(&self) -> Option<DataObjectKind> {
        match self {
            Expression::Reference(reference) => Some(reference.kind),
            Expression::Index { target, .. } | Expression::Field { target, .. } => {
                target.data_object_kind()
            }
            _ => None,
        }
    }
}

impl From<Value> for Expression {
    fn from(value: Value) -> Self {
        Expression::Value(value)
    }
}

impl From<DataObjectReference> for Expression {
    fn from(reference: DataObjectReference) -> Self {
        Expression::Reference(reference)
    }
}

impl From<Invokation> for Expression {
    fn from(invokation: Invokation) -> Self {
        Expression::Invokation(invokation)
    }
}

impl Render for Expression {
    fn to_vhdl(&self, options: &VhdlGenerationOptions) -> String {
        match self {
            Expression::Value(value) => value.to_vhdl(options),
            Expression::Reference(reference) => reference.to_vhdl(options),
            Expression::EnumValue(name) => identifier(name, options),
            Expression::Index { target, index } => {
                format!("{}({})", target.to_vhdl(options), index.to_vhdl(options))
            }
            Expression::Field { target, field } => {
                format!("{}.{}", target.to_vhdl(options), identifier(field, options))
            }
            Expression::Binary {
                operator,
                left,
                right,
            } => format!(
                "({} {} {})",
                left.to_vhdl(options),
                operator.symbol(),
                right.to_vhdl(options)
            ),
            Expression::Unary { operator, operand } => match operator {
                UnaryOperator::Not => format!("not {}", operand.to_vhdl(options)),
                UnaryOperator::Negation => format!("-{}", operand.to_vhdl(options)),
            },
            Expression::Invokation(invokation) => invokation.to_vhdl(options),
            Expression::Raw(code) => code.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> VhdlGenerationOptions {
        VhdlGenerationOptions::debug()
    }

    #[test]
    fn literals() {
        assert_eq!(Value::Boolean(true).to_vhdl(&options()), "true");
        assert_eq!(Value::Integer(-4).to_vhdl(&options()), "-4");
        assert_eq!(Value::StdLogic('1').to_vhdl(&options()), "'1'");
        assert_eq!(Value::Others('0').to_vhdl(&options()), "(others => '0')");
    }

    #[test]
    fn bit_mask_literal_is_msb_first() {
        let mask = BitMask::from_u32(0b1011, 6);
        assert_eq!(Value::from_bit_mask(&mask).to_vhdl(&options()), "\"001011\"");
        assert_eq!(Value::from_bit_mask(&BitMask::zero(0)).to_vhdl(&options()), "\"\"");
    }

    #[test]
    fn nested_expression() {
        let sum = Expression::binary(
            BinaryOperator::Add,
            DataObjectReference::variable("Run.a").into(),
            Invokation::to_unsigned(Value::Integer(1).into(), 32),
        );
        let compared = Expression::binary(BinaryOperator::GreaterThan, sum, Value::Integer(0).into());
        assert_eq!(
            compared.to_vhdl(&options()),
            "((\\Run.a\\ + to_unsigned(1, 32)) > 0)"
        );
    }

    #[test]
    fn access_expressions() {
        let element = Expression::index(
            DataObjectReference::signal("Cells").into(),
            Value::Integer(3).into(),
        );
        assert_eq!(element.to_vhdl(&options()), "Cells(3)");
        assert_eq!(element.data_object_kind(), Some(DataObjectKind::Signal));

        let field = Expression::field(DataObjectReference::variable("p").into(), "X");
        assert_eq!(field.to_vhdl(&options()), "p.X");
        assert_eq!(field.data_object_kind(), Some(DataObjectKind::Variable));
        assert_eq!(Expression::Raw("x".to_owned()).data_object_kind(), None);
    }

    #[test]
    fn unary_and_calls() {
        let clock = DataObjectReference::signal("Clock");
        assert_eq!(
            Invokation::rising_edge(clock.clone().into()).to_vhdl(&options()),
            "rising_edge(Clock)"
        );
        assert_eq!(
            Expression::unary(UnaryOperator::Not, clock.into()).to_vhdl(&options()),
            "not Clock"
        );
        assert_eq!(Invokation::new("now", Vec::new()).to_vhdl(&options()), "now");
    }
}

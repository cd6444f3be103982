//! VHDL data types.
//!
//! Scalar and sized types are referenced inline (`unsigned(31 downto 0)`);
//! arrays, records and enums are declared once with a `type` declaration
//! and then referenced by name.

use crate::expression::{Expression, Value};
use crate::options::VhdlGenerationOptions;
use crate::render::{identifier, indent, Render};
use serde::{Deserialize, Serialize};

/// The base name of a sized vector type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SizedTypeName {
    /// `unsigned` from `numeric_std`.
    Unsigned,
    /// `signed` from `numeric_std`.
    Signed,
    /// `std_logic_vector`.
    StdLogicVector,
}

impl SizedTypeName {
    fn keyword(self) -> &'static str {
        match self {
            SizedTypeName::Unsigned => "unsigned",
            SizedTypeName::Signed => "signed",
            SizedTypeName::StdLogicVector => "std_logic_vector",
        }
    }
}

/// One field of a record type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordField {
    /// Field name.
    pub name: String,
    /// Field type.
    pub data_type: DataType,
}

impl Render for RecordField {
    fn to_vhdl(&self, options: &VhdlGenerationOptions) -> String {
        format!(
            "{}: {};{}",
            identifier(&self.name, options),
            self.data_type.to_vhdl(options),
            options.newline()
        )
    }
}

/// An enumeration type, e.g. the states of a state machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enum {
    /// Type name.
    pub name: String,
    /// Literals in declaration order.
    pub values: Vec<String>,
}

/// A VHDL type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DataType {
    /// `boolean`.
    Boolean,
    /// `integer`.
    Integer,
    /// `natural`.
    Natural,
    /// `character`.
    Character,
    /// `std_logic`.
    StdLogic,
    /// A vector type with an explicit bit width.
    Sized {
        /// The vector's base type.
        name: SizedTypeName,
        /// Width in bits.
        size: u32,
    },
    /// `integer range from to to`.
    Ranged {
        /// Lowest value.
        from: i64,
        /// Highest value.
        to: i64,
    },
    /// A constrained array type `array (0 to length - 1) of element`.
    Array {
        /// Type name.
        name: String,
        /// Element type.
        element: Box<DataType>,
        /// Number of elements.
        length: u32,
    },
    /// A record type.
    Record {
        /// Type name.
        name: String,
        /// Fields in declaration order.
        fields: Vec<RecordField>,
    },
    /// An enumeration type.
    Enum(Enum),
}

impl DataType {
    /// `unsigned(size - 1 downto 0)`.
    pub fn unsigned(size: u32) -> Self {
        DataType::Sized {
            name: SizedTypeName::Unsigned,
            size,
        }
    }

    /// `signed(size - 1 downto 0)`.
    pub fn signed(size: u32) -> Self {
        DataType::Sized {
            name: SizedTypeName::Signed,
            size,
        }
    }

    /// `std_logic_vector(size - 1 downto 0)`.
    pub fn std_logic_vector(size: u32) -> Self {
        DataType::Sized {
            name: SizedTypeName::StdLogicVector,
            size,
        }
    }

    /// Returns `true` for types that need a `type` declaration.
    pub fn is_composite(&self) -> bool {
        matches!(
            self,
            DataType::Array { .. } | DataType::Record { .. } | DataType::Enum(_)
        )
    }

    /// The `type ... is ...;` declaration of a composite type, `None` for
    /// types referenced inline.
    pub fn to_declaration(&self, options: &VhdlGenerationOptions) -> Option<String> {
        let newline = options.newline();
        let code = match self {
            DataType::Array {
                name,
                element,
                length,
            } => format!(
                "type {} is array (0 to {}) of {};{newline}",
                identifier(name, options),
                i64::from(*length) - 1,
                element.to_vhdl(options)
            ),
            DataType::Record { name, fields } => format!(
                "type {} is record{newline}{}end record;{newline}",
                identifier(name, options),
                indent(&fields.to_vhdl(options), options)
            ),
            DataType::Enum(enumeration) => {
                let values: Vec<String> = enumeration
                    .values
                    .iter()
                    .map(|value| identifier(value, options))
                    .collect();
                format!(
                    "type {} is ({});{newline}",
                    identifier(&enumeration.name, options),
                    values.join(", ")
                )
            }
            _ => return None,
        };
        Some(code)
    }

    /// The value a reset restores objects of this type to.
    pub fn default_value(&self) -> Option<Expression> {
        let value = match self {
            DataType::Boolean => Value::Boolean(false),
            DataType::Integer | DataType::Natural => Value::Integer(0),
            DataType::Ranged { from, .. } => Value::Integer(*from),
            DataType::Character => Value::Character(' '),
            DataType::StdLogic => Value::StdLogic('0'),
            DataType::Sized { .. } => Value::Others('0'),
            DataType::Enum(enumeration) => {
                return enumeration.values.first().cloned().map(Expression::EnumValue);
            }
            DataType::Array { .. } | DataType::Record { .. } => return None,
        };
        Some(Expression::Value(value))
    }
}

impl Render for DataType {
    /// Renders a reference to the type.
    fn to_vhdl(&self, options: &VhdlGenerationOptions) -> String {
        match self {
            DataType::Boolean => "boolean".to_owned(),
            DataType::Integer => "integer".to_owned(),
            DataType::Natural => "natural".to_owned(),
            DataType::Character => "character".to_owned(),
            DataType::StdLogic => "std_logic".to_owned(),
            DataType::Sized { name, size } => {
                format!("{}({} downto 0)", name.keyword(), i64::from(*size) - 1)
            }
            DataType::Ranged { from, to } => format!("integer range {from} to {to}"),
            DataType::Array { name, .. } | DataType::Record { name, .. } => {
                identifier(name, options)
            }
            DataType::Enum(enumeration) => identifier(&enumeration.name, options),
        }
    }
}

impl Render for Enum {
    fn to_vhdl(&self, options: &VhdlGenerationOptions) -> String {
        DataType::Enum(self.clone())
            .to_declaration(options)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> VhdlGenerationOptions {
        VhdlGenerationOptions::debug()
    }

    #[test]
    fn inline_references() {
        assert_eq!(DataType::Boolean.to_vhdl(&options()), "boolean");
        assert_eq!(DataType::unsigned(32).to_vhdl(&options()), "unsigned(31 downto 0)");
        assert_eq!(DataType::signed(8).to_vhdl(&options()), "signed(7 downto 0)");
        assert_eq!(
            DataType::Ranged { from: 0, to: 5 }.to_vhdl(&options()),
            "integer range 0 to 5"
        );
        assert!(DataType::Integer.to_declaration(&options()).is_none());
    }

    #[test]
    fn array_declaration() {
        let array = DataType::Array {
            name: "unsigned32_Array".to_owned(),
            element: Box::new(DataType::unsigned(32)),
            length: 4,
        };
        assert_eq!(
            array.to_declaration(&options()).unwrap(),
            "type unsigned32_Array is array (0 to 3) of unsigned(31 downto 0);\n"
        );
        assert_eq!(array.to_vhdl(&options()), "unsigned32_Array");
    }

    #[test]
    fn enum_declaration_keeps_value_order() {
        let states = Enum {
            name: "Run._States".to_owned(),
            values: vec!["Run._State_0".to_owned(), "Run._State_1".to_owned()],
        };
        assert_eq!(
            states.to_vhdl(&options()),
            "type \\Run._States\\ is (\\Run._State_0\\, \\Run._State_1\\);\n"
        );
    }

    #[test]
    fn record_declaration() {
        let record = DataType::Record {
            name: "Point".to_owned(),
            fields: vec![
                RecordField {
                    name: "X".to_owned(),
                    data_type: DataType::Integer,
                },
                RecordField {
                    name: "Y".to_owned(),
                    data_type: DataType::Boolean,
                },
            ],
        };
        assert_eq!(
            record.to_declaration(&options()).unwrap(),
            "type Point is record\n    X: integer;\n    Y: boolean;\nend record;\n"
        );
    }

    #[test]
    fn default_values() {
        let render = |data_type: DataType| {
            data_type
                .default_value()
                .map(|value| value.to_vhdl(&options()))
        };
        assert_eq!(render(DataType::Boolean).as_deref(), Some("false"));
        assert_eq!(render(DataType::unsigned(4)).as_deref(), Some("(others => '0')"));
        assert_eq!(
            render(DataType::Enum(Enum {
                name: "S".to_owned(),
                values: vec!["Idle".to_owned(), "Busy".to_owned()],
            }))
            .as_deref(),
            Some("Idle")
        );
        assert_eq!(render(DataType::Record { name: "R".to_owned(), fields: Vec::new() }), None);
    }
}

//! Declarations: ports, data objects, aliases, attributes, components.

use crate::data_type::DataType;
use crate::expression::{DataObjectKind, DataObjectReference, Expression};
use crate::options::VhdlGenerationOptions;
use crate::render::{comment_lines, identifier, indent, statement_line, Render};
use serde::{Deserialize, Serialize};

/// Direction of a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortMode {
    /// `in`.
    In,
    /// `out`.
    Out,
    /// `inout`.
    InOut,
    /// `buffer`.
    Buffer,
}

impl PortMode {
    fn keyword(self) -> &'static str {
        match self {
            PortMode::In => "in",
            PortMode::Out => "out",
            PortMode::InOut => "inout",
            PortMode::Buffer => "buffer",
        }
    }
}

/// A port of an entity or component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Port {
    /// Port name.
    pub name: String,
    /// Direction.
    pub mode: PortMode,
    /// Type.
    pub data_type: DataType,
}

impl Port {
    /// Creates a port.
    pub fn new(name: impl Into<String>, mode: PortMode, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            mode,
            data_type,
        }
    }

    /// A signal reference to this port.
    pub fn to_reference(&self) -> DataObjectReference {
        DataObjectReference::signal(self.name.clone())
    }
}

impl Render for Port {
    fn to_vhdl(&self, options: &VhdlGenerationOptions) -> String {
        format!(
            "{}: {} {}",
            identifier(&self.name, options),
            self.mode.keyword(),
            self.data_type.to_vhdl(options)
        )
    }
}

/// The `port(...);` clause of an entity or component; empty without ports.
pub(crate) fn port_clause(ports: &[Port], options: &VhdlGenerationOptions) -> String {
    if ports.is_empty() {
        return String::new();
    }
    let newline = options.newline();
    let rendered: Vec<String> = ports.iter().map(|port| port.to_vhdl(options)).collect();
    let separator = format!(";{newline}");
    format!(
        "port({newline}{}{newline});{newline}",
        indent(&rendered.join(&separator), options).trim_end()
    )
}

/// A signal, variable or constant declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataObject {
    /// Signal, variable or constant.
    pub kind: DataObjectKind,
    /// Whether a variable is declared `shared`.
    pub shared: bool,
    /// Name.
    pub name: String,
    /// Type.
    pub data_type: DataType,
    /// Initial value, also restored on reset.
    pub initial_value: Option<Expression>,
}

impl DataObject {
    fn new(kind: DataObjectKind, name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            kind,
            shared: false,
            name: name.into(),
            data_type,
            initial_value: None,
        }
    }

    /// A signal without initial value.
    pub fn signal(name: impl Into<String>, data_type: DataType) -> Self {
        Self::new(DataObjectKind::Signal, name, data_type)
    }

    /// A process-local variable without initial value.
    pub fn variable(name: impl Into<String>, data_type: DataType) -> Self {
        Self::new(DataObjectKind::Variable, name, data_type)
    }

    /// A shared variable, visible to every process of the architecture.
    pub fn shared_variable(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            shared: true,
            ..Self::new(DataObjectKind::Variable, name, data_type)
        }
    }

    /// A constant.
    pub fn constant(name: impl Into<String>, data_type: DataType, value: Expression) -> Self {
        Self::new(DataObjectKind::Constant, name, data_type).with_initial_value(value)
    }

    /// Sets the initial value.
    pub fn with_initial_value(mut self, value: Expression) -> Self {
        self.initial_value = Some(value);
        self
    }

    /// A reference to this object.
    pub fn to_reference(&self) -> DataObjectReference {
        DataObjectReference {
            kind: self.kind,
            name: self.name.clone(),
        }
    }
}

impl Render for DataObject {
    fn to_vhdl(&self, options: &VhdlGenerationOptions) -> String {
        let shared = if self.shared { "shared " } else { "" };
        let initial = self
            .initial_value
            .as_ref()
            .map(|value| format!(" := {}", value.to_vhdl(options)))
            .unwrap_or_default();
        statement_line(
            &format!(
                "{shared}{} {}: {}{initial}",
                self.kind.keyword(),
                identifier(&self.name, options),
                self.data_type.to_vhdl(options)
            ),
            options,
        )
    }
}

/// `alias name: type is object;`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alias {
    /// Alias name.
    pub name: String,
    /// Type of the aliased object.
    pub data_type: DataType,
    /// The aliased object.
    pub object: Expression,
}

impl Render for Alias {
    fn to_vhdl(&self, options: &VhdlGenerationOptions) -> String {
        statement_line(
            &format!(
                "alias {}: {} is {}",
                identifier(&self.name, options),
                self.data_type.to_vhdl(options),
                self.object.to_vhdl(options)
            ),
            options,
        )
    }
}

/// `attribute name: type;`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    /// Attribute name.
    pub name: String,
    /// Attribute value type.
    pub data_type: DataType,
}

impl Render for Attribute {
    fn to_vhdl(&self, options: &VhdlGenerationOptions) -> String {
        statement_line(
            &format!(
                "attribute {}: {}",
                identifier(&self.name, options),
                self.data_type.to_vhdl(options)
            ),
            options,
        )
    }
}

/// `attribute name of item: class is value;`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeSpecification {
    /// The specified attribute.
    pub attribute: String,
    /// The decorated item.
    pub item: String,
    /// Entity class of the item, e.g. `signal`.
    pub item_class: String,
    /// Attribute value.
    pub value: Expression,
}

impl Render for AttributeSpecification {
    fn to_vhdl(&self, options: &VhdlGenerationOptions) -> String {
        statement_line(
            &format!(
                "attribute {} of {}: {} is {}",
                identifier(&self.attribute, options),
                identifier(&self.item, options),
                self.item_class,
                self.value.to_vhdl(options)
            ),
            options,
        )
    }
}

/// A component declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    /// Component name, matching the instantiated entity.
    pub name: String,
    /// Ports.
    pub ports: Vec<Port>,
}

impl Render for Component {
    fn to_vhdl(&self, options: &VhdlGenerationOptions) -> String {
        let newline = options.newline();
        let name = identifier(&self.name, options);
        format!(
            "component {name} is{newline}{}end component;{newline}",
            indent(&port_clause(&self.ports, options), options)
        )
    }
}

/// Anything that can appear in a declarative part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Declaration {
    /// Signal, variable or constant.
    DataObject(DataObject),
    /// A type declaration; inline types render nothing.
    Type(DataType),
    /// An alias.
    Alias(Alias),
    /// An attribute.
    Attribute(Attribute),
    /// An attribute specification.
    AttributeSpecification(AttributeSpecification),
    /// A component declaration.
    Component(Component),
    /// A `--` comment.
    LineComment(String),
    /// Unescaped text.
    Raw(String),
}

impl From<DataObject> for Declaration {
    fn from(data_object: DataObject) -> Self {
        Declaration::DataObject(data_object)
    }
}

impl Render for Declaration {
    fn to_vhdl(&self, options: &VhdlGenerationOptions) -> String {
        match self {
            Declaration::DataObject(data_object) => data_object.to_vhdl(options),
            Declaration::Type(data_type) => data_type.to_declaration(options).unwrap_or_default(),
            Declaration::Alias(alias) => alias.to_vhdl(options),
            Declaration::Attribute(attribute) => attribute.to_vhdl(options),
            Declaration::AttributeSpecification(specification) => specification.to_vhdl(options),
            Declaration::Component(component) => component.to_vhdl(options),
            Declaration::LineComment(text) => comment_lines(text, options),
            Declaration::Raw(code) => code.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::Value;

    fn options() -> VhdlGenerationOptions {
        VhdlGenerationOptions::debug()
    }

    #[test]
    fn signal_with_initial_value() {
        let started = DataObject::signal("Run._Started", DataType::Boolean)
            .with_initial_value(Value::Boolean(false).into());
        assert_eq!(
            started.to_vhdl(&options()),
            "signal \\Run._Started\\: boolean := false;\n"
        );
        assert_eq!(started.to_reference().kind, DataObjectKind::Signal);
    }

    #[test]
    fn shared_variable_and_constant() {
        let shared = DataObject::shared_variable("Counter", DataType::Integer);
        assert_eq!(shared.to_vhdl(&options()), "shared variable Counter: integer;\n");
        let constant = DataObject::constant("Width", DataType::Integer, Value::Integer(8).into());
        assert_eq!(constant.to_vhdl(&options()), "constant Width: integer := 8;\n");
    }

    #[test]
    fn component_declaration() {
        let component = Component {
            name: "Adder".to_owned(),
            ports: vec![
                Port::new("A", PortMode::In, DataType::unsigned(8)),
                Port::new("Sum", PortMode::Out, DataType::unsigned(8)),
            ],
        };
        assert_eq!(
            component.to_vhdl(&options()),
            "component Adder is\n    port(\n        A: in unsigned(7 downto 0);\n        Sum: out unsigned(7 downto 0)\n    );\nend component;\n"
        );
    }

    #[test]
    fn empty_port_list_renders_nothing() {
        assert_eq!(port_clause(&[], &options()), "");
    }

    #[test]
    fn attribute_specification() {
        let specification = AttributeSpecification {
            attribute: "dont_touch".to_owned(),
            item: "Run._Started".to_owned(),
            item_class: "signal".to_owned(),
            value: Expression::Raw("\"true\"".to_owned()),
        };
        assert_eq!(
            specification.to_vhdl(&options()),
            "attribute dont_touch of \\Run._Started\\: signal is \"true\";\n"
        );
    }

    #[test]
    fn comments_follow_options() {
        let comment = Declaration::LineComment("generated".to_owned());
        assert_eq!(comment.to_vhdl(&options()), "-- generated\n");
        assert_eq!(comment.to_vhdl(&VhdlGenerationOptions::default()), "");
    }
}

//! An intermediate representation of VHDL and its textual rendering.
//!
//! Every node implements [`Render`], turning itself into VHDL source under a
//! given set of [`VhdlGenerationOptions`]. Nodes own their children; signals,
//! variables and components are referred to by name only.
//!
//! Names are stored unescaped. Anything that is not a plain VHDL identifier
//! is rendered as an extended identifier (`\Some.Name\`), optionally passed
//! through the configured [`NameShortening`] first.

#![warn(missing_docs)]

pub mod data_type;
pub mod declaration;
pub mod design;
pub mod expression;
pub mod options;
pub mod render;
pub mod statement;

pub use data_type::{DataType, Enum, RecordField, SizedTypeName};
pub use declaration::{
    Alias, Attribute, AttributeSpecification, Component, DataObject, Declaration, Port, PortMode,
};
pub use design::{Architecture, Entity, Library, Module, VhdlManifest};
pub use expression::{
    BinaryOperator, DataObjectKind, DataObjectReference, Expression, Invokation, UnaryOperator,
    Value,
};
pub use options::{NameShortening, VhdlGenerationOptions};
pub use render::{identifier, indent, terminate, Render};
pub use statement::{
    Assignment, Case, CaseWhen, ComponentInstance, ConditionalSignalAssignment, ElseIf, IfElse,
    PortMapping, Process, SignalAssignmentWhen, Statement,
};

//! Mapping of syntax tree types to VHDL types.

use crate::error::TransformError;
use crate::tree::{SyntaxTree, TypeDefinition, TypeRef};
use hast_vhdl::{DataType, Enum, RecordField};
use std::collections::BTreeSet;

/// The VHDL literal of an enum variant. Variants are prefixed with their
/// type so that equally named variants of different enums stay distinct.
pub fn enum_literal(enum_name: &str, variant: &str) -> String {
    format!("{enum_name}.{variant}")
}

/// Name of the array type holding `length` elements of `element`.
pub fn array_type_name(element: &TypeRef, length: u32) -> String {
    let element_name = match element {
        TypeRef::Bool => "boolean".to_string(),
        TypeRef::Int { width, signed: false } => format!("unsigned{width}"),
        TypeRef::Int { width, signed: true } => format!("signed{width}"),
        TypeRef::Named(name) => name.clone(),
        TypeRef::Array { .. } => "array".to_string(),
    };
    format!("{element_name}_Array{length}")
}

/// Resolves [`TypeRef`]s against the named types of a tree.
#[derive(Debug, Clone, Copy)]
pub struct TypeMapper<'a> {
    tree: &'a SyntaxTree,
}

impl<'a> TypeMapper<'a> {
    /// A mapper for `tree`.
    pub fn new(tree: &'a SyntaxTree) -> Self {
        Self { tree }
    }

    /// The definition of a named type.
    pub fn definition(&self, name: &str) -> Result<&'a TypeDefinition, TransformError> {
        self.tree
            .type_definition(name)
            .ok_or_else(|| TransformError::UnknownType(name.to_string()))
    }

    /// The VHDL type of `type_ref`.
    pub fn data_type(&self, type_ref: &TypeRef) -> Result<DataType, TransformError> {
        match type_ref {
            TypeRef::Bool => Ok(DataType::Boolean),
            TypeRef::Int { width, signed: false } => Ok(DataType::unsigned(*width)),
            TypeRef::Int { width, signed: true } => Ok(DataType::signed(*width)),
            TypeRef::Array { element, length } => {
                let length = length.ok_or_else(|| {
                    TransformError::UnknownType(format!("{type_ref:?} without a length"))
                })?;
                Ok(DataType::Array {
                    name: array_type_name(element, length),
                    element: Box::new(self.data_type(element)?),
                    length,
                })
            }
            TypeRef::Named(name) => match self.definition(name)? {
                TypeDefinition::Record { name, fields } => Ok(DataType::Record {
                    name: name.clone(),
                    fields: fields
                        .iter()
                        .map(|field| {
                            Ok(RecordField {
                                name: field.name.clone(),
                                data_type: self.data_type(&field.type_ref)?,
                            })
                        })
                        .collect::<Result<_, TransformError>>()?,
                }),
                TypeDefinition::Enum { name, variants } => Ok(DataType::Enum(Enum {
                    name: name.clone(),
                    values: variants
                        .iter()
                        .map(|variant| enum_literal(name, variant))
                        .collect(),
                })),
            },
        }
    }

    /// The type of `field` of the record named `record`.
    pub fn field_type(&self, record: &str, field: &str) -> Result<&'a TypeRef, TransformError> {
        match self.definition(record)? {
            TypeDefinition::Record { fields, .. } => fields
                .iter()
                .find(|candidate| candidate.name == field)
                .map(|candidate| &candidate.type_ref)
                .ok_or_else(|| TransformError::UnknownType(format!("{record}.{field}"))),
            TypeDefinition::Enum { .. } => Err(TransformError::UnknownType(format!("{record}.{field}"))),
        }
    }

    /// Declarations for every composite type the given members use, plus
    /// every named type of the tree, each after the types it depends on.
    pub fn type_declarations<'b>(
        &self,
        used: impl IntoIterator<Item = &'b TypeRef>,
    ) -> Result<Vec<DataType>, TransformError> {
        let mut declared = BTreeSet::new();
        let mut declarations = Vec::new();
        for definition in &self.tree.types {
            self.declare(&TypeRef::Named(definition.name().to_string()), &mut declared, &mut declarations)?;
        }
        for type_ref in used {
            self.declare(type_ref, &mut declared, &mut declarations)?;
        }
        Ok(declarations)
    }

    fn declare(
        &self,
        type_ref: &TypeRef,
        declared: &mut BTreeSet<String>,
        declarations: &mut Vec<DataType>,
    ) -> Result<(), TransformError> {
        match type_ref {
            TypeRef::Array { element, .. } => self.declare(element, declared, declarations)?,
            TypeRef::Named(name) => {
                if let TypeDefinition::Record { fields, .. } = self.definition(name)? {
                    for field in fields {
                        self.declare(&field.type_ref, declared, declarations)?;
                    }
                }
            }
            TypeRef::Bool | TypeRef::Int { .. } => return Ok(()),
        }
        let data_type = self.data_type(type_ref)?;
        let name = match &data_type {
            DataType::Array { name, .. } | DataType::Record { name, .. } => name.clone(),
            DataType::Enum(enumeration) => enumeration.name.clone(),
            _ => return Ok(()),
        };
        if declared.insert(name) {
            declarations.push(data_type);
        }
        Ok(())
    }
}

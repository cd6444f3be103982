//! Design units: libraries, entities, architectures, modules and manifests.

use crate::declaration::{port_clause, Declaration, Port};
use crate::options::VhdlGenerationOptions;
use crate::render::{identifier, indent, Render};
use crate::statement::Statement;
use serde::{Deserialize, Serialize};

/// A `library` clause with its `use` clauses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Library {
    /// Library name.
    pub name: String,
    /// Used packages relative to the library, e.g. `std_logic_1164.all`.
    pub uses: Vec<String>,
}

impl Library {
    /// `ieee` with `std_logic_1164` and `numeric_std`.
    pub fn ieee() -> Self {
        Self {
            name: "ieee".to_owned(),
            uses: vec!["std_logic_1164.all".to_owned(), "numeric_std.all".to_owned()],
        }
    }
}

impl Render for Library {
    fn to_vhdl(&self, options: &VhdlGenerationOptions) -> String {
        let newline = options.newline();
        let mut code = format!("library {};{newline}", self.name);
        for used in &self.uses {
            code.push_str(&format!("use {}.{used};{newline}", self.name));
        }
        code
    }
}

/// An entity with its ports.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Entity name.
    pub name: String,
    /// Ports in declaration order.
    pub ports: Vec<Port>,
    /// Entity declarative part.
    pub declarations: Vec<Declaration>,
}

impl Entity {
    /// An entity without ports.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

impl Render for Entity {
    fn to_vhdl(&self, options: &VhdlGenerationOptions) -> String {
        let newline = options.newline();
        let name = identifier(&self.name, options);
        format!(
            "entity {name} is{newline}{}{}end {name};{newline}",
            indent(&port_clause(&self.ports, options), options),
            indent(&self.declarations.to_vhdl(options), options)
        )
    }
}

/// An architecture body of an entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Architecture {
    /// Architecture name.
    pub name: String,
    /// Name of the implemented entity.
    pub entity_name: String,
    /// Declarative part.
    pub declarations: Vec<Declaration>,
    /// Concurrent statements.
    pub body: Vec<Statement>,
}

impl Render for Architecture {
    fn to_vhdl(&self, options: &VhdlGenerationOptions) -> String {
        let newline = options.newline();
        let name = identifier(&self.name, options);
        format!(
            "architecture {name} of {} is{newline}{}begin{newline}{}end {name};{newline}",
            identifier(&self.entity_name, options),
            indent(&self.declarations.to_vhdl(options), options),
            indent(&self.body.to_vhdl(options), options)
        )
    }
}

/// Libraries, entity and architecture forming one design file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Module {
    /// Library clauses.
    pub libraries: Vec<Library>,
    /// The entity.
    pub entity: Entity,
    /// Its architecture.
    pub architecture: Architecture,
}

impl Module {
    /// A module with `ieee` imported and an empty architecture named `Imp`.
    pub fn new(entity_name: impl Into<String>) -> Self {
        let entity = Entity::new(entity_name);
        let architecture = Architecture {
            name: "Imp".to_owned(),
            entity_name: entity.name.clone(),
            ..Architecture::default()
        };
        Self {
            libraries: vec![Library::ieee()],
            entity,
            architecture,
        }
    }
}

impl Render for Module {
    fn to_vhdl(&self, options: &VhdlGenerationOptions) -> String {
        format!(
            "{}{}{}{}",
            self.libraries.to_vhdl(options),
            self.entity.to_vhdl(options),
            options.newline(),
            self.architecture.to_vhdl(options)
        )
    }
}

/// The complete generated hardware: the top module plus any modules it uses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VhdlManifest {
    /// The top-level module.
    pub top_module: Module,
    /// Additional modules.
    pub modules: Vec<Module>,
}

impl Render for VhdlManifest {
    fn to_vhdl(&self, options: &VhdlGenerationOptions) -> String {
        let mut code = self.top_module.to_vhdl(options);
        for module in &self.modules {
            code.push_str(options.newline());
            code.push_str(&module.to_vhdl(options));
        }
        code
    }
}

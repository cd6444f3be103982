//! The bookkeeping of one synthesizable unit.

use crate::naming;
use hast_vhdl::{
    DataObject, DataObjectReference, DataType, Declaration, Process, Statement, Value,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The storage, signals and call bookkeeping of one component.
///
/// A component owns everything it declares. Other components reach its
/// signals only through the invocation proxies, which look them up by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchitectureComponent {
    /// Stable name; not a VHDL identifier.
    pub name: String,
    /// Variables of the component's process.
    pub local_variables: Vec<DataObject>,
    /// Shared variables declared at architecture level.
    pub global_variables: Vec<DataObject>,
    /// Signals the component drives, other than `_Finished`.
    pub signals: Vec<DataObject>,
    /// Signals the component declares but an invocation proxy drives: its
    /// parameter inputs and the completion and return signals of its call
    /// slots. `_Started` is one of these too, but is not listed.
    pub incoming_signals: Vec<DataObject>,
    /// For every callee, how many invocations this component may have
    /// running at the same time.
    pub other_member_max_call_instance_counts: BTreeMap<String, u32>,
    /// Whether the component drives the SimpleMemory bus.
    pub uses_simple_memory: bool,
}

impl ArchitectureComponent {
    /// An empty component.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            local_variables: Vec::new(),
            global_variables: Vec::new(),
            signals: Vec::new(),
            incoming_signals: Vec::new(),
            other_member_max_call_instance_counts: BTreeMap::new(),
            uses_simple_memory: false,
        }
    }

    /// The `_Started` handshake signal.
    pub fn started_signal(&self) -> DataObject {
        DataObject::signal(naming::started(&self.name), DataType::Boolean)
            .with_initial_value(Value::Boolean(false).into())
    }

    /// The `_Finished` handshake signal.
    pub fn finished_signal(&self) -> DataObject {
        DataObject::signal(naming::finished(&self.name), DataType::Boolean)
            .with_initial_value(Value::Boolean(false).into())
    }

    /// Reference to the `_Started` signal.
    pub fn started_reference(&self) -> DataObjectReference {
        DataObjectReference::signal(naming::started(&self.name))
    }

    /// Reference to the `_Finished` signal.
    pub fn finished_reference(&self) -> DataObjectReference {
        DataObjectReference::signal(naming::finished(&self.name))
    }

    /// Adds a process variable unless one with the same name exists.
    pub fn add_local_variable(&mut self, variable: DataObject) -> DataObjectReference {
        add_unique(&mut self.local_variables, variable)
    }

    /// Adds a shared variable unless one with the same name exists.
    pub fn add_global_variable(&mut self, mut variable: DataObject) -> DataObjectReference {
        variable.shared = true;
        add_unique(&mut self.global_variables, variable)
    }

    /// Adds a signal unless one with the same name exists.
    pub fn add_signal(&mut self, signal: DataObject) -> DataObjectReference {
        add_unique(&mut self.signals, signal)
    }

    /// Adds a signal driven by a proxy unless one with the same name exists.
    pub fn add_incoming_signal(&mut self, signal: DataObject) -> DataObjectReference {
        add_unique(&mut self.incoming_signals, signal)
    }

    /// Finds a declared signal by name.
    pub fn signal(&self, name: &str) -> Option<&DataObject> {
        self.signals
            .iter()
            .chain(self.incoming_signals.iter())
            .find(|signal| signal.name == name)
    }

    /// Raises the recorded number of concurrent invocations of `callee`.
    pub fn record_call_instance_count(&mut self, callee: &str, count: u32) {
        let entry = self
            .other_member_max_call_instance_counts
            .entry(callee.to_string())
            .or_insert(0);
        *entry = (*entry).max(count);
    }

    /// Architecture-level declarations: the handshake pair, the other
    /// signals, then the shared variables.
    pub fn build_declarations(&self) -> Vec<Declaration> {
        let mut declarations = vec![
            Declaration::DataObject(self.started_signal()),
            Declaration::DataObject(self.finished_signal()),
        ];
        declarations.extend(
            self.signals
                .iter()
                .chain(self.incoming_signals.iter())
                .cloned()
                .map(Declaration::DataObject),
        );
        declarations.extend(self.global_variables.iter().cloned().map(Declaration::DataObject));
        declarations
    }

    /// Assignments restoring every object the component drives that
    /// declares an initial value. Proxy-driven signals are reset by their
    /// proxy.
    pub fn reset_statements(&self) -> Vec<Statement> {
        [self.finished_signal()]
            .iter()
            .chain(self.signals.iter())
            .chain(self.local_variables.iter())
            .chain(self.global_variables.iter())
            .filter_map(|object| {
                object
                    .initial_value
                    .clone()
                    .map(|value| Statement::assign(object.to_reference(), value))
            })
            .collect()
    }
}

fn add_unique(objects: &mut Vec<DataObject>, object: DataObject) -> DataObjectReference {
    if let Some(existing) = objects.iter().find(|existing| existing.name == object.name) {
        return existing.to_reference();
    }
    let reference = object.to_reference();
    objects.push(object);
    reference
}

/// A component rendered to IR: its architecture-level declarations and its
/// process.
#[derive(Debug, Clone, PartialEq)]
pub struct ArchitectureComponentResult {
    /// Declarations for the architecture's declarative part.
    pub declarations: Vec<Declaration>,
    /// The component's process.
    pub body: Process,
}

#[cfg(test)]
mod tests {
    use super::*;
    use hast_vhdl::{Render, VhdlGenerationOptions};

    #[test]
    fn declarations_start_with_handshake_pair() {
        let mut component = ArchitectureComponent::new("Calc.Run().0");
        component.add_signal(DataObject::signal("Calc.Run().0.Return", DataType::unsigned(32)));
        component.add_global_variable(DataObject::variable("Calc.Run().0.Shared", DataType::Boolean));
        let options = VhdlGenerationOptions::debug();
        let rendered: Vec<String> = component
            .build_declarations()
            .iter()
            .map(|declaration| declaration.to_vhdl(&options))
            .collect();
        assert_eq!(rendered.len(), 4);
        assert_eq!(rendered[0], "signal \\Calc.Run().0._Started\\: boolean := false;\n");
        assert_eq!(rendered[1], "signal \\Calc.Run().0._Finished\\: boolean := false;\n");
        assert!(rendered[3].starts_with("shared variable"));
    }

    #[test]
    fn objects_are_deduplicated_by_name() {
        let mut component = ArchitectureComponent::new("C");
        let first = component.add_local_variable(DataObject::variable("C.x", DataType::Boolean));
        let second = component.add_local_variable(DataObject::variable("C.x", DataType::Integer));
        assert_eq!(first, second);
        assert_eq!(component.local_variables.len(), 1);
    }

    #[test]
    fn call_instance_counts_keep_maximum() {
        let mut component = ArchitectureComponent::new("C");
        component.record_call_instance_count("Task", 3);
        component.record_call_instance_count("Task", 1);
        assert_eq!(component.other_member_max_call_instance_counts["Task"], 3);
    }

    #[test]
    fn reset_restores_initialized_objects_only() {
        let mut component = ArchitectureComponent::new("C");
        component.add_local_variable(
            DataObject::variable("C.x", DataType::unsigned(8)).with_initial_value(Value::Others('0').into()),
        );
        component.add_local_variable(DataObject::variable("C.y", DataType::unsigned(8)));
        component.add_incoming_signal(
            DataObject::signal("C.Parameter.p.In", DataType::Boolean).with_initial_value(Value::Boolean(false).into()),
        );
        let reset = component.reset_statements();
        assert_eq!(reset.len(), 2);
        let options = VhdlGenerationOptions::debug();
        assert_eq!(reset[0].to_vhdl(&options), "\\C._Finished\\ <= false;\n");
        assert_eq!(reset[1].to_vhdl(&options), "\\C.x\\ := (others => '0');\n");
        assert!(component.signal("C.Parameter.p.In").is_some());
    }
}
